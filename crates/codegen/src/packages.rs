//! Per-run cache of loaded packages and package names.

use std::collections::HashMap;
use std::rc::Rc;
use structmap_core::{guess_package_name, LoadError, Package, PackageLoader};

pub struct PackageCache {
    loader: Box<dyn PackageLoader>,
    packages: HashMap<String, Rc<Package>>,
    names: HashMap<String, String>,
}

impl PackageCache {
    pub fn new(loader: Box<dyn PackageLoader>) -> Self {
        PackageCache {
            loader,
            packages: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Load `path`, at most once per run.
    pub fn load(&mut self, path: &str) -> Result<Rc<Package>, LoadError> {
        if let Some(pkg) = self.packages.get(path) {
            return Ok(Rc::clone(pkg));
        }
        let pkg = Rc::new(self.loader.load(path)?);
        tracing::debug!(path, name = %pkg.name, "loaded package");
        self.names.insert(path.to_string(), pkg.name.clone());
        self.packages.insert(path.to_string(), Rc::clone(&pkg));
        Ok(pkg)
    }

    /// The name a plain import of `path` binds: the declared package name
    /// when the package loads, the conventional guess otherwise.
    pub fn package_name(&mut self, path: &str) -> String {
        if let Some(name) = self.names.get(path) {
            return name.clone();
        }
        let name = match self.load(path) {
            Ok(pkg) => pkg.name.clone(),
            Err(err) => {
                tracing::trace!(path, error = %err, "package name guessed from path");
                guess_package_name(path)
            }
        };
        self.names.insert(path.to_string(), name.clone());
        name
    }
}
