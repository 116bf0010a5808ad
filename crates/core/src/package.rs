//! Import path → parsed package.
//!
//! [`ModuleLoader`] maps import paths onto directories: the main module,
//! its `vendor/` tree, required modules in the module cache, and the
//! standard library under `$GOROOT/src`. Every non-test `.go` file that
//! takes part in the build is parsed.

use crate::ast::{SourceFile, TypeDecl};
use crate::build::GoEnv;
use crate::error::LoadError;
use crate::source::SourceProvider;
use std::path::{Path, PathBuf};

/// A parsed package: its declared name and files in file-name order.
#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<SourceFile>,
}

impl Package {
    /// The declaration of `name` together with the file that declares it.
    pub fn find_type(&self, name: &str) -> Option<(&SourceFile, &TypeDecl)> {
        self.files.iter().find_map(|file| {
            file.types
                .iter()
                .find(|decl| decl.name == name)
                .map(|decl| (file, decl))
        })
    }
}

/// Loads packages by import path. Implementations must be deterministic for
/// a given path; callers cache the results.
pub trait PackageLoader {
    fn load(&self, path: &str) -> Result<Package, LoadError>;
}

/// `require path version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
}

/// `replace path [version] => target [version]`. A target without a version
/// is a directory relative to the module root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub path: String,
    pub target: String,
    pub version: Option<String>,
}

/// A module root and what its `go.mod` declares.
#[derive(Debug, Clone)]
pub struct GoModule {
    pub root: PathBuf,
    pub module_path: String,
    pub requires: Vec<Requirement>,
    pub replaces: Vec<Replacement>,
}

impl GoModule {
    /// Read `<root>/go.mod`.
    pub fn discover(root: &Path, provider: &dyn SourceProvider) -> Result<Self, LoadError> {
        let go_mod = root.join("go.mod");
        let text = provider.read_source(&go_mod).map_err(|source| LoadError::Io {
            path: go_mod.clone(),
            source,
        })?;
        let module_path =
            parse_module_directive(&text).ok_or_else(|| LoadError::MissingModuleDirective {
                root: root.to_path_buf(),
            })?;
        let (requires, replaces) = parse_dependencies(&text);
        Ok(GoModule {
            root: root.to_path_buf(),
            module_path,
            requires,
            replaces,
        })
    }

    /// Directory holding the package with import path `path`, if any.
    ///
    /// The empty path names the module root. Lookup order: the main module,
    /// `vendor/`, the required module with the longest matching path, then
    /// the standard library.
    pub fn package_dir(
        &self,
        path: &str,
        provider: &dyn SourceProvider,
        env: &GoEnv,
    ) -> Option<PathBuf> {
        if let Some(rest) = strip_module(path, &self.module_path) {
            return Some(join_rest(self.root.clone(), rest));
        }
        let vendored = self.root.join("vendor").join(path);
        if provider.is_dir(&vendored) {
            return Some(vendored);
        }
        if let Some(dir) = self.dependency_dir(path, env) {
            if provider.is_dir(&dir) {
                return Some(dir);
            }
        }
        if is_standard_path(path) {
            let dir = env.goroot.as_ref()?.join("src").join(path);
            if provider.is_dir(&dir) {
                return Some(dir);
            }
        }
        None
    }

    fn dependency_dir(&self, path: &str, env: &GoEnv) -> Option<PathBuf> {
        let (req, rest) = self
            .requires
            .iter()
            .filter_map(|req| strip_module(path, &req.path).map(|rest| (req, rest)))
            .max_by_key(|(req, _)| req.path.len())?;
        let base = match self.replaces.iter().find(|r| r.path == req.path) {
            Some(Replacement {
                target,
                version: None,
                ..
            }) => self.root.join(target),
            Some(Replacement {
                target,
                version: Some(version),
                ..
            }) => cache_dir(env, target, version)?,
            None => cache_dir(env, &req.path, &req.version)?,
        };
        Some(join_rest(base, rest))
    }
}

/// `Some(rest)` when `path` is `module` or lies below it.
fn strip_module<'p>(path: &'p str, module: &str) -> Option<&'p str> {
    if path.is_empty() || path == module {
        return Some("");
    }
    path.strip_prefix(module)?.strip_prefix('/')
}

fn join_rest(base: PathBuf, rest: &str) -> PathBuf {
    if rest.is_empty() {
        base
    } else {
        base.join(rest)
    }
}

fn cache_dir(env: &GoEnv, path: &str, version: &str) -> Option<PathBuf> {
    let cache = env.mod_cache.as_ref()?;
    Some(cache.join(format!(
        "{}@{}",
        escape_module_text(path),
        escape_module_text(version)
    )))
}

/// Standard-library paths have no dot in their first element.
fn is_standard_path(path: &str) -> bool {
    !path.is_empty() && !path.split('/').next().unwrap_or_default().contains('.')
}

/// Module cache case encoding: each upper-case letter becomes `!` followed
/// by its lower-case form (`github.com/Azure/x` → `github.com/!azure/x`).
pub fn escape_module_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The module path from a `go.mod` file (`module example.com/m`).
pub fn parse_module_directive(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or_default().trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// `require` and `replace` directives, single-line or in blocks.
pub fn parse_dependencies(go_mod: &str) -> (Vec<Requirement>, Vec<Replacement>) {
    let mut requires = Vec::new();
    let mut replaces = Vec::new();
    let mut block: Option<&str> = None;
    for raw in go_mod.lines() {
        let line = raw.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let (verb, body) = match block {
            Some(_) if line == ")" => {
                block = None;
                continue;
            }
            Some(verb) => (verb, line),
            None => {
                let Some((verb, rest)) = line.split_once(char::is_whitespace) else {
                    continue;
                };
                let rest = rest.trim();
                if rest == "(" {
                    block = Some(verb);
                    continue;
                }
                (verb, rest)
            }
        };
        match verb {
            "require" => {
                let words: Vec<&str> = body.split_whitespace().map(unquote).collect();
                if let [path, version, ..] = words.as_slice() {
                    requires.push(Requirement {
                        path: path.to_string(),
                        version: version.to_string(),
                    });
                }
            }
            "replace" => {
                let Some((old, new)) = body.split_once("=>") else {
                    continue;
                };
                let old: Vec<&str> = old.split_whitespace().map(unquote).collect();
                let new: Vec<&str> = new.split_whitespace().map(unquote).collect();
                if let (Some(path), Some(target)) = (old.first(), new.first()) {
                    replaces.push(Replacement {
                        path: path.to_string(),
                        target: target.to_string(),
                        version: new.get(1).map(|v| v.to_string()),
                    });
                }
            }
            _ => {}
        }
    }
    (requires, replaces)
}

fn unquote(word: &str) -> &str {
    word.trim_matches('"')
}

/// Conventional package name for an import path, used when the package
/// itself cannot be loaded: `gopkg.in/yaml.v3` → `yaml`,
/// `github.com/jackc/pgx/v5` → `pgx`, `github.com/mattn/go-isatty` → `isatty`.
pub fn guess_package_name(path: &str) -> String {
    let mut segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    if segments.len() > 1 {
        if let Some(last) = segments.last() {
            if is_major_version(last) {
                segments.pop();
            }
        }
    }
    let mut name = segments.last().copied().unwrap_or(path);
    if let Some((base, version)) = name.rsplit_once('.') {
        if is_major_version(version) {
            name = base;
        }
    }
    let name = name.strip_prefix("go-").unwrap_or(name);
    let name = name.rsplit('-').next().unwrap_or(name);
    name.to_string()
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// [`PackageLoader`] over one Go module read through a [`SourceProvider`].
pub struct ModuleLoader<P: SourceProvider> {
    provider: P,
    module: GoModule,
    env: GoEnv,
}

impl<P: SourceProvider> ModuleLoader<P> {
    /// Locate the module from `<root>/go.mod`, building for the host
    /// environment ([`GoEnv::from_env`]).
    pub fn discover(provider: P, root: &Path) -> Result<Self, LoadError> {
        Self::discover_with(provider, root, GoEnv::from_env())
    }

    pub fn discover_with(provider: P, root: &Path, env: GoEnv) -> Result<Self, LoadError> {
        let module = GoModule::discover(root, &provider)?;
        Ok(ModuleLoader {
            provider,
            module,
            env,
        })
    }

    pub fn module(&self) -> &GoModule {
        &self.module
    }
}

impl<P: SourceProvider> PackageLoader for ModuleLoader<P> {
    fn load(&self, path: &str) -> Result<Package, LoadError> {
        let dir = self
            .module
            .package_dir(path, &self.provider, &self.env)
            .ok_or_else(|| LoadError::Unresolved {
                path: path.to_string(),
                module: self.module.module_path.clone(),
            })?;
        let entries = self
            .provider
            .list_dir(&dir)
            .map_err(|source| LoadError::Io {
                path: dir.clone(),
                source,
            })?;

        let mut files: Vec<SourceFile> = Vec::new();
        for file_path in entries {
            let file_name = file_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            if !file_name.ends_with(".go") || file_name.ends_with("_test.go") {
                continue;
            }
            let src = self
                .provider
                .read_source(&file_path)
                .map_err(|source| LoadError::Io {
                    path: file_path.clone(),
                    source,
                })?;
            if !self.env.includes(&file_name, &src)? {
                tracing::trace!(path, file = %file_name, "excluded by build constraints");
                continue;
            }
            let file = crate::parse_source(&src, &file_name)?;
            if let Some(first) = files.first() {
                if first.package != file.package {
                    return Err(LoadError::MultiplePackages {
                        path: path.to_string(),
                        first: first.package.clone(),
                        second: file.package,
                    });
                }
            }
            files.push(file);
        }

        let Some(first) = files.first() else {
            return Err(LoadError::NoGoFiles {
                path: path.to_string(),
                dir,
            });
        };
        let name = first.package.clone();
        tracing::trace!(path, %name, files = files.len(), "loaded package");
        Ok(Package {
            path: path.to_string(),
            name,
            dir,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    fn module() -> InMemoryProvider {
        InMemoryProvider::default()
            .with_file("/m/go.mod", "module example.com/app\n\ngo 1.22\n")
            .with_file(
                "/m/models/b.go",
                "package models\n\ntype B struct{ X int }\n",
            )
            .with_file(
                "/m/models/a.go",
                "package models\n\ntype A struct{ Y string }\n",
            )
            .with_file(
                "/m/models/a_test.go",
                "package models_test\n\ntype T struct{}\n",
            )
            .with_file(
                "/m/vendor/github.com/google/uuid/uuid.go",
                "package uuid\n\ntype UUID [16]byte\n",
            )
    }

    #[test]
    fn module_directive_is_parsed() {
        assert_eq!(
            parse_module_directive("// c\nmodule example.com/app // trailing\n").as_deref(),
            Some("example.com/app")
        );
        assert_eq!(parse_module_directive("modules x\n"), None);
        assert_eq!(parse_module_directive("go 1.21\n"), None);
    }

    #[test]
    fn loads_package_files_in_name_order_skipping_tests() {
        let loader = ModuleLoader::discover(module(), Path::new("/m")).unwrap();
        let pkg = loader.load("example.com/app/models").unwrap();
        assert_eq!(pkg.name, "models");
        let names: Vec<_> = pkg.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
        let (file, decl) = pkg.find_type("B").unwrap();
        assert_eq!(file.name, "b.go");
        assert_eq!(decl.name, "B");
    }

    #[test]
    fn vendored_packages_resolve() {
        let loader = ModuleLoader::discover(module(), Path::new("/m")).unwrap();
        let pkg = loader.load("github.com/google/uuid").unwrap();
        assert_eq!(pkg.name, "uuid");
    }

    #[test]
    fn unknown_path_is_unresolved() {
        let loader = ModuleLoader::discover(module(), Path::new("/m")).unwrap();
        let err = loader.load("github.com/other/thing").unwrap_err();
        assert!(matches!(err, LoadError::Unresolved { .. }));
    }

    #[test]
    fn mixed_package_clauses_are_rejected() {
        let provider = module().with_file("/m/models/c.go", "package other\n");
        let loader = ModuleLoader::discover(provider, Path::new("/m")).unwrap();
        let err = loader.load("example.com/app/models").unwrap_err();
        assert!(matches!(err, LoadError::MultiplePackages { .. }));
    }

    fn linux() -> GoEnv {
        GoEnv::new("linux", "amd64")
            .with_mod_cache("/cache")
            .with_goroot("/goroot")
    }

    #[test]
    fn ignored_and_foreign_platform_files_are_skipped() {
        let provider = module()
            .with_file(
                "/m/models/gen.go",
                "//go:build ignore\n\npackage main\n\ntype Gen struct{}\n",
            )
            .with_file(
                "/m/models/path_windows.go",
                "package models\n\ntype Path struct{ Drive string }\n",
            )
            .with_file(
                "/m/models/path_linux.go",
                "package models\n\ntype Path struct{ Root string }\n",
            );
        let loader = ModuleLoader::discover_with(provider, Path::new("/m"), linux()).unwrap();
        let pkg = loader.load("example.com/app/models").unwrap();
        assert_eq!(pkg.name, "models");
        let names: Vec<_> = pkg.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.go", "b.go", "path_linux.go"]);
        assert!(pkg.find_type("Gen").is_none());
        let (file, _) = pkg.find_type("Path").unwrap();
        assert_eq!(file.name, "path_linux.go");
    }

    #[test]
    fn required_modules_resolve_from_the_module_cache() {
        let provider = InMemoryProvider::default()
            .with_file(
                "/m/go.mod",
                "module example.com/app\n\nrequire gorm.io/gorm v1.25.0\n\nrequire (\n\tgithub.com/Azure/go-sdk v0.3.1 // indirect\n)\n",
            )
            .with_file(
                "/cache/gorm.io/gorm@v1.25.0/model.go",
                "package gorm\n\ntype Model struct{ ID uint }\n",
            )
            .with_file(
                "/cache/github.com/!azure/go-sdk@v0.3.1/storage/blob.go",
                "package storage\n\ntype Blob struct{ Name string }\n",
            );
        let loader = ModuleLoader::discover_with(provider, Path::new("/m"), linux()).unwrap();
        let gorm = loader.load("gorm.io/gorm").unwrap();
        assert_eq!(gorm.name, "gorm");
        assert_eq!(gorm.dir, PathBuf::from("/cache/gorm.io/gorm@v1.25.0"));
        let blob = loader.load("github.com/Azure/go-sdk/storage").unwrap();
        assert!(blob.find_type("Blob").is_some());
    }

    #[test]
    fn replace_directives_redirect_required_modules() {
        let provider = InMemoryProvider::default()
            .with_file(
                "/m/go.mod",
                "module example.com/app\n\nrequire (\n\texample.com/lib v1.0.0\n\texample.com/fork v1.0.0\n)\n\nreplace example.com/lib => ../lib\nreplace example.com/fork v1.0.0 => example.com/forked v1.2.0\n",
            )
            .with_file("/lib/types/t.go", "package types\n\ntype T struct{}\n")
            .with_file("/cache/example.com/forked@v1.2.0/f.go", "package fork\n\ntype F struct{}\n");
        let loader = ModuleLoader::discover_with(provider, Path::new("/m"), linux()).unwrap();
        assert_eq!(loader.load("example.com/lib/types").unwrap().name, "types");
        assert_eq!(loader.load("example.com/fork").unwrap().name, "fork");
    }

    #[test]
    fn standard_library_resolves_under_goroot() {
        let provider = module().with_file(
            "/goroot/src/time/time.go",
            "package time\n\ntype Time struct{ wall uint64 }\n",
        );
        let loader = ModuleLoader::discover_with(provider.clone(), Path::new("/m"), linux()).unwrap();
        assert_eq!(loader.load("time").unwrap().name, "time");

        let no_goroot = GoEnv::new("linux", "amd64");
        let loader = ModuleLoader::discover_with(provider, Path::new("/m"), no_goroot).unwrap();
        assert!(matches!(loader.load("time"), Err(LoadError::Unresolved { .. })));
    }

    #[test]
    fn dependency_directives_are_parsed() {
        let (requires, replaces) = parse_dependencies(
            "module x\n\nrequire a.com/b v1.0.0\nrequire (\n\t\"c.com/d\" v2.1.0 // indirect\n)\nexclude e.com/f v1.0.0\nreplace (\n\ta.com/b => ./local\n)\n",
        );
        assert_eq!(
            requires,
            vec![
                Requirement {
                    path: "a.com/b".into(),
                    version: "v1.0.0".into()
                },
                Requirement {
                    path: "c.com/d".into(),
                    version: "v2.1.0".into()
                },
            ]
        );
        assert_eq!(
            replaces,
            vec![Replacement {
                path: "a.com/b".into(),
                target: "./local".into(),
                version: None
            }]
        );
        assert_eq!(escape_module_text("github.com/BurntSushi/toml"), "github.com/!burnt!sushi/toml");
    }

    #[test]
    fn guesses_conventional_names() {
        assert_eq!(guess_package_name("time"), "time");
        assert_eq!(guess_package_name("github.com/google/uuid"), "uuid");
        assert_eq!(guess_package_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(guess_package_name("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(guess_package_name("github.com/mattn/go-isatty"), "isatty");
    }
}
