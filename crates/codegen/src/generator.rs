//! Code assembly: one Go function per mapping, plus the file around them.

use crate::conversion::{find_conversion, Assignment};
use crate::error::{CodegenError, ResolveError};
use crate::imports::ImportManager;
use crate::matcher::SourceIndex;
use crate::model::{Config, ConversionRule, FieldDescriptor, MappingSpec, TypeKey};
use crate::packages::PackageCache;
use crate::resolver::TypeResolver;
use crate::store::TypeStore;
use structmap_core::PackageLoader;

pub const GENERATED_HEADER: &str = "// Code generated by structmap; DO NOT EDIT.";

/// One emitted mapping function.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFunction {
    pub name: String,
    /// `// Name copies From → To`
    pub doc: String,
    /// `func Name(src From, ...) (dst To)` without the opening brace.
    pub signature: String,
    /// Assignment lines, unindented, without the final `return`.
    pub body: String,
    pub returns_error: bool,
}

impl GeneratedFunction {
    /// The full function text.
    pub fn source(&self) -> String {
        let mut out = format!("{}\n{} {{\n", self.doc, self.signature);
        for line in self.body.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push('\t');
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("\treturn\n}");
        out
    }
}

/// Mutable state of one run: loaded packages, resolved types and import
/// aliases. Owned by the caller and passed to every step.
struct Session {
    packages: PackageCache,
    store: TypeStore,
    imports: ImportManager,
}

impl Session {
    fn new(loader: Box<dyn PackageLoader>) -> Self {
        Session {
            packages: PackageCache::new(loader),
            store: TypeStore::new(),
            imports: ImportManager::new(),
        }
    }

    fn ensure_resolved(&mut self, key: &TypeKey) -> Result<&[FieldDescriptor], ResolveError> {
        if !self.store.contains(key) {
            let fields =
                TypeResolver::new(&mut self.packages, &mut self.imports).resolve(key)?;
            tracing::debug!(%key, fields = fields.len(), "resolved type");
            self.store.insert(key.clone(), fields);
        }
        Ok(self.store.get(key).unwrap_or_default())
    }
}

pub struct Generator {
    config: Config,
    conversions: Vec<ConversionRule>,
    session: Session,
}

impl Generator {
    pub fn new(
        config: Config,
        conversions: Vec<ConversionRule>,
        loader: Box<dyn PackageLoader>,
    ) -> Self {
        Generator {
            config,
            conversions,
            session: Session::new(loader),
        }
    }

    pub fn imports(&self) -> &ImportManager {
        &self.session.imports
    }

    /// Produce the complete output file. Any resolution or template error
    /// aborts the run.
    pub fn generate(&mut self) -> Result<String, CodegenError> {
        for rule in &self.conversions {
            for path in &rule.imports {
                self.session.imports.register(path);
            }
        }

        let mut functions = Vec::with_capacity(self.config.mappings.len());
        for (index, mapping) in self.config.mappings.iter().enumerate() {
            let context = format!("mapping {} ({})", index, mapping.label());
            prepare(&mut self.session, mapping, self.config.debug).map_err(|source| {
                CodegenError::Resolve {
                    context: context.clone(),
                    source,
                }
            })?;
            let function = assemble(
                &self.session,
                mapping,
                &self.conversions,
                &self.config.default_tag,
                &context,
            )?;
            tracing::debug!(
                function = %function.name,
                returns_error = function.returns_error,
                "generated mapping function"
            );
            functions.push(function.source());
        }

        let code = functions.join("\n\n");
        let mut out = format!(
            "{}\npackage {}\n\n",
            GENERATED_HEADER, self.config.out_package_name
        );
        let import_block = self.session.imports.render(&code);
        if !import_block.is_empty() {
            out.push_str(&import_block);
            out.push('\n');
        }
        if !code.is_empty() {
            out.push_str(&code);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Fields of a single type, with nothing generated.
pub fn inspect(
    loader: Box<dyn PackageLoader>,
    key: &TypeKey,
) -> Result<Vec<FieldDescriptor>, CodegenError> {
    let mut session = Session::new(loader);
    let fields = session
        .ensure_resolved(key)
        .map_err(|source| CodegenError::Resolve {
            context: format!("inspecting {}", key),
            source,
        })?;
    Ok(fields.to_vec())
}

/// Register the mapping's declared imports, then resolve both sides.
fn prepare(session: &mut Session, mapping: &MappingSpec, debug: bool) -> Result<(), ResolveError> {
    for rule in &mapping.conversions {
        for path in &rule.imports {
            session.imports.register(path);
        }
    }
    for arg in &mapping.additional_args {
        for path in arg.ty.imports() {
            session.imports.register(path);
        }
    }
    for path in mapping.from.imports().iter().chain(mapping.to.imports()) {
        session.imports.register(path);
    }

    for (side, key) in [("source", &mapping.from_key), ("dest", &mapping.to_key)] {
        let fields = session.ensure_resolved(key)?;
        if debug {
            match serde_json::to_string_pretty(fields) {
                Ok(json) => tracing::info!(%key, "{} fields:\n{}", side, json),
                Err(err) => tracing::warn!(%key, error = %err, "cannot dump {} fields", side),
            }
        }
    }
    Ok(())
}

fn assemble(
    session: &Session,
    mapping: &MappingSpec,
    global: &[ConversionRule],
    default_tag: &str,
    context: &str,
) -> Result<GeneratedFunction, CodegenError> {
    let imports = &session.imports;
    let sources = session.store.get(&mapping.from_key).unwrap_or_default();
    let dests = session.store.get(&mapping.to_key).unwrap_or_default();
    let index = SourceIndex::new(sources, mapping.tag_key(default_tag));

    let mut lines: Vec<String> = Vec::with_capacity(dests.len());
    let mut returns_error = false;
    for dest in dests {
        let (source_expr, source_ty) = if let Some(arg) = mapping.arg_for(&dest.name) {
            (arg.name.clone(), &arg.ty)
        } else if let Some(source) = index.match_field(dest, &mapping.field_overrides) {
            (format!("src.{}", source.name), &source.ty)
        } else {
            tracing::warn!(
                mapping = %mapping.label(),
                field = %dest.name,
                "no matching source field"
            );
            lines.push(format!(
                "// no matching source found for field: {}, consider adding an additional arg or aligning the fields",
                dest.name
            ));
            continue;
        };

        let dest_expr = format!("dst.{}", dest.name);
        let assignment =
            match find_conversion(source_ty, &dest.ty, &mapping.conversions, global, imports) {
                Some((rule, direction)) => {
                    tracing::trace!(field = %dest.name, ?direction, "applying conversion");
                    rule.render(direction, &source_expr, &dest_expr, "err", imports)
                        .map_err(|source| CodegenError::Template {
                            context: format!("{}: field {}", context, dest.name),
                            source,
                        })?
                }
                None => Assignment::direct(&dest_expr, &source_expr),
            };
        returns_error |= assignment.fallible;
        lines.push(assignment.code);
    }

    let name = mapping.function_name();
    let mut params = vec![format!("src {}", mapping.from.render(imports))];
    for arg in &mapping.additional_args {
        params.push(format!("{} {}", arg.name, arg.ty.render(imports)));
    }
    let to = mapping.to.render(imports);
    let results = if returns_error {
        format!("(dst {}, err error)", to)
    } else {
        format!("(dst {})", to)
    };

    Ok(GeneratedFunction {
        doc: format!(
            "// {} copies {} → {}",
            name,
            mapping.from.unaliased(),
            mapping.to.unaliased()
        ),
        signature: format!("func {}({}) {}", name, params.join(", "), results),
        body: lines.join("\n"),
        returns_error,
        name,
    })
}
