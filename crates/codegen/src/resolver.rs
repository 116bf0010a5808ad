//! Type resolution: a named struct type → its flattened field list.
//!
//! Aliases and defined types are followed to their target, embedded members
//! are expanded in place, and every module path a field type mentions is
//! registered with the [`ImportManager`] so the output can qualify it.

use crate::error::ResolveError;
use crate::imports::ImportManager;
use crate::model::{FieldDescriptor, TypeKey};
use crate::packages::PackageCache;
use crate::template::TypeTemplate;
use std::collections::HashSet;
use structmap_core::{FieldDecl, Package, SourceFile, TypeExpr};

/// Types currently being expanded. The Vec keeps order for the error
/// message, the set gives constant-time lookups.
#[derive(Debug, Default)]
pub struct Visiting {
    stack: Vec<TypeKey>,
    stack_set: HashSet<TypeKey>,
}

impl Visiting {
    fn enter(&mut self, key: &TypeKey) -> Result<(), ResolveError> {
        if self.stack_set.contains(key) {
            let mut chain: Vec<String> = self.stack.iter().map(ToString::to_string).collect();
            chain.push(key.to_string());
            return Err(ResolveError::Circular {
                chain: chain.join(" → "),
            });
        }
        self.stack_set.insert(key.clone());
        self.stack.push(key.clone());
        Ok(())
    }

    fn leave(&mut self, key: &TypeKey) {
        self.stack.pop();
        self.stack_set.remove(key);
    }
}

pub struct TypeResolver<'a> {
    packages: &'a mut PackageCache,
    imports: &'a mut ImportManager,
}

impl<'a> TypeResolver<'a> {
    pub fn new(packages: &'a mut PackageCache, imports: &'a mut ImportManager) -> Self {
        TypeResolver { packages, imports }
    }

    /// Fields of `key` in declaration order, embedded members flattened.
    pub fn resolve(&mut self, key: &TypeKey) -> Result<Vec<FieldDescriptor>, ResolveError> {
        self.resolve_in(key, &mut Visiting::default())
    }

    pub fn resolve_in(
        &mut self,
        key: &TypeKey,
        visiting: &mut Visiting,
    ) -> Result<Vec<FieldDescriptor>, ResolveError> {
        visiting.enter(key)?;
        let result = self.resolve_decl(key, visiting);
        visiting.leave(key);
        result
    }

    fn resolve_decl(
        &mut self,
        key: &TypeKey,
        visiting: &mut Visiting,
    ) -> Result<Vec<FieldDescriptor>, ResolveError> {
        self.imports.register(&key.module);
        let pkg = self
            .packages
            .load(&key.module)
            .map_err(|source| ResolveError::Load {
                path: key.module.clone(),
                source,
            })?;
        let (file, decl) =
            pkg.find_type(&key.name)
                .ok_or_else(|| ResolveError::TypeNotFound {
                    path: key.module.clone(),
                    name: key.name.clone(),
                })?;
        tracing::trace!(%key, file = %file.name, alias = decl.alias, "resolving type");

        match strip_parens(&decl.ty) {
            TypeExpr::Struct(fields) => self.expand_struct(key, &pkg, file, fields, visiting),
            TypeExpr::Named(target) if !is_predeclared(target) => {
                let target = TypeKey::new(key.module.clone(), target.clone());
                self.resolve_in(&target, visiting)
            }
            TypeExpr::Qualified { package, name } => {
                let module = self.import_path(&pkg, file, package)?;
                self.resolve_in(&TypeKey::new(module, name.clone()), visiting)
            }
            target @ (TypeExpr::Generic { .. } | TypeExpr::Pointer(_)) => {
                Err(ResolveError::UnsupportedAlias {
                    key: key.to_string(),
                    target: target.to_string(),
                })
            }
            other => Err(ResolveError::NotAStruct {
                key: key.to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn expand_struct(
        &mut self,
        key: &TypeKey,
        pkg: &Package,
        file: &SourceFile,
        fields: &[FieldDecl],
        visiting: &mut Visiting,
    ) -> Result<Vec<FieldDescriptor>, ResolveError> {
        let mut out = Vec::new();
        for field in fields {
            if field.is_embedded() {
                let target = self.embedded_target(key, pkg, file, &field.ty)?;
                tracing::trace!(%key, embedded = %target, "expanding embedded field");
                out.extend(self.resolve_in(&target, visiting)?);
                continue;
            }

            let modules = field
                .ty
                .qualifiers()
                .iter()
                .map(|q| self.import_path(pkg, file, q))
                .collect::<Result<Vec<_>, _>>()?;
            for module in &modules {
                self.imports.register(module);
            }
            let ty = TypeTemplate::from_expr(&field.ty, modules)?;
            let tag = field.tag.clone().unwrap_or_default();
            for name in &field.names {
                out.push(FieldDescriptor {
                    name: name.clone(),
                    tag: tag.clone(),
                    ty: ty.clone(),
                });
            }
        }
        Ok(out)
    }

    /// The named type an embedded member refers to: `T`, `*T`, `pkg.T` or
    /// `*pkg.T`.
    fn embedded_target(
        &mut self,
        key: &TypeKey,
        pkg: &Package,
        file: &SourceFile,
        ty: &TypeExpr,
    ) -> Result<TypeKey, ResolveError> {
        match strip_parens(ty) {
            TypeExpr::Pointer(inner) => self.embedded_target(key, pkg, file, inner),
            TypeExpr::Named(name) => Ok(TypeKey::new(key.module.clone(), name.clone())),
            TypeExpr::Qualified { package, name } => {
                let module = self.import_path(pkg, file, package)?;
                Ok(TypeKey::new(module, name.clone()))
            }
            other => Err(ResolveError::UnsupportedEmbedded {
                key: key.to_string(),
                expr: other.to_string(),
            }),
        }
    }

    /// Module path bound to `qualifier` by the imports of `file`. An explicit
    /// import name wins; otherwise the imported package's own name decides.
    /// Blank and dot imports never bind a qualifier.
    fn import_path(
        &mut self,
        pkg: &Package,
        file: &SourceFile,
        qualifier: &str,
    ) -> Result<String, ResolveError> {
        for import in &file.imports {
            let bound = match import.name.as_deref() {
                Some("_") | Some(".") => continue,
                Some(name) => name == qualifier,
                None => self.packages.package_name(&import.path) == qualifier,
            };
            if bound {
                return Ok(import.path.clone());
            }
        }
        Err(ResolveError::ImportNotFound {
            qualifier: qualifier.to_string(),
            path: pkg.path.clone(),
            file: file.name.clone(),
        })
    }
}

fn strip_parens(ty: &TypeExpr) -> &TypeExpr {
    match ty {
        TypeExpr::Paren(inner) => strip_parens(inner),
        other => other,
    }
}

fn is_predeclared(name: &str) -> bool {
    matches!(
        name,
        "bool"
            | "byte"
            | "complex64"
            | "complex128"
            | "error"
            | "float32"
            | "float64"
            | "int"
            | "int8"
            | "int16"
            | "int32"
            | "int64"
            | "rune"
            | "string"
            | "uint"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "uintptr"
            | "any"
            | "comparable"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use structmap_core::{InMemoryProvider, ModuleLoader};

    fn cache(provider: InMemoryProvider) -> PackageCache {
        let provider = provider.with_file("/m/go.mod", "module example.com/app\n");
        let loader = ModuleLoader::discover(provider, Path::new("/m")).unwrap();
        PackageCache::new(Box::new(loader))
    }

    fn resolve(
        provider: InMemoryProvider,
        key: TypeKey,
    ) -> (Result<Vec<FieldDescriptor>, ResolveError>, ImportManager) {
        let mut packages = cache(provider);
        let mut imports = ImportManager::new();
        let result = TypeResolver::new(&mut packages, &mut imports).resolve(&key);
        (result, imports)
    }

    fn names(fields: &[FieldDescriptor]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn flattens_two_levels_of_embedding_in_order() {
        let provider = InMemoryProvider::default().with_file(
            "/m/models/models.go",
            "package models\n\ntype Base struct{ ID int }\ntype Mid struct {\n\tBase\n\tCreated int64\n}\ntype Top struct {\n\t*Mid\n\tName string `json:\"name\"`\n}\n",
        );
        let (fields, _) = resolve(provider, TypeKey::new("example.com/app/models", "Top"));
        let fields = fields.unwrap();
        assert_eq!(names(&fields), vec!["ID", "Created", "Name"]);
        assert_eq!(fields[2].tag, "json:\"name\"");
        assert_eq!(fields[2].tag_value("json").as_deref(), Some("name"));
    }

    #[test]
    fn follows_aliases_across_packages() {
        let provider = InMemoryProvider::default()
            .with_file(
                "/m/api/api.go",
                "package api\n\nimport \"example.com/app/models\"\n\ntype User = models.User\n",
            )
            .with_file(
                "/m/models/user.go",
                "package models\n\nimport \"github.com/google/uuid\"\n\ntype User struct {\n\tID uuid.UUID\n\tTags []string\n}\n",
            )
            .with_file(
                "/m/vendor/github.com/google/uuid/uuid.go",
                "package uuid\n\ntype UUID [16]byte\n",
            );
        let (fields, imports) = resolve(provider, TypeKey::new("example.com/app/api", "User"));
        let fields = fields.unwrap();
        assert_eq!(names(&fields), vec!["ID", "Tags"]);
        assert_eq!(fields[0].ty.text(), "{{ .Import0 }}.UUID");
        assert_eq!(fields[0].ty.imports(), ["github.com/google/uuid"]);
        assert_eq!(fields[0].ty.render(&imports), "ref3.UUID");
        assert_eq!(imports.alias_of("example.com/app/api"), "ref1");
        assert_eq!(imports.alias_of("example.com/app/models"), "ref2");
    }

    #[test]
    fn renamed_imports_bind_their_name() {
        let provider = InMemoryProvider::default().with_file(
            "/m/models/user.go",
            "package models\n\nimport (\n\tstd \"time\"\n\t_ \"embed\"\n)\n\ntype User struct{ At std.Time }\n",
        );
        let (fields, imports) = resolve(provider, TypeKey::new("example.com/app/models", "User"));
        let fields = fields.unwrap();
        assert_eq!(fields[0].ty.imports(), ["time"]);
        assert_eq!(fields[0].ty.render(&imports), "time.Time");
    }

    #[test]
    fn alias_cycle_is_detected() {
        let provider = InMemoryProvider::default()
            .with_file(
                "/m/a/a.go",
                "package a\n\nimport \"example.com/app/b\"\n\ntype A = b.B\n",
            )
            .with_file(
                "/m/b/b.go",
                "package b\n\nimport \"example.com/app/a\"\n\ntype B = a.A\n",
            );
        let (result, _) = resolve(provider, TypeKey::new("example.com/app/a", "A"));
        match result.unwrap_err() {
            ResolveError::Circular { chain } => assert_eq!(
                chain,
                "example.com/app/a.A → example.com/app/b.B → example.com/app/a.A"
            ),
            other => panic!("expected a cycle, got {other}"),
        }
    }

    #[test]
    fn embedding_cycle_is_detected_but_diamonds_are_not() {
        let cyclic = InMemoryProvider::default().with_file(
            "/m/x.go",
            "package app\n\ntype A struct {\n\tB\n}\ntype B struct {\n\t*A\n}\n",
        );
        let (result, _) = resolve(cyclic, TypeKey::new("", "A"));
        assert!(matches!(result, Err(ResolveError::Circular { .. })));

        let diamond = InMemoryProvider::default().with_file(
            "/m/x.go",
            "package app\n\ntype Base struct{ ID int }\ntype L struct{ Base }\ntype R struct{ Base }\ntype D struct {\n\tL\n\tR\n}\n",
        );
        let (result, _) = resolve(diamond, TypeKey::new("", "D"));
        assert_eq!(names(&result.unwrap()), vec!["ID", "ID"]);
    }

    #[test]
    fn non_struct_and_missing_types_fail() {
        let provider = InMemoryProvider::default()
            .with_file("/m/x.go", "package app\n\ntype ID string\n");
        let (result, _) = resolve(provider.clone(), TypeKey::new("", "ID"));
        assert!(matches!(result, Err(ResolveError::NotAStruct { .. })));
        let (result, _) = resolve(provider, TypeKey::new("", "Missing"));
        assert!(matches!(result, Err(ResolveError::TypeNotFound { .. })));
    }

    #[test]
    fn unknown_qualifier_is_reported() {
        let provider = InMemoryProvider::default()
            .with_file("/m/x.go", "package app\n\ntype A struct{ X ghost.Thing }\n");
        let (result, _) = resolve(provider, TypeKey::new("", "A"));
        assert!(matches!(result, Err(ResolveError::ImportNotFound { .. })));
    }
}
