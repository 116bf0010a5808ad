//! structmap-core: Go source introspection for the structmap generator.
//!
//! Turns an import path into a navigable syntax tree of the package's type
//! declarations. Only what struct mapping needs is modelled: the package
//! clause, imports, and `type` declarations with their full type
//! expressions and struct tags.
//!
//! # Public API
//!
//! - [`PackageLoader`] -- load a [`Package`] by import path
//! - [`ModuleLoader`] -- loader over one Go module, its `vendor/` tree, the
//!   module cache and `$GOROOT/src`
//! - [`GoEnv`] -- target platform and toolchain directories; decides which
//!   files take part in a build
//! - [`SourceProvider`] -- file access, with [`FileSystemProvider`] and
//!   [`InMemoryProvider`] implementations
//! - AST types: [`SourceFile`], [`ImportSpec`], [`TypeDecl`], [`FieldDecl`],
//!   [`TypeExpr`]
//! - [`tag::tag_value`] -- struct tag lookup

pub mod ast;
pub mod build;
pub mod error;
pub mod lexer;
pub mod package;
pub mod parser;
pub mod source;
pub mod tag;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{FieldDecl, ImportSpec, SourceFile, TypeDecl, TypeExpr};
pub use build::GoEnv;
pub use error::{LoadError, SyntaxError};
pub use package::{
    guess_package_name, GoModule, ModuleLoader, Package, PackageLoader, Replacement, Requirement,
};
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider};

/// Lex and parse one Go source file.
pub fn parse_source(src: &str, filename: &str) -> Result<SourceFile, SyntaxError> {
    let tokens = lexer::lex(src, filename)?;
    parser::parse(&tokens, filename)
}
