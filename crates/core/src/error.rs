use std::path::PathBuf;

/// A lex or parse failure inside a single Go source file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{file}:{line}: {message}")]
pub struct SyntaxError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(file: &str, line: u32, message: impl Into<String>) -> Self {
        SyntaxError {
            file: file.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub fn lex(file: &str, line: u32, message: impl Into<String>) -> Self {
        SyntaxError::new(file, line, message)
    }

    pub fn parse(file: &str, line: u32, message: impl Into<String>) -> Self {
        SyntaxError::new(file, line, message)
    }
}

/// Failure to turn an import path into a parsed [`Package`](crate::Package).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The import path is not in the module, `vendor/`, the module cache or
    /// the standard library.
    #[error("cannot resolve package '{path}': not within module '{module}', its vendor tree, its required modules or GOROOT")]
    Unresolved { path: String, module: String },

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no Go files in package '{path}' ({})", dir.display())]
    NoGoFiles { path: String, dir: PathBuf },

    #[error("multiple packages in '{path}': {first} and {second}")]
    MultiplePackages {
        path: String,
        first: String,
        second: String,
    },

    #[error("go.mod in '{}' has no module directive", root.display())]
    MissingModuleDirective { root: PathBuf },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}
