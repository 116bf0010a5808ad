//! Error types for configuration loading, type resolution and emission.

use structmap_core::LoadError;

/// A conversion or type template that cannot be parsed or rendered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{name}': unclosed action at offset {offset}")]
    Unclosed { name: String, offset: usize },

    /// Anything other than `{{ .Name }}` inside an action.
    #[error("template '{name}': unsupported action '{action}'")]
    UnsupportedAction { name: String, action: String },

    /// A variable the template's context never provides.
    #[error("template '{name}': unknown variable '.{variable}'")]
    UnknownVariable { name: String, variable: String },

    #[error("template '{name}': no value for '.{variable}'")]
    MissingValue { name: String, variable: String },
}

/// The mapping or conversion documents are invalid.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{context}: {source}")]
    Template {
        context: String,
        #[source]
        source: TemplateError,
    },

    #[error("{context}: {message}")]
    Invalid { context: String, message: String },
}

/// Failure while walking type declarations.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to load package '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("type {name} not found in package '{path}'")]
    TypeNotFound { path: String, name: String },

    #[error("circular type reference detected: {chain}")]
    Circular { chain: String },

    /// The declaration exists but is not a struct (`type ID string`).
    #[error("type {key} is not a struct type: {found}")]
    NotAStruct { key: String, found: String },

    #[error("unsupported alias target for {key}: {target}")]
    UnsupportedAlias { key: String, target: String },

    #[error("unsupported embedded field '{expr}' in {key}")]
    UnsupportedEmbedded { key: String, expr: String },

    #[error("import not found for package '{qualifier}' in {file} of '{path}'")]
    ImportNotFound {
        qualifier: String,
        path: String,
        file: String,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Top-level error of a generation run. Every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    Resolve {
        context: String,
        #[source]
        source: ResolveError,
    },

    #[error("{context}: {source}")]
    Template {
        context: String,
        #[source]
        source: TemplateError,
    },
}
