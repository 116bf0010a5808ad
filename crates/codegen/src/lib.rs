//! Struct mapping code generation.
//!
//! A [`Config`] lists mappings between Go struct types. For each mapping the
//! [`Generator`] resolves both types to flat field lists, matches destination
//! fields to source fields, applies conversion rules and emits one Go
//! function. All functions go into a single file with a pruned import block.

pub mod config;
pub mod conversion;
pub mod error;
pub mod generator;
pub mod imports;
pub mod matcher;
pub mod model;
pub mod packages;
pub mod resolver;
pub mod store;
pub mod template;

pub use config::load_conversions;
pub use error::{CodegenError, ConfigError, ResolveError, TemplateError};
pub use generator::{inspect, GeneratedFunction, Generator, GENERATED_HEADER};
pub use imports::ImportManager;
pub use model::{
    AdditionalArg, Config, ConversionRule, ConversionTemplate, FieldDescriptor, FieldOverride,
    MappingSpec, TypeKey, DEFAULT_OUT_FILE_NAME, DEFAULT_TAG,
};
pub use template::{Template, TypeTemplate};
