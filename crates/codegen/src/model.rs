//! Validated configuration and the field descriptors produced by resolution.

use crate::template::{Template, TypeTemplate};
use serde::Serialize;
use std::fmt;
use structmap_core::tag;

pub const DEFAULT_TAG: &str = "json";
pub const DEFAULT_OUT_FILE_NAME: &str = "structmap.gen.go";

/// A named type in a module. The empty module path is the module root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    pub module: String,
    pub name: String,
}

impl TypeKey {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        TypeKey {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.module, self.name)
        }
    }
}

/// One struct member as seen by the matcher: embedded members are already
/// flattened away.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Raw struct tag, `""` when absent.
    pub tag: String,
    #[serde(rename = "type")]
    pub ty: TypeTemplate,
}

impl FieldDescriptor {
    /// Value of the tag under `key`; `-` and empty count as absent.
    pub fn tag_value(&self, key: &str) -> Option<String> {
        tag::tag_value(&self.tag, key)
    }
}

/// A conversion template and whether it may fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTemplate {
    pub template: Template,
    pub fallible: bool,
}

/// How to convert between two types. `reverse` handles dest → source.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRule {
    pub source_type: TypeTemplate,
    pub dest_type: TypeTemplate,
    pub forward: ConversionTemplate,
    pub reverse: Option<ConversionTemplate>,
    pub imports: Vec<String>,
}

/// Explicit source choice for a destination field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOverride {
    pub source_field: Option<String>,
    pub dest_field: Option<String>,
    pub source_tag: Option<String>,
    pub dest_tag: Option<String>,
    /// Tag key for the `*_tag` values; the mapping's key when unset.
    pub tag: Option<String>,
}

/// Extra function parameter assigned to `dest_field`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalArg {
    pub name: String,
    pub dest_field: String,
    pub ty: TypeTemplate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingSpec {
    pub from: TypeTemplate,
    pub to: TypeTemplate,
    pub from_key: TypeKey,
    pub to_key: TypeKey,
    pub func_name: Option<String>,
    pub additional_args: Vec<AdditionalArg>,
    pub field_overrides: Vec<FieldOverride>,
    pub conversions: Vec<ConversionRule>,
    pub tag: Option<String>,
}

impl MappingSpec {
    pub fn function_name(&self) -> String {
        match &self.func_name {
            Some(name) => name.clone(),
            None => format!("Map{}To{}", self.from_key.name, self.to_key.name),
        }
    }

    pub fn tag_key<'a>(&'a self, default: &'a str) -> &'a str {
        self.tag.as_deref().unwrap_or(default)
    }

    /// The argument bound to destination field `name`, if any.
    pub fn arg_for(&self, name: &str) -> Option<&AdditionalArg> {
        self.additional_args.iter().find(|a| a.dest_field == name)
    }

    /// `User -> UserDTO`, for error messages and logs.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.from.unaliased(), self.to.unaliased())
    }
}

/// Everything a generation run needs from the mapping document.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub out_package_name: String,
    pub out_file_name: String,
    pub out_file_path: String,
    pub default_tag: String,
    pub debug: bool,
    pub mappings: Vec<MappingSpec>,
}
