//! YAML documents: the mapping configuration and the shared conversion list.
//!
//! Documents deserialize into plain DTOs first; [`Config::from_yaml`] and
//! [`load_conversions`] then parse and check every template so that a bad
//! placeholder is reported before any package is loaded.

use crate::error::{ConfigError, TemplateError};
use crate::model::{
    AdditionalArg, Config, ConversionRule, ConversionTemplate, FieldOverride, MappingSpec,
    TypeKey, DEFAULT_OUT_FILE_NAME, DEFAULT_TAG,
};
use crate::template::{import_index, Template, TypeTemplate};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ConfigDto {
    out_package_name: String,
    #[serde(default)]
    out_file_name: Option<String>,
    #[serde(default)]
    out_file_path: Option<String>,
    #[serde(default)]
    default_tag: Option<String>,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    mappings: Vec<MappingDto>,
}

#[derive(Debug, Deserialize)]
struct TypeRefDto {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MappingDto {
    from: TypeRefDto,
    to: TypeRefDto,
    #[serde(default)]
    func_name: Option<String>,
    #[serde(default)]
    func_additional_args: Vec<ArgDto>,
    #[serde(default)]
    custom_field_mappings: Vec<FieldOverrideDto>,
    #[serde(default)]
    custom_conversions: Vec<ConversionDto>,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArgDto {
    name: String,
    dest_field: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FieldOverrideDto {
    #[serde(default)]
    source_field: Option<String>,
    #[serde(default)]
    dest_field: Option<String>,
    #[serde(default)]
    source_tag: Option<String>,
    #[serde(default)]
    dest_tag: Option<String>,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversionsDto {
    #[serde(default)]
    conversions: Vec<ConversionDto>,
}

#[derive(Debug, Deserialize)]
struct ConversionDto {
    source_type: String,
    dest_type: String,
    conversion: ConversionTemplateDto,
    #[serde(default)]
    reverse_conversion: Option<ConversionTemplateDto>,
    #[serde(default)]
    imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConversionTemplateDto {
    #[serde(default)]
    tmpl: String,
    #[serde(default)]
    error: bool,
}

impl Config {
    /// Parse and validate the mapping document.
    pub fn from_yaml(text: &str) -> Result<Config, ConfigError> {
        let dto: ConfigDto = serde_yaml::from_str(text)?;
        if dto.out_package_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                context: "out_package_name".into(),
                message: "must not be empty".into(),
            });
        }

        let mappings = dto
            .mappings
            .into_iter()
            .enumerate()
            .map(|(i, m)| compile_mapping(i, m))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            out_package_name: dto.out_package_name.trim().to_string(),
            out_file_name: non_empty(dto.out_file_name)
                .unwrap_or_else(|| DEFAULT_OUT_FILE_NAME.to_string()),
            out_file_path: non_empty(dto.out_file_path).unwrap_or_else(|| ".".to_string()),
            default_tag: non_empty(dto.default_tag).unwrap_or_else(|| DEFAULT_TAG.to_string()),
            debug: dto.debug,
            mappings,
        })
    }
}

/// Parse and validate a conversions document (`conversions: [...]`). An
/// empty document has no conversions.
pub fn load_conversions(text: &str) -> Result<Vec<ConversionRule>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let dto: ConversionsDto = serde_yaml::from_str(text)?;
    dto.conversions
        .into_iter()
        .enumerate()
        .map(|(i, c)| compile_conversion(&format!("conversions[{}]", i), c))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn template_error(context: String) -> impl FnOnce(TemplateError) -> ConfigError {
    move |source| ConfigError::Template { context, source }
}

fn compile_mapping(index: usize, dto: MappingDto) -> Result<MappingSpec, ConfigError> {
    let ctx = format!("mappings[{}]", index);

    let (from, from_key) = compile_mapped_type(&format!("{}.from", ctx), dto.from)?;
    let (to, to_key) = compile_mapped_type(&format!("{}.to", ctx), dto.to)?;

    let additional_args = dto
        .func_additional_args
        .into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let arg_ctx = format!("{}.func_additional_args[{}]", ctx, i);
            if arg.name.trim().is_empty() || arg.dest_field.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    context: arg_ctx,
                    message: "name and dest_field are required".into(),
                });
            }
            let ty = TypeTemplate::parse(&arg.ty, arg.imports)
                .map_err(template_error(format!("{}.type", arg_ctx)))?;
            Ok(AdditionalArg {
                name: arg.name,
                dest_field: arg.dest_field,
                ty,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let field_overrides = dto
        .custom_field_mappings
        .into_iter()
        .enumerate()
        .map(|(i, o)| {
            if o.dest_field.is_none() && o.dest_tag.is_none() {
                return Err(ConfigError::Invalid {
                    context: format!("{}.custom_field_mappings[{}]", ctx, i),
                    message: "dest_field or dest_tag is required".into(),
                });
            }
            Ok(FieldOverride {
                source_field: o.source_field,
                dest_field: o.dest_field,
                source_tag: o.source_tag,
                dest_tag: o.dest_tag,
                tag: o.tag,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let conversions = dto
        .custom_conversions
        .into_iter()
        .enumerate()
        .map(|(i, c)| compile_conversion(&format!("{}.custom_conversions[{}]", ctx, i), c))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MappingSpec {
        from,
        to,
        from_key,
        to_key,
        func_name: non_empty(dto.func_name),
        additional_args,
        field_overrides,
        conversions,
        tag: non_empty(dto.tag),
    })
}

/// A mapped type must name a struct: `Name` or `{{ .ImportN }}.Name`.
fn compile_mapped_type(
    ctx: &str,
    dto: TypeRefDto,
) -> Result<(TypeTemplate, TypeKey), ConfigError> {
    let template =
        TypeTemplate::parse(&dto.ty, dto.imports).map_err(template_error(ctx.to_string()))?;
    let (index, name) = template.named_type().ok_or_else(|| ConfigError::Invalid {
        context: ctx.to_string(),
        message: format!("'{}' is not a named type", template.text()),
    })?;
    let imports = template.imports();
    let module = index
        .and_then(|i| imports.get(i))
        .or_else(|| imports.first())
        .cloned()
        .unwrap_or_default();
    let key = TypeKey::new(module, name);
    Ok((template, key))
}

fn compile_conversion(ctx: &str, dto: ConversionDto) -> Result<ConversionRule, ConfigError> {
    let source_type = TypeTemplate::parse(&dto.source_type, dto.imports.clone())
        .map_err(template_error(format!("{}.source_type", ctx)))?;
    let dest_type = TypeTemplate::parse(&dto.dest_type, dto.imports.clone())
        .map_err(template_error(format!("{}.dest_type", ctx)))?;

    let count = dto.imports.len();
    let known = |v: &str| {
        matches!(v, "Source" | "Dest" | "Error") || import_index(v).is_some_and(|i| i < count)
    };
    let compile = |name: &str, t: ConversionTemplateDto| {
        let template = Template::parse(name, &t.tmpl).map_err(template_error(name.to_string()))?;
        template
            .check(known)
            .map_err(template_error(name.to_string()))?;
        Ok::<_, ConfigError>(ConversionTemplate {
            template,
            fallible: t.error,
        })
    };

    if dto.conversion.tmpl.trim().is_empty() {
        return Err(ConfigError::Invalid {
            context: format!("{}.conversion", ctx),
            message: "tmpl must not be empty".into(),
        });
    }
    let forward = compile(&format!("{}.conversion", ctx), dto.conversion)?;
    let reverse = match dto.reverse_conversion {
        Some(r) if !r.tmpl.trim().is_empty() => {
            Some(compile(&format!("{}.reverse_conversion", ctx), r)?)
        }
        _ => None,
    };

    Ok(ConversionRule {
        source_type,
        dest_type,
        forward,
        reverse,
        imports: dto.imports,
    })
}
