//! The `{{ .Name }}` template language used by conversion and type templates.
//!
//! Only variable substitution is supported, with `{{-` / `-}}` trimming the
//! whitespace next to an action. Templates are parsed once, when the
//! configuration is loaded, and checked against the variables their context
//! provides.

use crate::error::TemplateError;
use crate::imports::ImportManager;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use structmap_core::TypeExpr;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut rest = source;
        let mut offset = 0usize;

        while let Some(start) = rest.find("{{") {
            let mut literal = &rest[..start];
            let after_open = &rest[start + 2..];
            let end = after_open.find("}}").ok_or_else(|| TemplateError::Unclosed {
                name: name.to_string(),
                offset: offset + start,
            })?;
            let mut inner = &after_open[..end];

            if let Some(stripped) = strip_trim_marker_left(inner) {
                literal = literal.trim_end();
                inner = stripped;
            }
            let trim_right = match strip_trim_marker_right(inner) {
                Some(stripped) => {
                    inner = stripped;
                    true
                }
                None => false,
            };

            text.push_str(literal);
            let action = inner.trim();
            let variable = action
                .strip_prefix('.')
                .filter(|v| is_identifier(v))
                .ok_or_else(|| TemplateError::UnsupportedAction {
                    name: name.to_string(),
                    action: action.to_string(),
                })?;
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Var(variable.to_string()));

            let consumed = start + 2 + end + 2;
            rest = &rest[consumed..];
            offset += consumed;
            if trim_right {
                let trimmed = rest.trim_start();
                offset += rest.len() - trimmed.len();
                rest = trimmed;
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Template {
            name: name.to_string(),
            source: source.to_string(),
            segments,
        })
    }

    /// The template text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variables referenced by the template, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(v) => Some(v.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Reject any variable for which `known` returns false.
    pub fn check(&self, known: impl Fn(&str) -> bool) -> Result<(), TemplateError> {
        match self.variables().find(|v| !known(v)) {
            Some(variable) => Err(TemplateError::UnknownVariable {
                name: self.name.clone(),
                variable: variable.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn render(&self, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Var(v) => {
                    let value = vars.get(v).ok_or_else(|| TemplateError::MissingValue {
                        name: self.name.clone(),
                        variable: v.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Render with a total substitution. Only for templates whose variables
    /// were checked when they were built.
    fn substitute(&self, value: impl Fn(&str) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Var(v) => out.push_str(&value(v)),
            }
        }
        out
    }
}

fn strip_trim_marker_left(inner: &str) -> Option<&str> {
    let rest = inner.strip_prefix('-')?;
    rest.starts_with(char::is_whitespace).then_some(rest)
}

fn strip_trim_marker_right(inner: &str) -> Option<&str> {
    let rest = inner.strip_suffix('-')?;
    rest.ends_with(char::is_whitespace).then_some(rest)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// `Import3` → `Some(3)`.
pub fn import_index(variable: &str) -> Option<usize> {
    let digits = variable.strip_prefix("Import")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `{{ .ImportN }}`.
pub fn import_placeholder(index: usize) -> String {
    format!("{{{{ .Import{} }}}}", index)
}

/// A Go type expression whose package qualifiers are `{{ .ImportN }}`
/// placeholders bound to module paths.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTemplate {
    template: Template,
    imports: Vec<String>,
}

impl TypeTemplate {
    /// Parse type text written in configuration. Every `ImportN` must have a
    /// matching entry in `imports`.
    pub fn parse(text: &str, imports: Vec<String>) -> Result<Self, TemplateError> {
        let template = Template::parse(text, text)?;
        let count = imports.len();
        template.check(|v| import_index(v).is_some_and(|i| i < count))?;
        Ok(TypeTemplate { template, imports })
    }

    /// Build from a declared type. `imports[i]` is the module path of the
    /// i-th qualifier returned by [`TypeExpr::qualifiers`].
    pub fn from_expr(expr: &TypeExpr, imports: Vec<String>) -> Result<Self, TemplateError> {
        let qualifiers = expr.qualifiers();
        let text = expr.render_with(&|q| {
            let index = qualifiers.iter().position(|x| x == q).unwrap_or_default();
            import_placeholder(index)
        });
        TypeTemplate::parse(&text, imports)
    }

    pub fn text(&self) -> &str {
        self.template.source()
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Substitute each placeholder with the output alias of its module.
    pub fn render(&self, imports: &ImportManager) -> String {
        self.template.substitute(|v| {
            import_index(v)
                .and_then(|i| self.imports.get(i))
                .map(|path| imports.qualifier_for(path))
                .unwrap_or_default()
        })
    }

    /// The type with placeholders and their trailing `.` removed:
    /// `{{ .Import0 }}.User` → `User`.
    pub fn unaliased(&self) -> String {
        let mut out = String::new();
        let mut after_import = false;
        for segment in &self.template.segments {
            match segment {
                Segment::Var(v) => after_import = import_index(v).is_some(),
                Segment::Text(t) => {
                    let t = if after_import {
                        t.strip_prefix('.').unwrap_or(t)
                    } else {
                        t
                    };
                    out.push_str(t);
                    after_import = false;
                }
            }
        }
        out
    }

    /// `(import index, type name)` when the template is a plain named type,
    /// `Name` or `{{ .ImportN }}.Name`.
    pub fn named_type(&self) -> Option<(Option<usize>, &str)> {
        match self.template.segments.as_slice() {
            [Segment::Text(name)] if is_identifier(name.trim()) => Some((None, name.trim())),
            [Segment::Var(v), Segment::Text(rest)] => {
                let index = import_index(v)?;
                let name = rest.trim_end().strip_prefix('.')?;
                is_identifier(name).then_some((Some(index), name))
            }
            _ => None,
        }
    }
}

impl Serialize for TypeTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TypeTemplate", 2)?;
        state.serialize_field("type", self.text())?;
        state.serialize_field("imports", &self.imports)?;
        state.end()
    }
}
