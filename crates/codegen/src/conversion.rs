//! Conversion lookup and rendering.

use crate::error::TemplateError;
use crate::imports::ImportManager;
use crate::model::{ConversionRule, ConversionTemplate};
use crate::template::TypeTemplate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// One rendered assignment. `code` may span several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub code: String,
    pub fallible: bool,
}

impl Assignment {
    pub fn direct(dest: &str, source: &str) -> Self {
        Assignment {
            code: format!("{} = {}", dest, source),
            fallible: false,
        }
    }
}

/// First rule converting `source` into `dest`. Local rules are searched
/// before global ones; within a rule a forward match beats a reverse one,
/// and a reverse match needs a reverse template.
pub fn find_conversion<'r>(
    source: &TypeTemplate,
    dest: &TypeTemplate,
    local: &'r [ConversionRule],
    global: &'r [ConversionRule],
    imports: &ImportManager,
) -> Option<(&'r ConversionRule, Direction)> {
    let source = source.render(imports);
    let dest = dest.render(imports);
    local.iter().chain(global).find_map(|rule| {
        let rule_source = rule.source_type.render(imports);
        let rule_dest = rule.dest_type.render(imports);
        if rule_source == source && rule_dest == dest {
            Some((rule, Direction::Forward))
        } else if rule.reverse.is_some() && rule_dest == source && rule_source == dest {
            Some((rule, Direction::Reverse))
        } else {
            None
        }
    })
}

impl ConversionRule {
    /// Render the template for `direction` with the given expressions. A
    /// reverse rendering without a reverse template is a plain assignment.
    pub fn render(
        &self,
        direction: Direction,
        source: &str,
        dest: &str,
        error: &str,
        imports: &ImportManager,
    ) -> Result<Assignment, TemplateError> {
        let template = match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => match &self.reverse {
                Some(reverse) => reverse,
                None => return Ok(Assignment::direct(dest, source)),
            },
        };
        self.render_template(template, source, dest, error, imports)
    }

    fn render_template(
        &self,
        template: &ConversionTemplate,
        source: &str,
        dest: &str,
        error: &str,
        imports: &ImportManager,
    ) -> Result<Assignment, TemplateError> {
        let mut vars: HashMap<String, String> = self
            .imports
            .iter()
            .enumerate()
            .map(|(i, path)| (format!("Import{}", i), imports.qualifier_for(path)))
            .collect();
        vars.insert("Source".into(), source.to_string());
        vars.insert("Dest".into(), dest.to_string());
        vars.insert("Error".into(), error.to_string());
        Ok(Assignment {
            code: template.template.render(&vars)?,
            fallible: template.fallible,
        })
    }
}
