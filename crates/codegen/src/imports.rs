//! Output import aliases.
//!
//! Every module path containing a `/` gets a stable alias `ref1`, `ref2`, …
//! in order of first registration. Standard-library paths (no `/`) keep
//! their own name and are imported unaliased.

use std::collections::HashMap;

/// One aliased import of the generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub alias: String,
    pub path: String,
}

#[derive(Debug, Default)]
pub struct ImportManager {
    bindings: Vec<ImportBinding>,
    by_path: HashMap<String, usize>,
    standard: Vec<String>,
}

impl ImportManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module path. Re-registering is a no-op; the empty path is
    /// ignored.
    pub fn register(&mut self, path: &str) {
        let path = normalize(path);
        if path.is_empty() {
            return;
        }
        if !path.contains('/') {
            if !self.standard.iter().any(|p| p == path) {
                self.standard.push(path.to_string());
            }
            return;
        }
        if self.by_path.contains_key(path) {
            return;
        }
        let alias = format!("ref{}", self.bindings.len() + 1);
        tracing::trace!(path, %alias, "registered import");
        self.by_path.insert(path.to_string(), self.bindings.len());
        self.bindings.push(ImportBinding {
            alias,
            path: path.to_string(),
        });
    }

    /// Alias of a registered path, or `""`.
    pub fn alias_of(&self, path: &str) -> &str {
        self.by_path
            .get(normalize(path))
            .map(|&i| self.bindings[i].alias.as_str())
            .unwrap_or("")
    }

    /// The name generated code uses to qualify identifiers from `path`.
    pub fn qualifier_for(&self, path: &str) -> String {
        let path = normalize(path);
        if !path.is_empty() && !path.contains('/') {
            return path.to_string();
        }
        self.alias_of(path).to_string()
    }

    pub fn bindings(&self) -> &[ImportBinding] {
        &self.bindings
    }

    /// The import block for `code`: only imports `code` actually references,
    /// standard-library paths first, then aliases in registration order.
    /// Empty when nothing is referenced.
    pub fn render(&self, code: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        for path in &self.standard {
            if references(code, path) {
                lines.push(format!("\t\"{}\"", path));
            }
        }
        for binding in &self.bindings {
            if references(code, &binding.alias) {
                lines.push(format!("\t{} \"{}\"", binding.alias, binding.path));
            }
        }
        if lines.is_empty() {
            return String::new();
        }
        format!("import (\n{}\n)\n", lines.join("\n"))
    }
}

fn normalize(path: &str) -> &str {
    path.trim().trim_matches('"')
}

/// `code` contains `qualifier.` starting at an identifier boundary and not
/// as a selector, so `myref1.` and `src.time.` are not uses.
fn references(code: &str, qualifier: &str) -> bool {
    let needle = format!("{}.", qualifier);
    code.match_indices(&needle).any(|(at, _)| {
        let before = code[..at].chars().next_back();
        !matches!(before, Some(c) if c.is_alphanumeric() || c == '_' || c == '.')
    })
}
