//! Picks the source field for each destination field.

use crate::model::{FieldDescriptor, FieldOverride};
use std::collections::HashMap;

/// Source fields indexed by name and by tag value. When two fields share a
/// name or tag value, the one declared last wins.
pub struct SourceIndex<'a> {
    fields: &'a [FieldDescriptor],
    by_name: HashMap<&'a str, &'a FieldDescriptor>,
    by_tag: HashMap<String, &'a FieldDescriptor>,
    tag_key: &'a str,
}

impl<'a> SourceIndex<'a> {
    pub fn new(fields: &'a [FieldDescriptor], tag_key: &'a str) -> Self {
        let mut by_name = HashMap::new();
        let mut by_tag = HashMap::new();
        for field in fields {
            by_name.insert(field.name.as_str(), field);
            if let Some(value) = field.tag_value(tag_key) {
                by_tag.insert(value, field);
            }
        }
        SourceIndex {
            fields,
            by_name,
            by_tag,
            tag_key,
        }
    }

    /// Source for `dest`, or `None` when the field stays unmapped.
    ///
    /// Overrides are tried in declaration order, each record's name clause
    /// before its tag clause. After that comes an exact name match and
    /// finally a match on the mapping's tag key.
    pub fn match_field(
        &self,
        dest: &FieldDescriptor,
        overrides: &[FieldOverride],
    ) -> Option<&'a FieldDescriptor> {
        let overridden = overrides.iter().find_map(|o| {
            self.by_name_override(dest, o)
                .or_else(|| self.by_tag_override(dest, o))
        });
        if overridden.is_some() {
            return overridden;
        }
        if let Some(found) = self.by_name.get(dest.name.as_str()) {
            return Some(*found);
        }
        let value = dest.tag_value(self.tag_key)?;
        self.by_tag.get(&value).copied()
    }

    fn by_name_override(
        &self,
        dest: &FieldDescriptor,
        o: &FieldOverride,
    ) -> Option<&'a FieldDescriptor> {
        if o.dest_field.as_deref() != Some(dest.name.as_str()) {
            return None;
        }
        let source_field = o.source_field.as_deref()?;
        self.by_name.get(source_field).copied()
    }

    /// The first source whose tag value equals the override's `source_tag`.
    fn by_tag_override(
        &self,
        dest: &FieldDescriptor,
        o: &FieldOverride,
    ) -> Option<&'a FieldDescriptor> {
        let (dest_tag, source_tag) = (o.dest_tag.as_deref()?, o.source_tag.as_deref()?);
        let key = o.tag.as_deref().unwrap_or(self.tag_key);
        if dest.tag_value(key).as_deref() != Some(dest_tag) {
            return None;
        }
        self.fields
            .iter()
            .find(|f| f.tag_value(key).as_deref() == Some(source_tag))
    }
}
