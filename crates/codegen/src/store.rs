//! Resolved field lists, keyed by type.

use crate::model::{FieldDescriptor, TypeKey};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TypeStore {
    types: HashMap<TypeKey, Vec<FieldDescriptor>>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the fields of `key`. An existing entry is kept.
    pub fn insert(&mut self, key: TypeKey, fields: Vec<FieldDescriptor>) {
        self.types.entry(key).or_insert(fields);
    }

    pub fn get(&self, key: &TypeKey) -> Option<&[FieldDescriptor]> {
        self.types.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }
}
