//! Entity type registry: record type name to typed constructor.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::entities::{EntityKind, ENTITY_TYPES};

type Constructor = fn() -> EntityKind;

fn registry() -> &'static HashMap<&'static str, Constructor> {
    static REGISTRY: OnceLock<HashMap<&'static str, Constructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| ENTITY_TYPES.iter().copied().collect())
}

/// Create an empty entity for the record type `name`.
///
/// Unknown names yield [`EntityKind::Unsupported`] carrying the name.
pub fn create(name: &str) -> EntityKind {
    match registry().get(name) {
        Some(constructor) => constructor(),
        None => EntityKind::Unsupported {
            type_name: name.to_string(),
        },
    }
}

/// Whether `name` has a typed layout.
pub fn is_registered(name: &str) -> bool {
    registry().contains_key(name)
}

/// All registered type names, sorted.
pub fn type_names() -> Vec<&'static str> {
    let mut names: Vec<_> = registry().keys().copied().collect();
    names.sort_unstable();
    names
}
