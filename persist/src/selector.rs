//! Field selection: which fields of a type take part in persistence, and
//! under which wire name, for a given schema version.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::object::Persist;
use crate::schema::{resolve_name, FieldInfo, SchemaVersion};

/// A field chosen for the walk, paired with its resolved wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedField {
    /// Declared Rust identifier, used to dispatch into the host.
    pub ident: &'static str,
    /// Name of the node in the document.
    pub wire_name: &'static str,
}

/// Returns `true` if `info` takes part in persistence at all.
///
/// A field whose most recent tag removes it is never eligible. Otherwise any
/// tagged field is eligible, and an untagged one is eligible when it is
/// public or explicitly included and not explicitly skipped.
pub fn is_eligible(info: &FieldInfo) -> bool {
    if info.is_removed() {
        return false;
    }
    !info.tags.is_empty() || ((info.public || info.include) && !info.skip)
}

/// Selects the eligible fields of `table` for documents at `version`.
///
/// Declaration order is kept. Fields whose resolved name was already taken
/// are dropped (first occurrence wins), as are fields removed as of
/// `version`.
pub fn select_fields(table: &[FieldInfo], version: SchemaVersion) -> Vec<SelectedField> {
    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(table.len());
    for info in table.iter().filter(|info| is_eligible(info)) {
        let Some(wire_name) = resolve_name(info, version) else {
            continue;
        };
        if !seen.insert(wire_name) {
            log::debug!(
                "Field '{}' shadowed by an earlier field with wire name '{wire_name}'",
                info.ident
            );
            continue;
        }
        selected.push(SelectedField {
            ident: info.ident,
            wire_name,
        });
    }
    selected
}

/// Per-walk cache of field selections keyed by type and schema version.
#[derive(Default)]
pub struct FieldSelector {
    cache: HashMap<(TypeId, SchemaVersion), Rc<[SelectedField]>>,
}

impl FieldSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selection for `T` at `version`, computing it on first use.
    pub fn select<T: Persist>(&mut self, version: SchemaVersion) -> Rc<[SelectedField]> {
        self.cache
            .entry((TypeId::of::<T>(), version))
            .or_insert_with(|| select_fields(T::field_table(), version).into())
            .clone()
    }

    /// Number of cached selections.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
