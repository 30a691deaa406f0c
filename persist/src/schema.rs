//! Static schema metadata: schema versions, per-field version tags and the
//! rename/removal resolution shared by the write and read walks.
//!
//! Field tables are generated once per type by `#[derive(Persist)]` and live
//! in `'static` memory, so nothing here allocates per save or load except the
//! short scratch list used while resolving a name.

use serde::{Deserialize, Serialize};

/// Build-wide ordinal identifying the current field naming and shape rules.
///
/// Every document records the version it was written with. Writes always
/// target the build's version; reads resolve names against the document's.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One version annotation on a field.
///
/// Applies from `version` onwards until a newer tag takes over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldTag {
    /// Schema version this tag applies from.
    pub version: SchemaVersion,
    /// Wire name used from this version on.
    pub name: Option<&'static str>,
    /// Wire name used before this version.
    pub former_name: Option<&'static str>,
    /// The field is no longer persisted from this version on.
    pub removed: bool,
}

impl FieldTag {
    pub const fn new(version: u32) -> Self {
        Self {
            version: SchemaVersion::new(version),
            name: None,
            former_name: None,
            removed: false,
        }
    }

    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub const fn formerly(mut self, name: &'static str) -> Self {
        self.former_name = Some(name);
        self
    }

    pub const fn removed(mut self) -> Self {
        self.removed = true;
        self
    }
}

/// Static description of one struct field as seen by the persistence walk.
#[derive(Clone, Copy, Debug)]
pub struct FieldInfo {
    /// Declared Rust identifier (`"0"`, `"1"`, ... for tuple structs).
    pub ident: &'static str,
    /// Field is declared `pub`.
    pub public: bool,
    /// Field is explicitly marked persistable despite being private.
    pub include: bool,
    /// Field is explicitly excluded.
    pub skip: bool,
    /// Version tags in declaration order.
    pub tags: &'static [FieldTag],
}

impl FieldInfo {
    /// Returns the tag with the highest version, if any.
    pub fn latest_tag(&self) -> Option<&'static FieldTag> {
        // max_by_key returns the last maximum, matching a stable ascending sort.
        self.tags.iter().max_by_key(|tag| tag.version)
    }

    /// Returns `true` if the most recent tag removes the field.
    pub fn is_removed(&self) -> bool {
        self.latest_tag().is_some_and(|tag| tag.removed)
    }
}

/// Resolves the wire name of `info` for documents at `target`.
///
/// Tags are scanned from newest to oldest. The first tag whose version is
/// `<= target` is active. Newer tags seen before it contribute their
/// `former_name`; the oldest of those wins. The result is the active tag's
/// name, else that former name, else the declared identifier.
///
/// Returns `None` when the active tag is a removal tag: the field does not
/// exist in documents of that version.
pub fn resolve_name(info: &FieldInfo, target: SchemaVersion) -> Option<&'static str> {
    let mut tags: Vec<&'static FieldTag> = info.tags.iter().collect();
    tags.sort_by_key(|tag| tag.version);

    let mut formerly = None;
    let mut active = None;
    for tag in tags.into_iter().rev() {
        if tag.version <= target {
            active = Some(tag);
            break;
        }
        if tag.former_name.is_some() {
            formerly = tag.former_name;
        }
    }

    match active {
        Some(tag) if tag.removed => None,
        Some(tag) => Some(tag.name.or(formerly).unwrap_or(info.ident)),
        None => Some(formerly.unwrap_or(info.ident)),
    }
}
