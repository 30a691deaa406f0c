//! The static asset catalog and catalog reference fields.
//!
//! Catalog entries are immutable for the duration of a load: they are looked
//! up by their stable integer id, never created or destroyed by the walk.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::field::{Field, Instantiate};
use crate::serialize::{DeserializeContext, FieldError, SerializeContext, SerializeError, Value};

/// One registered asset.
#[derive(Clone)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    pub asset: Arc<dyn Any + Send + Sync>,
    /// The asset is a template that scenes can instantiate.
    pub spawnable: bool,
}

impl CatalogEntry {
    /// Returns the asset as `T`, or `None` if it has another type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.asset).downcast::<T>().ok()
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("spawnable", &self.spawnable)
            .finish_non_exhaustive()
    }
}

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The id is already taken.
    Duplicate { id: u32, existing: String },
    /// The same shared asset is already registered under another id.
    AlreadyRegistered { id: u32, existing: u32 },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { id, existing } => {
                write!(f, "catalog id {id} is already registered to '{existing}'")
            }
            Self::AlreadyRegistered { id, existing } => {
                write!(f, "asset for catalog id {id} is already registered as {existing}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

fn ptr_key<T: ?Sized>(asset: &Arc<T>) -> usize {
    Arc::as_ptr(asset) as *const () as usize
}

/// Id-addressed table of static assets.
#[derive(Default)]
pub struct Catalog {
    entries: HashMap<u32, CatalogEntry>,
    by_ptr: HashMap<usize, u32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `asset` under `id` and returns the shared handle.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        id: u32,
        name: impl Into<String>,
        asset: T,
    ) -> Result<Arc<T>, CatalogError> {
        self.insert(id, name.into(), Arc::new(asset), false)
    }

    /// Registers an already shared asset under `id`.
    ///
    /// Each shared asset has exactly one id, so registering the same `Arc`
    /// a second time fails with [`CatalogError::AlreadyRegistered`].
    pub fn register_arc<T: Any + Send + Sync>(
        &mut self,
        id: u32,
        name: impl Into<String>,
        asset: Arc<T>,
    ) -> Result<Arc<T>, CatalogError> {
        self.insert(id, name.into(), asset, false)
    }

    /// Registers a spawnable template under `id`.
    pub fn register_template<T: Any + Send + Sync>(
        &mut self,
        id: u32,
        name: impl Into<String>,
        template: T,
    ) -> Result<Arc<T>, CatalogError> {
        self.insert(id, name.into(), Arc::new(template), true)
    }

    fn insert<T: Any + Send + Sync>(
        &mut self,
        id: u32,
        name: String,
        asset: Arc<T>,
        spawnable: bool,
    ) -> Result<Arc<T>, CatalogError> {
        if let Some(existing) = self.entries.get(&id) {
            return Err(CatalogError::Duplicate {
                id,
                existing: existing.name.clone(),
            });
        }
        let key = ptr_key(&asset);
        if let Some(&existing) = self.by_ptr.get(&key) {
            return Err(CatalogError::AlreadyRegistered { id, existing });
        }
        log::debug!("Catalog: registered '{name}' as {id}");
        self.by_ptr.insert(key, id);
        let erased: Arc<dyn Any + Send + Sync> = asset.clone();
        self.entries.insert(
            id,
            CatalogEntry {
                id,
                name,
                asset: erased,
                spawnable,
            },
        );
        Ok(asset)
    }

    pub fn entry(&self, id: u32) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    /// Returns the asset registered under `id` if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, id: u32) -> Option<Arc<T>> {
        self.entries.get(&id)?.downcast::<T>()
    }

    /// Returns the entry under `id` only if it is a spawnable template.
    pub fn template(&self, id: u32) -> Option<&CatalogEntry> {
        self.entries.get(&id).filter(|entry| entry.spawnable)
    }

    /// Reverse lookup by pointer identity.
    pub fn id_of<T: ?Sized>(&self, asset: &Arc<T>) -> Option<u32> {
        self.by_ptr.get(&ptr_key(asset)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

/// A field holding a reference to a catalog asset.
///
/// With auto-reference on (the default for writes) the asset is stored as
/// its catalog id. With auto-reference off the asset is stored by full value.
/// Reads accept either shape.
pub struct CatalogRef<T>(pub Option<Arc<T>>);

impl<T> CatalogRef<T> {
    pub fn new(asset: Arc<T>) -> Self {
        Self(Some(asset))
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.0.as_ref()
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl<T> Default for CatalogRef<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Clone for CatalogRef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for CatalogRef<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for CatalogRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(asset) => write!(f, "CatalogRef({:p})", Arc::as_ptr(asset)),
            None => f.write_str("CatalogRef(None)"),
        }
    }
}

impl<T> Field for CatalogRef<T>
where
    T: Field + Instantiate + Send + Sync + 'static,
{
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        let Some(asset) = &self.0 else {
            return Ok(None);
        };
        if !ctx.auto_reference() {
            return (**asset).encode(ctx);
        }
        match ctx.catalog().id_of(asset) {
            Some(id) => Ok(Some(Value::Catalog(id))),
            None => {
                log::warn!(
                    "{} asset is not registered in the catalog, reference omitted",
                    std::any::type_name::<T>()
                );
                Ok(None)
            }
        }
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        let id = match node {
            Value::Null => {
                self.0 = None;
                return Ok(());
            }
            Value::Catalog(id) => *id,
            Value::U64(id) => u32::try_from(*id)
                .map_err(|_| FieldError::mismatch("catalog id", node))?,
            Value::I64(id) => u32::try_from(*id)
                .map_err(|_| FieldError::mismatch("catalog id", node))?,
            Value::Map(_) => {
                let mut asset = T::instantiate();
                asset.decode(node, ctx)?;
                self.0 = Some(Arc::new(asset));
                return Ok(());
            }
            other => return Err(FieldError::mismatch("catalog reference", other)),
        };

        let Some(entry) = ctx.catalog().entry(id) else {
            self.0 = None;
            return Err(FieldError::UnknownCatalogId(id));
        };
        match entry.downcast::<T>() {
            Some(asset) => {
                self.0 = Some(asset);
                Ok(())
            }
            None => Err(FieldError::TypeMismatch {
                expected: std::any::type_name::<T>().to_owned(),
                found: "catalog asset of another type",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sword {
        damage: u32,
    }

    #[test]
    fn register_and_lookup() {
        let mut catalog = Catalog::new();
        let sword = catalog.register(3, "sword", Sword { damage: 9 }).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.id_of(&sword), Some(3));
        assert!(Arc::ptr_eq(&catalog.get::<Sword>(3).unwrap(), &sword));
        assert!(catalog.get::<String>(3).is_none());
        assert!(catalog.template(3).is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut catalog = Catalog::new();
        catalog.register(1, "a", 1u32).unwrap();
        let err = catalog.register(1, "b", 2u32).unwrap_err();
        assert_eq!(
            err,
            CatalogError::Duplicate {
                id: 1,
                existing: "a".into()
            }
        );
    }

    #[test]
    fn shared_asset_keeps_its_first_id() {
        let mut catalog = Catalog::new();
        let sword = Arc::new(Sword { damage: 4 });
        catalog.register_arc(1, "sword", Arc::clone(&sword)).unwrap();

        let err = catalog.register_arc(2, "alias", Arc::clone(&sword)).unwrap_err();
        assert_eq!(err, CatalogError::AlreadyRegistered { id: 2, existing: 1 });
        assert_eq!(catalog.id_of(&sword), Some(1));
        assert!(catalog.entry(2).is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn unregistered_asset_has_no_id() {
        let catalog = Catalog::new();
        let loose = Arc::new(Sword { damage: 1 });
        assert_eq!(catalog.id_of(&loose), None);
    }

    #[test]
    fn templates_are_spawnable() {
        let mut catalog = Catalog::new();
        catalog.register_template(5, "crate", ()).unwrap();
        let entry = catalog.template(5).unwrap();
        assert!(entry.spawnable);
        assert_eq!(entry.name, "crate");
    }

    #[test]
    fn catalog_ref_equality_is_identity() {
        let a = Arc::new(Sword { damage: 1 });
        let b = Arc::new(Sword { damage: 1 });
        assert_eq!(CatalogRef::new(a.clone()), CatalogRef::new(a));
        assert_ne!(CatalogRef::new(b), CatalogRef::default());
    }
}
