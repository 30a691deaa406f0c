//! The public save/load entry points.
//!
//! A [`Serializer`] owns its storage backend, the live-instance registry
//! used during a load, and the last document it saved or loaded. A save is
//! one write walk over the host; a load parses the stored document and runs
//! the read walk once per phase so instances exist before links to them are
//! resolved.

use std::fmt;

use crate::config::PersistConfig;
use crate::instance::InstanceRegistry;
use crate::object::Persist;
use crate::scene::Environment;
use crate::serialize::{
    self, DeserializeContext, DeserializeError, Document, SerializeContext, SerializeError, Value,
};
use crate::storage::{path, Storage, StorageError};

pub struct Serializer {
    config: PersistConfig,
    storage: Box<dyn Storage>,
    registry: InstanceRegistry,
    document: Option<Document>,
}

impl Serializer {
    pub fn new(config: PersistConfig, storage: impl Storage) -> Self {
        Self {
            config,
            storage: Box::new(storage),
            registry: InstanceRegistry::new(),
            document: None,
        }
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// Registry populated by the last load.
    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Document produced by the last save or consumed by the last load.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Returns `true` if a save exists at the configured path.
    pub fn has_save(&self) -> bool {
        path::normalize(&self.config.path)
            .and_then(|path| self.storage.exists(&path))
            .unwrap_or(false)
    }

    /// Delete the save at the configured path.
    pub fn delete_save(&mut self) -> Result<(), PersistError> {
        let fail = |source: StorageError| PersistError::Save {
            path: self.config.path.clone(),
            source: PersistFailure::Storage(source),
        };
        let path = path::normalize(&self.config.path).map_err(fail)?;
        self.storage.delete(&path).map_err(fail)?;
        log::info!("Deleted save {path}");
        Ok(())
    }

    /// Save `host` to the configured path.
    pub fn save<T: Persist>(&mut self, host: &T, env: &Environment<'_>) -> Result<(), PersistError> {
        let fail = |source: PersistFailure| PersistError::Save {
            path: self.config.path.clone(),
            source,
        };

        let document = self
            .save_to_document(host, env)
            .map_err(|e| fail(PersistFailure::Serialize(e)))?;
        let bytes = serialize::encode(&document, self.config.format)
            .map_err(|e| fail(PersistFailure::Serialize(e)))?;
        let path = path::normalize(&self.config.path)
            .map_err(|e| fail(PersistFailure::Storage(e)))?;
        self.storage
            .write(&path, &bytes)
            .map_err(|e| fail(PersistFailure::Storage(e)))?;

        log::info!(
            "Saved {} to {path} ({} bytes, schema {})",
            T::NAME,
            bytes.len(),
            document.schema_version
        );
        self.document = Some(document);
        Ok(())
    }

    /// Run the write walk over `host` without touching storage.
    pub fn save_to_document<T: Persist>(
        &self,
        host: &T,
        env: &Environment<'_>,
    ) -> Result<Document, SerializeError> {
        let version = self.config.schema_version();
        let mut ctx = SerializeContext::new(version, env.catalog, &*env.scene);
        host.save(&mut ctx)?;
        Ok(Document::new(version, ctx.finish()))
    }

    /// Load `host` from the configured path.
    ///
    /// Storage and parse failures abort the load. Field-level problems are
    /// logged and skipped.
    pub fn load<T: Persist>(
        &mut self,
        host: &mut T,
        env: &mut Environment<'_>,
    ) -> Result<(), PersistError> {
        let fail = |source: PersistFailure| PersistError::Load {
            path: self.config.path.clone(),
            source,
        };

        let path = path::normalize(&self.config.path)
            .map_err(|e| fail(PersistFailure::Storage(e)))?;
        let bytes = self
            .storage
            .read(&path)
            .map_err(|e| fail(PersistFailure::Storage(e)))?;
        let document: Document = serialize::decode(&bytes, self.config.format)
            .map_err(|e| fail(PersistFailure::Deserialize(e)))?;
        let version = document.schema_version;

        self.load_document(document, host, env)
            .map_err(|e| PersistError::Load {
                path: self.config.path.clone(),
                source: PersistFailure::Deserialize(e),
            })?;

        log::info!(
            "Loaded {} from {path} (schema {version}, {} instances linked)",
            T::NAME,
            self.registry.len()
        );
        Ok(())
    }

    /// Run every load phase of `document` over `host`.
    ///
    /// Clears the registry first. Rejects documents written by a newer
    /// schema and documents whose root is not an object.
    pub fn load_document<T: Persist>(
        &mut self,
        document: Document,
        host: &mut T,
        env: &mut Environment<'_>,
    ) -> Result<(), DeserializeError> {
        let current = self.config.schema_version();
        if document.schema_version > current {
            return Err(DeserializeError::UnsupportedVersion {
                found: document.schema_version,
                current,
            });
        }
        if !matches!(document.data, Value::Map(_)) {
            return Err(DeserializeError::MalformedDocument {
                found: document.data.kind(),
            });
        }

        self.registry.clear();
        let phases = self.config.load_phases();
        {
            let mut ctx =
                DeserializeContext::new(document.schema_version, &mut self.registry, env);
            for phase in 0..phases {
                ctx.begin_phase(phase);
                if let Err(err) = ctx.decode_object(&document.data, host) {
                    log::warn!("{} phase {phase}: {err}", T::NAME);
                }
            }
        }
        log::debug!(
            "Loaded {} in {phases} phases, {} instances registered",
            T::NAME,
            self.registry.len()
        );

        self.document = Some(document);
        Ok(())
    }
}

/// Underlying cause of a failed save or load.
#[derive(Debug)]
pub enum PersistFailure {
    Storage(StorageError),
    Serialize(SerializeError),
    Deserialize(DeserializeError),
}

impl fmt::Display for PersistFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistFailure::Storage(e) => write!(f, "{e}"),
            PersistFailure::Serialize(e) => write!(f, "{e}"),
            PersistFailure::Deserialize(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PersistFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistFailure::Storage(e) => Some(e),
            PersistFailure::Serialize(e) => Some(e),
            PersistFailure::Deserialize(e) => Some(e),
        }
    }
}

/// The single outcome of a failed [`Serializer::save`] or [`Serializer::load`].
#[derive(Debug)]
pub enum PersistError {
    Save { path: String, source: PersistFailure },
    Load { path: String, source: PersistFailure },
}

impl PersistError {
    /// Short user-facing message without the underlying detail.
    pub fn message(&self) -> String {
        match self {
            PersistError::Save { path, .. } => format!("Could not save game to '{path}'"),
            PersistError::Load { path, .. } => format!("Could not load game from '{path}'"),
        }
    }

    pub fn failure(&self) -> &PersistFailure {
        match self {
            PersistError::Save { source, .. } | PersistError::Load { source, .. } => source,
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message(), self.failure())
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.failure())
    }
}
