// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Record store adapter.
//!
//! A thin document-database contract (`create`, `get`, `update`, `delete`,
//! `query`) over two backends: Firestore in production and an in-memory
//! store for tests and local development. Queries are built from typed
//! [`Filter`] values, never from interpolated strings.

pub mod firestore;
pub mod memory;
pub mod repo;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const MAGIC_LINKS: &str = "magic_links";
    pub const SESSIONS: &str = "sessions";
    pub const PROJECTS: &str = "projects";
    /// Processed checkout sessions (issuance idempotency)
    pub const LICENSE_EVENTS: &str = "license_events";
}

/// A scalar value a filter compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl FieldValue {
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Str(s) => serde_json::Value::String(s.clone()),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// A single query condition. All conditions in a [`Query`] are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value (exact, case-sensitive)
    Eq(&'static str, FieldValue),
    /// Array field contains value
    ArrayContains(&'static str, FieldValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Parameterised query over one collection.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(&'static str, Direction)>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.filters.push(Filter::Eq(field, value.into()));
        self
    }

    pub fn array_contains(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.filters.push(Filter::ArrayContains(field, value.into()));
        self
    }

    pub fn order_by(mut self, field: &'static str, direction: Direction) -> Self {
        self.order_by = Some((field, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored document together with its store-assigned id.
#[derive(Debug, Clone)]
pub struct Record<T> {
    pub id: String,
    pub data: T,
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Handle to the record store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Connect the backend selected in configuration.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.store_backend {
            StoreBackend::Firestore => Ok(Self::firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory record store; data will not survive restarts");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn firestore(db: FirestoreDb) -> Self {
        Self {
            backend: Backend::Firestore(db),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    /// Make every in-memory operation fail. No effect on Firestore.
    #[cfg(debug_assertions)]
    pub fn set_failing(&self, failing: bool) {
        if let Backend::Memory(store) = &self.backend {
            store.set_failing(failing);
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    /// Insert a document under a fresh store-assigned id.
    pub async fn create<T>(&self, collection: &str, doc: &T) -> Result<String, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let id = crate::tokens::document_id()?;
        match &self.backend {
            Backend::Firestore(db) => db.insert(collection, &id, doc).await?,
            Backend::Memory(store) => {
                store.ensure_available()?;
                store.create(collection, &id, to_json(doc)?)?
            }
        }
        Ok(id)
    }

    pub async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(db) => db.get(collection, id).await,
            Backend::Memory(store) => {
                store.ensure_available()?;
                store.get(collection, id).map(from_json).transpose()
            }
        }
    }

    /// Overwrite a document.
    pub async fn update<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(db) => db.put(collection, id, doc).await,
            Backend::Memory(store) => {
                store.ensure_available()?;
                store.insert(collection, id, to_json(doc)?);
                Ok(())
            }
        }
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.delete(collection, id).await,
            Backend::Memory(store) => {
                store.ensure_available()?;
                store.remove(collection, id);
                Ok(())
            }
        }
    }

    pub async fn query<T>(&self, collection: &str, query: &Query) -> Result<Vec<Record<T>>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(db) => db.query(collection, query).await,
            Backend::Memory(store) => {
                store.ensure_available()?;
                store
                    .query(collection, query)
                    .into_iter()
                    .map(|(id, value)| {
                        Ok(Record {
                            id,
                            data: from_json(value)?,
                        })
                    })
                    .collect()
            }
        }
    }

    /// Read-check-write of one document.
    ///
    /// `apply` mutates the document and returns whether to write it back.
    /// Returns the written document, or `None` if the document is missing or
    /// `apply` declined. The in-memory backend holds the record lock for the
    /// whole step. Firestore reads and writes in one transaction and may call
    /// `apply` again after a contended commit.
    pub async fn modify<T, F>(
        &self,
        collection: &str,
        id: &str,
        apply: F,
    ) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn(&mut T) -> bool + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(db) => db.modify(collection, id, apply).await,
            Backend::Memory(store) => {
                store.ensure_available()?;
                store
                    .modify(collection, id, |value| {
                        let mut doc: T = from_json(value.clone())?;
                        if !apply(&mut doc) {
                            return Ok(None);
                        }
                        *value = to_json(&doc)?;
                        Ok(Some(doc))
                    })
                    .unwrap_or(Ok(None))
            }
        }
    }
}

fn to_json<T: Serialize>(doc: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(format!("Serialize failed: {}", e)))
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Deserialize failed: {}", e)))
}
