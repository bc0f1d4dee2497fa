// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! In-memory record store.
//!
//! Documents live as JSON values in per-collection maps. Used by tests and
//! for local development without a Firestore emulator. Query semantics
//! follow the Firestore backend: ANDed filters, one sort field, limit.

use crate::db::{Direction, Filter, Query};
use crate::error::AppError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Value>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, to exercise store outage paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Error out while the store is switched to failing.
    pub fn ensure_available(&self) -> Result<(), AppError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Database("Mock store failure".to_string()));
        }
        Ok(())
    }

    /// Insert under `id` unless a document already holds it.
    pub fn create(&self, collection: &str, id: &str, value: Value) -> Result<(), AppError> {
        let docs = self.collections.entry(collection.to_string()).or_default();
        let result = match docs.entry(id.to_string()) {
            Entry::Occupied(_) => Err(AppError::Database(format!(
                "Document {}/{} already exists",
                collection, id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        };
        result
    }

    pub fn insert(&self, collection: &str, id: &str, value: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)?
            .get(id)
            .map(|doc| doc.value().clone())
    }

    pub fn remove(&self, collection: &str, id: &str) {
        if let Some(docs) = self.collections.get(collection) {
            docs.remove(id);
        }
    }

    /// Run `apply` with exclusive access to one document.
    pub fn modify<R>(&self, collection: &str, id: &str, apply: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let docs = self.collections.get(collection)?;
        let mut doc = docs.get_mut(id)?;
        Some(apply(doc.value_mut()))
    }

    pub fn query(&self, collection: &str, query: &Query) -> Vec<(String, Value)> {
        let Some(docs) = self.collections.get(collection) else {
            return Vec::new();
        };

        let mut matches: Vec<(String, Value)> = docs
            .iter()
            .filter(|doc| query.filters.iter().all(|f| matches_filter(doc.value(), f)))
            .map(|doc| (doc.key().clone(), doc.value().clone()))
            .collect();
        drop(docs);

        if let Some((field, direction)) = query.order_by {
            matches.sort_by(|(_, a), (_, b)| {
                let ordering = compare_fields(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matches.truncate(limit as usize);
        }

        matches
    }
}

fn matches_filter(doc: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, expected) => doc.get(*field) == Some(&expected.to_json()),
        Filter::ArrayContains(field, expected) => doc
            .get(*field)
            .and_then(Value::as_array)
            .is_some_and(|items| items.contains(&expected.to_json())),
    }
}

/// Missing fields sort first, like Firestore's null ordering.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
