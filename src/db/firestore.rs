// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Firestore backend for the record store.
//!
//! Documents are addressed by `(collection, id)`; queries translate typed
//! [`Filter`]s into Firestore structured-query filters.

use crate::db::{Direction, FieldValue, Filter, Query, Record};
use crate::error::AppError;
use firestore::errors::FirestoreError;
use firestore::select_filter_builder::FirestoreQueryFilterBuilder;
use firestore::{FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreQueryFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    pub async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a document, failing if the id is already taken.
    pub async fn insert<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: serde::de::IgnoredAny = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataConflictError(_) => AppError::Database(format!(
                    "Document {}/{} already exists",
                    collection, id
                )),
                other => AppError::Database(other.to_string()),
            })?;
        Ok(())
    }

    /// Create or overwrite a document.
    pub async fn put<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn query<T>(&self, collection: &str, query: &Query) -> Result<Vec<Record<T>>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let filters = query.filters.clone();
        let select = self.client.fluent().select().from(collection);

        let select = if filters.is_empty() {
            select
        } else {
            select.filter(move |q| q.for_all(filters.iter().map(|f| translate_filter(&q, f))))
        };

        let select = match query.order_by {
            Some((field, Direction::Ascending)) => {
                select.order_by([(field, FirestoreQueryDirection::Ascending)])
            }
            Some((field, Direction::Descending)) => {
                select.order_by([(field, FirestoreQueryDirection::Descending)])
            }
            None => select,
        };

        let select = match query.limit {
            Some(limit) => select.limit(limit),
            None => select,
        };

        let documents = select
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        documents
            .iter()
            .map(|doc| {
                let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                let data = firestore::FirestoreDb::deserialize_doc_to::<T>(doc)
                    .map_err(|e| AppError::Database(format!("Failed to decode {}: {}", id, e)))?;
                Ok(Record { id, data })
            })
            .collect()
    }

    /// Read a document, let `apply` decide, and commit the write, all inside
    /// one transaction.
    ///
    /// The read is bound to the transaction, so a concurrent writer of the
    /// same document makes one of the commits abort. An aborted attempt is
    /// retried from a fresh read, where `apply` sees the winner's write.
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
        let mut attempt = 1;
        loop {
            match self.modify_once(collection, id, &apply).await {
                Err(TransactionError::Contended(e)) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::debug!(collection, id, attempt, error = %e, "Transaction contended, retrying");
                    attempt += 1;
                }
                Err(TransactionError::Contended(e)) | Err(TransactionError::Failed(e)) => {
                    return Err(AppError::Database(e))
                }
                Ok(result) => return Ok(result),
            }
        }
    }

    async fn modify_once<T, F>(
        &self,
        collection: &str,
        id: &str,
        apply: &F,
    ) -> Result<Option<T>, TransactionError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn(&mut T) -> bool + Send + Sync,
    {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| TransactionError::from_firestore("Failed to begin transaction", e))?;

        let in_transaction = self.client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<T> = match in_transaction
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
        {
            Ok(current) => current,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(TransactionError::from_firestore("Transactional read failed", e));
            }
        };

        let Some(mut doc) = current else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        if !apply(&mut doc) {
            let _ = transaction.rollback().await;
            return Ok(None);
        }

        self.client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(&doc)
            .add_to_transaction(&mut transaction)
            .map_err(|e| TransactionError::from_firestore("Failed to add write to transaction", e))?;

        transaction
            .commit()
            .await
            .map_err(|e| TransactionError::from_firestore("Transaction commit failed", e))?;

        Ok(Some(doc))
    }
}

/// Attempts made by [`FirestoreDb::modify`] before a contended transaction
/// is reported as a database error.
const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

enum TransactionError {
    /// Aborted by a conflicting transaction; safe to retry from the read.
    Contended(String),
    Failed(String),
}

impl TransactionError {
    fn from_firestore(context: &str, error: FirestoreError) -> Self {
        let message = format!("{}: {}", context, error);
        match error {
            FirestoreError::DatabaseError(ref db_err) if db_err.retry_possible => {
                TransactionError::Contended(message)
            }
            _ => TransactionError::Failed(message),
        }
    }
}

fn translate_filter(q: &FirestoreQueryFilterBuilder, filter: &Filter) -> Option<FirestoreQueryFilter> {
    match filter {
        Filter::Eq(field, FieldValue::Str(value)) => q.field(*field).eq(value.clone()),
        Filter::Eq(field, FieldValue::Bool(value)) => q.field(*field).eq(*value),
        Filter::ArrayContains(field, FieldValue::Str(value)) => {
            q.field(*field).array_contains(value.clone())
        }
        Filter::ArrayContains(field, FieldValue::Bool(value)) => {
            q.field(*field).array_contains(*value)
        }
    }
}
