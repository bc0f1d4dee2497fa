//! Synced project documents.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Project record stored in the `projects` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Owning user id (single owner)
    pub user_id: String,
    /// User ids granted read access
    #[serde(default)]
    pub shared_with: Vec<String>,
    pub name: String,
    /// Serialized JSON; parsed only on load
    #[serde(default)]
    pub data: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Owner or an explicit share.
    pub fn is_accessible_by(&self, user_id: &str) -> bool {
        self.is_owned_by(user_id) || self.shared_with.iter().any(|id| id == user_id)
    }

    /// Parse the stored blob. Corrupt data degrades to an empty object.
    pub fn parsed_data(&self) -> serde_json::Value {
        if self.data.is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(&self.data).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored project data is not valid JSON, returning empty");
            serde_json::json!({})
        })
    }
}

/// Project entry in list responses (no data payload).
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_owner: bool,
}

impl ProjectSummary {
    pub fn new(id: String, project: Project, is_owner: bool) -> Self {
        Self {
            id,
            name: project.name,
            created_at: project.created_at,
            updated_at: project.updated_at,
            is_owner,
        }
    }
}
