// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Project sync: list, load and save of per-user JSON documents.
//!
//! Access rules:
//! - Owners and users in `shared_with` may load a project
//! - Only the owner may save over it
//! - Tier quotas count owned projects only

use crate::db::{Database, Record};
use crate::error::{AppError, Result};
use crate::models::{Project, ProjectSummary, User};
use crate::services::entitlements::{Entitlements, UNLIMITED};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Listing of every project visible to a user.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
    pub total: usize,
    /// Owned-project limit for the caller's tier (-1 = unlimited)
    pub limit: i32,
    pub can_create: bool,
}

/// A project with its parsed document.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedProject {
    pub id: String,
    pub name: String,
    pub data: Value,
    pub created_at: String,
    pub updated_at: String,
    pub is_owner: bool,
}

/// Save input. `project_id` absent means create.
#[derive(Debug, Clone, Default)]
pub struct SaveProject {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub project_id: String,
    pub created: bool,
}

#[derive(Clone)]
pub struct SyncService {
    db: Database,
    entitlements: Entitlements,
}

impl SyncService {
    pub fn new(db: Database, entitlements: Entitlements) -> Self {
        Self { db, entitlements }
    }

    /// Owned projects first, then shared ones; each group newest first.
    pub async fn list(&self, user: &Record<User>) -> Result<ProjectList> {
        let owned = self.db.owned_projects(&user.id).await?;
        let shared = self.db.shared_projects(&user.id).await?;
        let owned_count = owned.len();

        let projects: Vec<ProjectSummary> = owned
            .into_iter()
            .map(|p| ProjectSummary::new(p.id, p.data, true))
            .chain(
                shared
                    .into_iter()
                    // A self-share is still an owned project
                    .filter(|p| !p.data.is_owned_by(&user.id))
                    .map(|p| ProjectSummary::new(p.id, p.data, false)),
            )
            .collect();

        let tier = user.data.license_tier;
        Ok(ProjectList {
            total: projects.len(),
            limit: self.entitlements.limits(tier).max_projects,
            can_create: self.entitlements.can_create_project(tier, owned_count),
            projects,
        })
    }

    pub async fn load(&self, user: &Record<User>, project_id: &str) -> Result<LoadedProject> {
        if project_id.is_empty() {
            return Err(AppError::BadRequest("Project ID is required".to_string()));
        }

        let project = self
            .db
            .get_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        if !project.is_accessible_by(&user.id) {
            tracing::warn!(user_id = %user.id, project_id, "Project access denied");
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        Ok(LoadedProject {
            id: project_id.to_string(),
            data: project.parsed_data(),
            is_owner: project.is_owned_by(&user.id),
            name: project.name,
            created_at: project.created_at,
            updated_at: project.updated_at,
        })
    }

    pub async fn save(
        &self,
        user: &Record<User>,
        request: SaveProject,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome> {
        let name = request.name.filter(|n| !n.is_empty());
        let data = request.data.filter(is_present);
        let (Some(name), Some(data)) = (name, data) else {
            return Err(AppError::BadRequest(
                "Project name and data are required".to_string(),
            ));
        };

        let tier = user.data.license_tier;
        if !self.entitlements.can_sync(tier) {
            return Err(AppError::UpgradeRequired(
                "Cloud sync requires Starter license or higher".to_string(),
            ));
        }

        let serialized = serde_json::to_string(&data)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Serialize project data: {}", e)))?;
        let stamp = format_utc_rfc3339(now);

        match request.project_id.filter(|id| !id.is_empty()) {
            Some(project_id) => {
                let mut project = self
                    .db
                    .get_project(&project_id)
                    .await?
                    .filter(|p| p.is_owned_by(&user.id))
                    .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

                project.name = name;
                project.data = serialized;
                project.updated_at = stamp;
                self.db.update_project(&project_id, &project).await?;

                tracing::info!(user_id = %user.id, project_id = %project_id, "Project updated");
                Ok(SaveOutcome {
                    project_id,
                    created: false,
                })
            }
            None => {
                let max = self.entitlements.limits(tier).max_projects;
                // Check-then-create is not atomic; concurrent saves may overshoot by one
                if max != UNLIMITED {
                    let owned = self.db.count_owned_projects(&user.id).await?;
                    if !self.entitlements.can_create_project(tier, owned) {
                        return Err(AppError::UpgradeRequired(format!(
                            "Project limit reached ({}). Upgrade to Pro for unlimited projects.",
                            max
                        )));
                    }
                }

                let project = Project {
                    user_id: user.id.clone(),
                    shared_with: Vec::new(),
                    name,
                    data: serialized,
                    created_at: stamp.clone(),
                    updated_at: stamp,
                };
                let project_id = self.db.create_project(&project).await?;

                tracing::info!(user_id = %user.id, project_id = %project_id, "Project created");
                Ok(SaveOutcome {
                    project_id,
                    created: true,
                })
            }
        }
    }
}

/// A project payload counts as missing when it is null, false, zero or an
/// empty string. Objects and arrays are always present, even when empty.
fn is_present(data: &Value) -> bool {
    match data {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LicenseTier;
    use chrono::Duration;
    use serde_json::json;

    async fn user(db: &Database, email: &str, tier: LicenseTier) -> Record<User> {
        let mut user = User::new_free(email.to_string(), format_utc_rfc3339(Utc::now()));
        user.license_tier = tier;
        let id = db.create_user(&user).await.unwrap();
        Record { id, data: user }
    }

    fn save_new(name: &str) -> SaveProject {
        SaveProject {
            project_id: None,
            name: Some(name.to_string()),
            data: Some(json!({"nodes": [1, 2, 3]})),
        }
    }

    #[tokio::test]
    async fn test_free_tier_cannot_save() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let free = user(&db, "free@example.com", LicenseTier::Free).await;

        let err = svc.save(&free, save_new("Plan"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::UpgradeRequired(_)));
    }

    #[tokio::test]
    async fn test_missing_name_or_data() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let pro = user(&db, "pro@example.com", LicenseTier::Pro).await;

        let mut request = save_new("Plan");
        request.data = Some(Value::Null);
        assert!(matches!(
            svc.save(&pro, request, Utc::now()).await,
            Err(AppError::BadRequest(_))
        ));

        let mut request = save_new("");
        request.name = None;
        assert!(matches!(
            svc.save(&pro, request, Utc::now()).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_payload_presence_rules() {
        for missing in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_present(&missing), "{} should count as missing", missing);
        }
        for present in [json!({}), json!([]), json!(true), json!(1), json!("x")] {
            assert!(is_present(&present), "{} should count as present", present);
        }
    }

    #[tokio::test]
    async fn test_blank_name_is_accepted_but_empty_name_is_not() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let pro = user(&db, "names@example.com", LicenseTier::Pro).await;

        assert!(svc.save(&pro, save_new("   "), Utc::now()).await.is_ok());
        assert!(matches!(
            svc.save(&pro, save_new(""), Utc::now()).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_starter_quota() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let starter = user(&db, "s@example.com", LicenseTier::Starter).await;
        let now = Utc::now();

        for i in 0..10 {
            svc.save(&starter, save_new(&format!("P{}", i)), now).await.unwrap();
        }
        let err = svc.save(&starter, save_new("P10"), now).await.unwrap_err();
        match err {
            AppError::UpgradeRequired(msg) => assert!(msg.contains("(10)")),
            other => panic!("unexpected {:?}", other),
        }

        // Updating an existing project is not quota-gated
        let list = svc.list(&starter).await.unwrap();
        assert!(!list.can_create);
        let existing = list.projects[0].id.clone();
        let update = SaveProject {
            project_id: Some(existing),
            ..save_new("Renamed")
        };
        assert!(!svc.save(&starter, update, now).await.unwrap().created);
    }

    #[tokio::test]
    async fn test_shared_projects_do_not_count_against_quota() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let owner = user(&db, "o@example.com", LicenseTier::Pro).await;
        let viewer = user(&db, "v@example.com", LicenseTier::Starter).await;
        let now = Utc::now();

        for i in 0..12 {
            let saved = svc.save(&owner, save_new(&format!("P{}", i)), now).await.unwrap();
            let mut project = db.get_project(&saved.project_id).await.unwrap().unwrap();
            project.shared_with.push(viewer.id.clone());
            db.update_project(&saved.project_id, &project).await.unwrap();
        }

        let list = svc.list(&viewer).await.unwrap();
        assert_eq!(list.total, 12);
        assert!(list.projects.iter().all(|p| !p.is_owner));
        assert!(list.can_create);
        assert_eq!(list.limit, 10);
    }

    #[tokio::test]
    async fn test_list_orders_owned_then_shared_newest_first() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let me = user(&db, "me@example.com", LicenseTier::Pro).await;
        let other = user(&db, "other@example.com", LicenseTier::Pro).await;
        let t0 = Utc::now();

        let old = svc.save(&me, save_new("old"), t0).await.unwrap();
        let new = svc.save(&me, save_new("new"), t0 + Duration::minutes(5)).await.unwrap();
        let shared = svc.save(&other, save_new("shared"), t0 + Duration::minutes(10)).await.unwrap();
        let mut project = db.get_project(&shared.project_id).await.unwrap().unwrap();
        project.shared_with = vec![me.id.clone()];
        db.update_project(&shared.project_id, &project).await.unwrap();

        let list = svc.list(&me).await.unwrap();
        let ids: Vec<&str> = list.projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                new.project_id.as_str(),
                old.project_id.as_str(),
                shared.project_id.as_str()
            ]
        );
        assert_eq!(list.limit, -1);
        assert!(list.can_create);
    }

    #[tokio::test]
    async fn test_load_access_rules() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let owner = user(&db, "o@example.com", LicenseTier::Pro).await;
        let viewer = user(&db, "v@example.com", LicenseTier::Free).await;
        let stranger = user(&db, "s@example.com", LicenseTier::Agency).await;
        let now = Utc::now();

        let saved = svc.save(&owner, save_new("Plan"), now).await.unwrap();
        let mut project = db.get_project(&saved.project_id).await.unwrap().unwrap();
        project.shared_with.push(viewer.id.clone());
        db.update_project(&saved.project_id, &project).await.unwrap();

        let loaded = svc.load(&owner, &saved.project_id).await.unwrap();
        assert!(loaded.is_owner);
        assert_eq!(loaded.data, json!({"nodes": [1, 2, 3]}));

        let loaded = svc.load(&viewer, &saved.project_id).await.unwrap();
        assert!(!loaded.is_owner);

        assert!(matches!(
            svc.load(&stranger, &saved.project_id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            svc.load(&owner, "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_shared_user_cannot_save_over_project() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let owner = user(&db, "o@example.com", LicenseTier::Pro).await;
        let viewer = user(&db, "v@example.com", LicenseTier::Pro).await;
        let now = Utc::now();

        let saved = svc.save(&owner, save_new("Plan"), now).await.unwrap();
        let mut project = db.get_project(&saved.project_id).await.unwrap().unwrap();
        project.shared_with.push(viewer.id.clone());
        db.update_project(&saved.project_id, &project).await.unwrap();

        let overwrite = SaveProject {
            project_id: Some(saved.project_id.clone()),
            ..save_new("Hijacked")
        };
        assert!(matches!(
            svc.save(&viewer, overwrite, now).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at_and_shares() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let owner = user(&db, "o@example.com", LicenseTier::Starter).await;
        let t0 = Utc::now();

        let saved = svc.save(&owner, save_new("Plan"), t0).await.unwrap();
        let mut project = db.get_project(&saved.project_id).await.unwrap().unwrap();
        project.shared_with.push("friend".to_string());
        db.update_project(&saved.project_id, &project).await.unwrap();

        let update = SaveProject {
            project_id: Some(saved.project_id.clone()),
            name: Some("Plan v2".to_string()),
            data: Some(json!({"v": 2})),
        };
        svc.save(&owner, update, t0 + Duration::hours(1)).await.unwrap();

        let stored = db.get_project(&saved.project_id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Plan v2");
        assert_eq!(stored.created_at, format_utc_rfc3339(t0));
        assert_eq!(stored.updated_at, format_utc_rfc3339(t0 + Duration::hours(1)));
        assert_eq!(stored.shared_with, vec!["friend".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_data_loads_as_empty_object() {
        let db = Database::in_memory();
        let svc = SyncService::new(db.clone(), Entitlements::new());
        let owner = user(&db, "o@example.com", LicenseTier::Pro).await;
        let stamp = format_utc_rfc3339(Utc::now());
        let id = db
            .create_project(&Project {
                user_id: owner.id.clone(),
                shared_with: vec![],
                name: "Broken".to_string(),
                data: "{not json".to_string(),
                created_at: stamp.clone(),
                updated_at: stamp,
            })
            .await
            .unwrap();

        let loaded = svc.load(&owner, &id).await.unwrap();
        assert_eq!(loaded.data, json!({}));
    }
}
