// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Typed operations per collection.
//!
//! Provides high-level operations for:
//! - Users (lookup by id, email or license key)
//! - Magic links (issue, find unused, consume once)
//! - Sessions (issue, resolve by token, delete)
//! - Projects (owned/shared listings, create, update)
//! - License events (issuance idempotency)

use crate::db::{collections, Database, Direction, Query, Record};
use crate::error::AppError;
use crate::models::{LicenseEvent, MagicLink, Project, Session, User};
use chrono::{DateTime, Utc};

impl Database {
    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, user_id).await
    }

    /// Find a user by already-normalized email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<Record<User>>, AppError> {
        let query = Query::new().eq("email", email).limit(1);
        Ok(self.query(collections::USERS, &query).await?.into_iter().next())
    }

    pub async fn find_user_by_license_key(
        &self,
        license_key: &str,
    ) -> Result<Option<Record<User>>, AppError> {
        let query = Query::new().eq("license_key", license_key).limit(1);
        Ok(self.query(collections::USERS, &query).await?.into_iter().next())
    }

    pub async fn create_user(&self, user: &User) -> Result<String, AppError> {
        self.create(collections::USERS, user).await
    }

    pub async fn update_user(&self, user_id: &str, user: &User) -> Result<(), AppError> {
        self.update(collections::USERS, user_id, user).await
    }

    // ─── Magic Link Operations ───────────────────────────────────

    pub async fn create_magic_link(&self, link: &MagicLink) -> Result<String, AppError> {
        self.create(collections::MAGIC_LINKS, link).await
    }

    /// Find an unused link by exact token match.
    pub async fn find_unused_magic_link(
        &self,
        token: &str,
    ) -> Result<Option<Record<MagicLink>>, AppError> {
        let query = Query::new().eq("token", token).eq("used", false).limit(1);
        Ok(self
            .query(collections::MAGIC_LINKS, &query)
            .await?
            .into_iter()
            .next())
    }

    /// Flip `used` if the link is still valid at `now`.
    ///
    /// Returns `None` when another request consumed it first or it expired.
    pub async fn consume_magic_link(
        &self,
        link_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MagicLink>, AppError> {
        self.modify(collections::MAGIC_LINKS, link_id, |link: &mut MagicLink| {
            if !link.is_valid_at(now) {
                return false;
            }
            link.used = true;
            true
        })
        .await
    }

    // ─── Session Operations ──────────────────────────────────────

    pub async fn create_session(&self, session: &Session) -> Result<String, AppError> {
        self.create(collections::SESSIONS, session).await
    }

    pub async fn find_session_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Record<Session>>, AppError> {
        let query = Query::new().eq("token", token).limit(1);
        Ok(self.query(collections::SESSIONS, &query).await?.into_iter().next())
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.delete(collections::SESSIONS, session_id).await
    }

    // ─── Project Operations ──────────────────────────────────────

    pub async fn get_project(&self, project_id: &str) -> Result<Option<Project>, AppError> {
        self.get(collections::PROJECTS, project_id).await
    }

    /// Projects owned by the user, most recently updated first.
    pub async fn owned_projects(&self, user_id: &str) -> Result<Vec<Record<Project>>, AppError> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_by("updated_at", Direction::Descending);
        self.query(collections::PROJECTS, &query).await
    }

    /// Projects shared with the user, most recently updated first.
    pub async fn shared_projects(&self, user_id: &str) -> Result<Vec<Record<Project>>, AppError> {
        let query = Query::new()
            .array_contains("shared_with", user_id)
            .order_by("updated_at", Direction::Descending);
        self.query(collections::PROJECTS, &query).await
    }

    pub async fn count_owned_projects(&self, user_id: &str) -> Result<usize, AppError> {
        let query = Query::new().eq("user_id", user_id);
        Ok(self
            .query::<Project>(collections::PROJECTS, &query)
            .await?
            .len())
    }

    pub async fn create_project(&self, project: &Project) -> Result<String, AppError> {
        self.create(collections::PROJECTS, project).await
    }

    pub async fn update_project(&self, project_id: &str, project: &Project) -> Result<(), AppError> {
        self.update(collections::PROJECTS, project_id, project).await
    }

    // ─── License Event Operations ────────────────────────────────

    pub async fn find_license_event(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Record<LicenseEvent>>, AppError> {
        let query = Query::new()
            .eq("checkout_session_id", checkout_session_id)
            .limit(1);
        Ok(self
            .query(collections::LICENSE_EVENTS, &query)
            .await?
            .into_iter()
            .next())
    }

    pub async fn record_license_event(&self, event: &LicenseEvent) -> Result<String, AppError> {
        self.create(collections::LICENSE_EVENTS, event).await
    }
}
