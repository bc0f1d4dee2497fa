// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Passwordless login.
//!
//! Handles the core workflow:
//! 1. Issue a single-use magic link and email it
//! 2. Verify the link, consuming it exactly once
//! 3. Find or create the user by normalized email
//! 4. Issue a session token
//!
//! Plus logout and "who am I" over an existing session.

use crate::config::{Config, EmailTemplates};
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{MagicLink, PublicUser, Session, User};
use crate::services::email::Mailer;
use crate::services::sessions;
use crate::time_utils::format_utc_rfc3339;
use crate::tokens::{redact, secure_token};
use crate::validation::{is_valid_email, normalize_email};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

/// Magic links are valid for 15 minutes after issue.
pub const MAGIC_LINK_TTL_MINUTES: i64 = 15;

/// Sessions are valid for 30 days after login.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Why a magic-link verification did not produce a session.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Invalid or missing token")]
    MissingToken,
    #[error("Invalid or expired link")]
    InvalidLink,
    #[error("This link has expired. Please request a new one.")]
    Expired,
    #[error("Something went wrong. Please try again.")]
    Failed(#[from] AppError),
}

/// A freshly created session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Magic-link authentication and session lifecycle.
#[derive(Clone)]
pub struct AuthFlow {
    db: Database,
    mailer: Mailer,
    app_url: String,
    templates: EmailTemplates,
}

impl AuthFlow {
    pub fn new(db: Database, mailer: Mailer, config: &Config) -> Self {
        Self {
            db,
            mailer,
            app_url: config.app_url.clone(),
            templates: config.email_templates.clone(),
        }
    }

    /// Issue a magic link for `email` and send it.
    ///
    /// Succeeds whether or not an account exists for the address yet.
    pub async fn request_magic_link(&self, email: &str, now: DateTime<Utc>) -> Result<()> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AppError::BadRequest("Valid email is required".to_string()));
        }

        let link = MagicLink {
            email: email.clone(),
            token: secure_token()?,
            expires_at: format_utc_rfc3339(now + Duration::minutes(MAGIC_LINK_TTL_MINUTES)),
            used: false,
        };
        self.db.create_magic_link(&link).await?;

        let url = format!(
            "{}/api/auth/verify-magic-link?token={}",
            self.app_url, link.token
        );
        self.mailer
            .send_template(
                self.templates.magic_link,
                &email,
                json!({ "MAGIC_LINK": url, "EMAIL": email }),
            )
            .await?;

        tracing::info!(token = %redact(&link.token), "Magic link issued");
        Ok(())
    }

    /// Consume a magic link and open a session for its owner.
    pub async fn verify_magic_link(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> std::result::Result<IssuedSession, VerifyError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(VerifyError::MissingToken)?;

        let link = self
            .db
            .find_unused_magic_link(token)
            .await?
            .ok_or(VerifyError::InvalidLink)?;

        if link.data.is_expired_at(now) {
            return Err(VerifyError::Expired);
        }

        // Loses to a concurrent verification of the same link
        let link = self
            .db
            .consume_magic_link(&link.id, now)
            .await?
            .ok_or(VerifyError::InvalidLink)?;

        let user_id = self.find_or_create_user(&link.email, now).await?;

        let expires_at = now + Duration::days(SESSION_TTL_DAYS);
        let session = Session {
            user_id: user_id.clone(),
            token: secure_token()?,
            expires_at: format_utc_rfc3339(expires_at),
            created_at: Some(format_utc_rfc3339(now)),
        };
        self.db.create_session(&session).await?;

        tracing::info!(user_id = %user_id, "Login verified");
        Ok(IssuedSession {
            user_id,
            token: session.token,
            expires_at,
        })
    }

    async fn find_or_create_user(&self, email: &str, now: DateTime<Utc>) -> Result<String> {
        let email = normalize_email(email);
        if let Some(existing) = self.db.find_user_by_email(&email).await? {
            return Ok(existing.id);
        }

        let user_id = self
            .db
            .create_user(&User::new_free(email.clone(), format_utc_rfc3339(now)))
            .await?;
        tracing::info!(user_id = %user_id, "Created user on first login");

        if let Err(e) = self
            .mailer
            .send_template(self.templates.welcome, &email, json!({ "EMAIL": email }))
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Welcome email failed");
        }

        Ok(user_id)
    }

    /// End the session behind `token`, if any. Never fails.
    pub async fn logout(&self, token: Option<&str>) {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return;
        };

        let result = match self.db.find_session_by_token(token).await {
            Ok(Some(session)) => self.db.delete_session(&session.id).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(token = %redact(token), error = %e, "Session delete failed during logout");
        }
    }

    /// Public profile of the session's user, or `None` when unauthenticated.
    pub async fn whoami(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Option<PublicUser>> {
        match sessions::resolve(&self.db, token, now).await {
            Ok(user) => Ok(Some(PublicUser::from_user(&user.id, &user.data))),
            Err(AppError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
