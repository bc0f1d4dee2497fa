// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Session resolution: bearer token to user.

use crate::db::{Database, Record};
use crate::error::AppError;
use crate::models::User;
use crate::tokens::redact;
use chrono::{DateTime, Utc};

/// Resolve a session token to its user.
///
/// Fails with `Unauthorized` for a missing or unknown token, an expired
/// session (which is deleted as a side effect), or a session whose user no
/// longer exists. Store failures propagate unchanged.
pub async fn resolve(
    db: &Database,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Record<User>, AppError> {
    let token = token.filter(|t| !t.is_empty()).ok_or(AppError::Unauthorized)?;

    let session = db
        .find_session_by_token(token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if session.data.is_expired_at(now) {
        tracing::debug!(token = %redact(token), "Session expired; deleting");
        db.delete_session(&session.id).await?;
        return Err(AppError::Unauthorized);
    }

    let user_id = session.data.user_id;
    let user = db.get_user(&user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user_id, "Session references a missing user");
        AppError::Unauthorized
    })?;

    Ok(Record { id: user_id, data: user })
}
