// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Authentication credentials: magic links and sessions.

use crate::time_utils::parse_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single-use login credential delivered by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLink {
    /// Lowercased recipient
    pub email: String,
    /// 64-char opaque token embedded in the emailed URL
    pub token: String,
    pub expires_at: String,
    #[serde(default)]
    pub used: bool,
}

impl MagicLink {
    /// Valid iff unused and `now < expires_at`. Unparseable expiry is invalid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        parse_utc(&self.expires_at).map_or(true, |expires_at| now >= expires_at)
    }
}

/// Bearer credential issued after a verified magic link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Weak reference to the user record
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Session {
    /// Expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        parse_utc(&self.expires_at).map_or(true, |expires_at| now >= expires_at)
    }
}
