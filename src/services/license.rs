// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! License issuance on completed checkout, and read-only license checks.

use crate::config::Config;
use crate::db::{Database, Record};
use crate::error::Result;
use crate::models::{LicenseEvent, LicenseTier, User};
use crate::services::email::Mailer;
use crate::services::entitlements::{Entitlements, TierLimits};
use crate::services::stripe::CheckoutCompleted;
use crate::time_utils::format_utc_rfc3339;
use crate::tokens;
use crate::validation::normalize_email;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

/// `updates_until` for lifetime (agency) licenses.
pub const LIFETIME_UPDATES_UNTIL: &str = "2099-12-31T00:00:00.000Z";

/// Update eligibility for non-lifetime licenses.
pub const UPDATES_WINDOW_DAYS: i64 = 365;

/// Outcome of handling one checkout-completed event.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    Issued { user_id: String, license_key: String },
    /// Event already processed; nothing written
    Duplicate,
    /// Event lacks email or a purchasable tier; nothing written
    Skipped,
}

/// Identifier for a license check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseLookup {
    Key(String),
    Email(String),
}

impl LicenseLookup {
    /// Prefer the key when both are given; blank values count as absent.
    pub fn from_parts(license_key: Option<&str>, email: Option<&str>) -> Option<Self> {
        let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        present(license_key)
            .map(LicenseLookup::Key)
            .or_else(|| present(email).map(LicenseLookup::Email))
    }
}

/// Result of a license check.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseCheck {
    pub valid: bool,
    pub tier: LicenseTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates_expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<TierLimits>,
    pub message: String,
}

/// `updates_until` for a purchase of `tier` at `now`.
pub fn updates_until_for(tier: LicenseTier, now: DateTime<Utc>) -> String {
    match tier {
        LicenseTier::Agency => LIFETIME_UPDATES_UNTIL.to_string(),
        _ => format_utc_rfc3339(now + Duration::days(UPDATES_WINDOW_DAYS)),
    }
}

#[derive(Clone)]
pub struct LicenseService {
    db: Database,
    mailer: Mailer,
    entitlements: Entitlements,
    app_url: String,
    license_template: u64,
}

impl LicenseService {
    pub fn new(db: Database, mailer: Mailer, entitlements: Entitlements, config: &Config) -> Self {
        Self {
            db,
            mailer,
            entitlements,
            app_url: config.app_url.clone(),
            license_template: config.email_templates.license_key,
        }
    }

    /// Issue a license for a completed checkout.
    ///
    /// Persistence failures propagate so the event is redelivered; a
    /// redelivered event for an already processed session is a no-op.
    pub async fn issue(&self, event: &CheckoutCompleted, now: DateTime<Utc>) -> Result<IssueOutcome> {
        let (Some(email), Some(tier_name)) = (event.email.as_deref(), event.tier.as_deref()) else {
            tracing::error!(session_id = %event.session_id, "Checkout missing email or tier; skipping");
            return Ok(IssueOutcome::Skipped);
        };
        let Some(tier) = LicenseTier::parse(tier_name).filter(|t| t.is_purchasable()) else {
            tracing::error!(session_id = %event.session_id, tier = tier_name, "Checkout has unknown tier; skipping");
            return Ok(IssueOutcome::Skipped);
        };

        if !event.session_id.is_empty()
            && self.db.find_license_event(&event.session_id).await?.is_some()
        {
            tracing::info!(session_id = %event.session_id, "Checkout already processed");
            return Ok(IssueOutcome::Duplicate);
        }

        let email = normalize_email(email);
        let license_key = tokens::license_key(tier)?;
        let updates_until = updates_until_for(tier, now);
        let stamp = format_utc_rfc3339(now);

        // A repeat purchase replaces the previous entitlement outright
        let user_id = match self.db.find_user_by_email(&email).await? {
            Some(Record { id, data: mut user }) => {
                user.license_tier = tier;
                user.license_key = Some(license_key.clone());
                user.purchased_at = Some(stamp.clone());
                user.updates_until = Some(updates_until.clone());
                user.stripe_customer_id = event.customer_reference.clone();
                self.db.update_user(&id, &user).await?;
                id
            }
            None => {
                let mut user = User::new_free(email.clone(), stamp.clone());
                user.license_tier = tier;
                user.license_key = Some(license_key.clone());
                user.purchased_at = Some(stamp.clone());
                user.updates_until = Some(updates_until.clone());
                user.stripe_customer_id = event.customer_reference.clone();
                self.db.create_user(&user).await?
            }
        };

        self.db
            .record_license_event(&LicenseEvent {
                checkout_session_id: event.session_id.clone(),
                user_id: user_id.clone(),
                email: email.clone(),
                tier,
                license_key: license_key.clone(),
                processed_at: stamp,
            })
            .await?;

        let params = json!({
            "EMAIL": email,
            "TIER": tier.display_name(),
            "LICENSE_KEY": license_key,
            "APP_URL": self.app_url,
        });
        if let Err(e) = self
            .mailer
            .send_template(self.license_template, &email, params)
            .await
        {
            // The key stays reachable through the account page and license check
            tracing::warn!(user_id = %user_id, error = %e, "License email failed");
        }

        tracing::info!(
            user_id = %user_id,
            tier = %tier,
            license_key = %tokens::redact(&license_key),
            "License issued"
        );
        Ok(IssueOutcome::Issued {
            user_id,
            license_key,
        })
    }

    /// Look up a license by key (exact) or by email (normalized).
    pub async fn check(&self, lookup: &LicenseLookup, now: DateTime<Utc>) -> Result<LicenseCheck> {
        let found = match lookup {
            LicenseLookup::Key(key) => self.db.find_user_by_license_key(key).await?,
            LicenseLookup::Email(email) => {
                self.db.find_user_by_email(&normalize_email(email)).await?
            }
        };

        let Some(Record { data: user, .. }) = found else {
            let message = match lookup {
                LicenseLookup::Key(_) => "Invalid license key",
                LicenseLookup::Email(_) => "No license found for this email",
            };
            return Ok(LicenseCheck {
                valid: false,
                tier: LicenseTier::Free,
                email: None,
                license_key: None,
                purchased_at: None,
                updates_until: None,
                updates_expired: None,
                limits: None,
                message: message.to_string(),
            });
        };

        let tier = user.license_tier;
        let status = self
            .entitlements
            .license_status(tier, user.updates_until.as_deref(), now);
        let message = if status.valid {
            format!("{} license active", tier.display_name())
        } else {
            "Free tier".to_string()
        };

        Ok(LicenseCheck {
            valid: status.valid,
            tier,
            email: Some(user.email),
            license_key: user.license_key,
            purchased_at: user.purchased_at,
            updates_until: user.updates_until,
            updates_expired: Some(status.updates_expired),
            limits: Some(*self.entitlements.limits(tier)),
            message,
        })
    }
}
