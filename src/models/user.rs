//! User model for storage and API.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// License tier. Governs project limits and feature access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    #[default]
    Free,
    Starter,
    Pro,
    Agency,
}

impl LicenseTier {
    pub const ALL: [LicenseTier; 4] = [
        LicenseTier::Free,
        LicenseTier::Starter,
        LicenseTier::Pro,
        LicenseTier::Agency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LicenseTier::Free => "free",
            LicenseTier::Starter => "starter",
            LicenseTier::Pro => "pro",
            LicenseTier::Agency => "agency",
        }
    }

    /// Parse a tier name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == name)
    }

    /// Parse a tier name, treating anything unrecognized as free.
    pub fn parse_lenient(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// Tiers that can be bought through checkout.
    pub fn is_purchasable(self) -> bool {
        self != LicenseTier::Free
    }

    /// Capitalized name used in emails and messages.
    pub fn display_name(self) -> &'static str {
        match self {
            LicenseTier::Free => "Free",
            LicenseTier::Starter => "Starter",
            LicenseTier::Pro => "Pro",
            LicenseTier::Agency => "Agency",
        }
    }

    /// Three-letter license key prefix ("STA", "PRO", "AGE").
    pub fn key_prefix(self) -> String {
        self.as_str()
            .chars()
            .take(3)
            .collect::<String>()
            .to_uppercase()
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored tiers may predate the current set; fall back to free.
fn deserialize_tier<'de, D>(deserializer: D) -> Result<LicenseTier, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(LicenseTier::parse_lenient)
        .unwrap_or_default())
}

/// User record stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Lowercased email; natural key for lookup and upsert
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tier")]
    pub license_tier: LicenseTier,
    /// Format `TIE-XXXX-XXXX-XXXX-XXXX`
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub purchased_at: Option<String>,
    /// End of the update-eligibility window (ISO 8601)
    #[serde(default)]
    pub updates_until: Option<String>,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub device_count: u32,
    pub created_at: String,
}

impl User {
    /// A new free-tier account.
    pub fn new_free(email: String, created_at: String) -> Self {
        Self {
            email,
            name: None,
            license_tier: LicenseTier::Free,
            license_key: None,
            purchased_at: None,
            updates_until: None,
            stripe_customer_id: None,
            device_count: 0,
            created_at,
        }
    }
}

/// Public projection of a user returned by `/auth/me`.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub license_tier: LicenseTier,
    pub license_key: Option<String>,
    pub updates_until: Option<String>,
    pub device_count: u32,
}

impl PublicUser {
    pub fn from_user(id: &str, user: &User) -> Self {
        Self {
            id: id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            license_tier: user.license_tier,
            license_key: user.license_key.clone(),
            updates_until: user.updates_until.clone(),
            device_count: user.device_count,
        }
    }
}
