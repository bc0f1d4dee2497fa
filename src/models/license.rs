//! License issuance audit record.

use serde::{Deserialize, Serialize};

use crate::models::LicenseTier;

/// One processed checkout, keyed by the payment processor's session id.
///
/// Lets a redelivered webhook be acknowledged without issuing a second key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseEvent {
    pub checkout_session_id: String,
    pub user_id: String,
    pub email: String,
    pub tier: LicenseTier,
    pub license_key: String,
    pub processed_at: String,
}
