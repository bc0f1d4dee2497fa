// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Tier limit table and entitlement checks.
//!
//! The table is built once at startup and shared read-only through
//! `AppState`; nothing here touches the record store.

use crate::models::LicenseTier;
use crate::time_utils::parse_utc;
use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Marker for "no limit" in project and device counts.
pub const UNLIMITED: i32 = -1;

/// Capabilities and limits for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TierLimits {
    #[serde(rename = "projects")]
    pub max_projects: i32,
    #[serde(rename = "devices")]
    pub max_devices: i32,
    #[serde(rename = "cloudSync")]
    pub cloud_sync: bool,
    #[serde(rename = "pdfExport")]
    pub pdf_export: bool,
    #[serde(rename = "aiSummary")]
    pub ai_summary: bool,
    pub team: bool,
}

/// License validity on two independent axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseStatus {
    /// Any non-free tier
    pub valid: bool,
    /// `updates_until` is set and already past
    pub updates_expired: bool,
}

/// The static tier limit table.
#[derive(Debug, Clone)]
pub struct Entitlements {
    free: TierLimits,
    starter: TierLimits,
    pro: TierLimits,
    agency: TierLimits,
}

impl Default for Entitlements {
    fn default() -> Self {
        Self {
            free: TierLimits {
                max_projects: 3,
                max_devices: 1,
                cloud_sync: false,
                pdf_export: false,
                ai_summary: false,
                team: false,
            },
            starter: TierLimits {
                max_projects: 10,
                max_devices: 1,
                cloud_sync: true,
                pdf_export: true,
                ai_summary: false,
                team: false,
            },
            pro: TierLimits {
                max_projects: UNLIMITED,
                max_devices: 3,
                cloud_sync: true,
                pdf_export: true,
                ai_summary: true,
                team: false,
            },
            agency: TierLimits {
                max_projects: UNLIMITED,
                max_devices: UNLIMITED,
                cloud_sync: true,
                pdf_export: true,
                ai_summary: true,
                team: true,
            },
        }
    }
}

impl Entitlements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limits(&self, tier: LicenseTier) -> &TierLimits {
        match tier {
            LicenseTier::Free => &self.free,
            LicenseTier::Starter => &self.starter,
            LicenseTier::Pro => &self.pro,
            LicenseTier::Agency => &self.agency,
        }
    }

    /// Limits by tier name. Unrecognized names get the free tier.
    pub fn limits_for(&self, tier_name: &str) -> &TierLimits {
        self.limits(LicenseTier::parse_lenient(tier_name))
    }

    /// Whether another owned project may be created.
    pub fn can_create_project(&self, tier: LicenseTier, owned_projects: usize) -> bool {
        let max = self.limits(tier).max_projects;
        max == UNLIMITED || (max >= 0 && owned_projects < max as usize)
    }

    /// Cloud sync is a paid capability; free never syncs regardless of the table.
    pub fn can_sync(&self, tier: LicenseTier) -> bool {
        tier != LicenseTier::Free
    }

    pub fn license_status(
        &self,
        tier: LicenseTier,
        updates_until: Option<&str>,
        now: DateTime<Utc>,
    ) -> LicenseStatus {
        let updates_expired = updates_until
            .and_then(parse_utc)
            .is_some_and(|until| until < now);

        LicenseStatus {
            valid: tier != LicenseTier::Free,
            updates_expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_max_projects_per_tier() {
        let e = Entitlements::new();
        let maxes: Vec<i32> = ["free", "starter", "pro", "agency"]
            .iter()
            .map(|t| e.limits_for(t).max_projects)
            .collect();
        assert_eq!(maxes, vec![3, 10, -1, -1]);
    }

    #[test]
    fn test_unknown_tier_falls_back_to_free() {
        let e = Entitlements::new();
        assert_eq!(e.limits_for("enterprise"), e.limits(LicenseTier::Free));
        assert_eq!(e.limits_for(""), e.limits(LicenseTier::Free));
    }

    #[test]
    fn test_can_create_project() {
        let e = Entitlements::new();
        assert!(e.can_create_project(LicenseTier::Starter, 9));
        assert!(!e.can_create_project(LicenseTier::Starter, 10));
        assert!(e.can_create_project(LicenseTier::Pro, 10_000));
        assert!(e.can_create_project(LicenseTier::Free, 2));
        assert!(!e.can_create_project(LicenseTier::Free, 3));
    }

    #[test]
    fn test_only_free_cannot_sync() {
        let e = Entitlements::new();
        assert!(!e.can_sync(LicenseTier::Free));
        assert!(e.can_sync(LicenseTier::Starter));
        assert!(e.can_sync(LicenseTier::Pro));
        assert!(e.can_sync(LicenseTier::Agency));
    }

    #[test]
    fn test_license_status_axes_are_independent() {
        let e = Entitlements::new();
        let now = Utc::now();
        let past = crate::time_utils::format_utc_rfc3339(now - Duration::days(1));
        let future = crate::time_utils::format_utc_rfc3339(now + Duration::days(1));

        let status = e.license_status(LicenseTier::Pro, Some(&past), now);
        assert!(status.valid);
        assert!(status.updates_expired);

        let status = e.license_status(LicenseTier::Pro, Some(&future), now);
        assert!(status.valid && !status.updates_expired);

        let status = e.license_status(LicenseTier::Free, None, now);
        assert!(!status.valid && !status.updates_expired);
    }

    #[test]
    fn test_limits_wire_shape() {
        let e = Entitlements::new();
        let json = serde_json::to_value(e.limits(LicenseTier::Pro)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "projects": -1,
                "devices": 3,
                "cloudSync": true,
                "pdfExport": true,
                "aiSummary": true,
                "team": false
            })
        );
    }
}
