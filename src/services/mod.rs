// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Services module - business logic layer.

pub mod auth;
pub mod checkout;
pub mod email;
pub mod entitlements;
pub mod license;
pub mod newsletter;
pub mod sessions;
pub mod stripe;
pub mod sync;

pub use auth::{AuthFlow, IssuedSession, VerifyError};
pub use checkout::CheckoutService;
pub use email::{ContactOutcome, Mailer};
pub use entitlements::{Entitlements, TierLimits};
pub use license::{IssueOutcome, LicenseCheck, LicenseLookup, LicenseService};
pub use newsletter::NewsletterService;
pub use stripe::{CheckoutCompleted, StripeClient};
pub use sync::{SaveProject, SyncService};
