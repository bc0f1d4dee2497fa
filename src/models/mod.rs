// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Data models for the application.

pub mod auth;
pub mod license;
pub mod project;
pub mod user;

pub use auth::{MagicLink, Session};
pub use license::LicenseEvent;
pub use project::{Project, ProjectSummary};
pub use user::{LicenseTier, PublicUser, User};
