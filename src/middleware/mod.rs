// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Middleware modules (authentication, security headers).

pub mod auth;
pub mod security;

pub use auth::{require_session, session_token, AuthUser, SESSION_COOKIE};
