// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Clarity: backend API for the Clarity web app.
//!
//! This crate provides passwordless sign-in, license tiers and their
//! entitlements, license issuance from Stripe checkouts, and cloud sync of
//! project documents.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod tokens;
pub mod validation;

use config::Config;
use db::Database;
use services::{
    AuthFlow, CheckoutService, Entitlements, LicenseService, Mailer, NewsletterService,
    StripeClient, SyncService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub entitlements: Entitlements,
    pub auth: AuthFlow,
    pub licenses: LicenseService,
    pub sync: SyncService,
    pub checkout: CheckoutService,
    pub newsletter: NewsletterService,
}

impl AppState {
    /// Wire services over one store and one set of provider clients.
    pub fn new(config: Config, db: Database, mailer: Mailer, stripe: StripeClient) -> Self {
        let entitlements = Entitlements::new();
        Self {
            auth: AuthFlow::new(db.clone(), mailer.clone(), &config),
            licenses: LicenseService::new(db.clone(), mailer.clone(), entitlements.clone(), &config),
            sync: SyncService::new(db.clone(), entitlements.clone()),
            checkout: CheckoutService::new(stripe, &config),
            newsletter: NewsletterService::new(mailer, &config),
            entitlements,
            db,
            config,
        }
    }
}
