// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Clarity API Server
//!
//! Passwordless sign-in, license tiers and cloud project sync for the
//! Clarity web app.

use clarity_api::{
    config::Config,
    db::Database,
    services::{Mailer, StripeClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Clarity API");

    let db = Database::connect(&config).await?;
    tracing::info!(backend = db.backend_name(), "Record store connected");

    let mailer = Mailer::new(config.brevo_api_key.clone());
    let stripe = StripeClient::new(config.stripe_secret_key.clone());

    let port = config.port;
    let state = Arc::new(AppState::new(config, db, mailer, stripe));

    // Build router
    let app = clarity_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clarity_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
