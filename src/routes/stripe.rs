// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Stripe routes: checkout creation and the signed webhook.

use crate::error::{AppError, Result};
use crate::routes::extract::ValidatedJson;
use crate::services::stripe::{verify_signature, CheckoutCompleted, WebhookEvent};
use crate::services::IssueOutcome;
use crate::validation::EMAIL_RE;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stripe/create-checkout", post(create_checkout))
        .route("/stripe/webhook", post(handle_webhook))
}

// ─── Checkout ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    #[validate(regex(path = *EMAIL_RE, message = "Invalid email"))]
    pub email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub success: bool,
    pub session_id: String,
    pub url: Option<String>,
}

async fn create_checkout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>> {
    let session = state
        .checkout
        .start(&body.tier, body.email.as_deref())
        .await?;

    Ok(Json(CreateCheckoutResponse {
        success: true,
        session_id: session.id,
        url: session.url,
    }))
}

// ─── Webhook ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Handle a Stripe event.
///
/// The signature is checked against the raw body before any parsing.
/// Issuance failures return 500 so Stripe redelivers the event.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".to_string()))?;

    let now = Utc::now();
    if let Err(e) = verify_signature(&body, signature, &state.config.stripe_webhook_secret, now) {
        tracing::warn!(error = %e, "Security Alert: Webhook signature verification failed");
        return Err(AppError::BadRequest(
            "Webhook signature verification failed".to_string(),
        ));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest("Invalid event payload".to_string())
    })?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Webhook event verified");

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let completed = CheckoutCompleted::from_session_object(&event.data.object);
            match state.licenses.issue(&completed, now).await {
                Ok(IssueOutcome::Issued { user_id, .. }) => {
                    tracing::info!(event_id = %event.id, user_id = %user_id, "Checkout fulfilled");
                }
                Ok(outcome) => {
                    tracing::info!(event_id = %event.id, outcome = ?outcome, "Checkout not fulfilled");
                }
                Err(e) => {
                    tracing::error!(event_id = %event.id, error = %e, "License issuance failed");
                    return Err(e);
                }
            }
        }
        "payment_intent.succeeded" => {
            // Fulfilled through checkout.session.completed
            tracing::debug!(event_id = %event.id, "Ignoring payment_intent.succeeded");
        }
        other => {
            tracing::info!(event_type = other, "Unhandled event type");
        }
    }

    Ok(Json(WebhookAck { received: true }))
}
