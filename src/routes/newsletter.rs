// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Newsletter signup route.

use crate::error::Result;
use crate::routes::extract::ValidatedJson;
use crate::services::ContactOutcome;
use crate::validation::EMAIL_RE;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/newsletter/subscribe", post(subscribe))
}

#[derive(Deserialize, Validate)]
pub struct SubscribeRequest {
    #[serde(default)]
    #[validate(regex(path = *EMAIL_RE, message = "Valid email is required"))]
    pub email: String,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    pub duplicate: bool,
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>> {
    let outcome = state.newsletter.subscribe(&body.email).await?;

    let (message, duplicate) = match outcome {
        ContactOutcome::Added => ("Subscribed! Check your email.", false),
        ContactOutcome::AlreadySubscribed => ("You're already subscribed!", true),
    };

    Ok(Json(SubscribeResponse {
        success: true,
        message: message.to_string(),
        duplicate,
    }))
}
