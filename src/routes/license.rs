// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! License check route.

use crate::error::{AppError, Result};
use crate::routes::extract::ValidatedJson;
use crate::services::{LicenseCheck, LicenseLookup};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/license/check", post(check_license))
}

#[derive(Deserialize, Validate)]
pub struct LicenseCheckRequest {
    #[serde(default)]
    #[validate(length(max = 64))]
    pub license_key: Option<String>,
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: Option<String>,
}

async fn check_license(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<LicenseCheckRequest>,
) -> Result<Json<LicenseCheck>> {
    let lookup = LicenseLookup::from_parts(body.license_key.as_deref(), body.email.as_deref())
        .ok_or_else(|| AppError::BadRequest("License key or email required".to_string()))?;

    Ok(Json(state.licenses.check(&lookup, Utc::now()).await?))
}
