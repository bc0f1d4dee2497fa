// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Project sync routes (require a session).

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::routes::extract::ValidatedJson;
use crate::services::sync::{LoadedProject, ProjectList};
use crate::services::SaveProject;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// Sync routes. The session middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/list", get(list_projects))
        .route("/sync/load", get(load_project))
        .route("/sync/save", post(save_project))
}

// ─── List ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ListResponse {
    pub success: bool,
    #[serde(flatten)]
    pub list: ProjectList,
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ListResponse>> {
    let list = state.sync.list(&user.0).await?;
    Ok(Json(ListResponse {
        success: true,
        list,
    }))
}

// ─── Load ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoadParams {
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Serialize)]
pub struct LoadResponse {
    pub success: bool,
    pub project: LoadedProject,
}

async fn load_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LoadParams>,
) -> Result<Json<LoadResponse>> {
    let project_id = params.project_id.unwrap_or_default();
    let project = state.sync.load(&user.0, &project_id).await?;
    Ok(Json(LoadResponse {
        success: true,
        project,
    }))
}

// ─── Save ────────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SaveRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub project_id: String,
    pub message: String,
}

async fn save_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<SaveRequest>,
) -> Result<Json<SaveResponse>> {
    let request = SaveProject {
        project_id: body.project_id,
        name: body.name,
        data: body.data,
    };
    let outcome = state.sync.save(&user.0, request, Utc::now()).await?;

    Ok(Json(SaveResponse {
        success: true,
        project_id: outcome.project_id,
        message: if outcome.created {
            "Project saved".to_string()
        } else {
            "Project updated".to_string()
        },
    }))
}
