//! Version history, creation, comparison and restore endpoints.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use contentvc_core::diff::{DiffResult, DiffSummary};
use contentvc_core::models::{ContentVersion, NewVersion, RestoreRecord};
use contentvc_core::restore::RestoreOutcome;

use crate::api::status::{blocking, AppError};
use crate::api::tenant::Tenant;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// History entry; bodies are fetched one version at a time.
#[derive(Serialize)]
struct VersionListItem {
    id: i64,
    version_number: i64,
    body_hash: String,
    author_id: i64,
    is_current: bool,
    tags: BTreeSet<String>,
    restored_from: Option<i64>,
    created_at: String,
}

impl From<ContentVersion> for VersionListItem {
    fn from(v: ContentVersion) -> Self {
        Self {
            id: v.id,
            version_number: v.version_number,
            body_hash: v.body_hash,
            author_id: v.author_id,
            is_current: v.is_current,
            tags: v.tags,
            restored_from: v.restored_from,
            created_at: v.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateVersionRequest {
    pub body: String,
    pub author_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct CompareQuery {
    pub a: i64,
    pub b: i64,
    /// `unified` adds a rendered patch to the response.
    pub format: Option<String>,
}

#[derive(Serialize)]
struct CompareResponse {
    diff: DiffResult,
    summary: DiffSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    unified: Option<String>,
}

#[derive(Deserialize)]
pub struct RestoreRequest {
    pub restored_by: i64,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/contents/{content_id}/versions",
            get(list_versions).post(create_version),
        )
        .route("/api/contents/{content_id}/versions/current", get(current_version))
        .route("/api/contents/{content_id}/restores", get(list_restores))
        .route("/api/versions/compare", get(compare_versions))
        .route("/api/versions/{id}", get(get_version))
        .route("/api/versions/{id}/restore", post(restore_version))
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(content_id): Path<i64>,
) -> Result<Json<Vec<VersionListItem>>, AppError> {
    let versions = blocking(move || Ok(state.control.list_versions(tenant, content_id)?)).await?;
    Ok(Json(versions.into_iter().map(VersionListItem::from).collect()))
}

async fn create_version(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(content_id): Path<i64>,
    Json(body): Json<CreateVersionRequest>,
) -> Result<(StatusCode, Json<ContentVersion>), AppError> {
    let new = NewVersion::new(content_id, body.body, body.author_id).with_tags(body.tags);
    let version = blocking(move || Ok(state.control.commit_version(tenant, new)?)).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

async fn current_version(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(content_id): Path<i64>,
) -> Result<Json<ContentVersion>, AppError> {
    let version = blocking(move || Ok(state.control.get_current(tenant, content_id)?)).await?;
    Ok(Json(version))
}

async fn list_restores(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(content_id): Path<i64>,
) -> Result<Json<Vec<RestoreRecord>>, AppError> {
    let records = blocking(move || Ok(state.control.list_restores(tenant, content_id)?)).await?;
    Ok(Json(records))
}

async fn get_version(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(id): Path<i64>,
) -> Result<Json<ContentVersion>, AppError> {
    let version = blocking(move || Ok(state.control.get_version(tenant, id)?)).await?;
    Ok(Json(version))
}

async fn compare_versions(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareResponse>, AppError> {
    let unified = match query.format.as_deref() {
        None | Some("json") => false,
        Some("unified") => true,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "invalid format '{}': must be json or unified",
                other
            )));
        }
    };

    let response = blocking(move || {
        let control = &state.control;
        let diff = control.compare(tenant, query.a, query.b)?;
        let unified = if unified {
            let from = control.get_version(tenant, query.a)?;
            let to = control.get_version(tenant, query.b)?;
            Some(control.diff_engine().unified(&from.body, &to.body)?)
        } else {
            None
        };
        Ok(CompareResponse {
            summary: diff.summary(),
            diff: DiffResult::clone(&diff),
            unified,
        })
    })
    .await?;

    Ok(Json(response))
}

async fn restore_version(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Path(id): Path<i64>,
    Json(body): Json<RestoreRequest>,
) -> Result<(StatusCode, Json<RestoreOutcome>), AppError> {
    let outcome = blocking(move || {
        Ok(state
            .control
            .restore(tenant, id, body.restored_by, body.notes)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
