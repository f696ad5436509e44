//! Merge, conflict detection and conflict resolution endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use contentvc_core::conflict::{
    find_conflict_blocks, ConflictRegion, ConflictResolver, MergeOptions, MergeResult, Resolution,
};

use crate::api::status::{blocking, AppError};
use crate::api::tenant::Tenant;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct MergeRequest {
    pub ours_id: i64,
    pub theirs_id: i64,
    /// Common ancestor; without it the merge is two-way.
    pub base_id: Option<i64>,
    #[serde(default)]
    pub options: MergeOptions,
}

#[derive(Serialize)]
struct ConflictsResponse {
    conflicts: Vec<ConflictRegion>,
    total: usize,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub body: String,
    /// One resolution per conflict block, in order.
    #[serde(default)]
    pub resolutions: Vec<Resolution>,
    /// Applied to every block when `resolutions` is empty.
    pub resolution: Option<Resolution>,
}

#[derive(Serialize)]
struct ResolveResponse {
    body: String,
    resolved: usize,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/versions/merge", post(merge_versions))
        .route("/api/versions/conflicts", post(detect_conflicts))
        .route("/api/merge/resolve", post(resolve_conflicts))
}

async fn merge_versions(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Json(body): Json<MergeRequest>,
) -> Result<Json<MergeResult>, AppError> {
    let result = blocking(move || {
        Ok(state.control.merge_versions(
            tenant,
            body.ours_id,
            body.theirs_id,
            body.base_id,
            body.options,
        )?)
    })
    .await?;
    Ok(Json(result))
}

async fn detect_conflicts(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Json(body): Json<MergeRequest>,
) -> Result<Json<ConflictsResponse>, AppError> {
    let conflicts = blocking(move || {
        Ok(state
            .control
            .detect_conflicts(tenant, body.ours_id, body.theirs_id, body.base_id)?)
    })
    .await?;
    let total = conflicts.len();
    Ok(Json(ConflictsResponse { conflicts, total }))
}

/// Requires a tenant like every other endpoint; only the submitted body is
/// read.
async fn resolve_conflicts(
    Tenant(_tenant): Tenant,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let response = blocking(move || {
        let resolved = find_conflict_blocks(&body.body).len();
        let merged = match (body.resolutions.is_empty(), body.resolution) {
            (false, None) => ConflictResolver::resolve(&body.body, &body.resolutions)?,
            (true, Some(resolution)) => ConflictResolver::resolve_all(&body.body, &resolution)?,
            (true, None) => {
                return Err(AppError::BadRequest(
                    "either 'resolution' or 'resolutions' is required".into(),
                ));
            }
            (false, Some(_)) => {
                return Err(AppError::BadRequest(
                    "'resolution' and 'resolutions' are mutually exclusive".into(),
                ));
            }
        };
        Ok(ResolveResponse {
            body: merged,
            resolved,
        })
    })
    .await?;

    Ok(Json(response))
}
