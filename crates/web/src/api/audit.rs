//! Audit log API endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use contentvc_core::db::AuditLogEntry;

use crate::api::status::{blocking, AppError};
use crate::api::tenant::Tenant;
use crate::AppState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct AuditListResponse {
    entries: Vec<AuditLogEntry>,
    total: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/audit", get(list_audit))
}

async fn list_audit(
    State(state): State<Arc<AppState>>,
    Tenant(tenant): Tenant,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditListResponse>, AppError> {
    let limit = query.limit.unwrap_or(50).min(500);

    let entries = blocking(move || {
        state
            .db
            .list_audit_log(tenant, limit)
            .map_err(|e| AppError::Internal(format!("database error: {}", e)))
    })
    .await?;

    let total = entries.len();
    Ok(Json(AuditListResponse { entries, total }))
}
