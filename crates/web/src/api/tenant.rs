//! Tenant identity extraction.
//!
//! The tenant-context provider in front of this service authenticates the
//! caller and forwards its tenant id in the `X-Tenant-Id` header. Handlers
//! never infer the tenant from anything else.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use contentvc_core::models::TenantId;

use crate::api::status::AppError;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// The calling tenant, parsed from the `X-Tenant-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct Tenant(pub TenantId);

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_HEADER)
            .ok_or_else(|| AppError::BadRequest(format!("missing {TENANT_HEADER} header")))?;

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| Tenant(TenantId(id)))
            .ok_or_else(|| AppError::BadRequest(format!("invalid {TENANT_HEADER} header")))
    }
}
