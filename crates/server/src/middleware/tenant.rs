//! Tenant resolution

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use hims_core::{Outcome, TenantId};

/// Header naming the tenant (hospital) a request acts on
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Resolve `X-Tenant-ID` into a `TenantId` request extension.
///
/// Every `/api` handler extracts `Extension<TenantId>`, so a request that
/// gets past this middleware is always scoped to exactly one tenant.
pub async fn tenant_middleware(mut request: Request<Body>, next: Next) -> Response {
    let raw = request
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    let tenant = match raw {
        Some(raw) => TenantId::parse(raw),
        None => {
            let outcome = Outcome::invalid("Missing X-Tenant-ID header");
            return (StatusCode::BAD_REQUEST, Json(outcome)).into_response();
        }
    };

    match tenant {
        Ok(tenant) => {
            request.extensions_mut().insert(tenant);
            next.run(request).await
        }
        Err(e) => (StatusCode::BAD_REQUEST, Json(e.to_outcome())).into_response(),
    }
}
