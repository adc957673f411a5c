use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use clinicbill_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

/// Header carrying the caller's clinic id, set by the upstream gateway after it
/// authenticated the user.
pub const TENANT_HEADER: &str = "x-tenant-id";

pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(id) => id,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, "missing_tenant", message),
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));

    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, &'static str> {
    let header = headers
        .get(TENANT_HEADER)
        .ok_or("X-Tenant-Id header is required")?;

    let value = header
        .to_str()
        .map_err(|_| "X-Tenant-Id header is not valid text")?
        .trim();

    value.parse().map_err(|_| "X-Tenant-Id header is not a valid tenant id")
}
