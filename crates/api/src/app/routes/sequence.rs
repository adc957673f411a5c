use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

/// Allocated invoice numbers that have no stored bill.
pub async fn gaps(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.sequence_audit(tenant.tenant_id()).await {
        Ok(audit) => Json(dto::SequenceGapsResponse::from(audit)).into_response(),
        Err(e) => errors::audit_error_to_response(e),
    }
}
