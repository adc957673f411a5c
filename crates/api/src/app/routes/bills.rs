use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use clinicbill_billing::InvoiceNumber;
use clinicbill_core::BillId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bills))
        .route("/generate", post(generate_bill))
        .route("/by-number/:number", get(get_bill_by_number))
        .route("/:id", get(get_bill))
}

pub async fn generate_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    body: Result<Json<dto::GenerateBillRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", e.body_text()),
    };

    match services.generate_bill(body.into_command(tenant)).await {
        Ok(generated) => (
            StatusCode::CREATED,
            Json(dto::GeneratedBillResponse::from(generated)),
        )
            .into_response(),
        Err(e) => errors::generate_error_to_response(e),
    }
}

pub async fn list_bills(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.list_bills(tenant.tenant_id()).await {
        Ok(bills) => Json(dto::BillListResponse {
            count: bills.len(),
            bills,
        })
        .into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_bill(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let bill_id: BillId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid bill id"),
    };

    match services.get_bill(tenant.tenant_id(), bill_id).await {
        Ok(Some(bill)) => Json(bill).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "bill not found"),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_bill_by_number(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(number): Path<String>,
) -> axum::response::Response {
    let invoice_number = match number.parse::<u64>() {
        Ok(n) if n >= InvoiceNumber::FIRST.value() => InvoiceNumber::new(n),
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_invoice_number",
                "invoice number must be a positive integer",
            )
        }
    };

    match services.get_bill_by_number(tenant.tenant_id(), invoice_number).await {
        Ok(Some(bill)) => Json(bill).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "bill not found"),
        Err(e) => errors::repository_error_to_response(e),
    }
}
