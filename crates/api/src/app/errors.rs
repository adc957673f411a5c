use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use clinicbill_infra::audit::AuditError;
use clinicbill_infra::bill_store::RepositoryError;
use clinicbill_infra::sequence::SequenceError;
use clinicbill_infra::{BillingFailure, GenerateBillError};

fn failure_status(reason: &BillingFailure) -> StatusCode {
    match reason {
        BillingFailure::NotFound { .. } => StatusCode::NOT_FOUND,
        BillingFailure::InvalidAmount(_) | BillingFailure::Snapshot(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BillingFailure::Sequence(SequenceError::NotInitialized(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        BillingFailure::Sequence(SequenceError::StorageUnavailable(_))
        | BillingFailure::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        BillingFailure::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn generate_error_to_response(err: GenerateBillError) -> axum::response::Response {
    let status = failure_status(&err.reason);
    let mut body = json!({
        "error": err.kind(),
        "message": err.reason.to_string(),
        "stage": err.stage,
    });
    if let Some(number) = err.orphaned_invoice_number {
        body["orphaned_invoice_number"] = json!(number);
    }
    (status, axum::Json(body)).into_response()
}

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", msg)
        }
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            other.to_string(),
        ),
    }
}

pub fn audit_error_to_response(err: AuditError) -> axum::response::Response {
    match err {
        AuditError::Repository(e) => repository_error_to_response(e),
        AuditError::Sequence(SequenceError::StorageUnavailable(msg)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", msg)
        }
        AuditError::Sequence(e @ SequenceError::NotInitialized(_)) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "sequence_not_initialized",
            e.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
