use axum::{routing::get, Router};

pub mod bills;
pub mod sequence;
pub mod system;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/bills", bills::router())
        .route("/sequence/gaps", get(sequence::gaps))
}
