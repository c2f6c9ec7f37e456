pub mod todos;

use axum::{http::StatusCode, routing::get, Router};

use crate::http::types::ApiError;

pub fn app(router: Router) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(router)
        .fallback(|| async { ApiError { status: StatusCode::NOT_FOUND, message: "no such route".into() } })
}
