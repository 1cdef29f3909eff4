pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::captions::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Caption workbench API
        .route(
            "/api/v1/captions/variants",
            post(handlers::handle_generate_variants),
        )
        .route(
            "/api/v1/captions/evaluate",
            post(handlers::handle_evaluate_caption),
        )
        .with_state(state)
}
