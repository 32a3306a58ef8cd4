pub mod routes;
pub mod models;
pub mod errors;

use std::sync::Arc;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::controller::ExecutionController;
use crate::workflow::TaskCatalog;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<ExecutionController>>,
    pub catalog: Arc<TaskCatalog>,
}

impl AppState {
    pub fn new(controller: ExecutionController, catalog: TaskCatalog) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            catalog: Arc::new(catalog),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/tasks", get(routes::tasks::list_tasks))
        .route("/api/layout", get(routes::layout::get_layout))
        .route(
            "/api/execution",
            post(routes::execution::start_execution)
                .get(routes::execution::get_execution)
                .delete(routes::execution::stop_execution),
        )
        .route("/api/execution/start", post(routes::execution::trigger_start))
        .route("/api/execution/upload", post(routes::execution::upload_document))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
