// Ask CSV - upload a CSV, ask questions about it and chart the answers

pub mod config;
pub mod models;
pub mod types;
pub mod dataset;
pub mod agents;
pub mod llm;
pub mod charts;
pub mod session;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
