use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // A001 Brand handlers
        .route(
            "/api/brand",
            get(handlers::a001_brand::list_all).post(handlers::a001_brand::upsert),
        )
        .route("/api/brand/:id", get(handlers::a001_brand::get_by_id))
        .route(
            "/api/brand/:id/connections",
            get(handlers::a002_platform_connection::list_by_brand),
        )
        // A002 Platform connection handlers
        .route(
            "/api/platform-connection",
            post(handlers::a002_platform_connection::upsert),
        )
        .route(
            "/api/platform-connection/:id",
            get(handlers::a002_platform_connection::get_by_id),
        )
        // U501 Sync daily metrics
        .route(
            "/api/sync/daily-metrics",
            post(handlers::u501_sync::run_sync),
        )
}
