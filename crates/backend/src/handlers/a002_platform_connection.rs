use axum::{extract::Path, Json};
use serde_json::json;

use crate::domain::a002_platform_connection;

/// GET /api/brand/:id/connections
pub async fn list_by_brand(
    Path(brand_id): Path<String>,
) -> Result<
    Json<Vec<contracts::domain::a002_platform_connection::aggregate::PlatformConnection>>,
    axum::http::StatusCode,
> {
    match a002_platform_connection::service::list_by_brand(&brand_id).await {
        Ok(v) => Ok(Json(v)),
        Err(_) => Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/platform-connection/:id
pub async fn get_by_id(
    Path(id): Path<String>,
) -> Result<
    Json<contracts::domain::a002_platform_connection::aggregate::PlatformConnection>,
    axum::http::StatusCode,
> {
    let uuid = match uuid::Uuid::parse_str(&id) {
        Ok(uuid) => uuid,
        Err(_) => return Err(axum::http::StatusCode::BAD_REQUEST),
    };
    match a002_platform_connection::service::get_by_id(uuid).await {
        Ok(Some(v)) => Ok(Json(v)),
        Ok(None) => Err(axum::http::StatusCode::NOT_FOUND),
        Err(_) => Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// POST /api/platform-connection
pub async fn upsert(
    Json(dto): Json<contracts::domain::a002_platform_connection::aggregate::PlatformConnectionDto>,
) -> Result<Json<serde_json::Value>, axum::http::StatusCode> {
    match a002_platform_connection::service::upsert(dto).await {
        Ok(id) => Ok(Json(json!({"id": id.to_string()}))),
        Err(e) => {
            tracing::error!("Platform connection upsert failed: {:#}", e);
            Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
