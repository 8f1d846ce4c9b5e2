use axum::Json;
use contracts::usecases::u501_sync_daily_metrics::{SyncRequest, SyncResponse};
use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::shared::config;
use crate::shared::logger::LoggerRegistry;
use crate::shared::notify::LogChannel;
use crate::usecases::u501_sync_daily_metrics::executor::SyncExecutor;

static EXECUTOR: Lazy<SyncExecutor> = Lazy::new(|| {
    let pipeline = config::load_config()
        .map(|c| c.pipeline)
        .unwrap_or_default();
    SyncExecutor::new(
        pipeline,
        Arc::new(LogChannel),
        Arc::new(LoggerRegistry::new("target/logs/daily")),
    )
});

/// POST /api/sync/daily-metrics
///
/// Тонкая оболочка над executor'ом: валидация и маршрутизация живут
/// снаружи ядра, прогон всегда отвечает объектом результата
pub async fn run_sync(Json(request): Json<SyncRequest>) -> Json<SyncResponse> {
    Json(EXECUTOR.run(request).await)
}
