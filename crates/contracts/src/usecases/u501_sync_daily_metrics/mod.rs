pub mod request;
pub mod response;

pub use request::SyncRequest;
pub use response::{SyncResponse, WindowOutcome};

use crate::usecases::common::UseCaseMetadata;

pub struct SyncDailyMetrics;

impl UseCaseMetadata for SyncDailyMetrics {
    fn usecase_index() -> &'static str {
        "u501"
    }

    fn usecase_name() -> &'static str {
        "sync_daily_metrics"
    }

    fn display_name() -> &'static str {
        "Синхронизация дневных метрик"
    }

    fn description() -> &'static str {
        "Сбор расходов Meta/Google и заказов Shopify в дневные метрики бренда"
    }
}
