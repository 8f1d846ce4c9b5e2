use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Уведомление о завершении/провале прогона пайплайна
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncNotification {
    pub success: bool,
    pub message: String,
    pub brand_id: String,
    pub user_id: String,
}

/// Канал уведомлений (fire-and-forget).
///
/// Сам канал (pub/sub, UI-алерты) живет за пределами этого ядра;
/// здесь только интерфейс и логирующая реализация по умолчанию.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, notification: SyncNotification);
}

/// Реализация по умолчанию: публикация в серверный лог
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn publish(&self, notification: SyncNotification) {
        crate::shared::logger::log(
            "sync",
            &format!(
                "brand={} user={} success={} {}",
                notification.brand_id,
                notification.user_id,
                notification.success,
                notification.message
            ),
        );
    }
}
