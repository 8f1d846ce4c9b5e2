use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Итог обработки одного окна дат
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowOutcome {
    /// Начало окна (включительно)
    pub window_start: NaiveDate,
    /// Конец окна (эксклюзивно)
    pub window_end: NaiveDate,
    /// Окно обработано без деградаций
    pub complete: bool,
    /// Количество заказов, прочитанных в окне
    pub orders_read: usize,
    /// Деградации по источникам и ошибки окна
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<String>,
}

/// Результат прогона синхронизации
///
/// Вызывающая сторона всегда получает этот объект; ошибки уровня
/// запроса/источника/окна деградируют внутрь, а не пробрасываются.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    /// Итоги по окнам (отсортированы по началу окна)
    #[serde(default)]
    pub data: Vec<WindowOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_saved_entries: Option<usize>,
}

impl SyncResponse {
    /// Фатальный исход (предусловия не выполнены)
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Vec::new(),
            total_chunks: None,
            total_saved_entries: None,
        }
    }
}
