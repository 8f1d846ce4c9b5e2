use crate::domain::a002_platform_connection::aggregate::PlatformType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Запрос на запуск синхронизации дневных метрик
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Бренд, для которого собираются метрики
    pub brand_id: String,

    /// Начало диапазона (включительно)
    pub start_date: NaiveDate,

    /// Конец диапазона (включительно; внутри пайплайна
    /// преобразуется в эксклюзивную верхнюю границу)
    pub end_date: NaiveDate,

    /// Платформа, добавленная после первичного бэкфилла.
    /// Если указана и за диапазон уже есть записи, прогон идет
    /// инкрементальным путем: к сохраненным значениям добавляется
    /// только вклад этой платформы.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_source: Option<PlatformType>,
}

impl SyncRequest {
    pub fn new(brand_id: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            brand_id: brand_id.into(),
            start_date,
            end_date,
            new_source: None,
        }
    }

    /// Валидация диапазона
    pub fn validate(&self) -> Result<(), String> {
        if self.brand_id.trim().is_empty() {
            return Err("brand_id не может быть пустым".into());
        }
        if self.end_date < self.start_date {
            return Err(format!(
                "Некорректный диапазон: {} > {}",
                self.start_date, self.end_date
            ));
        }
        Ok(())
    }
}
