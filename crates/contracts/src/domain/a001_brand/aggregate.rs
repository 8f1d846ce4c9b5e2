use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор бренда
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandId(pub Uuid);

impl BrandId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for BrandId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(BrandId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Бренд (мерчант), чьи рекламные и торговые аккаунты агрегируются
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    #[serde(flatten)]
    pub base: BaseAggregate<BrandId>,

    /// Владелец бренда (пользователь системы)
    pub user_id: String,

    /// IANA-таймзона магазина (например, "Asia/Kolkata").
    /// Все дневные метрики по заказам бакетируются именно в ней.
    pub store_timezone: String,

    /// Код валюты магазина (информационно, без конверсии)
    pub currency: String,

    /// Бренд активен
    pub is_active: bool,
}

impl Brand {
    /// Создать новый бренд для вставки в БД
    pub fn new_for_insert(
        code: String,
        description: String,
        user_id: String,
        store_timezone: String,
        currency: String,
    ) -> Self {
        let base = BaseAggregate::new(BrandId::new_v4(), code, description);

        Self {
            base,
            user_id,
            store_timezone,
            currency,
            is_active: true,
        }
    }

    /// Получить ID как строку
    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    /// Таймзона магазина; UTC если значение не распознано
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.store_timezone
            .parse()
            .unwrap_or(chrono_tz::Tz::UTC)
    }

    /// Обновить данные из DTO
    pub fn update(&mut self, dto: &BrandDto) {
        self.base.code = dto.code.clone().unwrap_or_default();
        self.base.description = dto.description.clone();
        self.base.comment = dto.comment.clone();
        self.user_id = dto.user_id.clone();
        self.store_timezone = dto.store_timezone.clone();
        self.currency = dto.currency.clone();
        self.is_active = dto.is_active;
    }

    /// Валидация данных
    pub fn validate(&self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Наименование не может быть пустым".into());
        }
        if self.store_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!("Неизвестная таймзона: {}", self.store_timezone));
        }
        Ok(())
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Brand {
    type Id = BrandId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a001"
    }

    fn collection_name() -> &'static str {
        "brand"
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO для создания/обновления бренда
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandDto {
    pub id: Option<String>,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub user_id: String,
    pub store_timezone: String,
    pub currency: String,
    pub is_active: bool,
}
