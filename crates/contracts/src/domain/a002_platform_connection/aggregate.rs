use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор подключения к платформе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformConnectionId(pub Uuid);

impl PlatformConnectionId {
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

impl AggregateId for PlatformConnectionId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(PlatformConnectionId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Типы внешних платформ
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlatformType {
    #[serde(rename = "meta_ads")]
    MetaAds,
    #[serde(rename = "google_ads")]
    GoogleAds,
    #[serde(rename = "shopify")]
    Shopify,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetaAds => "meta_ads",
            Self::GoogleAds => "google_ads",
            Self::Shopify => "shopify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "meta_ads" => Some(Self::MetaAds),
            "google_ads" => Some(Self::GoogleAds),
            "shopify" => Some(Self::Shopify),
            _ => None,
        }
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Подключение бренда к внешней платформе (рекламный кабинет или магазин)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConnection {
    #[serde(flatten)]
    pub base: BaseAggregate<PlatformConnectionId>,

    /// Бренд-владелец подключения
    pub brand_id: String,

    /// Платформа
    pub platform: PlatformType,

    /// Токен доступа (bearer)
    pub access_token: String,

    /// Refresh-токен (Google Ads)
    pub refresh_token: Option<String>,

    /// Идентификатор аккаунта: ad account id (Meta), customer id (Google)
    pub account_id: Option<String>,

    /// Домен магазина (Shopify, "*.myshopify.com")
    pub shop_domain: Option<String>,

    /// Подключение используется пайплайном
    pub is_active: bool,

    /// Тестовый режим (sandbox-аккаунт)
    pub test_mode: bool,
}

impl PlatformConnection {
    /// Создать новое подключение для вставки в БД
    pub fn new_for_insert(
        code: String,
        description: String,
        brand_id: String,
        platform: PlatformType,
        access_token: String,
    ) -> Self {
        let base = BaseAggregate::new(PlatformConnectionId::new_v4(), code, description);

        Self {
            base,
            brand_id,
            platform,
            access_token,
            refresh_token: None,
            account_id: None,
            shop_domain: None,
            is_active: true,
            test_mode: false,
        }
    }

    /// Получить ID как строку
    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    /// Обновить данные из DTO
    pub fn update(&mut self, dto: &PlatformConnectionDto) {
        self.base.code = dto.code.clone().unwrap_or_default();
        self.base.description = dto.description.clone();
        self.base.comment = dto.comment.clone();
        self.brand_id = dto.brand_id.clone();
        self.platform = dto.platform;
        self.access_token = dto.access_token.clone();
        self.refresh_token = dto.refresh_token.clone();
        self.account_id = dto.account_id.clone();
        self.shop_domain = dto.shop_domain.clone();
        self.is_active = dto.is_active;
        self.test_mode = dto.test_mode;
    }

    /// Валидация данных
    pub fn validate(&self) -> Result<(), String> {
        if self.access_token.trim().is_empty() {
            return Err("Access token не может быть пустым".into());
        }
        if self.brand_id.trim().is_empty() {
            return Err("Бренд должен быть указан".into());
        }
        match self.platform {
            PlatformType::Shopify => {
                if self.shop_domain.as_deref().unwrap_or("").trim().is_empty() {
                    return Err("Для Shopify требуется домен магазина".into());
                }
            }
            PlatformType::MetaAds | PlatformType::GoogleAds => {
                if self.account_id.as_deref().unwrap_or("").trim().is_empty() {
                    return Err("Для рекламной платформы требуется ID аккаунта".into());
                }
            }
        }
        Ok(())
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for PlatformConnection {
    type Id = PlatformConnectionId;

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
        "a002"
    }

    fn collection_name() -> &'static str {
        "platform_connection"
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO для создания/обновления подключения к платформе
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConnectionDto {
    pub id: Option<String>,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub brand_id: String,
    pub platform: PlatformType,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub account_id: Option<String>,
    pub shop_domain: Option<String>,
    pub is_active: bool,
    pub test_mode: bool,
}
