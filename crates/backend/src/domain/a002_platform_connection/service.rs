use anyhow::Result;
use contracts::domain::a002_platform_connection::aggregate::{
    PlatformConnection, PlatformConnectionDto, PlatformType,
};
use uuid::Uuid;

use super::repository;

/// Набор подключений бренда к трем платформам.
///
/// Shopify обязателен для прогона пайплайна; рекламные платформы
/// опциональны — их отсутствие дает нулевой вклад в метрики.
#[derive(Debug, Clone, Default)]
pub struct BrandCredentials {
    pub shopify: Option<PlatformConnection>,
    pub meta_ads: Option<PlatformConnection>,
    pub google_ads: Option<PlatformConnection>,
}

impl BrandCredentials {
    pub fn has_any_ad_source(&self) -> bool {
        self.meta_ads.is_some() || self.google_ads.is_some()
    }
}

/// Загрузить подключения бренда ко всем платформам
pub async fn load_for_brand(brand_id: &str) -> Result<BrandCredentials> {
    let mut credentials = BrandCredentials::default();

    for connection in repository::list_active_by_brand(brand_id).await? {
        match connection.platform {
            PlatformType::Shopify => credentials.shopify = Some(connection),
            PlatformType::MetaAds => credentials.meta_ads = Some(connection),
            PlatformType::GoogleAds => credentials.google_ads = Some(connection),
        }
    }

    Ok(credentials)
}

pub async fn get_by_id(id: Uuid) -> Result<Option<PlatformConnection>> {
    repository::get_by_id(id).await
}

pub async fn list_by_brand(brand_id: &str) -> Result<Vec<PlatformConnection>> {
    repository::list_active_by_brand(brand_id).await
}

/// Создать или обновить подключение бренда к платформе.
/// На платформу допускается одно активное подключение.
pub async fn upsert(dto: PlatformConnectionDto) -> Result<Uuid> {
    if let Some(mut existing) =
        repository::get_by_brand_and_platform(&dto.brand_id, dto.platform).await?
    {
        existing.update(&dto);
        existing.validate().map_err(|e| anyhow::anyhow!(e))?;
        existing.before_write();
        existing.base.metadata.increment_version();
        repository::update(&existing).await?;
        return Ok(existing.base.id.value());
    }

    let code = dto
        .code
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| format!("PC-{}", dto.platform.as_str().to_uppercase()));

    let mut connection = PlatformConnection::new_for_insert(
        code,
        dto.description.clone(),
        dto.brand_id.clone(),
        dto.platform,
        dto.access_token.clone(),
    );
    connection.base.comment = dto.comment.clone();
    connection.refresh_token = dto.refresh_token.clone();
    connection.account_id = dto.account_id.clone();
    connection.shop_domain = dto.shop_domain.clone();
    connection.is_active = dto.is_active;
    connection.test_mode = dto.test_mode;
    connection.validate().map_err(|e| anyhow::anyhow!(e))?;

    repository::insert(&connection).await
}
