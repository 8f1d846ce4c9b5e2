use anyhow::Result;
use contracts::domain::a001_brand::aggregate::{Brand, BrandDto};
use uuid::Uuid;

use super::repository;

pub async fn list_all() -> Result<Vec<Brand>> {
    repository::list_active().await
}

pub async fn get_by_id(id: Uuid) -> Result<Option<Brand>> {
    repository::get_by_id(id).await
}

pub async fn create(dto: BrandDto) -> Result<Uuid> {
    let code = dto
        .code
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| format!("BR-{}", &Uuid::new_v4().to_string()[..8]));

    let mut brand = Brand::new_for_insert(
        code,
        dto.description.clone(),
        dto.user_id.clone(),
        dto.store_timezone.clone(),
        dto.currency.clone(),
    );
    brand.base.comment = dto.comment.clone();
    brand.is_active = dto.is_active;
    brand.validate().map_err(|e| anyhow::anyhow!(e))?;

    repository::insert(&brand).await
}

pub async fn update(dto: BrandDto) -> Result<()> {
    let id = dto
        .id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Brand id is required for update"))?;
    let uuid = Uuid::parse_str(id)?;

    let mut brand = repository::get_by_id(uuid)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Brand not found: {}", id))?;
    brand.update(&dto);
    brand.validate().map_err(|e| anyhow::anyhow!(e))?;
    brand.before_write();
    brand.base.metadata.increment_version();

    repository::update(&brand).await
}
