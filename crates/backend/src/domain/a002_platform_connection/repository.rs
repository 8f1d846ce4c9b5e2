use chrono::Utc;
use contracts::domain::a002_platform_connection::aggregate::{
    PlatformConnection, PlatformConnectionId, PlatformType,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_platform_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub brand_id: String,
    pub platform: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub account_id: Option<String>,
    pub shop_domain: Option<String>,
    pub is_active: bool,
    pub test_mode: bool,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PlatformConnection {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        // Колонка platform пишется только из PlatformType::as_str
        let platform = PlatformType::parse(&m.platform).unwrap_or(PlatformType::Shopify);

        PlatformConnection {
            base: BaseAggregate::with_metadata(
                PlatformConnectionId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            brand_id: m.brand_id,
            platform,
            access_token: m.access_token,
            refresh_token: m.refresh_token,
            account_id: m.account_id,
            shop_domain: m.shop_domain,
            is_active: m.is_active,
            test_mode: m.test_mode,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<PlatformConnection>> {
    let result = Entity::find_by_id(id.to_string()).one(conn()).await?;
    Ok(result.map(Into::into))
}

/// Все активные подключения бренда
pub async fn list_active_by_brand(brand_id: &str) -> anyhow::Result<Vec<PlatformConnection>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::IsActive.eq(true))
        .filter(Column::BrandId.eq(brand_id))
        .all(conn())
        .await?;
    Ok(items.into_iter().map(Into::into).collect())
}

/// Активное подключение бренда к конкретной платформе
pub async fn get_by_brand_and_platform(
    brand_id: &str,
    platform: PlatformType,
) -> anyhow::Result<Option<PlatformConnection>> {
    let result = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::IsActive.eq(true))
        .filter(Column::BrandId.eq(brand_id))
        .filter(Column::Platform.eq(platform.as_str()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

pub async fn insert(aggregate: &PlatformConnection) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        brand_id: Set(aggregate.brand_id.clone()),
        platform: Set(aggregate.platform.as_str().to_string()),
        access_token: Set(aggregate.access_token.clone()),
        refresh_token: Set(aggregate.refresh_token.clone()),
        account_id: Set(aggregate.account_id.clone()),
        shop_domain: Set(aggregate.shop_domain.clone()),
        is_active: Set(aggregate.is_active),
        test_mode: Set(aggregate.test_mode),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(uuid)
}

pub async fn update(aggregate: &PlatformConnection) -> anyhow::Result<()> {
    let id = aggregate.base.id.value().to_string();
    let active = ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        brand_id: Set(aggregate.brand_id.clone()),
        platform: Set(aggregate.platform.as_str().to_string()),
        access_token: Set(aggregate.access_token.clone()),
        refresh_token: Set(aggregate.refresh_token.clone()),
        account_id: Set(aggregate.account_id.clone()),
        shop_domain: Set(aggregate.shop_domain.clone()),
        is_active: Set(aggregate.is_active),
        test_mode: Set(aggregate.test_mode),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
