use chrono::Utc;
use contracts::domain::a004_order_refund::aggregate::{OrderRefund, OrderRefundId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a004_order_refund")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub brand_id: String,
    pub order_id: String,
    pub order_created_at: chrono::DateTime<chrono::Utc>,
    pub amount: f64,
    pub refund_count: i32,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for OrderRefund {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        OrderRefund {
            base: BaseAggregate::with_metadata(
                OrderRefundId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            brand_id: m.brand_id,
            order_id: m.order_id,
            order_created_at: m.order_created_at,
            amount: m.amount,
            refund_count: m.refund_count,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub async fn get_by_brand_and_order(
    brand_id: &str,
    order_id: &str,
) -> anyhow::Result<Option<OrderRefund>> {
    let result = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::BrandId.eq(brand_id))
        .filter(Column::OrderId.eq(order_id))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Создать запись, если ее еще нет (идемпотентно по (brand_id, order_id))
pub async fn ensure_exists(
    brand_id: &str,
    order_id: &str,
    order_created_at: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<OrderRefund> {
    if let Some(existing) = get_by_brand_and_order(brand_id, order_id).await? {
        return Ok(existing);
    }

    let aggregate = OrderRefund::new_for_insert(
        brand_id.to_string(),
        order_id.to_string(),
        order_created_at,
    );
    let active = ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        brand_id: Set(aggregate.brand_id.clone()),
        order_id: Set(aggregate.order_id.clone()),
        order_created_at: Set(aggregate.order_created_at),
        amount: Set(aggregate.amount),
        refund_count: Set(aggregate.refund_count),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(conn()).await?;
    Ok(aggregate)
}

/// Перезаписать сумму и количество возвратов (latest-wins, не аддитивно)
pub async fn update_amount(
    brand_id: &str,
    order_id: &str,
    amount: f64,
    refund_count: i32,
) -> anyhow::Result<()> {
    let existing = get_by_brand_and_order(brand_id, order_id).await?;
    let Some(mut record) = existing else {
        anyhow::bail!(
            "Refund record not found for brand {} order {}",
            brand_id,
            order_id
        );
    };

    record.amount = amount;
    record.refund_count = refund_count;
    record.before_write();
    record.base.metadata.increment_version();

    let active = ActiveModel {
        id: Set(record.base.id.value().to_string()),
        code: Set(record.base.code.clone()),
        description: Set(record.base.description.clone()),
        comment: Set(record.base.comment.clone()),
        brand_id: Set(record.brand_id.clone()),
        order_id: Set(record.order_id.clone()),
        order_created_at: Set(record.order_created_at),
        amount: Set(record.amount),
        refund_count: Set(record.refund_count),
        is_deleted: Set(record.base.metadata.is_deleted),
        updated_at: Set(Some(record.base.metadata.updated_at)),
        version: Set(record.base.metadata.version),
        created_at: sea_orm::ActiveValue::NotSet,
    };
    active.update(conn()).await?;
    Ok(())
}
