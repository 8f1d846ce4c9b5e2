use chrono::{NaiveDate, Utc};
use contracts::domain::a003_daily_metrics::aggregate::{DailyMetrics, DailyMetricsId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_daily_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub brand_id: String,
    pub date: String, // stored as YYYY-MM-DD
    pub meta_spend: f64,
    pub meta_revenue: f64,
    pub google_spend: f64,
    pub google_roas: f64,
    pub google_sales: f64,
    pub gross_sales: f64,
    pub total_taxes: f64,
    pub discount_amount: f64,
    pub total_price: f64,
    pub refund_amount: f64,
    pub order_count: i32,
    pub cancelled_order_count: i32,
    pub cod_order_count: i32,
    pub prepaid_order_count: i32,
    pub total_sales: f64,
    pub total_spend: f64,
    pub gross_roi: f64,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DailyMetrics {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let date = NaiveDate::parse_from_str(&m.date, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive());

        DailyMetrics {
            base: BaseAggregate::with_metadata(
                DailyMetricsId(uuid),
                m.code,
                m.description,
                m.comment.clone(),
                metadata,
            ),
            brand_id: m.brand_id,
            date,
            meta_spend: m.meta_spend,
            meta_revenue: m.meta_revenue,
            google_spend: m.google_spend,
            google_roas: m.google_roas,
            google_sales: m.google_sales,
            gross_sales: m.gross_sales,
            total_taxes: m.total_taxes,
            discount_amount: m.discount_amount,
            total_price: m.total_price,
            refund_amount: m.refund_amount,
            order_count: m.order_count,
            cancelled_order_count: m.cancelled_order_count,
            cod_order_count: m.cod_order_count,
            prepaid_order_count: m.prepaid_order_count,
            total_sales: m.total_sales,
            total_spend: m.total_spend,
            gross_roi: m.gross_roi,
        }
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

fn active_model(aggregate: &DailyMetrics, id: String, is_update: bool) -> ActiveModel {
    ActiveModel {
        id: Set(id),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        brand_id: Set(aggregate.brand_id.clone()),
        date: Set(aggregate.date.format("%Y-%m-%d").to_string()),
        meta_spend: Set(aggregate.meta_spend),
        meta_revenue: Set(aggregate.meta_revenue),
        google_spend: Set(aggregate.google_spend),
        google_roas: Set(aggregate.google_roas),
        google_sales: Set(aggregate.google_sales),
        gross_sales: Set(aggregate.gross_sales),
        total_taxes: Set(aggregate.total_taxes),
        discount_amount: Set(aggregate.discount_amount),
        total_price: Set(aggregate.total_price),
        refund_amount: Set(aggregate.refund_amount),
        order_count: Set(aggregate.order_count),
        cancelled_order_count: Set(aggregate.cancelled_order_count),
        cod_order_count: Set(aggregate.cod_order_count),
        prepaid_order_count: Set(aggregate.prepaid_order_count),
        total_sales: Set(aggregate.total_sales),
        total_spend: Set(aggregate.total_spend),
        gross_roi: Set(aggregate.gross_roi),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
        created_at: if is_update {
            sea_orm::ActiveValue::NotSet
        } else {
            Set(Some(aggregate.base.metadata.created_at))
        },
    }
}

pub async fn get_by_brand_and_date(
    brand_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Option<DailyMetrics>> {
    let result = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::BrandId.eq(brand_id))
        .filter(Column::Date.eq(date.format("%Y-%m-%d").to_string()))
        .one(conn())
        .await?;
    Ok(result.map(Into::into))
}

/// Записи бренда в диапазоне дат [start, end) (end эксклюзивно)
pub async fn find_range(
    brand_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<DailyMetrics>> {
    let items = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::BrandId.eq(brand_id))
        .filter(Column::Date.gte(start.format("%Y-%m-%d").to_string()))
        .filter(Column::Date.lt(end.format("%Y-%m-%d").to_string()))
        .order_by_asc(Column::Date)
        .all(conn())
        .await?;
    Ok(items.into_iter().map(Into::into).collect())
}

/// Upsert по натуральному ключу (brand_id, date).
///
/// Повторный прогон с теми же входами полностью перезаписывает
/// вычисленные поля записи.
pub async fn upsert_by_brand_and_date(aggregate: &DailyMetrics) -> anyhow::Result<Uuid> {
    let existing = get_by_brand_and_date(&aggregate.brand_id, aggregate.date).await?;

    if let Some(existing_record) = existing {
        let existing_uuid = existing_record.base.id.value();
        let mut to_update = aggregate.clone();
        to_update.base.metadata.version = existing_record.base.metadata.version + 1;
        let active = active_model(&to_update, existing_uuid.to_string(), true);
        active.update(conn()).await?;
        Ok(existing_uuid)
    } else {
        let uuid = aggregate.base.id.value();
        let active = active_model(aggregate, uuid.to_string(), false);
        active.insert(conn()).await?;
        Ok(uuid)
    }
}

/// Сохранить набор дневных записей; возвращает количество записанных
pub async fn bulk_upsert(records: &[DailyMetrics]) -> anyhow::Result<usize> {
    let mut saved = 0usize;
    for record in records {
        upsert_by_brand_and_date(record).await?;
        saved += 1;
    }
    Ok(saved)
}
