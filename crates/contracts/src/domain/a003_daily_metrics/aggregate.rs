use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, EntityMetadata};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор записи дневных метрик
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DailyMetricsId(pub Uuid);

impl DailyMetricsId {
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

impl AggregateId for DailyMetricsId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(DailyMetricsId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Дневная запись метрик бренда. Уникальна по (brand_id, date).
///
/// Комбинирует расходы двух рекламных платформ и дневную выручку магазина;
/// производные поля total_spend / total_sales / gross_roi пересчитываются
/// при каждом прогоне пайплайна.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetrics {
    #[serde(flatten)]
    pub base: BaseAggregate<DailyMetricsId>,

    pub brand_id: String,

    /// Календарная дата в таймзоне магазина бренда
    pub date: NaiveDate,

    // Meta Ads
    pub meta_spend: f64,
    pub meta_revenue: f64,

    // Google Ads
    pub google_spend: f64,
    pub google_roas: f64,
    pub google_sales: f64,

    // Магазин (Shopify)
    pub gross_sales: f64,
    pub total_taxes: f64,
    pub discount_amount: f64,
    pub total_price: f64,
    pub refund_amount: f64,
    pub order_count: i32,
    pub cancelled_order_count: i32,
    pub cod_order_count: i32,
    pub prepaid_order_count: i32,

    // Производные
    /// total_price - refund_amount
    pub total_sales: f64,
    /// meta_spend + google_spend
    pub total_spend: f64,
    /// (meta_revenue + google_sales) / total_spend, 0 при нулевом расходе
    pub gross_roi: f64,
}

impl DailyMetrics {
    /// Создать новую запись для вставки в БД
    pub fn new_for_insert(brand_id: String, date: NaiveDate) -> Self {
        let short_brand: String = brand_id.chars().take(8).collect();
        let code = format!("DM-{}-{}", date.format("%Y-%m-%d"), short_brand);
        let description = format!("Дневные метрики {}", date.format("%Y-%m-%d"));
        let base = BaseAggregate::new(DailyMetricsId::new_v4(), code, description);

        Self {
            base,
            brand_id,
            date,
            meta_spend: 0.0,
            meta_revenue: 0.0,
            google_spend: 0.0,
            google_roas: 0.0,
            google_sales: 0.0,
            gross_sales: 0.0,
            total_taxes: 0.0,
            discount_amount: 0.0,
            total_price: 0.0,
            refund_amount: 0.0,
            order_count: 0,
            cancelled_order_count: 0,
            cod_order_count: 0,
            prepaid_order_count: 0,
            total_sales: 0.0,
            total_spend: 0.0,
            gross_roi: 0.0,
        }
    }

    /// Пересчитать производные поля из первичных
    pub fn recompute_derived(&mut self) {
        self.total_sales = self.total_price - self.refund_amount;
        self.total_spend = self.meta_spend + self.google_spend;
        self.gross_roi = if self.total_spend > 0.0 {
            (self.meta_revenue + self.google_sales) / self.total_spend
        } else {
            0.0
        };
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for DailyMetrics {
    type Id = DailyMetricsId;

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
        "a003"
    }

    fn collection_name() -> &'static str {
        "daily_metrics"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recompute_derived_zero_spend() {
        let mut m = DailyMetrics::new_for_insert("b1".to_string(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        m.meta_revenue = 150.0;
        m.google_sales = 60.0;
        m.recompute_derived();
        assert_eq!(m.total_spend, 0.0);
        assert_eq!(m.gross_roi, 0.0);
        assert!(m.gross_roi.is_finite());
    }

    #[test]
    fn test_recompute_derived() {
        let mut m = DailyMetrics::new_for_insert("b1".to_string(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        m.meta_spend = 100.0;
        m.google_spend = 20.0;
        m.meta_revenue = 150.0;
        m.google_sales = 60.0;
        m.total_price = 500.0;
        m.refund_amount = 40.0;
        m.recompute_derived();
        assert_eq!(m.total_spend, 120.0);
        assert_eq!(m.total_sales, 460.0);
        assert!((m.gross_roi - 210.0 / 120.0).abs() < 1e-9);
    }
}
