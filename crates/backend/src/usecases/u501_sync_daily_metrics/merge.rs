use chrono::NaiveDate;
use contracts::domain::a002_platform_connection::aggregate::PlatformType;
use contracts::domain::a003_daily_metrics::aggregate::DailyMetrics;
use std::collections::{BTreeMap, BTreeSet};

use crate::usecases::u502_import_from_shopify::processors::daily::CommerceDaily;
use crate::usecases::u503_import_from_meta::meta_api_client::MetaDaily;
use crate::usecases::u504_import_from_google::google_ads_client::GoogleDaily;

/// Режим слияния, выбираемый один раз на прогон.
///
/// Incremental включается, когда у бренда появился новый источник
/// после первичного бэкфилла и за диапазон уже есть записи: тогда к
/// сохраненным значениям добавляется только вклад нового источника.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    Incremental(PlatformType),
}

impl SyncMode {
    /// Нужно ли в этом режиме опрашивать данную платформу
    pub fn includes(&self, platform: PlatformType) -> bool {
        match self {
            Self::Full => true,
            Self::Incremental(source) => *source == platform,
        }
    }
}

/// Дневные агрегаты трех источников, накопленные по окнам
#[derive(Debug, Clone, Default)]
pub struct SourcePartials {
    pub meta: BTreeMap<NaiveDate, MetaDaily>,
    pub google: BTreeMap<NaiveDate, GoogleDaily>,
    pub commerce: BTreeMap<NaiveDate, CommerceDaily>,
}

impl SourcePartials {
    /// Влить агрегаты другого окна. Окна не пересекаются по датам,
    /// но на всякий случай совпавшие даты суммируются, а не затираются.
    pub fn absorb(&mut self, other: SourcePartials) {
        for (date, value) in other.meta {
            self.meta.entry(date).or_default().add(&value);
        }
        for (date, value) in other.google {
            self.google.entry(date).or_default().add(&value);
        }
        for (date, value) in other.commerce {
            self.commerce.entry(date).or_default().add(&value);
        }
    }

    /// Даты, по которым есть вклад хотя бы одного источника
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.meta
            .keys()
            .chain(self.google.keys())
            .chain(self.commerce.keys())
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty() && self.google.is_empty() && self.commerce.is_empty()
    }
}

fn apply_meta(record: &mut DailyMetrics, partial: &MetaDaily) {
    record.meta_spend = partial.spend;
    record.meta_revenue = partial.revenue;
}

fn apply_google(record: &mut DailyMetrics, partial: &GoogleDaily) {
    record.google_spend = partial.spend;
    record.google_roas = partial.roas;
    record.google_sales = partial.sales;
}

fn apply_commerce(record: &mut DailyMetrics, partial: &CommerceDaily) {
    record.gross_sales = partial.gross_sales;
    record.total_taxes = partial.total_taxes;
    record.discount_amount = partial.discount_amount;
    record.total_price = partial.total_price;
    record.refund_amount = partial.refund_amount;
    record.order_count = partial.order_count;
    record.cancelled_order_count = partial.cancelled_order_count;
    record.cod_order_count = partial.cod_order_count;
    record.prepaid_order_count = partial.prepaid_order_count;
}

/// Полное слияние: по каждой дате с вкладом хотя бы одного источника
/// строится запись; поля отсутствующих источников остаются нулевыми
/// (день с рекламным расходом без заказов дает запись с total_sales 0).
pub fn merge_full(brand_id: &str, partials: &SourcePartials) -> Vec<DailyMetrics> {
    partials
        .dates()
        .into_iter()
        .map(|date| {
            let mut record = DailyMetrics::new_for_insert(brand_id.to_string(), date);
            if let Some(meta) = partials.meta.get(&date) {
                apply_meta(&mut record, meta);
            }
            if let Some(google) = partials.google.get(&date) {
                apply_google(&mut record, google);
            }
            if let Some(commerce) = partials.commerce.get(&date) {
                apply_commerce(&mut record, commerce);
            }
            record.recompute_derived();
            record
        })
        .collect()
}

/// Инкрементальное слияние: к уже сохраненным записям добавляется
/// вклад только нового источника, производные поля пересчитываются.
/// Даты без сохраненной записи получают новую запись с одним источником.
pub fn merge_incremental(
    brand_id: &str,
    existing: Vec<DailyMetrics>,
    source: PlatformType,
    partials: &SourcePartials,
) -> Vec<DailyMetrics> {
    let mut by_date: BTreeMap<NaiveDate, DailyMetrics> =
        existing.into_iter().map(|r| (r.date, r)).collect();

    let source_dates: BTreeSet<NaiveDate> = match source {
        PlatformType::MetaAds => partials.meta.keys().copied().collect(),
        PlatformType::GoogleAds => partials.google.keys().copied().collect(),
        PlatformType::Shopify => partials.commerce.keys().copied().collect(),
    };

    let mut merged = Vec::with_capacity(source_dates.len());
    for date in source_dates {
        let mut record = by_date
            .remove(&date)
            .unwrap_or_else(|| DailyMetrics::new_for_insert(brand_id.to_string(), date));

        match source {
            PlatformType::MetaAds => {
                if let Some(meta) = partials.meta.get(&date) {
                    apply_meta(&mut record, meta);
                }
            }
            PlatformType::GoogleAds => {
                if let Some(google) = partials.google.get(&date) {
                    apply_google(&mut record, google);
                }
            }
            PlatformType::Shopify => {
                if let Some(commerce) = partials.commerce.get(&date) {
                    apply_commerce(&mut record, commerce);
                }
            }
        }

        record.recompute_derived();
        merged.push(record);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn partials_with_all_sources(d: NaiveDate) -> SourcePartials {
        let mut partials = SourcePartials::default();
        partials.meta.insert(
            d,
            MetaDaily {
                spend: 100.0,
                revenue: 150.0,
            },
        );
        partials.google.insert(
            d,
            GoogleDaily {
                spend: 20.0,
                roas: 3.0,
                sales: 60.0,
            },
        );
        partials.commerce.insert(
            d,
            CommerceDaily {
                gross_sales: 450.0,
                total_taxes: 25.0,
                discount_amount: 30.0,
                total_price: 500.0,
                refund_amount: 40.0,
                order_count: 10,
                cancelled_order_count: 1,
                cod_order_count: 4,
                prepaid_order_count: 5,
            },
        );
        partials
    }

    #[test]
    fn test_merge_full_combines_sources() {
        let d = date(2024, 1, 3);
        let records = merge_full("brand-1", &partials_with_all_sources(d));
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.date, d);
        assert_eq!(r.meta_spend, 100.0);
        assert_eq!(r.google_spend, 20.0);
        assert_eq!(r.total_spend, 120.0);
        assert_eq!(r.total_sales, 460.0);
        assert!((r.gross_roi - (150.0 + 60.0) / 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_full_is_idempotent() {
        let d = date(2024, 1, 3);
        let partials = partials_with_all_sources(d);
        let first = merge_full("brand-1", &partials);
        let second = merge_full("brand-1", &partials);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.date, b.date);
            assert_eq!(a.meta_spend, b.meta_spend);
            assert_eq!(a.meta_revenue, b.meta_revenue);
            assert_eq!(a.google_spend, b.google_spend);
            assert_eq!(a.google_sales, b.google_sales);
            assert_eq!(a.total_sales, b.total_sales);
            assert_eq!(a.total_spend, b.total_spend);
            assert_eq!(a.gross_roi, b.gross_roi);
        }
    }

    #[test]
    fn test_merge_ad_spend_without_orders() {
        let d = date(2024, 1, 3);
        let mut partials = SourcePartials::default();
        partials.meta.insert(
            d,
            MetaDaily {
                spend: 50.0,
                revenue: 0.0,
            },
        );

        let records = merge_full("brand-1", &partials);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.total_sales, 0.0);
        assert_eq!(r.order_count, 0);
        assert_eq!(r.total_spend, 50.0);
        assert_eq!(r.gross_roi, 0.0);
    }

    #[test]
    fn test_gross_roi_never_nan_or_inf() {
        let d = date(2024, 1, 3);
        let mut partials = SourcePartials::default();
        partials.commerce.insert(d, CommerceDaily::default());

        let records = merge_full("brand-1", &partials);
        assert_eq!(records[0].total_spend, 0.0);
        assert_eq!(records[0].gross_roi, 0.0);
        assert!(records[0].gross_roi.is_finite());
    }

    #[test]
    fn test_merge_incremental_adds_new_source_onto_existing() {
        let d = date(2024, 1, 3);
        let mut existing = DailyMetrics::new_for_insert("brand-1".to_string(), d);
        existing.meta_spend = 100.0;
        existing.meta_revenue = 150.0;
        existing.total_price = 500.0;
        existing.recompute_derived();
        assert_eq!(existing.total_sales, 500.0);

        let mut partials = SourcePartials::default();
        partials.google.insert(
            d,
            GoogleDaily {
                spend: 20.0,
                roas: 3.0,
                sales: 60.0,
            },
        );

        let merged = merge_incremental(
            "brand-1",
            vec![existing],
            PlatformType::GoogleAds,
            &partials,
        );
        assert_eq!(merged.len(), 1);
        let r = &merged[0];
        assert_eq!(r.meta_spend, 100.0);
        assert_eq!(r.google_spend, 20.0);
        assert_eq!(r.total_spend, 120.0);
        assert_eq!(r.total_sales, 500.0);
        assert!((r.gross_roi - (150.0 + 60.0) / 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_incremental_creates_record_for_new_dates() {
        let d = date(2024, 1, 4);
        let mut partials = SourcePartials::default();
        partials.google.insert(
            d,
            GoogleDaily {
                spend: 10.0,
                roas: 2.0,
                sales: 20.0,
            },
        );

        let merged = merge_incremental("brand-1", Vec::new(), PlatformType::GoogleAds, &partials);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].google_spend, 10.0);
        assert_eq!(merged[0].meta_spend, 0.0);
    }

    #[test]
    fn test_absorb_sums_same_date() {
        let d = date(2024, 1, 3);
        let mut a = SourcePartials::default();
        a.meta.insert(
            d,
            MetaDaily {
                spend: 10.0,
                revenue: 20.0,
            },
        );
        let mut b = SourcePartials::default();
        b.meta.insert(
            d,
            MetaDaily {
                spend: 5.0,
                revenue: 7.0,
            },
        );

        a.absorb(b);
        assert_eq!(a.meta[&d].spend, 15.0);
        assert_eq!(a.meta[&d].revenue, 27.0);
    }

    #[test]
    fn test_sync_mode_includes() {
        assert!(SyncMode::Full.includes(PlatformType::Shopify));
        assert!(SyncMode::Incremental(PlatformType::MetaAds).includes(PlatformType::MetaAds));
        assert!(!SyncMode::Incremental(PlatformType::MetaAds).includes(PlatformType::GoogleAds));
    }
}
