use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::normalize::NormalizedOrder;

/// Дневной агрегат магазина по одной дате (в таймзоне магазина)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommerceDaily {
    pub gross_sales: f64,
    pub total_taxes: f64,
    pub discount_amount: f64,
    pub total_price: f64,
    pub refund_amount: f64,
    pub order_count: i32,
    pub cancelled_order_count: i32,
    pub cod_order_count: i32,
    pub prepaid_order_count: i32,
}

impl CommerceDaily {
    pub fn add(&mut self, other: &CommerceDaily) {
        self.gross_sales += other.gross_sales;
        self.total_taxes += other.total_taxes;
        self.discount_amount += other.discount_amount;
        self.total_price += other.total_price;
        self.refund_amount += other.refund_amount;
        self.order_count += other.order_count;
        self.cancelled_order_count += other.cancelled_order_count;
        self.cod_order_count += other.cod_order_count;
        self.prepaid_order_count += other.prepaid_order_count;
    }
}

/// Свернуть нормализованные заказы в дневные агрегаты.
///
/// Ключ — дата заказа в таймзоне магазина; бакетирование по UTC или
/// серверному времени дало бы сдвиг на сутки для вечерних заказов.
pub fn accumulate_daily(orders: &[NormalizedOrder]) -> BTreeMap<NaiveDate, CommerceDaily> {
    let mut daily: BTreeMap<NaiveDate, CommerceDaily> = BTreeMap::new();

    for order in orders {
        let bucket = daily.entry(order.local_date).or_default();
        bucket.gross_sales += order.gross_sales;
        bucket.total_taxes += order.total_taxes;
        bucket.discount_amount += order.discount_amount;
        bucket.total_price += order.total_price;
        bucket.refund_amount += order.refund_amount;
        bucket.order_count += 1;
        if order.cancelled {
            bucket.cancelled_order_count += 1;
        }
        if order.is_cod {
            bucket.cod_order_count += 1;
        }
        if order.is_prepaid {
            bucket.prepaid_order_count += 1;
        }
    }

    daily
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn normalized(
        id: &str,
        local_date: NaiveDate,
        total_price: f64,
        cancelled: bool,
        is_cod: bool,
    ) -> NormalizedOrder {
        NormalizedOrder {
            order_id: id.to_string(),
            created_at: "2024-01-03T10:00:00Z".parse::<DateTime<Utc>>().unwrap(),
            local_date,
            gross_sales: total_price,
            total_taxes: 0.0,
            discount_amount: 0.0,
            total_price,
            refund_amount: 0.0,
            refund_count: 0,
            is_cod,
            is_prepaid: !is_cod && !cancelled,
            cancelled,
        }
    }

    #[test]
    fn test_orders_grouped_by_local_date() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let orders = vec![
            normalized("o1", d1, 100.0, false, false),
            normalized("o2", d1, 50.0, false, true),
            normalized("o3", d2, 70.0, true, false),
        ];

        let daily = accumulate_daily(&orders);
        assert_eq!(daily.len(), 2);

        let day1 = &daily[&d1];
        assert_eq!(day1.order_count, 2);
        assert_eq!(day1.total_price, 150.0);
        assert_eq!(day1.cod_order_count, 1);
        assert_eq!(day1.prepaid_order_count, 1);
        assert_eq!(day1.cancelled_order_count, 0);

        let day2 = &daily[&d2];
        assert_eq!(day2.order_count, 1);
        assert_eq!(day2.cancelled_order_count, 1);
        assert_eq!(day2.cod_order_count, 0);
        assert_eq!(day2.prepaid_order_count, 0);
    }

    #[test]
    fn test_empty_input_empty_output() {
        assert!(accumulate_daily(&[]).is_empty());
    }
}
