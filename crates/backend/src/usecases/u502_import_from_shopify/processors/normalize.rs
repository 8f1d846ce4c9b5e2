use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::usecases::u502_import_from_shopify::shopify_api_client::{parse_money, ShopifyOrder};

/// Словарь для распознавания наложенного платежа по имени шлюза
/// (case-insensitive подстрока)
const COD_TOKENS: &[&str] = &["cod", "cash on delivery", "cash_on_delivery"];

/// Плоская расчетная проекция сырого заказа
#[derive(Debug, Clone)]
pub struct NormalizedOrder {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    /// Календарная дата заказа в таймзоне магазина
    pub local_date: NaiveDate,
    pub gross_sales: f64,
    pub total_taxes: f64,
    pub discount_amount: f64,
    pub total_price: f64,
    pub refund_amount: f64,
    pub refund_count: usize,
    pub is_cod: bool,
    pub is_prepaid: bool,
    pub cancelled: bool,
}

/// Преобразовать сырой заказ в расчетную форму.
///
/// Валовая выручка: сумма строк заказа за вычетом налога строки.
/// Если на заказе есть хотя бы один возврат, налог не вычитается и
/// не учитывается вовсе — исторически сложившееся бизнес-правило,
/// сохранено как есть, без "исправления".
pub fn normalize(order: &ShopifyOrder, tz: Tz) -> NormalizedOrder {
    let has_refunds = !order.refunds.is_empty();

    let gross_sales = if !order.line_items.nodes.is_empty() {
        order
            .line_items
            .nodes
            .iter()
            .map(|item| {
                let line_total = parse_money(&item.unit_price) * item.quantity as f64;
                if has_refunds {
                    line_total
                } else {
                    let line_tax: f64 =
                        item.tax_lines.iter().map(|t| parse_money(&t.price)).sum();
                    line_total - line_tax
                }
            })
            .sum()
    } else {
        // Заказ без строк: восстанавливаем из сабтотала и скидок
        parse_money(&order.subtotal_price) + parse_money(&order.total_discounts)
    };

    let total_taxes = if has_refunds {
        0.0
    } else {
        parse_money(&order.total_tax)
    };

    let refund_amount = compute_refund_amount(order);

    let cancelled = order.cancelled_at.is_some();
    let gateways = &order.payment_gateway_names;
    let is_cod_gateway = gateways.iter().any(|g| {
        let lower = g.to_lowercase();
        COD_TOKENS.iter().any(|token| lower.contains(token))
    });
    // Отмененные заказы не классифицируются по способу оплаты
    let (is_cod, is_prepaid) = if cancelled {
        (false, false)
    } else if is_cod_gateway {
        (true, false)
    } else {
        (false, !gateways.is_empty())
    };

    NormalizedOrder {
        order_id: order.id.clone(),
        created_at: order.created_at,
        local_date: order.created_at.with_timezone(&tz).date_naive(),
        gross_sales,
        total_taxes,
        discount_amount: parse_money(&order.total_discounts),
        total_price: parse_money(&order.total_price),
        refund_amount,
        refund_count: order.refunds.len(),
        is_cod,
        is_prepaid,
        cancelled,
    }
}

/// Сумма возврата заказа: по каждому возврату строки (сабтотал + налог),
/// доставка (сумма + налог) и корректировки заказа; суммируется по всем
/// возвратам заказа.
pub fn compute_refund_amount(order: &ShopifyOrder) -> f64 {
    order
        .refunds
        .iter()
        .map(|refund| {
            let lines: f64 = refund
                .refund_line_items
                .nodes
                .iter()
                .map(|l| parse_money(&l.subtotal) + parse_money(&l.total_tax))
                .sum();
            let shipping: f64 = refund
                .refund_shipping_lines
                .nodes
                .iter()
                .map(|s| parse_money(&s.amount) + parse_money(&s.tax_amount))
                .sum();
            let adjustments: f64 = refund
                .order_adjustments
                .nodes
                .iter()
                .map(|a| parse_money(&a.amount))
                .sum();
            lines + shipping + adjustments
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u502_import_from_shopify::shopify_api_client::{
        ShopifyLineItem, ShopifyOrderAdjustment, ShopifyRefund, ShopifyRefundLineItem,
        ShopifyRefundShippingLine, ShopifyTaxLine,
    };

    fn base_order() -> ShopifyOrder {
        serde_json::from_str(
            r#"{
                "id": "o1",
                "createdAt": "2024-01-03T10:00:00Z",
                "totalPrice": "105.00",
                "subtotalPrice": "100.00",
                "totalDiscounts": "10.00",
                "totalTax": "5.00",
                "paymentGatewayNames": []
            }"#,
        )
        .unwrap()
    }

    fn line(quantity: i32, unit_price: &str, tax: &str) -> ShopifyLineItem {
        ShopifyLineItem {
            quantity,
            unit_price: unit_price.to_string(),
            tax_lines: vec![ShopifyTaxLine {
                price: tax.to_string(),
            }],
        }
    }

    fn simple_refund(subtotal: &str, tax: &str) -> ShopifyRefund {
        ShopifyRefund {
            created_at: "2024-01-05T10:00:00Z".parse().unwrap(),
            refund_line_items: vec![ShopifyRefundLineItem {
                subtotal: subtotal.to_string(),
                total_tax: tax.to_string(),
            }]
            .into(),
            refund_shipping_lines: Vec::new().into(),
            order_adjustments: Vec::new().into(),
        }
    }

    #[test]
    fn test_gross_sales_excludes_tax_without_refunds() {
        let mut order = base_order();
        order.line_items = vec![line(2, "50.00", "5.00")].into();

        let n = normalize(&order, chrono_tz::Tz::UTC);
        assert_eq!(n.gross_sales, 95.0);
        assert_eq!(n.total_taxes, 5.0);
    }

    #[test]
    fn test_refund_presence_keeps_tax_in_gross_sales() {
        let mut order = base_order();
        order.line_items = vec![line(2, "50.00", "5.00")].into();
        order.refunds = vec![simple_refund("20.00", "1.00")];

        let n = normalize(&order, chrono_tz::Tz::UTC);
        // Налог не вычитается из валовой выручки и обнуляется в total_taxes
        assert_eq!(n.gross_sales, 100.0);
        assert_eq!(n.total_taxes, 0.0);
        assert_eq!(n.refund_amount, 21.0);
    }

    #[test]
    fn test_no_line_items_fallback() {
        let order = base_order();
        let n = normalize(&order, chrono_tz::Tz::UTC);
        // subtotal + discounts
        assert_eq!(n.gross_sales, 110.0);
    }

    #[test]
    fn test_refund_amount_sums_all_components() {
        let mut order = base_order();
        order.refunds = vec![
            ShopifyRefund {
                created_at: "2024-01-05T10:00:00Z".parse().unwrap(),
                refund_line_items: vec![ShopifyRefundLineItem {
                    subtotal: "20.00".to_string(),
                    total_tax: "2.00".to_string(),
                }]
                .into(),
                refund_shipping_lines: vec![ShopifyRefundShippingLine {
                    amount: "6.00".to_string(),
                    tax_amount: "0.50".to_string(),
                }]
                .into(),
                order_adjustments: vec![ShopifyOrderAdjustment {
                    amount: "-1.50".to_string(),
                }]
                .into(),
            },
            simple_refund("10.00", "1.00"),
        ];

        assert_eq!(compute_refund_amount(&order), 38.0);
    }

    #[test]
    fn test_zero_refunds_zero_amount() {
        let order = base_order();
        assert_eq!(compute_refund_amount(&order), 0.0);
    }

    #[test]
    fn test_cod_classification() {
        let mut order = base_order();
        order.payment_gateway_names = vec!["Cash on Delivery (COD)".to_string()];
        let n = normalize(&order, chrono_tz::Tz::UTC);
        assert!(n.is_cod);
        assert!(!n.is_prepaid);
    }

    #[test]
    fn test_prepaid_classification() {
        let mut order = base_order();
        order.payment_gateway_names = vec!["razorpay".to_string()];
        let n = normalize(&order, chrono_tz::Tz::UTC);
        assert!(!n.is_cod);
        assert!(n.is_prepaid);
    }

    #[test]
    fn test_no_gateways_neither_classification() {
        let order = base_order();
        let n = normalize(&order, chrono_tz::Tz::UTC);
        assert!(!n.is_cod);
        assert!(!n.is_prepaid);
    }

    #[test]
    fn test_cancelled_excluded_from_payment_classes() {
        let mut order = base_order();
        order.payment_gateway_names = vec!["cod".to_string()];
        order.cancelled_at = Some("2024-01-04T10:00:00Z".parse().unwrap());
        let n = normalize(&order, chrono_tz::Tz::UTC);
        assert!(n.cancelled);
        assert!(!n.is_cod);
        assert!(!n.is_prepaid);
    }

    #[test]
    fn test_local_date_uses_store_timezone() {
        let mut order = base_order();
        // 23:30 UTC 3 января = 05:00 IST 4 января
        order.created_at = "2024-01-03T23:30:00Z".parse().unwrap();
        let tz: chrono_tz::Tz = "Asia/Kolkata".parse().unwrap();
        let n = normalize(&order, tz);
        assert_eq!(n.local_date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }
}
