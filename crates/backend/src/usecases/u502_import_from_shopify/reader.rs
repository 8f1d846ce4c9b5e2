use async_trait::async_trait;
use contracts::domain::a002_platform_connection::aggregate::PlatformConnection;
use std::collections::HashSet;
use std::time::Duration;

use crate::shared::http::ApiError;
use crate::usecases::u501_sync_daily_metrics::chunker::DateWindow;

use super::processors::normalize::{normalize, NormalizedOrder};
use super::shopify_api_client::{build_window_query, OrdersPage, ShopifyApiClient};

/// Источник страниц заказов. Отделяет пагинацию от транспорта,
/// чтобы ридер можно было гонять в тестах на заранее заданных страницах.
#[async_trait]
pub trait OrderPageSource: Send + Sync {
    async fn fetch_page(
        &self,
        connection: &PlatformConnection,
        query_filter: &str,
        page_size: i32,
        cursor: Option<String>,
    ) -> Result<OrdersPage, ApiError>;
}

#[async_trait]
impl OrderPageSource for ShopifyApiClient {
    async fn fetch_page(
        &self,
        connection: &PlatformConnection,
        query_filter: &str,
        page_size: i32,
        cursor: Option<String>,
    ) -> Result<OrdersPage, ApiError> {
        self.fetch_orders_page(connection, query_filter, page_size, cursor)
            .await
    }
}

/// Результат чтения окна: нормализованные заказы и признак того,
/// что пагинация дошла до конца без ошибок
#[derive(Debug)]
pub struct ReadResult {
    pub orders: Vec<NormalizedOrder>,
    pub complete: bool,
}

/// Постраничный ридер заказов одного окна дат.
///
/// Дедуплицирует заказы по внешнему id внутри окна (повтор id на
/// соседних страницах — известный артефакт пагинации апстрима),
/// отфильтровывает тестовые заказы и выдерживает паузу между
/// страницами. Ошибка страницы после ретраев не роняет окно:
/// возвращается то, что успели прочитать.
pub struct OrderReader<'a, S: OrderPageSource> {
    source: &'a S,
    page_size: i32,
    page_delay: Duration,
}

impl<'a, S: OrderPageSource> OrderReader<'a, S> {
    pub fn new(source: &'a S, page_size: i32, page_delay: Duration) -> Self {
        Self {
            source,
            page_size,
            page_delay,
        }
    }

    /// Прочитать и нормализовать заказы окна
    pub async fn read_orders(
        &self,
        connection: &PlatformConnection,
        window: &DateWindow,
        tz: chrono_tz::Tz,
    ) -> ReadResult {
        let (start_utc, end_utc) = window.to_utc_range(tz);
        let query = build_window_query(start_utc, end_utc);

        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut orders: Vec<NormalizedOrder> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_number = 0usize;
        let mut complete = true;

        loop {
            page_number += 1;
            let page = match self
                .source
                .fetch_page(connection, &query, self.page_size, cursor.clone())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        "Order page {} failed for window {}..{}: {}. Returning {} orders read so far",
                        page_number,
                        window.start,
                        window.end,
                        e,
                        orders.len()
                    );
                    complete = false;
                    break;
                }
            };

            let batch_size = page.orders.len();
            for order in page.orders {
                if order.test {
                    tracing::debug!("Skipping test order {}", order.id);
                    continue;
                }
                if !seen_ids.insert(order.id.clone()) {
                    tracing::warn!(
                        "Duplicate order {} within window {}..{}, dropping",
                        order.id,
                        window.start,
                        window.end
                    );
                    continue;
                }
                orders.push(normalize(&order, tz));
            }

            tracing::debug!(
                "Window {}..{}: page {} gave {} orders ({} total)",
                window.start,
                window.end,
                page_number,
                batch_size,
                orders.len()
            );

            if !page.has_next_page {
                break;
            }
            // Защита от зацикливания: курсор обязан меняться
            if page.end_cursor.is_none() || page.end_cursor == cursor {
                tracing::warn!(
                    "Pagination cursor did not advance for window {}..{}, stopping",
                    window.start,
                    window.end
                );
                break;
            }
            cursor = page.end_cursor;

            tokio::time::sleep(self.page_delay).await;
        }

        ReadResult { orders, complete }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u502_import_from_shopify::shopify_api_client::ShopifyOrder;
    use chrono::NaiveDate;
    use contracts::domain::a002_platform_connection::aggregate::PlatformType;
    use std::sync::Mutex;

    struct ScriptedSource {
        pages: Mutex<Vec<Result<OrdersPage, ApiError>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<OrdersPage, ApiError>>) -> Self {
            Self {
                pages: Mutex::new(pages),
            }
        }
    }

    #[async_trait]
    impl OrderPageSource for ScriptedSource {
        async fn fetch_page(
            &self,
            _connection: &PlatformConnection,
            _query_filter: &str,
            _page_size: i32,
            _cursor: Option<String>,
        ) -> Result<OrdersPage, ApiError> {
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                panic!("ScriptedSource exhausted");
            }
            pages.remove(0)
        }
    }

    fn test_connection() -> PlatformConnection {
        let mut connection = PlatformConnection::new_for_insert(
            "SHP-1".to_string(),
            "Test shop".to_string(),
            "brand-1".to_string(),
            PlatformType::Shopify,
            "token".to_string(),
        );
        connection.shop_domain = Some("test.myshopify.com".to_string());
        connection
    }

    fn order(id: &str) -> ShopifyOrder {
        serde_json::from_str(&format!(
            r#"{{
                "id": "{}",
                "createdAt": "2024-01-03T10:00:00Z",
                "totalPrice": "100.00",
                "subtotalPrice": "100.00",
                "totalDiscounts": "0.00",
                "totalTax": "0.00",
                "paymentGatewayNames": ["razorpay"]
            }}"#,
            id
        ))
        .unwrap()
    }

    fn test_order(id: &str) -> ShopifyOrder {
        let mut o = order(id);
        o.test = true;
        o
    }

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        )
    }

    fn reader(source: &ScriptedSource) -> OrderReader<'_, ScriptedSource> {
        OrderReader::new(source, 50, Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_duplicate_across_pages_emitted_once() {
        let source = ScriptedSource::new(vec![
            Ok(OrdersPage {
                orders: vec![order("o1"), order("o2")],
                has_next_page: true,
                end_cursor: Some("c1".to_string()),
            }),
            Ok(OrdersPage {
                orders: vec![order("o2"), order("o3")],
                has_next_page: false,
                end_cursor: None,
            }),
        ]);

        let result = reader(&source)
            .read_orders(&test_connection(), &window(), chrono_tz::Tz::UTC)
            .await;

        assert!(result.complete);
        let ids: Vec<&str> = result.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2", "o3"]);
    }

    #[tokio::test]
    async fn test_test_orders_filtered() {
        let source = ScriptedSource::new(vec![Ok(OrdersPage {
            orders: vec![order("o1"), test_order("sandbox"), order("o2")],
            has_next_page: false,
            end_cursor: None,
        })]);

        let result = reader(&source)
            .read_orders(&test_connection(), &window(), chrono_tz::Tz::UTC)
            .await;

        assert_eq!(result.orders.len(), 2);
        assert!(result.orders.iter().all(|o| o.order_id != "sandbox"));
    }

    #[tokio::test]
    async fn test_partial_results_on_page_failure() {
        let source = ScriptedSource::new(vec![
            Ok(OrdersPage {
                orders: vec![order("o1"), order("o2")],
                has_next_page: true,
                end_cursor: Some("c1".to_string()),
            }),
            Err(ApiError::Upstream(503)),
        ]);

        let result = reader(&source)
            .read_orders(&test_connection(), &window(), chrono_tz::Tz::UTC)
            .await;

        assert_eq!(result.orders.len(), 2);
        assert!(!result.complete);
    }

    #[tokio::test]
    async fn test_stuck_cursor_stops_pagination() {
        let source = ScriptedSource::new(vec![
            Ok(OrdersPage {
                orders: vec![order("o1")],
                has_next_page: true,
                end_cursor: Some("c1".to_string()),
            }),
            Ok(OrdersPage {
                orders: vec![order("o2")],
                has_next_page: true,
                end_cursor: Some("c1".to_string()),
            }),
            // Эта страница не должна быть запрошена
            Ok(OrdersPage {
                orders: vec![order("o3")],
                has_next_page: false,
                end_cursor: None,
            }),
        ]);

        let result = reader(&source)
            .read_orders(&test_connection(), &window(), chrono_tz::Tz::UTC)
            .await;

        assert_eq!(result.orders.len(), 2);
    }
}
