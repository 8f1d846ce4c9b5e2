use chrono::{DateTime, Utc};
use contracts::domain::a002_platform_connection::aggregate::PlatformConnection;
use serde::{Deserialize, Serialize};

use crate::shared::config::RetryConfig;
use crate::shared::http::{execute_with_retry, ApiError, RetryPolicy};

/// HTTP-клиент для Shopify Admin GraphQL API
pub struct ShopifyApiClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

/// GraphQL-запрос страницы заказов: фильтр по дате создания + курсор
const ORDERS_QUERY: &str = r#"
query OrdersByWindow($first: Int!, $after: String, $query: String) {
  orders(first: $first, after: $after, query: $query, sortKey: CREATED_AT) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      createdAt
      cancelledAt
      test
      totalPrice
      subtotalPrice
      totalDiscounts
      totalTax
      paymentGatewayNames
      lineItems { nodes { quantity unitPrice taxLines { price } } }
      refunds {
        createdAt
        refundLineItems { nodes { subtotal totalTax } }
        refundShippingLines { nodes { amount taxAmount } }
        orderAdjustments { nodes { amount } }
      }
    }
  }
}
"#;

impl ShopifyApiClient {
    pub fn new(retry: &RetryConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(retry.request_timeout())
                .build()
                .expect("Failed to create HTTP client"),
            policy: RetryPolicy::from_config(retry),
        }
    }

    fn endpoint(connection: &PlatformConnection) -> Result<String, ApiError> {
        let domain = connection
            .shop_domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ApiError::Fatal {
                status: 0,
                body: "Shopify connection has no shop domain".to_string(),
            })?;
        Ok(format!("https://{}/admin/api/2024-04/graphql.json", domain))
    }

    /// Получить одну страницу заказов (с ретраями по transient-ошибкам)
    pub async fn fetch_orders_page(
        &self,
        connection: &PlatformConnection,
        query_filter: &str,
        page_size: i32,
        cursor: Option<String>,
    ) -> Result<OrdersPage, ApiError> {
        execute_with_retry(self.policy, "shopify orders page", || {
            self.fetch_orders_page_once(connection, query_filter, page_size, cursor.clone())
        })
        .await
    }

    async fn fetch_orders_page_once(
        &self,
        connection: &PlatformConnection,
        query_filter: &str,
        page_size: i32,
        cursor: Option<String>,
    ) -> Result<OrdersPage, ApiError> {
        let url = Self::endpoint(connection)?;

        let request_body = GraphQlRequest {
            query: ORDERS_QUERY,
            variables: OrdersVariables {
                first: page_size,
                after: cursor,
                query: query_filter.to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("X-Shopify-Access-Token", &connection.access_token)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Shopify API request failed with status {}: {}", status, body);
            return Err(ApiError::from_status(status, body));
        }

        let body = response.text().await?;
        let parsed: OrdersQueryResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(500).collect();
            tracing::error!("Failed to parse Shopify orders response: {}. Body: {}", e, preview);
            ApiError::Malformed(format!("orders response: {}", e))
        })?;

        if let Some(errors) = parsed.errors {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                // GraphQL-level throttle приходит со статусом 200
                if message.to_lowercase().contains("throttled") {
                    return Err(ApiError::RateLimited);
                }
                return Err(ApiError::Fatal {
                    status: status.as_u16(),
                    body: message,
                });
            }
        }

        let connection_data = parsed
            .data
            .map(|d| d.orders)
            .ok_or_else(|| ApiError::Malformed("orders response without data".to_string()))?;

        Ok(OrdersPage {
            orders: connection_data.nodes,
            has_next_page: connection_data.page_info.has_next_page,
            end_cursor: connection_data.page_info.end_cursor,
        })
    }
}

/// Фильтр окна: включительное начало, эксклюзивный конец (UTC)
pub fn build_window_query(start_utc: DateTime<Utc>, end_utc: DateTime<Utc>) -> String {
    format!(
        "created_at:>='{}' AND created_at:<'{}'",
        start_utc.to_rfc3339(),
        end_utc.to_rfc3339()
    )
}

/// Одна страница заказов
#[derive(Debug, Clone)]
pub struct OrdersPage {
    pub orders: Vec<ShopifyOrder>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

// ============================================================================
// Request/Response structures для Shopify Admin GraphQL API
// ============================================================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: OrdersVariables,
}

#[derive(Debug, Serialize)]
struct OrdersVariables {
    first: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<String>,
    query: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OrdersQueryResponse {
    #[serde(default)]
    data: Option<OrdersData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OrdersData {
    orders: OrdersConnection,
}

#[derive(Debug, Clone, Deserialize)]
struct OrdersConnection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<ShopifyOrder>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor", default)]
    end_cursor: Option<String>,
}

/// Сырой заказ магазина, как его отдает API. Не мутируется после чтения;
/// идентичность — внешний id, он же ключ дедупликации.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyOrder {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "cancelledAt", default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test: bool,
    #[serde(rename = "totalPrice", default)]
    pub total_price: String,
    #[serde(rename = "subtotalPrice", default)]
    pub subtotal_price: String,
    #[serde(rename = "totalDiscounts", default)]
    pub total_discounts: String,
    #[serde(rename = "totalTax", default)]
    pub total_tax: String,
    #[serde(rename = "paymentGatewayNames", default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(rename = "lineItems", default)]
    pub line_items: NodeList<ShopifyLineItem>,
    #[serde(default)]
    pub refunds: Vec<ShopifyRefund>,
}

/// Обертка GraphQL-connection: { nodes: [...] }
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeList<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> From<Vec<T>> for NodeList<T> {
    fn from(nodes: Vec<T>) -> Self {
        Self { nodes }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyLineItem {
    #[serde(default)]
    pub quantity: i32,
    #[serde(rename = "unitPrice", default)]
    pub unit_price: String,
    #[serde(rename = "taxLines", default)]
    pub tax_lines: Vec<ShopifyTaxLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyTaxLine {
    #[serde(default)]
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyRefund {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "refundLineItems", default)]
    pub refund_line_items: NodeList<ShopifyRefundLineItem>,
    #[serde(rename = "refundShippingLines", default)]
    pub refund_shipping_lines: NodeList<ShopifyRefundShippingLine>,
    #[serde(rename = "orderAdjustments", default)]
    pub order_adjustments: NodeList<ShopifyOrderAdjustment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyRefundLineItem {
    #[serde(default)]
    pub subtotal: String,
    #[serde(rename = "totalTax", default)]
    pub total_tax: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyRefundShippingLine {
    #[serde(default)]
    pub amount: String,
    #[serde(rename = "taxAmount", default)]
    pub tax_amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyOrderAdjustment {
    #[serde(default)]
    pub amount: String,
}

/// Денежные суммы приходят строками; нераспознанное значение — 0
pub fn parse_money(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("100.50"), 100.5);
        assert_eq!(parse_money(" 7 "), 7.0);
        assert_eq!(parse_money(""), 0.0);
        assert_eq!(parse_money("n/a"), 0.0);
    }

    #[test]
    fn test_build_window_query_boundaries() {
        let start = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let end = "2024-01-08T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let query = build_window_query(start, end);
        assert!(query.contains("created_at:>='2024-01-01T00:00:00+00:00'"));
        assert!(query.contains("created_at:<'2024-01-08T00:00:00+00:00'"));
    }

    #[test]
    fn test_order_deserialization_defaults() {
        let json = r#"{
            "id": "gid://shopify/Order/1",
            "createdAt": "2024-01-03T10:00:00Z",
            "totalPrice": "105.00",
            "subtotalPrice": "100.00",
            "totalDiscounts": "0.00",
            "totalTax": "5.00",
            "paymentGatewayNames": ["razorpay"],
            "lineItems": { "nodes": [ { "quantity": 2, "unitPrice": "50.00", "taxLines": [ { "price": "5.00" } ] } ] }
        }"#;
        let order: ShopifyOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.line_items.nodes.len(), 1);
        assert!(order.refunds.is_empty());
        assert!(!order.test);
        assert!(order.cancelled_at.is_none());
    }
}
