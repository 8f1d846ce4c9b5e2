use chrono::NaiveDate;
use contracts::domain::a002_platform_connection::aggregate::PlatformConnection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::config::RetryConfig;
use crate::shared::http::{execute_with_retry, ApiError, RetryPolicy};
use crate::usecases::u501_sync_daily_metrics::chunker::DateWindow;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// Типы действий, которые считаются покупками при расчете выручки
const PURCHASE_ACTION_TYPES: &[&str] = &["omni_purchase", "purchase", "offsite_conversion.fb_pixel_purchase"];

/// Дневной агрегат Meta Ads: расход и атрибуцированная выручка
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaDaily {
    pub spend: f64,
    pub revenue: f64,
}

impl MetaDaily {
    pub fn add(&mut self, other: &MetaDaily) {
        self.spend += other.spend;
        self.revenue += other.revenue;
    }
}

/// HTTP-клиент для Meta Marketing API (insights)
pub struct MetaApiClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl MetaApiClient {
    pub fn new(retry: &RetryConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(retry.request_timeout())
                .build()
                .expect("Failed to create HTTP client"),
            policy: RetryPolicy::from_config(retry),
        }
    }

    /// Дневные инсайты рекламного кабинета за окно дат.
    ///
    /// time_increment=1 дает строку на каждый день; окно передается
    /// включительными датами, поэтому эксклюзивный конец сдвигается
    /// на день назад.
    pub async fn fetch_daily_insights(
        &self,
        connection: &PlatformConnection,
        window: &DateWindow,
    ) -> Result<BTreeMap<NaiveDate, MetaDaily>, ApiError> {
        let account_id = connection
            .account_id
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ApiError::Fatal {
                status: 0,
                body: "Meta connection has no ad account id".to_string(),
            })?;

        let until = window.end.pred_opt().unwrap_or(window.start);
        let time_range = serde_json::json!({
            "since": window.start.format("%Y-%m-%d").to_string(),
            "until": until.format("%Y-%m-%d").to_string(),
        })
        .to_string();

        let url = format!("{}/act_{}/insights", GRAPH_API_BASE, account_id);
        let mut daily: BTreeMap<NaiveDate, MetaDaily> = BTreeMap::new();
        let mut after: Option<String> = None;

        loop {
            let page = execute_with_retry(self.policy, "meta insights page", || {
                self.fetch_insights_page(connection, &url, &time_range, after.clone())
            })
            .await?;

            for row in page.data {
                let Ok(date) = NaiveDate::parse_from_str(&row.date_start, "%Y-%m-%d") else {
                    tracing::warn!("Meta insights row with bad date_start: {}", row.date_start);
                    continue;
                };
                let revenue: f64 = row
                    .action_values
                    .iter()
                    .filter(|a| PURCHASE_ACTION_TYPES.contains(&a.action_type.as_str()))
                    .map(|a| a.value.parse::<f64>().unwrap_or(0.0))
                    .sum();
                let entry = daily.entry(date).or_default();
                entry.spend += row.spend.parse::<f64>().unwrap_or(0.0);
                entry.revenue += revenue;
            }

            let next_cursor = page.paging.and_then(|p| {
                if p.next.is_some() {
                    p.cursors.map(|c| c.after)
                } else {
                    None
                }
            });
            match next_cursor {
                Some(cursor) if Some(&cursor) != after.as_ref() => after = Some(cursor),
                _ => break,
            }
        }

        Ok(daily)
    }

    async fn fetch_insights_page(
        &self,
        connection: &PlatformConnection,
        url: &str,
        time_range: &str,
        after: Option<String>,
    ) -> Result<InsightsResponse, ApiError> {
        #[derive(Serialize)]
        struct QueryParams<'a> {
            fields: &'a str,
            time_increment: i32,
            time_range: &'a str,
            limit: i32,
            access_token: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            after: Option<String>,
        }

        let query = QueryParams {
            fields: "spend,action_values",
            time_increment: 1,
            time_range,
            limit: 100,
            access_token: &connection.access_token,
            after,
        };

        let response = self.client.get(url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Meta insights request failed with status {}: {}", status, body);
            return Err(ApiError::from_status(status, body));
        }

        let body = response.text().await?;
        serde_json::from_str::<InsightsResponse>(&body).map_err(|e| {
            let preview: String = body.chars().take(500).collect();
            tracing::error!("Failed to parse Meta insights response: {}. Body: {}", e, preview);
            ApiError::Malformed(format!("insights response: {}", e))
        })
    }
}

// ============================================================================
// Response structures для Meta Marketing API
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsResponse {
    #[serde(default)]
    pub data: Vec<InsightsRow>,
    #[serde(default)]
    pub paging: Option<InsightsPaging>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsRow {
    #[serde(default)]
    pub spend: String,
    #[serde(default)]
    pub date_start: String,
    #[serde(default)]
    pub action_values: Vec<ActionValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionValue {
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsPaging {
    #[serde(default)]
    pub cursors: Option<InsightsCursors>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsCursors {
    #[serde(default)]
    pub after: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insights_response_parsing() {
        let json = r#"{
            "data": [
                {
                    "spend": "120.55",
                    "date_start": "2024-01-03",
                    "date_stop": "2024-01-03",
                    "action_values": [
                        {"action_type": "omni_purchase", "value": "300.10"},
                        {"action_type": "link_click", "value": "15.00"}
                    ]
                }
            ],
            "paging": {"cursors": {"before": "a", "after": "b"}}
        }"#;
        let parsed: InsightsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].spend, "120.55");
        let paging = parsed.paging.unwrap();
        assert!(paging.next.is_none());
        assert_eq!(paging.cursors.unwrap().after, "b");
    }

    #[test]
    fn test_purchase_action_filter() {
        let row: InsightsRow = serde_json::from_str(
            r#"{
                "spend": "10",
                "date_start": "2024-01-03",
                "action_values": [
                    {"action_type": "purchase", "value": "50.0"},
                    {"action_type": "add_to_cart", "value": "99.0"}
                ]
            }"#,
        )
        .unwrap();
        let revenue: f64 = row
            .action_values
            .iter()
            .filter(|a| PURCHASE_ACTION_TYPES.contains(&a.action_type.as_str()))
            .map(|a| a.value.parse::<f64>().unwrap_or(0.0))
            .sum();
        assert_eq!(revenue, 50.0);
    }
}
