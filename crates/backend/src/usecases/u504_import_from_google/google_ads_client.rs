use chrono::NaiveDate;
use contracts::domain::a002_platform_connection::aggregate::PlatformConnection;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::shared::config::RetryConfig;
use crate::shared::http::{execute_with_retry, ApiError, RetryPolicy};
use crate::usecases::u501_sync_daily_metrics::chunker::DateWindow;

const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const ADS_API_BASE: &str = "https://googleads.googleapis.com/v16";

/// Сколько раз пересоздаем токен по auth-ошибке, прежде чем сдаться
const MAX_TOKEN_REFRESHES: u32 = 2;

/// Пауза перед повторной попыткой после обновления токена
const REFRESH_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Дневной агрегат Google Ads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoogleDaily {
    pub spend: f64,
    pub roas: f64,
    pub sales: f64,
}

impl GoogleDaily {
    pub fn add(&mut self, other: &GoogleDaily) {
        self.spend += other.spend;
        self.sales += other.sales;
        self.roas = if self.spend > 0.0 {
            self.sales / self.spend
        } else {
            0.0
        };
    }
}

/// Клиент Google Ads API с явным управлением токеном.
///
/// Access-токен короткоживущий и хранится внутри клиента; `refresh()`
/// выпускает новый по refresh-токену подключения. Политика повторов
/// дергает `refresh()` на классифицированной auth-ошибке (до
/// MAX_TOKEN_REFRESHES раз с небольшой паузой) вместо пересоздания
/// клиента по месту вызова.
pub struct GoogleAdsClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    access_token: RwLock<Option<String>>,
}

impl GoogleAdsClient {
    pub fn new(retry: &RetryConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(retry.request_timeout())
                .build()
                .expect("Failed to create HTTP client"),
            policy: RetryPolicy::from_config(retry),
            access_token: RwLock::new(None),
        }
    }

    /// Обменять refresh-токен подключения на свежий access-токен
    pub async fn refresh(&self, connection: &PlatformConnection) -> Result<(), ApiError> {
        let refresh_token = connection
            .refresh_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Fatal {
                status: 0,
                body: "Google connection has no refresh token".to_string(),
            })?;

        // Учетные данные приложения общие для всех брендов и живут в окружении
        let client_id = std::env::var("GOOGLE_ADS_CLIENT_ID").unwrap_or_default();
        let client_secret = std::env::var("GOOGLE_ADS_CLIENT_SECRET").unwrap_or_default();
        let params = [
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .client
            .post(OAUTH_TOKEN_URL)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Google token refresh failed with status {}: {}", status, body);
            return Err(ApiError::from_status(status, body));
        }

        let token: TokenResponse = response.json().await.map_err(ApiError::from)?;
        *self.access_token.write().await = Some(token.access_token);
        tracing::debug!("Google access token refreshed");
        Ok(())
    }

    async fn current_token(&self, connection: &PlatformConnection) -> Result<String, ApiError> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        // Первый запрос: начинаем с токена из подключения
        let initial = connection.access_token.clone();
        if initial.trim().is_empty() {
            self.refresh(connection).await?;
            return self
                .access_token
                .read()
                .await
                .clone()
                .ok_or_else(|| ApiError::Auth(401));
        }
        *self.access_token.write().await = Some(initial.clone());
        Ok(initial)
    }

    /// Дневные метрики кабинета за окно дат.
    ///
    /// По auth-ошибке токен принудительно обновляется и запрос
    /// повторяется; все остальные ошибки уходят наверх.
    pub async fn fetch_daily_metrics(
        &self,
        connection: &PlatformConnection,
        window: &DateWindow,
    ) -> Result<BTreeMap<NaiveDate, GoogleDaily>, ApiError> {
        let mut refreshes = 0u32;
        loop {
            let result = execute_with_retry(self.policy, "google ads search", || {
                self.search_daily_metrics_once(connection, window)
            })
            .await;

            match result {
                Err(e) if e.is_auth() && refreshes < MAX_TOKEN_REFRESHES => {
                    refreshes += 1;
                    tracing::warn!(
                        "Google Ads auth error ({}), refreshing token (attempt {}/{})",
                        e,
                        refreshes,
                        MAX_TOKEN_REFRESHES
                    );
                    tokio::time::sleep(REFRESH_RETRY_DELAY).await;
                    self.refresh(connection).await?;
                }
                other => return other,
            }
        }
    }

    async fn search_daily_metrics_once(
        &self,
        connection: &PlatformConnection,
        window: &DateWindow,
    ) -> Result<BTreeMap<NaiveDate, GoogleDaily>, ApiError> {
        let customer_id = connection
            .account_id
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ApiError::Fatal {
                status: 0,
                body: "Google connection has no customer id".to_string(),
            })?;

        let token = self.current_token(connection).await?;
        let until = window.end.pred_opt().unwrap_or(window.start);
        let gaql = format!(
            "SELECT segments.date, metrics.cost_micros, metrics.conversions_value \
             FROM customer \
             WHERE segments.date BETWEEN '{}' AND '{}'",
            window.start.format("%Y-%m-%d"),
            until.format("%Y-%m-%d")
        );

        let url = format!("{}/customers/{}/googleAds:search", ADS_API_BASE, customer_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header(
                "developer-token",
                std::env::var("GOOGLE_ADS_DEVELOPER_TOKEN").unwrap_or_default(),
            )
            .json(&serde_json::json!({ "query": gaql }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Google Ads search failed with status {}: {}", status, body);
            return Err(ApiError::from_status(status, body));
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(500).collect();
            tracing::error!("Failed to parse Google Ads response: {}. Body: {}", e, preview);
            ApiError::Malformed(format!("search response: {}", e))
        })?;

        let mut daily: BTreeMap<NaiveDate, GoogleDaily> = BTreeMap::new();
        for row in parsed.results {
            let Some(date_str) = row.segments.as_ref().map(|s| s.date.as_str()) else {
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
                tracing::warn!("Google Ads row with bad segments.date: {}", date_str);
                continue;
            };
            let metrics = row.metrics.unwrap_or_default();
            let spend = metrics.cost_micros.parse::<f64>().unwrap_or(0.0) / 1_000_000.0;
            let sales = metrics.conversions_value;

            let entry = daily.entry(date).or_default();
            entry.spend += spend;
            entry.sales += sales;
            entry.roas = if entry.spend > 0.0 {
                entry.sales / entry.spend
            } else {
                0.0
            };
        }

        Ok(daily)
    }
}

// ============================================================================
// Response structures для Google Ads API
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRow {
    #[serde(default)]
    pub segments: Option<RowSegments>,
    #[serde(default)]
    pub metrics: Option<RowMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowSegments {
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowMetrics {
    #[serde(rename = "costMicros", default)]
    pub cost_micros: String,
    #[serde(rename = "conversionsValue", default)]
    pub conversions_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "results": [
                {
                    "segments": {"date": "2024-01-03"},
                    "metrics": {"costMicros": "12500000", "conversionsValue": 42.5}
                }
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        let metrics = parsed.results[0].metrics.clone().unwrap();
        assert_eq!(metrics.cost_micros, "12500000");
        assert_eq!(metrics.conversions_value, 42.5);
    }

    #[test]
    fn test_google_daily_add_recomputes_roas() {
        let mut a = GoogleDaily {
            spend: 10.0,
            roas: 2.0,
            sales: 20.0,
        };
        a.add(&GoogleDaily {
            spend: 10.0,
            roas: 4.0,
            sales: 40.0,
        });
        assert_eq!(a.spend, 20.0);
        assert_eq!(a.sales, 60.0);
        assert_eq!(a.roas, 3.0);
    }

    #[test]
    fn test_google_daily_zero_spend_roas() {
        let mut a = GoogleDaily::default();
        a.add(&GoogleDaily {
            spend: 0.0,
            roas: 0.0,
            sales: 15.0,
        });
        assert_eq!(a.roas, 0.0);
    }
}
