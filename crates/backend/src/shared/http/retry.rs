use crate::shared::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Классифицированная ошибка обращения к внешнему API.
///
/// Transient-ошибки (rate limit, 5xx, таймаут, сеть) ретраятся,
/// остальные возвращаются сразу.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream error: HTTP {0}")]
    Upstream(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: HTTP {0}")]
    Auth(u16),

    #[error("request rejected: HTTP {status}: {body}")]
    Fatal { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Upstream(_) | Self::Timeout | Self::Network(_)
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Классификация по HTTP-статусу неуспешного ответа
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let code = status.as_u16();
        if code == 429 {
            Self::RateLimited
        } else if status.is_server_error() {
            Self::Upstream(code)
        } else if code == 401 || code == 403 {
            Self::Auth(code)
        } else {
            Self::Fatal { status: code, body }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() || e.is_request() {
            Self::Network(e.to_string())
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Политика повторов для одного запроса
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
        }
    }

    /// Задержка перед следующей попыткой: attempt * base (линейный backoff)
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Выполнить запрос с повторами по transient-ошибкам.
///
/// Без разделяемого состояния: безопасно звать параллельно из
/// нескольких окон пайплайна.
pub async fn execute_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    op_name: &str,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {:?}",
                    op_name,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!(
                        "{}: giving up after {} attempts: {}",
                        op_name,
                        policy.max_attempts,
                        e
                    );
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, String::new()),
            ApiError::Upstream(502)
        ));
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, String::new()),
            ApiError::Auth(401)
        ));
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            ApiError::Fatal { status: 422, .. }
        ));
    }

    #[test]
    fn test_transient_flags() {
        assert!(ApiError::RateLimited.is_transient());
        assert!(ApiError::Upstream(503).is_transient());
        assert!(ApiError::Timeout.is_transient());
        assert!(!ApiError::Auth(401).is_transient());
        assert!(!ApiError::Fatal {
            status: 400,
            body: String::new()
        }
        .is_transient());
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(test_policy(5), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ApiError::Upstream(500))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts_on_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(test_policy(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::RateLimited) }
        })
        .await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = execute_with_retry(test_policy(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiError::Fatal {
                    status: 400,
                    body: "bad request".to_string(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ApiError::Fatal { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
