use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Настройки пайплайна агрегации метрик.
///
/// Размеры окон и лимиты конкурентности задаются конфигурацией,
/// а не константами в коде, чтобы чанкер можно было гонять в тестах
/// с малым/большим фан-аутом без правок.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Размер чанка верхнего уровня в днях (планирование бэкфилла)
    #[serde(default = "default_schedule_chunk_days")]
    pub schedule_chunk_days: i64,

    /// Размер окна чтения заказов в днях
    #[serde(default = "default_order_window_days")]
    pub order_window_days: i64,

    /// Сколько окон обрабатывается одновременно
    #[serde(default = "default_window_concurrency")]
    pub window_concurrency: usize,

    /// Размер страницы при чтении заказов
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Пауза между страницами (rate limit), мс
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Максимум попыток одного запроса
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Базовая задержка между попытками, мс (задержка = attempt * base)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Таймаут одного HTTP-запроса, сек
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_schedule_chunk_days() -> i64 {
    120
}

fn default_order_window_days() -> i64 {
    7
}

fn default_window_concurrency() -> usize {
    3
}

fn default_page_size() -> i32 {
    250
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schedule_chunk_days: default_schedule_chunk_days(),
            order_window_days: default_order_window_days(),
            window_concurrency: default_window_concurrency(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[pipeline]
schedule_chunk_days = 120
order_window_days = 7
window_concurrency = 3
page_size = 250
page_delay_ms = 500

[pipeline.retry]
max_attempts = 3
base_delay_ms = 1000
request_timeout_secs = 30
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    // Try to find config.toml next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    // Fall back to default config
    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    // If absolute path, use as is
    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    // If relative path, resolve it relative to the executable directory
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(db_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.pipeline.order_window_days, 7);
        assert_eq!(config.pipeline.window_concurrency, 3);
        assert_eq!(config.pipeline.retry.max_attempts, 3);
    }

    #[test]
    fn test_pipeline_section_optional() {
        let config: Config = toml::from_str("[database]\npath = \"x.db\"\n").unwrap();
        assert_eq!(config.pipeline.schedule_chunk_days, 120);
        assert_eq!(config.pipeline.retry.base_delay_ms, 1000);
    }
}
