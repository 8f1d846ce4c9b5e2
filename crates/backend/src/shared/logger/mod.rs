pub mod registry;

pub use registry::{DateLogger, LoggerRegistry};

/// Логирование события сервера
pub fn log(category: &str, message: &str) {
    tracing::info!(target: "server", "[{}] {}", category, message);
}
