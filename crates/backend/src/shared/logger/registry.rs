use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Реестр отладочных логов, ключуемых датой обработки.
///
/// Каждому ключу (ISO-дата) соответствует свой append-only файл —
/// по нему можно восстановить, как классифицировались платежи и
/// считались суммы за конкретный день. Реестр создается на время
/// прогона и передается в пайплайн явно.
pub struct LoggerRegistry {
    dir: PathBuf,
    files: Mutex<HashMap<String, Arc<Mutex<File>>>>,
}

impl LoggerRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Получить (или создать) логгер для ключа
    pub fn get_or_create(&self, key: &str) -> DateLogger {
        let mut files = self.files.lock().expect("logger registry poisoned");
        let file = files
            .entry(key.to_string())
            .or_insert_with(|| {
                let _ = std::fs::create_dir_all(&self.dir);
                let path = self.dir.join(format!("metrics_{}.log", key));
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .unwrap_or_else(|e| {
                        panic!("Failed to open debug log {}: {}", path.display(), e)
                    });
                Arc::new(Mutex::new(file))
            })
            .clone();

        DateLogger {
            key: key.to_string(),
            file,
        }
    }
}

/// Логгер одного дня; дешево клонируется между задачами
#[derive(Clone)]
pub struct DateLogger {
    key: String,
    file: Arc<Mutex<File>>,
}

impl DateLogger {
    /// Записать строку в лог дня
    pub fn log(&self, message: &str) {
        if let Ok(mut file) = self.file.lock() {
            let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] [{}] {}", timestamp, self.key, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_shares_file() {
        let dir = std::env::temp_dir().join(format!("logreg_test_{}", uuid::Uuid::new_v4()));
        let registry = LoggerRegistry::new(&dir);

        let a = registry.get_or_create("2024-01-05");
        let b = registry.get_or_create("2024-01-05");
        a.log("first");
        b.log("second");

        let content =
            std::fs::read_to_string(dir.join("metrics_2024-01-05.log")).unwrap();
        assert!(content.contains("first"));
        assert!(content.contains("second"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_distinct_keys_distinct_files() {
        let dir = std::env::temp_dir().join(format!("logreg_test_{}", uuid::Uuid::new_v4()));
        let registry = LoggerRegistry::new(&dir);

        registry.get_or_create("2024-01-05").log("a");
        registry.get_or_create("2024-01-06").log("b");

        assert!(dir.join("metrics_2024-01-05.log").exists());
        assert!(dir.join("metrics_2024-01-06.log").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
