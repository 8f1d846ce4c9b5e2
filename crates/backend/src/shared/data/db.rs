use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<()> {
    let db_file = db_path.unwrap_or("target/db/app.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    // Ensure required tables exist (minimal schema bootstrap)
    for sql in SCHEMA_BOOTSTRAP {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            sql.to_string(),
        ))
        .await?;
    }

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}

const SCHEMA_BOOTSTRAP: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS a001_brand (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL,
        comment TEXT,
        user_id TEXT NOT NULL,
        store_timezone TEXT NOT NULL DEFAULT 'UTC',
        currency TEXT NOT NULL DEFAULT 'USD',
        is_active INTEGER NOT NULL DEFAULT 1,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a002_platform_connection (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL,
        comment TEXT,
        brand_id TEXT NOT NULL,
        platform TEXT NOT NULL,
        access_token TEXT NOT NULL,
        refresh_token TEXT,
        account_id TEXT,
        shop_domain TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        test_mode INTEGER NOT NULL DEFAULT 0,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_a002_brand_platform
        ON a002_platform_connection (brand_id, platform);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a003_daily_metrics (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL,
        comment TEXT,
        brand_id TEXT NOT NULL,
        date TEXT NOT NULL,
        meta_spend REAL NOT NULL DEFAULT 0,
        meta_revenue REAL NOT NULL DEFAULT 0,
        google_spend REAL NOT NULL DEFAULT 0,
        google_roas REAL NOT NULL DEFAULT 0,
        google_sales REAL NOT NULL DEFAULT 0,
        gross_sales REAL NOT NULL DEFAULT 0,
        total_taxes REAL NOT NULL DEFAULT 0,
        discount_amount REAL NOT NULL DEFAULT 0,
        total_price REAL NOT NULL DEFAULT 0,
        refund_amount REAL NOT NULL DEFAULT 0,
        order_count INTEGER NOT NULL DEFAULT 0,
        cancelled_order_count INTEGER NOT NULL DEFAULT 0,
        cod_order_count INTEGER NOT NULL DEFAULT 0,
        prepaid_order_count INTEGER NOT NULL DEFAULT 0,
        total_sales REAL NOT NULL DEFAULT 0,
        total_spend REAL NOT NULL DEFAULT 0,
        gross_roi REAL NOT NULL DEFAULT 0,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    );
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_a003_brand_date
        ON a003_daily_metrics (brand_id, date);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a004_order_refund (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL,
        comment TEXT,
        brand_id TEXT NOT NULL,
        order_id TEXT NOT NULL,
        order_created_at TEXT NOT NULL,
        amount REAL NOT NULL DEFAULT 0,
        refund_count INTEGER NOT NULL DEFAULT 0,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    );
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_a004_brand_order
        ON a004_order_refund (brand_id, order_id);
    "#,
];
