pub mod u501_sync_daily_metrics;
pub mod u502_import_from_shopify;
pub mod u503_import_from_meta;
pub mod u504_import_from_google;
