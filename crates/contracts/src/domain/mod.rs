pub mod common;

pub mod a001_brand;
pub mod a002_platform_connection;
pub mod a003_daily_metrics;
pub mod a004_order_refund;
