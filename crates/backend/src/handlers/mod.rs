pub mod a001_brand;
pub mod a002_platform_connection;
pub mod u501_sync;
