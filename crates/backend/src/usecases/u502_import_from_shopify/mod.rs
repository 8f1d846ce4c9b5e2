pub mod processors;
pub mod reader;
pub mod shopify_api_client;
