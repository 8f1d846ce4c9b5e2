pub mod meta_api_client;
