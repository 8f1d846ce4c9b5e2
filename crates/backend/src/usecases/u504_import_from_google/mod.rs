pub mod google_ads_client;
