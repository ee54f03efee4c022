pub mod api_request;
pub mod clock;
pub mod config;
pub mod error;
pub mod hue_api;
pub mod run_log;
pub mod sunset_api;
