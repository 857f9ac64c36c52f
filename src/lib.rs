pub mod cli;
pub mod config;
pub mod export;
pub mod geo_calibration;
pub mod geo_lookup;
pub mod http_client;
pub mod logging;
pub mod matrix_rain;
pub mod persist;
pub mod presets;
pub mod remote;
pub mod rich_text;
pub mod state;
pub mod store;
pub mod tactics;
