pub mod cache;
pub mod client_id;
pub mod clock;
pub mod config;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod providers;
pub mod quota;
pub mod rate_limit;
pub mod server;
pub mod store;
pub mod summary;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use types::{CitySuggestion, WeatherReading};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
