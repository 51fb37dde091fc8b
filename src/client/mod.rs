// client module - client-side access to the gateway

pub mod error;
pub mod fetch;

pub use error::ApiError;
pub use fetch::{fetch_json, FetchClient, Fetcher, LogNavigator, LoginNavigator};
