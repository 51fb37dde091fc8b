pub mod config;
pub mod resources;

pub use config::AppConfig;
pub use resources::*;
