pub mod config;
pub mod logger;

// Re-export to the modules namespace for callers
pub use config::*;
pub use logger::*;
