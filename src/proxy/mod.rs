// proxy module - session gateway in front of the Deliverant API

pub mod config;
pub mod handlers; // Gateway endpoint handlers
pub mod middleware; // Axum middleware
pub mod server;
pub mod session; // Credential store (session cookie)
pub mod upstream; // Upstream client

pub use config::GatewayConfig;
pub use server::AxumServer;
pub use session::{Credential, CredentialStore};
