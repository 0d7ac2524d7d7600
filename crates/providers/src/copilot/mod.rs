pub mod client;
pub mod config;
pub mod credential;
pub mod endpoint;
pub mod payload;
pub mod sse;

pub use client::CopilotClient;
pub use config::GatewayConfig;
pub use credential::Credential;
