pub mod broker;
pub mod copilot;
pub mod gateway;

pub use gateway::{ChatRequest, Gateway};
