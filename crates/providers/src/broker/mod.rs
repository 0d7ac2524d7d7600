pub mod http;
pub mod report;

use futures::{Stream, StreamExt};
use relay_core::broker::{BrokerCommand, BrokerMode, TokenBrokerStatus};
use relay_core::llm::GatewayError;
use serde::Serialize;
use serde_json::Value;
use std::{future::Future, pin::Pin, time::Duration};
use tracing::{info, warn};

use crate::copilot::credential::Credential;

pub use http::HttpBroker;

pub const FLOW_POLL_INTERVAL_SECS: u32 = 5;
pub const FLOW_POLL_COUNT: u32 = 30;

pub type ProgressStream<'a> = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send + 'a>>;

/// Remote service that owns the cached token and the device-flow handshake.
pub trait TokenBroker: Send + Sync {
    /// One round trip; the broker answers with its current status.
    fn query(
        &self,
        request: &BrokerRequest,
    ) -> impl Future<Output = Result<BrokerReply, GatewayError>> + Send;

    /// Runs the authorization relay, yielding its progress text as it arrives.
    fn relay<'a>(&'a self, request: &'a BrokerRequest) -> ProgressStream<'a>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerSettings {
    pub salt: Option<String>,
    pub mode: BrokerMode,
    pub markdown: Option<bool>,
    pub poll_interval_secs: Option<u32>,
    pub poll_count: Option<u32>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            salt: None,
            mode: BrokerMode::QueryToken,
            markdown: None,
            poll_interval_secs: None,
            poll_count: None,
        }
    }
}

impl BrokerSettings {
    fn flow_interval(&self) -> u32 {
        clamp_interval(self.poll_interval_secs.unwrap_or(FLOW_POLL_INTERVAL_SECS))
    }

    fn flow_count(&self) -> u32 {
        clamp_count(self.poll_count.unwrap_or(FLOW_POLL_COUNT))
    }

    /// Upper bound for one interactive flow, used as the broker client's timeout.
    pub fn flow_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.flow_interval() * self.flow_count()) + 30)
    }
}

fn clamp_interval(v: u32) -> u32 {
    v.clamp(5, 30)
}

fn clamp_count(v: u32) -> u32 {
    v.clamp(1, 60)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BrokerParams {
    pub mode: BrokerMode,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub refresh: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BrokerRequest {
    pub query: String,
    pub parameters: BrokerParams,
}

impl BrokerRequest {
    pub fn query_token(settings: &BrokerSettings) -> Self {
        Self {
            query: String::new(),
            parameters: BrokerParams {
                mode: BrokerMode::QueryToken,
                salt: settings.salt.clone(),
                ..BrokerParams::default()
            },
        }
    }

    pub fn auth_flow(settings: &BrokerSettings) -> Self {
        Self {
            query: String::new(),
            parameters: BrokerParams {
                mode: BrokerMode::AuthFlow,
                poll_interval_secs: Some(settings.flow_interval()),
                poll_count: Some(settings.flow_count()),
                salt: settings.salt.clone(),
                ..BrokerParams::default()
            },
        }
    }

    /// Pass-through request for a caller's direct token query; `refresh`/`reset`
    /// input turns into the matching directive.
    pub fn passthrough(text: &str, settings: &BrokerSettings) -> Self {
        let command = BrokerCommand::parse(text);
        Self {
            query: text.to_string(),
            parameters: BrokerParams {
                mode: settings.mode,
                refresh: command == Some(BrokerCommand::Refresh),
                reset: command == Some(BrokerCommand::Reset),
                poll_interval_secs: settings.poll_interval_secs.map(clamp_interval),
                poll_count: settings.poll_count.map(clamp_count),
                salt: settings.salt.clone(),
                markdown: settings.markdown,
            },
        }
    }
}

/// Raw broker answer: free text, possibly carrying a JSON status object.
#[derive(Clone, Debug, PartialEq)]
pub struct BrokerReply {
    pub text: String,
    pub data: Option<Value>,
}

impl BrokerReply {
    pub fn parse(text: String) -> Self {
        let data = status_object(text.trim()).or_else(|| fenced_block(&text).and_then(status_object));
        Self { text, data }
    }

    pub fn status(&self) -> TokenBrokerStatus {
        let Some(data) = &self.data else {
            let t = self.text.trim();
            return TokenBrokerStatus::Other(if t.is_empty() { "no response".into() } else { t.into() });
        };
        let field = |k: &str| data[k].as_str().unwrap_or("").to_string();
        match data["status"].as_str().unwrap_or("unknown") {
            "acquired" if !field("copilot_token").is_empty() => TokenBrokerStatus::Acquired {
                token: field("copilot_token"),
                acquired_at: field("copilot_acquired_at"),
                expires_at: field("copilot_expires_at"),
            },
            "acquired" => TokenBrokerStatus::Other("acquired without a token".into()),
            "authorization_pending" => TokenBrokerStatus::AuthorizationPending {
                user_code: field("user_code"),
                verification_uri: field("verification_uri"),
            },
            other => TokenBrokerStatus::Other(other.to_string()),
        }
    }
}

fn status_object(s: &str) -> Option<Value> {
    serde_json::from_str::<Value>(s)
        .ok()
        .filter(|v| v.get("status").is_some())
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

pub enum Acquisition {
    Progress(String),
    Token(Credential),
}

pub type AcquireStream<'a> =
    Pin<Box<dyn Stream<Item = Result<Acquisition, GatewayError>> + Send + 'a>>;

/// Cheap status query first; only when that does not yield a token, run the
/// interactive relay once and query again.
pub fn acquire<'a, B: TokenBroker>(broker: &'a B, settings: &'a BrokerSettings) -> AcquireStream<'a> {
    Box::pin(async_stream::try_stream! {
        let quick = BrokerRequest::query_token(settings);
        let first = broker.query(&quick).await?.status();
        if let TokenBrokerStatus::Acquired { token, expires_at, .. } = first {
            info!(target:"providers::broker","token ready expires_at={}", expires_at);
            yield Acquisition::Token(Credential::new(token));
        } else {
            info!(target:"providers::broker","status={} starting authorization relay", first.label());
            let flow = BrokerRequest::auth_flow(settings);
            let mut progress = broker.relay(&flow);
            while let Some(chunk) = progress.next().await {
                yield Acquisition::Progress(chunk?);
            }
            drop(progress);
            match broker.query(&quick).await?.status() {
                TokenBrokerStatus::Acquired { token, .. } => {
                    yield Acquisition::Token(Credential::new(token));
                }
                other => {
                    warn!(target:"providers::broker","no token after relay status={}", other.label());
                    Err::<(), _>(GatewayError::Auth(format!(
                        "could not authenticate with GitHub Copilot (broker status: {}); provide an API key or complete the GitHub authorization",
                        other.label()
                    )))?;
                }
            }
        }
    })
}
