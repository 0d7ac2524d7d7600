use crate::copilot::config::GatewayConfig;
use crate::copilot::credential::Credential;
use crate::copilot::endpoint::Endpoint;
use crate::copilot::sse::{SseParser, SseStep};
use futures::StreamExt;
use relay_core::llm::{ChatDelta, ChatStream, GatewayError};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const CLIENT_HEADERS: [(&str, &str); 6] = [
    ("accept", "application/json"),
    ("user-agent", "GitHubCopilotChat/1.0.0"),
    ("editor-version", "vscode/1.104.1"),
    ("editor-plugin-version", "copilot-chat/0.36.0"),
    ("openai-organization", "github-copilot"),
    ("copilot-integration-id", "vscode-chat"),
];

#[derive(Clone)]
pub struct CopilotClient {
    http: Client,
}

impl CopilotClient {
    pub fn new(cfg: &GatewayConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in CLIENT_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        Ok(Self { http })
    }

    /// POSTs `body` and returns the text deltas. The status is checked before any
    /// line is read; dropping the stream closes the connection.
    pub async fn stream(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        body: &Value,
    ) -> Result<ChatStream<'static>, GatewayError> {
        info!(target:"providers::copilot","start stream shape={:?} url={}", endpoint.shape, endpoint.url);
        let resp = self
            .http
            .post(&endpoint.url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(credential.secret())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if resp.status() != StatusCode::OK {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            error!(target:"providers::copilot","stream non-200 status={} body={:?}", status, body);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let mut parser = SseParser::new(endpoint.shape);
        let mut chunks = resp.bytes_stream();
        let s = async_stream::try_stream! {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(map_reqwest_err)?;
                for step in parser.feed(&chunk) {
                    if let SseStep::Delta(t) = step {
                        yield ChatDelta::Text(t);
                    }
                }
                if parser.is_done() {
                    debug!(target:"providers::copilot","stream finished with [DONE]");
                    break;
                }
            }
            if let Some(SseStep::Delta(t)) = parser.finish() {
                yield ChatDelta::Text(t);
            }
        };
        Ok(Box::pin(s))
    }
}

pub(crate) fn map_reqwest_err(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Connection(format!("request timed out: {e}"))
    } else {
        GatewayError::Connection(e.to_string())
    }
}
