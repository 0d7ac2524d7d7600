use futures::StreamExt;
use relay_core::llm::GatewayError;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{BrokerReply, BrokerRequest, ProgressStream, TokenBroker};
use crate::copilot::client::map_reqwest_err;
use crate::copilot::config::BrokerEndpoint;

/// Talks to the broker as a plain HTTP service: JSON request in, text out.
#[derive(Clone)]
pub struct HttpBroker {
    http: Client,
    url: String,
    token: Option<String>,
}

impl HttpBroker {
    pub fn new(endpoint: &BrokerEndpoint, timeout: Duration, proxy: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(1)
            .timeout(timeout);
        if let Some(p) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        Ok(Self {
            http: builder.build()?,
            url: endpoint.url.clone(),
            token: endpoint.token.clone(),
        })
    }

    fn post(&self, request: &BrokerRequest) -> RequestBuilder {
        let b = self.http.post(&self.url).json(request);
        match &self.token {
            Some(t) => b.bearer_auth(t),
            None => b,
        }
    }
}

impl TokenBroker for HttpBroker {
    async fn query(&self, request: &BrokerRequest) -> Result<BrokerReply, GatewayError> {
        debug!(target:"providers::broker","query mode={:?}", request.parameters.mode);
        let resp = self.post(request).send().await.map_err(map_reqwest_err)?;
        let status = resp.status();
        let text = resp.text().await.map_err(map_reqwest_err)?;
        if !status.is_success() {
            error!(target:"providers::broker","broker non-200 status={} body={:?}", status, text);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(BrokerReply::parse(text))
    }

    fn relay<'a>(&'a self, request: &'a BrokerRequest) -> ProgressStream<'a> {
        Box::pin(async_stream::try_stream! {
            info!(target:"providers::broker","relay start url={}", self.url);
            let resp = self.post(request).send().await.map_err(map_reqwest_err)?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
                error!(target:"providers::broker","relay non-200 status={} body={:?}", status, body);
                Err::<(), _>(GatewayError::Upstream { status: status.as_u16(), body })?;
            } else {
                let mut body = resp.bytes_stream();
                while let Some(chunk) = body.next().await {
                    let chunk = chunk.map_err(map_reqwest_err)?;
                    yield String::from_utf8_lossy(&chunk).into_owned();
                }
            }
        })
    }
}
