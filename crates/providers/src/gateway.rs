use futures::StreamExt;
use relay_core::llm::{
    ChatDelta, ChatStream, GatewayError, Message, ModelSelector, SamplingConfig, WireApi,
};
use tracing::{error, info};

use crate::broker::{self, Acquisition, BrokerSettings, HttpBroker, TokenBroker};
use crate::copilot::endpoint::{self, ModelFamily};
use crate::copilot::payload::shape_payload;
use crate::copilot::{CopilotClient, Credential, GatewayConfig};

#[derive(Clone, Debug, Default)]
pub struct ChatRequest {
    /// Earlier turns, oldest first; the current text is not included.
    pub history: Vec<Message>,
    pub text: String,
    pub model: ModelSelector,
    pub sampling: SamplingConfig,
    pub wire: WireApi,
    pub api_key: Option<String>,
}

impl ChatRequest {
    pub fn new<S: Into<String>>(text: S, cfg: &GatewayConfig) -> Self {
        Self {
            history: Vec::new(),
            text: text.into(),
            model: ModelSelector {
                model: cfg.model.clone(),
                custom: cfg.custom_model.clone(),
            },
            sampling: cfg.sampling.clone(),
            wire: cfg.wire_api,
            api_key: cfg.api_key.clone(),
        }
    }
}

pub struct Gateway<B = HttpBroker> {
    client: CopilotClient,
    broker: Option<B>,
    base_url: Option<String>,
    broker_settings: BrokerSettings,
}

impl Gateway<HttpBroker> {
    pub fn from_config(cfg: &GatewayConfig) -> anyhow::Result<Self> {
        let client = CopilotClient::new(cfg)?;
        let broker = match &cfg.broker {
            Some(ep) => Some(HttpBroker::new(
                ep,
                cfg.broker_settings.flow_timeout(),
                cfg.proxy.as_deref(),
            )?),
            None => None,
        };
        Ok(Self::new(client, broker, cfg))
    }
}

impl<B: TokenBroker> Gateway<B> {
    pub fn new(client: CopilotClient, broker: Option<B>, cfg: &GatewayConfig) -> Self {
        Self {
            client,
            broker,
            base_url: cfg.base_url.clone(),
            broker_settings: cfg.broker_settings.clone(),
        }
    }

    pub fn broker(&self) -> Option<&B> {
        self.broker.as_ref()
    }

    pub fn broker_settings(&self) -> &BrokerSettings {
        &self.broker_settings
    }

    /// Runs one request end to end. Broker progress arrives as `Notice`, model
    /// output as `Text`, both in arrival order; the first error ends the stream.
    pub fn chat(&self, req: ChatRequest) -> ChatStream<'_> {
        Box::pin(async_stream::try_stream! {
            let model = req.model.resolve();
            let supplied = req
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(Credential::new);
            let credential = match supplied {
                Some(c) => c,
                None => {
                    let broker = self.broker.as_ref().ok_or_else(|| {
                        GatewayError::Config(
                            "no API key provided and no token broker configured".into(),
                        )
                    })?;
                    let mut acquisition = broker::acquire(broker, &self.broker_settings);
                    let mut token = None;
                    while let Some(step) = acquisition.next().await {
                        match step? {
                            Acquisition::Progress(p) => {
                                yield ChatDelta::Notice(p);
                            }
                            Acquisition::Token(c) => token = Some(c),
                        }
                    }
                    token.ok_or_else(|| {
                        GatewayError::Auth("token broker finished without a credential".into())
                    })?
                }
            };

            let family = ModelFamily::classify(&model);
            let target = endpoint::resolve(
                family,
                self.base_url.as_deref(),
                credential.routing_hint(),
                req.wire,
            )?;
            info!(target:"gateway","request model={} family={:?} shape={:?} history={}", model, family, target.shape, req.history.len());
            let body = shape_payload(target.shape, &req.history, &req.text, &req.sampling, &model);
            let mut upstream = self.client.stream(&target, &credential, &body).await?;
            let mut relayed = 0usize;
            while let Some(delta) = upstream.next().await {
                match delta {
                    Ok(d) => {
                        relayed += 1;
                        yield d;
                    }
                    Err(e) => {
                        error!(target:"gateway","stream aborted after {} deltas: {}", relayed, e);
                        Err::<(), _>(e)?;
                    }
                }
            }
            info!(target:"gateway","stream complete deltas={}", relayed);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::tests::{FakeBroker, PENDING};
    use std::sync::atomic::Ordering;

    fn gateway(broker: Option<FakeBroker>) -> Gateway<FakeBroker> {
        let cfg = GatewayConfig::default();
        Gateway::new(CopilotClient::new(&cfg).unwrap(), broker, &cfg)
    }

    async fn collect(g: &Gateway<FakeBroker>, req: ChatRequest) -> Vec<Result<ChatDelta, GatewayError>> {
        g.chat(req).collect().await
    }

    #[tokio::test]
    async fn missing_key_without_broker_is_config_error() {
        let g = gateway(None);
        let req = ChatRequest::new("hi", &GatewayConfig::default());
        let out = collect(&g, req).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(GatewayError::Config(_))));
    }

    #[tokio::test]
    async fn unresolved_broker_status_is_auth_error_after_progress() {
        let g = gateway(Some(FakeBroker::new(&[PENDING, PENDING], &["waiting for device code\n"])));
        let mut req = ChatRequest::new("hi", &GatewayConfig::default());
        req.api_key = Some("   ".into());
        let out = collect(&g, req).await;
        assert_eq!(out[0], Ok(ChatDelta::Notice("waiting for device code\n".into())));
        assert!(matches!(out.last(), Some(Err(GatewayError::Auth(_)))));
        let broker = g.broker().unwrap();
        assert_eq!(broker.relays.load(Ordering::SeqCst), 1);
        assert_eq!(broker.queries.load(Ordering::SeqCst), 2);
    }
}
