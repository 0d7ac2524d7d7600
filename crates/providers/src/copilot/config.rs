use anyhow::Context;
use directories::BaseDirs;
use relay_core::broker::BrokerMode;
use relay_core::llm::{SamplingConfig, WireApi};
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::warn;

use crate::broker::BrokerSettings;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatewayFileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub custom_model: Option<String>,
    pub wire_api: Option<WireApi>,
    pub timeout_ms: Option<u64>,
    pub sampling: Option<SamplingConfig>,
    pub broker: Option<BrokerFileConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BrokerFileConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub salt: Option<String>,
    pub mode: Option<String>,
    pub markdown: Option<bool>,
    pub poll_interval_secs: Option<u32>,
    pub poll_count: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct BrokerEndpoint {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub custom_model: Option<String>,
    pub wire_api: WireApi,
    pub timeout: Duration,
    pub sampling: SamplingConfig,
    pub broker: Option<BrokerEndpoint>,
    pub broker_settings: BrokerSettings,
    pub proxy: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: relay_core::llm::DEFAULT_MODEL.to_string(),
            custom_model: None,
            wire_api: WireApi::Auto,
            timeout: Duration::from_secs(120),
            sampling: SamplingConfig::default(),
            broker: None,
            broker_settings: BrokerSettings::default(),
            proxy: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env_and_file() -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = Self::config_path() {
            if path.exists() {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("read config file: {}", path.display()))?;
                match Self::from_toml_str(&text) {
                    Ok(c) => cfg = c,
                    Err(e) => {
                        warn!(target:"providers::copilot","ignoring config {}: {:#}", path.display(), e)
                    }
                }
            }
        }

        if let Some(k) = non_empty(env::var("COPILOT_API_KEY").ok()) {
            cfg.api_key = Some(k);
        }
        if let Some(u) = non_empty(env::var("COPILOT_BASE_URL").ok()) {
            cfg.base_url = Some(u);
        }
        if let Some(u) = non_empty(env::var("RELAY_BROKER_URL").ok()) {
            let token = non_empty(env::var("RELAY_BROKER_TOKEN").ok())
                .or_else(|| cfg.broker.as_ref().and_then(|b| b.token.clone()));
            cfg.broker = Some(BrokerEndpoint { url: u, token });
        }
        cfg.proxy = env::var("HTTPS_PROXY")
            .ok()
            .or_else(|| env::var("HTTP_PROXY").ok());
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let file: GatewayFileConfig = toml::from_str(text).context("parse gateway config toml")?;
        let mut cfg = Self::default();
        cfg.api_key = non_empty(file.api_key);
        cfg.base_url = non_empty(file.base_url);
        if let Some(m) = non_empty(file.model) {
            cfg.model = m;
        }
        cfg.custom_model = non_empty(file.custom_model);
        if let Some(w) = file.wire_api {
            cfg.wire_api = w;
        }
        if let Some(t) = file.timeout_ms {
            cfg.timeout = Duration::from_millis(t);
        }
        if let Some(s) = file.sampling {
            cfg.sampling = s;
        }
        if let Some(b) = file.broker {
            let s = &mut cfg.broker_settings;
            s.salt = non_empty(b.salt);
            if let Some(m) = b.mode {
                s.mode = BrokerMode::parse(&m);
            }
            s.markdown = b.markdown;
            s.poll_interval_secs = b.poll_interval_secs;
            s.poll_count = b.poll_count;
            cfg.broker = non_empty(b.url).map(|url| BrokerEndpoint {
                url,
                token: non_empty(b.token),
            });
        }
        Ok(cfg)
    }

    fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        let p = if cfg!(target_os = "windows") {
            base.home_dir().join(".relay").join("config.toml")
        } else {
            base.config_dir().join("relay").join("config.toml")
        };
        Some(p)
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
