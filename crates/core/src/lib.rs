pub mod llm {
    use futures::Stream;
    use serde::{Deserialize, Serialize};
    use std::pin::Pin;
    use thiserror::Error;

    pub const DEFAULT_MODEL: &str = "gpt-4o";
    pub const CUSTOM_MODEL_SENTINEL: &str = "custom";

    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        System,
        User,
        Assistant,
    }

    impl Role {
        pub fn as_str(self) -> &'static str {
            match self {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            }
        }
    }

    /// One turn of the conversation the caller hands in on every request.
    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct Message {
        pub role: Role,
        pub content: String,
    }

    impl Message {
        pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
            Self {
                role,
                content: content.into(),
            }
        }
        pub fn system<S: Into<String>>(s: S) -> Self {
            Self::new(Role::System, s)
        }
        pub fn user<S: Into<String>>(s: S) -> Self {
            Self::new(Role::User, s)
        }
        pub fn assistant<S: Into<String>>(s: S) -> Self {
            Self::new(Role::Assistant, s)
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SamplingConfig {
        pub temperature: f64,
        pub top_p: f64,
        pub frequency_penalty: f64,
        pub presence_penalty: f64,
        /// `None` and `Some(0)` both mean no cap.
        pub max_output_tokens: Option<u32>,
    }

    impl Default for SamplingConfig {
        fn default() -> Self {
            Self {
                temperature: 1.0,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
                max_output_tokens: None,
            }
        }
    }

    impl SamplingConfig {
        pub fn output_cap(&self) -> Option<u32> {
            self.max_output_tokens.filter(|n| *n > 0)
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct ModelSelector {
        pub model: String,
        pub custom: Option<String>,
    }

    impl ModelSelector {
        pub fn new<S: Into<String>>(model: S) -> Self {
            Self {
                model: model.into(),
                custom: None,
            }
        }

        pub fn with_custom<S: Into<String>>(mut self, custom: S) -> Self {
            self.custom = Some(custom.into());
            self
        }

        /// Never returns an empty identifier.
        pub fn resolve(&self) -> String {
            let raw = self.model.trim();
            let picked = if raw == CUSTOM_MODEL_SENTINEL {
                self.custom.as_deref().map(str::trim).unwrap_or("")
            } else {
                raw
            };
            if picked.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                picked.to_string()
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum RequestShape {
        ChatCompletions,
        Responses,
        LegacyCompletions,
    }

    /// Which upstream API style the deployment exposes for codex models.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum WireApi {
        #[default]
        Auto,
        Chat,
        Responses,
    }

    impl WireApi {
        pub fn parse(s: &str) -> Option<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "auto" => Some(WireApi::Auto),
                "chat" => Some(WireApi::Chat),
                "responses" => Some(WireApi::Responses),
                _ => None,
            }
        }

        pub fn as_str(self) -> &'static str {
            match self {
                WireApi::Auto => "auto",
                WireApi::Chat => "chat",
                WireApi::Responses => "responses",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ChatDelta {
        Text(String),
        /// Progress text from the token broker, shown but not part of the answer.
        Notice(String),
    }

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum GatewayError {
        #[error("configuration error: {0}")]
        Config(String),
        #[error("authentication error: {0}")]
        Auth(String),
        #[error("API error ({status}): {body}")]
        Upstream { status: u16, body: String },
        #[error("connection error: {0}")]
        Connection(String),
    }

    pub type ChatStream<'a> =
        Pin<Box<dyn Stream<Item = Result<ChatDelta, GatewayError>> + Send + 'a>>;

}

pub mod broker {
    use serde::{Deserialize, Serialize};

    /// Snapshot of the broker's view of the credential; never cached here.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum TokenBrokerStatus {
        Acquired {
            token: String,
            acquired_at: String,
            expires_at: String,
        },
        AuthorizationPending {
            user_code: String,
            verification_uri: String,
        },
        Other(String),
    }

    impl TokenBrokerStatus {
        pub fn label(&self) -> &str {
            match self {
                TokenBrokerStatus::Acquired { .. } => "acquired",
                TokenBrokerStatus::AuthorizationPending { .. } => "authorization_pending",
                TokenBrokerStatus::Other(s) => s,
            }
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub enum BrokerMode {
        #[default]
        #[serde(rename = "")]
        Verbose,
        #[serde(rename = "query_token")]
        QueryToken,
        #[serde(rename = "auth_flow")]
        AuthFlow,
    }

    impl BrokerMode {
        pub fn parse(s: &str) -> Self {
            match s.trim() {
                "query_token" => BrokerMode::QueryToken,
                "auth_flow" => BrokerMode::AuthFlow,
                _ => BrokerMode::Verbose,
            }
        }
    }

    /// Direct broker directives typed by the caller.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum BrokerCommand {
        Refresh,
        Reset,
    }

    impl BrokerCommand {
        pub fn parse(text: &str) -> Option<Self> {
            match text.trim().to_lowercase().as_str() {
                "refresh" => Some(BrokerCommand::Refresh),
                "reset" => Some(BrokerCommand::Reset),
                _ => None,
            }
        }
    }

}
