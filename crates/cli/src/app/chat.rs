use anyhow::Result;
use futures::StreamExt;
use providers::broker::report::token_status;
use providers::{ChatRequest, Gateway};
use relay_core::llm::ChatDelta;
use tokio::io::{AsyncWriteExt, Stdout};
use tracing::{error, info};

use crate::strings::{self, PREFIX_ASSISTANT, PREFIX_NOTICE};

use super::App;

enum Outcome {
    Finished,
    Canceled,
    Failed(String),
}

impl App {
    pub fn request_for(&self, text: &str) -> ChatRequest {
        ChatRequest {
            history: self.turns.clone(),
            text: text.to_string(),
            model: self.selector.clone(),
            sampling: self.cfg.sampling.clone(),
            wire: self.wire,
            api_key: self.cfg.api_key.clone(),
        }
    }

    /// Streams one answer to stdout as it arrives. Ctrl-C drops the stream,
    /// which closes the upstream connection.
    pub async fn submit(&mut self, gateway: &Gateway, text: String, out: &mut Stdout) -> Result<()> {
        info!(target: "cli", "submit: model={} wire={} input_len={} chars", self.selector.resolve(), self.wire.as_str(), text.len());
        let mut stream = gateway.chat(self.request_for(&text));
        let mut reply = String::new();
        let mut started = false;
        let outcome = loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(ChatDelta::Text(t))) => {
                        if !started {
                            out.write_all(PREFIX_ASSISTANT.as_bytes()).await?;
                            started = true;
                        }
                        out.write_all(t.as_bytes()).await?;
                        out.flush().await?;
                        reply.push_str(&t);
                    }
                    Some(Ok(ChatDelta::Notice(n))) => {
                        out.write_all(format!("{PREFIX_NOTICE}{}\n", n.trim_end()).as_bytes()).await?;
                        out.flush().await?;
                    }
                    Some(Err(e)) => break Outcome::Failed(e.to_string()),
                    None => break Outcome::Finished,
                },
                _ = tokio::signal::ctrl_c() => break Outcome::Canceled,
            }
        };
        drop(stream);

        if started {
            out.write_all(b"\n").await?;
        }
        match outcome {
            Outcome::Finished => {}
            Outcome::Canceled => {
                info!(target: "cli", "stream canceled after {} chars", reply.len());
                out.write_all(format!("{}\n", strings::CANCELED).as_bytes()).await?;
            }
            Outcome::Failed(msg) => {
                error!(target: "cli", "request failed: {}", msg);
                out.write_all(format!("{}\n", strings::error_line(&msg)).as_bytes()).await?;
            }
        }
        out.flush().await?;
        self.record_exchange(&text, &reply);
        Ok(())
    }

    pub async fn token(&self, gateway: &Gateway, arg: &str, out: &mut Stdout) -> Result<()> {
        let Some(broker) = gateway.broker() else {
            out.write_all(format!("{}\n", strings::error_line(strings::NO_BROKER)).as_bytes()).await?;
            return Ok(());
        };
        let line = match token_status(broker, arg, gateway.broker_settings()).await {
            Ok(report) => report,
            Err(e) => {
                error!(target: "cli", "token query failed: {}", e);
                strings::error_line(&e.to_string())
            }
        };
        out.write_all(format!("{}\n", line.trim_end()).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
