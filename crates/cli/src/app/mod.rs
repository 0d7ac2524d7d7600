use anyhow::Result;
use providers::copilot::GatewayConfig;
use providers::Gateway;
use relay_core::llm::{Message, ModelSelector, WireApi};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tracing::info;

use crate::strings;

pub mod chat;
pub mod history;

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Send(String),
    Token(String),
    Say(String),
    Quit,
    Nothing,
}

pub struct App {
    pub cfg: GatewayConfig,
    pub turns: Vec<Message>,
    pub selector: ModelSelector,
    pub wire: WireApi,
}

impl App {
    pub fn new(cfg: GatewayConfig) -> Self {
        let selector = ModelSelector {
            model: cfg.model.clone(),
            custom: cfg.custom_model.clone(),
        };
        let wire = cfg.wire_api;
        Self {
            cfg,
            turns: Vec::new(),
            selector,
            wire,
        }
    }

    /// Turns one input line into what the loop should do next.
    pub fn interpret(&mut self, line: &str) -> Action {
        let s = line.trim();
        if s.is_empty() {
            return Action::Nothing;
        }
        if !s.starts_with('/') {
            return Action::Send(s.to_string());
        }
        let rest = &s[1..];
        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or("").to_lowercase();
        let arg = parts.next().unwrap_or("").trim();
        match cmd.as_str() {
            "model" => {
                if arg.is_empty() {
                    return Action::Say(strings::info_line(&format!(
                        "model is '{}'",
                        self.selector.resolve()
                    )));
                }
                self.selector.model = arg.to_string();
                Action::Say(strings::info_line(&format!(
                    "model set to '{}'",
                    self.selector.resolve()
                )))
            }
            "custom" => {
                self.selector.custom = Some(arg.to_string()).filter(|a| !a.is_empty());
                Action::Say(strings::info_line(&format!(
                    "custom model set to '{}'",
                    arg
                )))
            }
            "wire" => match WireApi::parse(arg) {
                Some(w) => {
                    self.wire = w;
                    Action::Say(strings::info_line(&format!("wire set to '{}'", w.as_str())))
                }
                None => Action::Say(strings::error_line("wire must be auto, chat or responses")),
            },
            "token" => Action::Token(arg.to_string()),
            "clear" => {
                self.turns.clear();
                Action::Say(strings::info_line("conversation cleared"))
            }
            "help" => Action::Say(strings::HELP.to_string()),
            "quit" | "exit" => Action::Quit,
            _ => Action::Say(strings::error_line(&format!("unknown command /{cmd}"))),
        }
    }

    pub async fn run(&mut self, gateway: &Gateway) -> Result<()> {
        let mut out = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        out.write_all(format!("{}\n", strings::BANNER).as_bytes()).await?;
        info!(target: "cli", "start model={} wire={}", self.selector.resolve(), self.wire.as_str());
        loop {
            out.write_all(strings::PROMPT.as_bytes()).await?;
            out.flush().await?;
            let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
                break;
            };
            match self.interpret(&line) {
                Action::Send(text) => self.submit(gateway, text, &mut out).await?,
                Action::Token(arg) => self.token(gateway, &arg, &mut out).await?,
                Action::Say(msg) => out.write_all(format!("{msg}\n").as_bytes()).await?,
                Action::Quit => break,
                Action::Nothing => {}
            }
        }
        Ok(())
    }
}

/// Next prompt line, or `None` on end of input or when `interrupt` fires first.
pub async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = interrupt => Ok(None),
    }
}
