use bytes::{Buf, BytesMut};
use relay_core::llm::RequestShape;
use serde_json::Value;
use tracing::{debug, warn};

pub const TEXT_DELTA_EVENT: &str = "response.output_text.delta";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseStep {
    Delta(String),
    Done,
}

/// Line-at-a-time SSE reader: the current `event:` name plus the bytes of a
/// line that has not seen its newline yet.
#[derive(Debug)]
pub struct SseParser {
    shape: RequestShape,
    event: String,
    buf: BytesMut,
    done: bool,
}

impl SseParser {
    pub fn new(shape: RequestShape) -> Self {
        Self {
            shape,
            event: String::new(),
            buf: BytesMut::new(),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds raw bytes; returns every step completed by them, stopping at `[DONE]`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseStep> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.buf.extend_from_slice(chunk);
        while let Some(pos) = twoway::find_bytes(&self.buf, b"\n") {
            let line = self.buf.split_to(pos).freeze();
            self.buf.advance(1);
            let text = String::from_utf8_lossy(&line);
            if let Some(step) = self.line(text.trim_end_matches('\r')) {
                let finished = step == SseStep::Done;
                out.push(step);
                if finished {
                    self.buf.clear();
                    break;
                }
            }
        }
        out
    }

    /// Flushes a trailing line left unterminated when the connection closed.
    pub fn finish(&mut self) -> Option<SseStep> {
        if self.done || self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split().freeze();
        let text = String::from_utf8_lossy(&rest);
        self.line(text.trim_end_matches('\r'))
    }

    pub fn line(&mut self, line: &str) -> Option<SseStep> {
        if let Some(name) = line.strip_prefix("event: ") {
            self.event = name.trim().to_string();
            return None;
        }
        let data = line.strip_prefix("data: ")?;
        if data == "[DONE]" {
            self.done = true;
            return Some(SseStep::Done);
        }
        let v: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                warn!(target:"providers::copilot","skipping malformed data line: {}", e);
                return None;
            }
        };
        let text = match self.shape {
            RequestShape::ChatCompletions => v["choices"][0]["delta"]["content"].as_str(),
            RequestShape::LegacyCompletions => v["choices"][0]["text"].as_str(),
            RequestShape::Responses if self.event == TEXT_DELTA_EVENT => v["delta"].as_str(),
            RequestShape::Responses => {
                debug!(target:"providers::copilot","ignoring event {}", self.event);
                None
            }
        };
        match text {
            Some(t) if !t.is_empty() => Some(SseStep::Delta(t.to_string())),
            _ => None,
        }
    }
}
