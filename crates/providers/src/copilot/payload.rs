use relay_core::llm::{Message, RequestShape, SamplingConfig};
use serde_json::{json, Map, Value};

/// Builds the provider-specific request body. `history` is everything before the
/// current user text, which is appended as the final user turn.
pub fn shape_payload(
    shape: RequestShape,
    history: &[Message],
    text: &str,
    sampling: &SamplingConfig,
    model: &str,
) -> Value {
    let mut turns = history.to_vec();
    turns.push(Message::user(text));

    let mut body = Map::new();
    body.insert("model".into(), json!(model));
    match shape {
        RequestShape::ChatCompletions => {
            body.insert("messages".into(), Value::Array(map_messages(&turns)));
            body.insert("stream".into(), json!(true));
            insert_sampling(&mut body, sampling);
            if let Some(n) = sampling.output_cap() {
                body.insert("max_tokens".into(), json!(n));
            }
        }
        RequestShape::LegacyCompletions => {
            body.insert("prompt".into(), json!(messages_to_prompt(&turns)));
            body.insert("stream".into(), json!(true));
            insert_sampling(&mut body, sampling);
            if let Some(n) = sampling.output_cap() {
                body.insert("max_tokens".into(), json!(n));
            }
        }
        RequestShape::Responses => {
            body.insert("input".into(), json!(messages_to_prompt(&turns)));
            body.insert("stream".into(), json!(true));
            if let Some(n) = sampling.output_cap() {
                body.insert("max_output_tokens".into(), json!(n));
            }
        }
    }
    Value::Object(body)
}

/// `"<role>: <text>"` per turn, newline-joined, closed with an `assistant:` line.
pub fn messages_to_prompt(turns: &[Message]) -> String {
    let mut lines: Vec<String> = turns
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect();
    lines.push("assistant:".to_string());
    lines.join("\n")
}

fn map_messages(msgs: &[Message]) -> Vec<Value> {
    msgs.iter()
        .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
        .collect()
}

fn insert_sampling(body: &mut Map<String, Value>, s: &SamplingConfig) {
    body.insert("temperature".into(), json!(s.temperature));
    body.insert("top_p".into(), json!(s.top_p));
    body.insert("frequency_penalty".into(), json!(s.frequency_penalty));
    body.insert("presence_penalty".into(), json!(s.presence_penalty));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Message> {
        vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
        ]
    }

    #[test]
    fn chat_body_appends_current_turn() {
        let body = shape_payload(
            RequestShape::ChatCompletions,
            &history(),
            "what now?",
            &SamplingConfig::default(),
            "gpt-4o",
        );
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(msgs[2]["role"], "assistant");
        assert_eq!(msgs[3], json!({"role": "user", "content": "what now?"}));
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["top_p"], 1.0);
        assert_eq!(body["frequency_penalty"], 0.0);
        assert_eq!(body["presence_penalty"], 0.0);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("prompt").is_none());
    }

    #[test]
    fn max_tokens_only_when_positive() {
        let mut s = SamplingConfig {
            max_output_tokens: Some(0),
            ..SamplingConfig::default()
        };
        for shape in [
            RequestShape::ChatCompletions,
            RequestShape::LegacyCompletions,
            RequestShape::Responses,
        ] {
            let body = shape_payload(shape, &[], "x", &s, "m");
            assert!(body.get("max_tokens").is_none());
            assert!(body.get("max_output_tokens").is_none());
        }
        s.max_output_tokens = Some(256);
        let body = shape_payload(RequestShape::ChatCompletions, &[], "x", &s, "m");
        assert_eq!(body["max_tokens"], 256);
        let body = shape_payload(RequestShape::Responses, &[], "x", &s, "m");
        assert_eq!(body["max_output_tokens"], 256);
    }

    #[test]
    fn legacy_flattens_into_prompt() {
        let body = shape_payload(
            RequestShape::LegacyCompletions,
            &history(),
            "next",
            &SamplingConfig::default(),
            "gpt-5-codex",
        );
        assert_eq!(
            body["prompt"],
            "system: be brief\nuser: hi\nassistant: hello\nuser: next\nassistant:"
        );
        assert!(body.get("messages").is_none());
        assert_eq!(body["temperature"], 1.0);
    }

    #[test]
    fn responses_carries_only_guaranteed_fields() {
        let body = shape_payload(
            RequestShape::Responses,
            &[],
            "write a test",
            &SamplingConfig::default(),
            "gpt-5.1-codex",
        );
        assert_eq!(
            body,
            json!({"model": "gpt-5.1-codex", "input": "user: write a test\nassistant:", "stream": true})
        );
    }

    #[test]
    fn prompt_flattening_is_stable() {
        let turns = history();
        let a = messages_to_prompt(&turns);
        assert_eq!(a, messages_to_prompt(&turns));
        assert!(a.ends_with("\nassistant:"));
        assert_eq!(messages_to_prompt(&[]), "assistant:");
    }
}
