use relay_core::broker::TokenBrokerStatus;
use relay_core::llm::GatewayError;

use super::{BrokerReply, BrokerRequest, BrokerSettings, TokenBroker};

/// Sends the caller's text straight to the broker and renders what came back.
pub async fn token_status<B: TokenBroker>(
    broker: &B,
    text: &str,
    settings: &BrokerSettings,
) -> Result<String, GatewayError> {
    let request = BrokerRequest::passthrough(text, settings);
    let reply = broker.query(&request).await?;
    Ok(render(&reply))
}

pub fn render(reply: &BrokerReply) -> String {
    if reply.data.is_none() {
        let t = reply.text.trim();
        return if t.is_empty() {
            "No response from token broker.".to_string()
        } else {
            t.to_string()
        };
    }
    match reply.status() {
        TokenBrokerStatus::Acquired {
            token,
            acquired_at,
            expires_at,
        } => format!(
            "Copilot Token Acquired\n\nExpires: {expires_at}\nAcquired: {acquired_at}\n\nToken:\n```\n{token}\n```\n"
        ),
        TokenBrokerStatus::AuthorizationPending {
            user_code,
            verification_uri,
        } => format!(
            "GitHub Authorization Required\n\nVisit: {verification_uri}\nEnter code: {user_code}\n\nSend another message after authorizing."
        ),
        TokenBrokerStatus::Other(status) => {
            let mut out = format!("Status: {status}\n");
            let extra = reply.text.trim();
            if !extra.starts_with('{') && !extra.is_empty() {
                out.push('\n');
                out.push_str(extra);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::tests::{FakeBroker, ACQUIRED, PENDING};

    #[test]
    fn acquired_report_shows_token_and_times() {
        let out = render(&BrokerReply::parse(ACQUIRED.to_string()));
        assert!(out.starts_with("Copilot Token Acquired"));
        assert!(out.contains("Expires: 2026-01-01T00:30:00Z"));
        assert!(out.contains("tid=9;proxy-ep=proxy.example.com;"));
    }

    #[test]
    fn pending_report_shows_code() {
        let out = render(&BrokerReply::parse(PENDING.to_string()));
        assert!(out.contains("Visit: https://github.com/login/device"));
        assert!(out.contains("Enter code: ABCD-1234"));
    }

    #[test]
    fn other_and_free_text() {
        let out = render(&BrokerReply::parse(
            "token revoked\n```json\n{\"status\":\"revoked\"}\n```".to_string(),
        ));
        assert!(out.starts_with("Status: revoked"));
        assert!(out.contains("token revoked"));

        assert_eq!(render(&BrokerReply::parse("hello".into())), "hello");
        assert_eq!(
            render(&BrokerReply::parse("   ".into())),
            "No response from token broker."
        );
    }

    #[tokio::test]
    async fn reset_directive_reaches_broker() {
        let broker = FakeBroker::new(&[r#"{"status":"reset"}"#], &[]);
        let out = token_status(&broker, "reset", &BrokerSettings::default())
            .await
            .unwrap();
        assert_eq!(out.trim(), "Status: reset");
        let seen = broker.seen.lock().unwrap();
        assert!(seen[0].parameters.reset);
        assert_eq!(seen[0].query, "reset");
    }
}
