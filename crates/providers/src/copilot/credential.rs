use std::fmt;

const PROXY_MARKER: &str = "proxy-ep=";

/// Bearer credential with its routing hint split out once at the boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    routing_hint: Option<String>,
}

impl Credential {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        let secret = secret.into();
        let routing_hint = extract_hint(&secret)
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        Self {
            secret,
            routing_hint,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn routing_hint(&self) -> Option<&str> {
        self.routing_hint.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("routing_hint", &self.routing_hint)
            .finish()
    }
}

/// Returns the text between `proxy-ep=` and the next `;` (or end of input).
pub fn extract_hint(credential: &str) -> Option<&str> {
    let start = credential.find(PROXY_MARKER)? + PROXY_MARKER.len();
    let rest = &credential[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_between_marker_and_semicolon() {
        let tok = "tid=abc;exp=1700000000;proxy-ep=proxy.enterprise.githubcopilot.com;sku=x";
        assert_eq!(extract_hint(tok), Some("proxy.enterprise.githubcopilot.com"));
    }

    #[test]
    fn hint_runs_to_end_without_semicolon() {
        assert_eq!(extract_hint("a=1;proxy-ep=host.example:8443"), Some("host.example:8443"));
    }

    #[test]
    fn no_marker_no_hint() {
        assert_eq!(extract_hint(""), None);
        assert_eq!(extract_hint("sk-plain-key"), None);
        assert_eq!(extract_hint("proxy-ep"), None);
    }

    #[test]
    fn empty_hint_is_dropped_by_adapter() {
        assert_eq!(extract_hint("proxy-ep=;x=1"), Some(""));
        assert_eq!(Credential::new("proxy-ep=;x=1").routing_hint(), None);
    }

    #[test]
    fn credential_keeps_secret_verbatim() {
        let raw = "tid=1;proxy-ep=p.example.com;";
        let c = Credential::new(raw);
        assert_eq!(c.secret(), raw);
        assert_eq!(c.routing_hint(), Some("p.example.com"));
        assert!(!format!("{c:?}").contains("tid=1"));
    }
}
