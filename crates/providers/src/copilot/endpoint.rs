use relay_core::llm::{GatewayError, RequestShape, WireApi};
use url::Url;

pub const DEFAULT_PUBLIC_HOST: &str = "https://api.githubcopilot.com";
pub const DEFAULT_ENTERPRISE_HOST: &str = "https://copilot-proxy.githubusercontent.com";
pub const INTERNAL_PREFIX: &str = "copilot-";

const CHAT_SUFFIX: &str = "/chat/completions";
const V1_CHAT_SUFFIX: &str = "/v1/chat/completions";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFamily {
    Codex,
    Internal,
    /// Internal prefix and codex name: enterprise host, codex request shape.
    InternalCodex,
    Standard,
}

impl ModelFamily {
    pub fn classify(model: &str) -> Self {
        let internal = model.starts_with(INTERNAL_PREFIX);
        let codex = model.to_lowercase().contains("codex");
        match (internal, codex) {
            (true, true) => ModelFamily::InternalCodex,
            (true, false) => ModelFamily::Internal,
            (false, true) => ModelFamily::Codex,
            (false, false) => ModelFamily::Standard,
        }
    }

    /// Selects the host.
    pub fn is_internal(self) -> bool {
        matches!(self, ModelFamily::Internal | ModelFamily::InternalCodex)
    }

    /// Selects the request shape.
    pub fn is_codex(self) -> bool {
        matches!(self, ModelFamily::Codex | ModelFamily::InternalCodex)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub shape: RequestShape,
}

/// Pure mapping from model family, configured base URL, routing hint and wire
/// selection to the concrete upstream URL and request shape.
pub fn resolve(
    family: ModelFamily,
    base_url: Option<&str>,
    hint: Option<&str>,
    wire: WireApi,
) -> Result<Endpoint, GatewayError> {
    let configured = base_url
        .map(|u| u.trim().trim_end_matches('/'))
        .filter(|u| !u.is_empty());
    let base = match (configured, hint) {
        (Some(url), Some(h)) => substitute_host(url, h)?,
        (Some(url), None) => url.to_string(),
        (None, _) => default_host(family, hint),
    };
    let base = base.trim_end_matches('/');
    let chat_url = if base.ends_with(CHAT_SUFFIX) {
        base.to_string()
    } else {
        format!("{base}{CHAT_SUFFIX}")
    };

    if !family.is_codex() {
        return Ok(Endpoint {
            url: chat_url,
            shape: RequestShape::ChatCompletions,
        });
    }
    let responses = match wire {
        WireApi::Responses => true,
        WireApi::Chat => false,
        WireApi::Auto => configured.is_none(),
    };
    if responses {
        let root = chat_url.strip_suffix(CHAT_SUFFIX).unwrap_or(&chat_url);
        Ok(Endpoint {
            url: format!("{root}/responses"),
            shape: RequestShape::Responses,
        })
    } else {
        Ok(Endpoint {
            url: legacy_completions_url(&chat_url),
            shape: RequestShape::LegacyCompletions,
        })
    }
}

fn default_host(family: ModelFamily, hint: Option<&str>) -> String {
    if !family.is_internal() {
        return DEFAULT_PUBLIC_HOST.to_string();
    }
    match hint {
        Some(h) if has_scheme(h) => h.to_string(),
        Some(h) => format!("https://{h}"),
        None => DEFAULT_ENTERPRISE_HOST.to_string(),
    }
}

fn has_scheme(hint: &str) -> bool {
    hint.contains("://")
}

/// The hint replaces the host (and port, and scheme when it names one) of a configured URL.
fn substitute_host(configured: &str, hint: &str) -> Result<String, GatewayError> {
    let mut url = Url::parse(configured)
        .map_err(|e| GatewayError::Config(format!("invalid base URL {configured}: {e}")))?;
    let explicit_scheme = has_scheme(hint);
    let hint_url = if explicit_scheme {
        Url::parse(hint)
    } else {
        Url::parse(&format!("https://{hint}"))
    }
    .map_err(|e| GatewayError::Config(format!("invalid routing hint {hint}: {e}")))?;
    let host = hint_url
        .host_str()
        .ok_or_else(|| GatewayError::Config(format!("routing hint {hint} has no host")))?;
    let bad = |_: ()| GatewayError::Config(format!("cannot route {configured} through {hint}"));
    if explicit_scheme {
        url.set_scheme(hint_url.scheme()).map_err(bad)?;
    }
    url.set_host(Some(host))
        .map_err(|e| GatewayError::Config(format!("cannot route {configured} through {hint}: {e}")))?;
    url.set_port(hint_url.port()).map_err(bad)?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn legacy_completions_url(chat_url: &str) -> String {
    let root = chat_url
        .strip_suffix(V1_CHAT_SUFFIX)
        .or_else(|| chat_url.strip_suffix(CHAT_SUFFIX))
        .unwrap_or(chat_url);
    format!("{root}/completions")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(url: &str, shape: RequestShape) -> Endpoint {
        Endpoint {
            url: url.to_string(),
            shape,
        }
    }

    #[test]
    fn classification() {
        assert_eq!(ModelFamily::classify("gpt-5.1-Codex-Max"), ModelFamily::Codex);
        assert_eq!(ModelFamily::classify("copilot-nes-v"), ModelFamily::Internal);
        assert_eq!(ModelFamily::classify("claude-sonnet-4.5"), ModelFamily::Standard);
        assert_eq!(ModelFamily::classify("Copilot-chat"), ModelFamily::Standard);
        assert_eq!(
            ModelFamily::classify("copilot-codex-preview"),
            ModelFamily::InternalCodex
        );
    }

    #[test]
    fn internal_codex_keeps_enterprise_host_and_codex_shape() {
        let family = ModelFamily::classify("copilot-codex-preview");
        let got = resolve(family, None, None, WireApi::Auto).unwrap();
        assert_eq!(
            got,
            ep("https://copilot-proxy.githubusercontent.com/responses", RequestShape::Responses)
        );

        let got = resolve(family, None, Some("proxy.individual.example"), WireApi::Chat).unwrap();
        assert_eq!(
            got,
            ep("https://proxy.individual.example/completions", RequestShape::LegacyCompletions)
        );
    }

    #[test]
    fn hint_starting_with_http_still_gets_a_scheme() {
        let got = resolve(ModelFamily::Internal, None, Some("httpproxy.corp.example"), WireApi::Auto)
            .unwrap();
        assert_eq!(got.url, "https://httpproxy.corp.example/chat/completions");
    }

    #[test]
    fn standard_models_use_public_host() {
        let got = resolve(ModelFamily::Standard, None, Some("ignored.example"), WireApi::Auto).unwrap();
        assert_eq!(
            got,
            ep("https://api.githubcopilot.com/chat/completions", RequestShape::ChatCompletions)
        );
    }

    #[test]
    fn internal_models_follow_hint_or_enterprise_default() {
        let got = resolve(ModelFamily::Internal, None, Some("proxy.individual.example"), WireApi::Auto)
            .unwrap();
        assert_eq!(got.url, "https://proxy.individual.example/chat/completions");

        let got = resolve(ModelFamily::Internal, None, Some("http://10.0.0.1:9000"), WireApi::Auto)
            .unwrap();
        assert_eq!(got.url, "http://10.0.0.1:9000/chat/completions");

        let got = resolve(ModelFamily::Internal, None, None, WireApi::Auto).unwrap();
        assert_eq!(
            got.url,
            "https://copilot-proxy.githubusercontent.com/chat/completions"
        );
    }

    #[test]
    fn codex_on_default_host_uses_responses() {
        let got = resolve(ModelFamily::Codex, None, None, WireApi::Auto).unwrap();
        assert_eq!(got, ep("https://api.githubcopilot.com/responses", RequestShape::Responses));
    }

    #[test]
    fn codex_on_configured_chat_url_goes_legacy() {
        let got = resolve(
            ModelFamily::Codex,
            Some("https://llm.example.com/v1/chat/completions/"),
            None,
            WireApi::Auto,
        )
        .unwrap();
        assert_eq!(
            got,
            ep("https://llm.example.com/completions", RequestShape::LegacyCompletions)
        );

        let got = resolve(ModelFamily::Codex, Some("https://llm.example.com/api"), None, WireApi::Chat)
            .unwrap();
        assert_eq!(got.url, "https://llm.example.com/api/completions");
    }

    #[test]
    fn codex_with_explicit_responses_wire() {
        let got = resolve(
            ModelFamily::Codex,
            Some("https://llm.example.com/v1"),
            None,
            WireApi::Responses,
        )
        .unwrap();
        assert_eq!(got, ep("https://llm.example.com/v1/responses", RequestShape::Responses));
    }

    #[test]
    fn forced_chat_wire_on_default_host_goes_legacy() {
        let got = resolve(ModelFamily::Codex, None, None, WireApi::Chat).unwrap();
        assert_eq!(got.url, "https://api.githubcopilot.com/completions");
        assert_eq!(got.shape, RequestShape::LegacyCompletions);
    }

    #[test]
    fn hint_overrides_configured_host() {
        let got = resolve(
            ModelFamily::Standard,
            Some("https://corp.example.com:8443/api/v1/"),
            Some("proxy.enterprise.example"),
            WireApi::Auto,
        )
        .unwrap();
        assert_eq!(got.url, "https://proxy.enterprise.example/api/v1/chat/completions");

        let got = resolve(
            ModelFamily::Standard,
            Some("https://corp.example.com/api"),
            Some("http://127.0.0.1:7000"),
            WireApi::Auto,
        )
        .unwrap();
        assert_eq!(got.url, "http://127.0.0.1:7000/api/chat/completions");
    }

    #[test]
    fn configured_url_without_scheme_is_rejected_when_hinted() {
        let err = resolve(ModelFamily::Standard, Some("not a url"), Some("h.example"), WireApi::Auto)
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn configured_url_passes_through_without_hint() {
        let got = resolve(ModelFamily::Standard, Some("http://127.0.0.1:1234"), None, WireApi::Auto)
            .unwrap();
        assert_eq!(got.url, "http://127.0.0.1:1234/chat/completions");
    }
}
