//! Outbound proxy selection
//!
//! Only the explicitly configured proxies are used. The HTTP client is built
//! with system proxy detection disabled, so lower-case `http_proxy` and
//! friends, or OS-level settings, never leak into requests.

use reqwest::{ClientBuilder, NoProxy, Proxy};
use url::Url;

/// Proxy configuration, one optional URL per scheme
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy for `http://` requests (`HTTP_PROXY`)
    pub http: Option<String>,
    /// Proxy for `https://` requests (`HTTPS_PROXY`)
    pub https: Option<String>,
    /// Fallback for any scheme without its own proxy (`ALL_PROXY`)
    pub all: Option<String>,
    /// Comma-separated hosts that bypass the proxy (`NO_PROXY`)
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    /// The proxy a request with `scheme` goes through, if any
    ///
    /// A scheme-specific proxy wins; `all` only fills in for schemes that
    /// have none.
    pub fn proxy_for(&self, scheme: &str) -> Option<&str> {
        let specific = match scheme {
            "http" => self.http.as_deref(),
            "https" => self.https.as_deref(),
            _ => None,
        };
        specific.or(self.all.as_deref())
    }

    /// Effective `(scheme, proxy)` pairs, for status output
    pub fn routes(&self) -> Vec<(&'static str, &str)> {
        ["http", "https"]
            .into_iter()
            .filter_map(|scheme| self.proxy_for(scheme).map(|url| (scheme, url)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none() && self.all.is_none()
    }

    /// Validation messages for every malformed proxy URL
    pub fn validate(&self) -> Vec<String> {
        [
            ("HTTP_PROXY", &self.http),
            ("HTTPS_PROXY", &self.https),
            ("ALL_PROXY", &self.all),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            let url = value.as_deref()?;
            (!is_valid_proxy_url(url)).then(|| {
                format!(
                    "{} must be a URL with scheme and host (got {})",
                    name,
                    redact_proxy_url(url)
                )
            })
        })
        .collect()
    }

    /// Register the configured proxies on a client builder
    pub fn apply(&self, builder: ClientBuilder) -> reqwest::Result<ClientBuilder> {
        let mut builder = builder.no_proxy();
        let bypass = self.no_proxy.as_deref().and_then(NoProxy::from_string);

        if let Some(url) = self.proxy_for("http") {
            builder = builder.proxy(Proxy::http(url)?.no_proxy(bypass.clone()));
        }
        if let Some(url) = self.proxy_for("https") {
            builder = builder.proxy(Proxy::https(url)?.no_proxy(bypass));
        }

        Ok(builder)
    }
}

/// A proxy URL needs both a scheme and a host
pub fn is_valid_proxy_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Mask proxy credentials for logging (`user:***@host`)
pub fn redact_proxy_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if !url.username().is_empty() || url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<invalid proxy url>".to_string(),
    }
}
