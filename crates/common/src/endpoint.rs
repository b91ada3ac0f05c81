//! Base-URI resolution and fixed endpoint constants
//!
//! Multivers and Boekhoudgemak expose the same API surface under different
//! hosts. Both follow `https://{sandbox-}api.{host}/V{version}`, so a
//! platform is described by a small [`ApiTarget`] value instead of a type
//! per platform.

use std::borrow::Cow;
use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONNECTION};

/// API version used when the caller does not pick one
pub const DEFAULT_API_VERSION: u32 = 21;

/// Browser-facing authorization endpoint, relative to the base URI
pub const AUTHORIZE_PATH: &str = "/OAuth/Authorize";

/// Token endpoint for both grant types, relative to the base URI
pub const TOKEN_PATH: &str = "/OAuth/Token";

/// Scope requested for every authorization
pub const OAUTH_SCOPE: &str = "http://UNIT4.Multivers.API/Web/WebApi/*";

/// Environment selection fed to a [`BaseUriResolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// Use the provider's sandbox host
    pub sandbox: bool,
    /// Versioned path segment (`/V{version}`)
    pub version: u32,
}

impl Default for Deployment {
    fn default() -> Self {
        Self { sandbox: false, version: DEFAULT_API_VERSION }
    }
}

/// Strategy that turns a [`Deployment`] into the scheme + host + version
/// prefix every request path is appended to.
///
/// Called once per outbound request, so implementations must be pure.
pub trait BaseUriResolver: fmt::Debug + Send + Sync {
    /// Resolve the base URI (no trailing slash)
    fn base_uri(&self, deployment: Deployment) -> String;

    /// Version to use when the configuration does not override it
    fn default_version(&self) -> u32 {
        DEFAULT_API_VERSION
    }
}

/// Provider host plus default version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTarget {
    host: Cow<'static, str>,
    default_version: u32,
}

impl ApiTarget {
    /// Unit4 Multivers (`api.multivers.nl`)
    pub const MULTIVERS: Self =
        Self { host: Cow::Borrowed("multivers.nl"), default_version: DEFAULT_API_VERSION };

    /// Boekhoudgemak (`api.boekhoudgemak.nl`)
    pub const BOEKHOUDGEMAK: Self =
        Self { host: Cow::Borrowed("boekhoudgemak.nl"), default_version: DEFAULT_API_VERSION };

    /// Any other deployment sharing the `api.{host}` layout
    #[must_use]
    pub fn custom(host: impl Into<String>, default_version: u32) -> Self {
        Self { host: Cow::Owned(host.into()), default_version }
    }

    /// Resolve a platform by name (`multivers` or `boekhoudgemak`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "multivers" => Some(Self::MULTIVERS),
            "boekhoudgemak" => Some(Self::BOEKHOUDGEMAK),
            _ => None,
        }
    }

    /// Provider host without the `api.` prefix
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl BaseUriResolver for ApiTarget {
    fn base_uri(&self, deployment: Deployment) -> String {
        let prefix = if deployment.sandbox { "sandbox-" } else { "" };
        format!("https://{prefix}api.{}/V{}", self.host, deployment.version)
    }

    fn default_version(&self) -> u32 {
        self.default_version
    }
}

/// Base URI that ignores the deployment, e.g. a gateway or a local mock
/// server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBaseUri(String);

impl FixedBaseUri {
    /// Trailing slashes are stripped so paths can be appended directly
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self(uri.trim_end_matches('/').to_string())
    }
}

impl BaseUriResolver for FixedBaseUri {
    fn base_uri(&self, _deployment: Deployment) -> String {
        self.0.clone()
    }
}

/// Whether `path` is one of the OAuth endpoints, which never carry bearer
/// credentials
#[must_use]
pub fn is_oauth_path(path: &str) -> bool {
    path == TOKEN_PATH || path == AUTHORIZE_PATH
}

/// Headers attached to every request: no caching, no keep-alive, JSON
/// responses
#[must_use]
pub fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint.
    use super::*;

    #[test]
    fn test_multivers_production_uri() {
        let uri = ApiTarget::MULTIVERS.base_uri(Deployment { sandbox: false, version: 221 });
        assert_eq!(uri, "https://api.multivers.nl/V221");
    }

    #[test]
    fn test_multivers_sandbox_uri() {
        let uri = ApiTarget::MULTIVERS.base_uri(Deployment { sandbox: true, version: 21 });
        assert_eq!(uri, "https://sandbox-api.multivers.nl/V21");
    }

    #[test]
    fn test_boekhoudgemak_uris() {
        let target = ApiTarget::BOEKHOUDGEMAK;
        assert_eq!(
            target.base_uri(Deployment { sandbox: false, version: 221 }),
            "https://api.boekhoudgemak.nl/V221"
        );
        assert_eq!(
            target.base_uri(Deployment { sandbox: true, version: 221 }),
            "https://sandbox-api.boekhoudgemak.nl/V221"
        );
    }

    #[test]
    fn test_custom_target_uses_own_default_version() {
        let target = ApiTarget::custom("example.test", 30);
        assert_eq!(target.default_version(), 30);
        assert_eq!(
            target.base_uri(Deployment { sandbox: false, version: target.default_version() }),
            "https://api.example.test/V30"
        );
    }

    #[test]
    fn test_target_from_name() {
        assert_eq!(ApiTarget::from_name("Multivers"), Some(ApiTarget::MULTIVERS));
        assert_eq!(ApiTarget::from_name(" boekhoudgemak "), Some(ApiTarget::BOEKHOUDGEMAK));
        assert_eq!(ApiTarget::from_name("exact"), None);
    }

    #[test]
    fn test_fixed_base_uri_ignores_deployment() {
        let fixed = FixedBaseUri::new("http://127.0.0.1:8080/");
        assert_eq!(fixed.base_uri(Deployment { sandbox: true, version: 99 }), "http://127.0.0.1:8080");
        assert_eq!(fixed.base_uri(Deployment::default()), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_default_deployment() {
        let deployment = Deployment::default();
        assert!(!deployment.sandbox);
        assert_eq!(deployment.version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_oauth_paths() {
        assert!(is_oauth_path("/OAuth/Token"));
        assert!(is_oauth_path("/OAuth/Authorize"));
        assert!(!is_oauth_path("/api/AdministrationInfoList"));
        assert!(!is_oauth_path("/oauth/token"));
    }

    #[test]
    fn test_base_headers() {
        let headers = base_headers();
        assert_eq!(headers.get(CACHE_CONTROL).map(HeaderValue::as_bytes), Some(&b"no-cache"[..]));
        assert_eq!(headers.get(CONNECTION).map(HeaderValue::as_bytes), Some(&b"close"[..]));
        assert_eq!(
            headers.get(ACCEPT).map(HeaderValue::as_bytes),
            Some(&b"application/json"[..])
        );
    }
}
