//! Download URL resolution
//!
//! URLs are never stored. They are rebuilt from the artifact id and the base address
//! chosen at startup, so a new public hostname after a redeploy fixes every link.

use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use tracing::{info, warn};
use url::Url;

use super::error::StorageError;
use super::naming::ArtifactId;
use crate::config::StorageConfig;

/// Route prefix under which presentations are served
pub const PRESENTATIONS_ROUTE: &str = "/presentations";

/// Where the base address came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseUrlSource {
    /// `BASE_URL`
    Configured,
    /// Public URL announced by the hosting platform
    Platform,
    /// The socket the server is bound to
    Detected,
    /// Bound to a wildcard address; nothing better than localhost is known
    Placeholder,
}

impl BaseUrlSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseUrlSource::Configured => "configured",
            BaseUrlSource::Platform => "platform",
            BaseUrlSource::Detected => "detected",
            BaseUrlSource::Placeholder => "placeholder",
        }
    }
}

/// Fully qualified link to a stored presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DownloadUrl(String);

impl DownloadUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DownloadUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds `<base>/presentations/<id>` links
#[derive(Debug, Clone)]
pub struct UrlResolver {
    base: String,
    source: BaseUrlSource,
}

impl UrlResolver {
    /// Pick the base address: `BASE_URL`, then the platform URL, then the bound socket.
    ///
    /// An invalid `BASE_URL` is a configuration error. A guessed address is logged at
    /// warn level so the operator knows links may not be reachable from outside.
    pub fn from_config(config: &StorageConfig, bound: SocketAddr) -> Result<Self, StorageError> {
        if let Some(raw) = &config.base_url {
            let base = normalize_base(raw)
                .map_err(|reason| StorageError::Configuration(format!("BASE_URL {}", reason)))?;
            info!(base_url = %base, "Using configured base URL");
            return Ok(Self::new(base, BaseUrlSource::Configured));
        }

        if let Some(raw) = &config.platform_url {
            match normalize_base(raw) {
                Ok(base) => {
                    info!(base_url = %base, "Using platform-provided base URL");
                    return Ok(Self::new(base, BaseUrlSource::Platform));
                }
                Err(reason) => warn!(url = %raw, "Ignoring platform URL: {}", reason),
            }
        }

        let resolver = Self::detect(bound);
        warn!(
            base_url = %resolver.base,
            source = resolver.source.as_str(),
            "BASE_URL not set; download links use an auto-detected address that may not be reachable behind a proxy"
        );
        Ok(resolver)
    }

    /// Resolver with an explicit, already trusted base address
    #[cfg(test)]
    pub fn with_base(raw: &str) -> Result<Self, StorageError> {
        let base = normalize_base(raw)
            .map_err(|reason| StorageError::Configuration(format!("base URL {}", reason)))?;
        Ok(Self::new(base, BaseUrlSource::Configured))
    }

    fn new(base: String, source: BaseUrlSource) -> Self {
        Self { base, source }
    }

    fn detect(bound: SocketAddr) -> Self {
        if bound.ip().is_unspecified() {
            Self::new(
                format!("http://localhost:{}", bound.port()),
                BaseUrlSource::Placeholder,
            )
        } else {
            Self::new(format!("http://{}", bound), BaseUrlSource::Detected)
        }
    }

    pub fn resolve(&self, id: &ArtifactId) -> DownloadUrl {
        DownloadUrl(format!("{}{}/{}", self.base, PRESENTATIONS_ROUTE, id))
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn source(&self) -> BaseUrlSource {
        self.source
    }

    /// Operator-facing note when links are built from a guessed address
    pub fn warning(&self) -> Option<String> {
        match self.source {
            BaseUrlSource::Configured | BaseUrlSource::Platform => None,
            BaseUrlSource::Detected => Some(format!(
                "BASE_URL not set; download links use the bound address {} which may be hidden by a proxy",
                self.base
            )),
            BaseUrlSource::Placeholder => Some(format!(
                "BASE_URL not set and the server is bound to a wildcard address; download links use placeholder {}",
                self.base
            )),
        }
    }
}

/// Validate an absolute http(s) base address and strip trailing slashes
fn normalize_base(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("'{}' must use http or https", raw));
    }
    if parsed.host_str().is_none() {
        return Err(format!("'{}' has no host", raw));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(format!("'{}' must not carry a query or fragment", raw));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use std::path::PathBuf;

    fn config(base_url: Option<&str>, platform_url: Option<&str>) -> StorageConfig {
        StorageConfig {
            backend: BackendConfig::Local {
                root: PathBuf::from("./presentations"),
            },
            base_url: base_url.map(String::from),
            platform_url: platform_url.map(String::from),
        }
    }

    fn wildcard() -> SocketAddr {
        "0.0.0.0:8000".parse().unwrap()
    }

    #[test]
    fn test_resolve_with_configured_base() {
        let resolver = UrlResolver::with_base("https://svc.example.com").unwrap();
        let id = ArtifactId::parse("demo123").unwrap();
        assert_eq!(
            resolver.resolve(&id).as_str(),
            "https://svc.example.com/presentations/demo123"
        );
        assert_eq!(resolver.source(), BaseUrlSource::Configured);
        assert!(resolver.warning().is_none());
    }

    #[test]
    fn test_trailing_slashes_and_paths() {
        let id = ArtifactId::parse("demo123").unwrap();

        let resolver = UrlResolver::with_base("https://svc.example.com///").unwrap();
        assert_eq!(
            resolver.resolve(&id).to_string(),
            "https://svc.example.com/presentations/demo123"
        );

        let resolver = UrlResolver::with_base("https://example.com/ppt/").unwrap();
        assert_eq!(
            resolver.resolve(&id).to_string(),
            "https://example.com/ppt/presentations/demo123"
        );
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        for bad in ["svc.example.com", "ftp://svc.example.com", "https://svc.example.com/?x=1"] {
            let err = UrlResolver::from_config(&config(Some(bad), None), wildcard()).unwrap_err();
            assert!(matches!(err, StorageError::Configuration(_)), "{bad}");
        }
    }

    #[test]
    fn test_configured_beats_platform() {
        let resolver = UrlResolver::from_config(
            &config(Some("https://decks.example.com"), Some("https://svc.onrender.com")),
            wildcard(),
        )
        .unwrap();
        assert_eq!(resolver.base_url(), "https://decks.example.com");
    }

    #[test]
    fn test_platform_url_used_when_base_missing() {
        let resolver =
            UrlResolver::from_config(&config(None, Some("https://svc.onrender.com")), wildcard())
                .unwrap();
        assert_eq!(resolver.base_url(), "https://svc.onrender.com");
        assert_eq!(resolver.source(), BaseUrlSource::Platform);
    }

    #[test]
    fn test_invalid_platform_url_falls_back_to_detection() {
        let resolver =
            UrlResolver::from_config(&config(None, Some("not a url")), wildcard()).unwrap();
        assert_eq!(resolver.source(), BaseUrlSource::Placeholder);
    }

    #[test]
    fn test_wildcard_bind_yields_marked_placeholder() {
        let resolver = UrlResolver::from_config(&config(None, None), wildcard()).unwrap();
        assert_eq!(resolver.base_url(), "http://localhost:8000");
        assert_eq!(resolver.source(), BaseUrlSource::Placeholder);
        assert!(resolver.warning().unwrap().contains("placeholder"));
    }

    #[test]
    fn test_specific_bind_is_detected() {
        let resolver =
            UrlResolver::from_config(&config(None, None), "10.0.0.7:9000".parse().unwrap())
                .unwrap();
        assert_eq!(resolver.base_url(), "http://10.0.0.7:9000");
        assert_eq!(resolver.source(), BaseUrlSource::Detected);
        assert!(resolver.warning().is_some());

        let v6 = UrlResolver::from_config(&config(None, None), "[::1]:8000".parse().unwrap())
            .unwrap();
        assert_eq!(v6.base_url(), "http://[::1]:8000");
    }
}
