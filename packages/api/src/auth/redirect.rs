//! Return-URL policy: where the gateway may send a browser after login or logout.

use reqwest::Url;

use crate::config::ConfigError;

/// Hosts the gateway is allowed to redirect to, plus their subdomains.
///
/// The first host is the primary one: relative return paths resolve against it and it
/// supplies the fallback destinations.
#[derive(Debug, Clone)]
pub struct ReturnPolicy {
    hosts: Vec<String>,
}

impl ReturnPolicy {
    /// Parse a comma separated host list such as `ledd.live,ledd.app`.
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let hosts: Vec<String> = raw
            .split(',')
            .map(|h| h.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        if hosts.is_empty() {
            return Err(ConfigError::Missing("AUTH_ALLOWED_RETURN_HOSTS"));
        }
        Ok(Self { hosts })
    }

    pub fn primary_host(&self) -> &str {
        &self.hosts[0]
    }

    pub fn home(&self) -> String {
        format!("https://{}/", self.primary_host())
    }

    /// Destination after login when the caller gave nothing usable.
    pub fn default_continue(&self) -> String {
        format!("https://{}/me", self.primary_host())
    }

    /// Absolute http(s) URL whose host is an allowed host or a subdomain of one.
    pub fn is_allowed(&self, url: &str) -> bool {
        Url::parse(url).ok().and_then(|u| self.check(u)).is_some()
    }

    /// The serialized form of `url` if it passes the host check.
    fn check(&self, url: Url) -> Option<String> {
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        self.hosts
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{allowed}")))
            .then(|| url.to_string())
    }

    /// Resolve a caller-supplied return target.
    ///
    /// `/path` style values are joined onto the primary host; anything else must pass
    /// [`is_allowed`](Self::is_allowed). The result is always the parsed, re-serialized
    /// URL, falling back to the default destination.
    pub fn pick(&self, candidate: Option<&str>) -> String {
        let Some(candidate) = candidate.map(str::trim).filter(|c| !c.is_empty()) else {
            return self.default_continue();
        };

        let resolved = if candidate.starts_with('/') {
            Url::parse(&self.home()).and_then(|base| base.join(candidate))
        } else {
            Url::parse(candidate)
        };

        resolved
            .ok()
            .and_then(|url| self.check(url))
            .unwrap_or_else(|| self.default_continue())
    }

    /// Like [`pick`](Self::pick) but only accepts absolute allowed URLs.
    pub fn allowed(&self, candidate: Option<&str>) -> Option<String> {
        let url = Url::parse(candidate?.trim()).ok()?;
        self.check(url)
    }
}
