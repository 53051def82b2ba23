use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gitdrop_core::git::GitHubGitDataApi;
use gitdrop_core::{AccessToken, Uploader};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "0.0.0.0:3000";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_HTML_URL: &str = "https://github.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Process-wide settings, read once at startup.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub endpoint: SocketAddr,
    pub github_token: Option<AccessToken>,
    pub github_api_url: Url,
    pub github_html_url: Url,
    pub request_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let endpoint = lookup("ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint: SocketAddr = endpoint
            .parse()
            .with_context(|| format!("ENDPOINT {endpoint} is not a socket address"))?;

        let github_token = lookup("GITHUB_TOKEN")
            .filter(|token| !token.is_empty())
            .map(|token| AccessToken::new(&token));

        let github_api_url = parse_url(&lookup, "GITHUB_API_URL", DEFAULT_GITHUB_API_URL)?;
        let github_html_url = parse_url(&lookup, "GITHUB_HTML_URL", DEFAULT_GITHUB_HTML_URL)?;

        let request_timeout = match lookup("GITHUB_REQUEST_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .with_context(|| format!("GITHUB_REQUEST_TIMEOUT_SECS {secs} is not a number"))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            endpoint,
            github_token,
            github_api_url,
            github_html_url,
            request_timeout: Duration::from_secs(request_timeout),
        })
    }

    pub fn uploader(&self) -> anyhow::Result<Uploader> {
        let github = GitHubGitDataApi::new(&self.github_api_url, self.request_timeout)?;

        Ok(Uploader::new(Arc::new(github), self.github_token.clone())
            .with_html_url(&self.github_html_url))
    }
}

fn parse_url(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> anyhow::Result<Url> {
    let value = lookup(key).unwrap_or_else(|| default.to_string());

    Url::parse(&value).with_context(|| format!("{key} {value} is not a valid url"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let config = config(&[])?;

        assert_eq!(config.endpoint.to_string(), "0.0.0.0:3000");
        assert!(config.github_token.is_none());
        assert_eq!(config.github_api_url.as_str(), "https://api.github.com/");
        assert_eq!(config.github_html_url.as_str(), "https://github.com/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));

        Ok(())
    }

    #[test]
    fn test_overrides() -> anyhow::Result<()> {
        let config = config(&[
            ("ENDPOINT", "127.0.0.1:8080"),
            ("GITHUB_TOKEN", "ghp_configured"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
            ("GITHUB_HTML_URL", "https://ghe.example.com"),
            ("GITHUB_REQUEST_TIMEOUT_SECS", "5"),
        ])?;

        assert_eq!(config.endpoint.port(), 8080);
        assert_eq!(config.github_token, Some(AccessToken::new("ghp_configured")));
        assert_eq!(config.github_api_url.host_str(), Some("ghe.example.com"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        config.uploader()?;

        Ok(())
    }

    #[test]
    fn test_empty_token_counts_as_missing() -> anyhow::Result<()> {
        let config = config(&[("GITHUB_TOKEN", "")])?;

        assert!(config.github_token.is_none());

        Ok(())
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(config(&[("ENDPOINT", "not-an-address")]).is_err());
        assert!(config(&[("GITHUB_API_URL", "::")]).is_err());
        assert!(config(&[("GITHUB_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
    }
}
