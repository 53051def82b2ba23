use std::time::Duration;

use anyhow::Context as _;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Context {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl Context {
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint =
            dotenvy::var("GITDROP_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            endpoint: Url::parse(&endpoint)
                .with_context(|| format!("GITDROP_ENDPOINT {endpoint} is not a valid url"))?,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}
