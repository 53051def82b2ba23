use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{CreateBlob, CreateCommit, CreateTree, GitDataApi, RefResponse, ShaResponse, UpdateRef};
use crate::error::HostError;
use crate::model::{AccessToken, GitObjectRef, RepositoryCoordinate};

pub const USER_AGENT: &str = "gitdrop/0.1.1";
pub const ACCEPT_HEADER: &str = "application/vnd.github+json";
pub const DEFAULT_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Git Data API client speaking to GitHub (or anything serving the same
/// routes under `api_url`).
#[derive(Clone, Debug)]
pub struct GitHubGitDataApi {
    client: Client,
    api_url: Url,
}

impl GitHubGitDataApi {
    pub fn new(api_url: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_url: with_trailing_slash(api_url),
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Appends `repos/{owner}/{repo}/git/{path..}` to the api url, one
    /// percent-encoded segment at a time.
    fn endpoint<'a>(
        &self,
        repo: &RepositoryCoordinate,
        path: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, HostError> {
        let mut url = self.api_url.clone();

        url.path_segments_mut()
            .map_err(|_| HostError::Transport(format!("{} cannot be a base url", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", repo.owner.as_str(), repo.repo.as_str(), "git"])
            .extend(path);

        Ok(url)
    }

    fn ref_endpoint(&self, repo: &RepositoryCoordinate) -> Result<Url, HostError> {
        self.endpoint(
            repo,
            ["refs", "heads"].into_iter().chain(repo.branch.split('/')),
        )
    }

    fn authorized(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        request
            .header(header::AUTHORIZATION, token.authorization())
            .header(header::ACCEPT, ACCEPT_HEADER)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: &AccessToken,
    ) -> Result<Response, HostError> {
        let response = self.authorized(request, token).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;

            tracing::debug!("github responded with {}: {}", status, message);

            return Err(HostError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &AccessToken,
    ) -> Result<T, HostError> {
        let response = self.send(request, token).await?;

        Ok(response.json::<T>().await?)
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}

/// GitHub error bodies carry a `message`; fall back to the reason phrase.
async fn error_message(response: Response) -> String {
    let reason = response
        .status()
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string();

    match response.json::<Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(|message| message.as_str())
            .map(|message| message.to_string())
            .unwrap_or(reason),
        Err(_) => reason,
    }
}

#[async_trait]
impl GitDataApi for GitHubGitDataApi {
    #[tracing::instrument(name = "github::get_ref", skip(self, token))]
    async fn get_ref(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
    ) -> Result<GitObjectRef, HostError> {
        let url = self.ref_endpoint(repo)?;

        let body: Value = self.send_json(self.client.get(url), token).await?;

        // The plural refs route answers a partial name with an array of
        // every ref sharing the prefix instead of a 404.
        if body.is_array() {
            return Err(HostError::Status {
                status: 404,
                message: format!("no ref named {}", repo.head_ref()),
            });
        }

        let head: RefResponse =
            serde_json::from_value(body).map_err(|err| HostError::Decode(err.to_string()))?;

        Ok(head.object.sha)
    }

    #[tracing::instrument(name = "github::create_blob", skip_all, fields(repo = %repo))]
    async fn create_blob(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        blob: &CreateBlob,
    ) -> Result<GitObjectRef, HostError> {
        let url = self.endpoint(repo, ["blobs"])?;

        let created: ShaResponse = self
            .send_json(self.client.post(url).json(blob), token)
            .await?;

        Ok(created.sha)
    }

    #[tracing::instrument(name = "github::create_tree", skip(self, token))]
    async fn create_tree(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        tree: &CreateTree,
    ) -> Result<GitObjectRef, HostError> {
        let url = self.endpoint(repo, ["trees"])?;

        let created: ShaResponse = self
            .send_json(self.client.post(url).json(tree), token)
            .await?;

        Ok(created.sha)
    }

    #[tracing::instrument(name = "github::create_commit", skip(self, token))]
    async fn create_commit(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        commit: &CreateCommit,
    ) -> Result<GitObjectRef, HostError> {
        let url = self.endpoint(repo, ["commits"])?;

        let created: ShaResponse = self
            .send_json(self.client.post(url).json(commit), token)
            .await?;

        Ok(created.sha)
    }

    #[tracing::instrument(name = "github::update_ref", skip(self, token))]
    async fn update_ref(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        update: &UpdateRef,
    ) -> Result<(), HostError> {
        let url = self.ref_endpoint(repo)?;

        self.send(self.client.patch(url).json(update), token).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> GitHubGitDataApi {
        GitHubGitDataApi::new(&Url::parse(api_url).unwrap(), DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn test_endpoint_for_default_api() {
        let api = client(DEFAULT_API_URL);
        let repo = RepositoryCoordinate::new("adeshgg", "test-upload", "main");

        assert_eq!(
            api.ref_endpoint(&repo).unwrap().as_str(),
            "https://api.github.com/repos/adeshgg/test-upload/git/refs/heads/main"
        );
        assert_eq!(
            api.endpoint(&repo, ["blobs"]).unwrap().as_str(),
            "https://api.github.com/repos/adeshgg/test-upload/git/blobs"
        );
    }

    #[test]
    fn test_endpoint_keeps_enterprise_prefix() {
        let api = client("https://ghe.example.com/api/v3");
        let repo = RepositoryCoordinate::new("team", "docs", "main");

        assert_eq!(api.api_url().as_str(), "https://ghe.example.com/api/v3/");
        assert_eq!(
            api.endpoint(&repo, ["trees"]).unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/team/docs/git/trees"
        );
    }

    #[test]
    fn test_reserved_characters_stay_in_the_ref_path() {
        let api = client(DEFAULT_API_URL);

        let url = api
            .ref_endpoint(&RepositoryCoordinate::new("octo", "notes", "fix#12"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/notes/git/refs/heads/fix%2312"
        );
        assert_eq!(url.fragment(), None);

        let url = api
            .ref_endpoint(&RepositoryCoordinate::new("octo", "notes", "wip?draft"))
            .unwrap();
        assert_eq!(url.path(), "/repos/octo/notes/git/refs/heads/wip%3Fdraft");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_nested_branch_keeps_its_slashes() {
        let api = client("https://ghe.example.com/api/v3");
        let repo = RepositoryCoordinate::new("team", "docs", "feature/new docs");

        assert_eq!(
            api.ref_endpoint(&repo).unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/team/docs/git/refs/heads/feature/new%20docs"
        );
    }

    #[test]
    fn test_user_agent_constant() {
        assert!(USER_AGENT.starts_with("gitdrop/"));
        assert_eq!(ACCEPT_HEADER, "application/vnd.github+json");
    }
}
