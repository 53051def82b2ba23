//! The relay endpoint's JSON contract and a client for it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::encoding::{decode_from_relay, encode_for_relay};
use crate::error::UploadError;
use crate::model::{RepositoryCoordinate, UploadRequest, DEFAULT_BRANCH};

pub const UPLOAD_ROUTE: &str = "/api/upload-to-github";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ContentEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayUploadRequest {
    pub file_name: String,
    pub content: String,
    pub owner: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub encoding: ContentEncoding,
}

impl RelayUploadRequest {
    pub fn new(file_name: &str, content: &[u8], coordinate: &RepositoryCoordinate) -> Self {
        let (content, encoding) = encode_for_relay(content);

        Self {
            file_name: file_name.to_string(),
            content,
            owner: coordinate.owner.clone(),
            repo: coordinate.repo.clone(),
            branch: Some(coordinate.branch.clone()),
            encoding,
        }
    }

    pub fn into_upload_request(self) -> Result<UploadRequest, UploadError> {
        let content = decode_from_relay(&self.content, self.encoding).map_err(|err| {
            UploadError::InvalidRequest(format!("content is not valid base64: {err}"))
        })?;

        let branch = self.branch.as_deref().unwrap_or(DEFAULT_BRANCH);

        Ok(UploadRequest {
            coordinate: RepositoryCoordinate::new(&self.owner, &self.repo, branch),
            file_name: self.file_name,
            content,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayUploadResponse {
    pub message: String,
}

impl RelayUploadResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// How the upload driver reaches the relay.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: &RelayUploadRequest) -> anyhow::Result<RelayUploadResponse>;
}

#[derive(Clone, Debug)]
pub struct HttpRelay {
    client: reqwest::Client,
    upload_url: Url,
}

impl HttpRelay {
    pub fn new(endpoint: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let upload_url = endpoint.join(UPLOAD_ROUTE)?;

        Ok(Self { client, upload_url })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    #[tracing::instrument(name = "relay::send", skip_all, fields(file_name = %request.file_name))]
    async fn send(&self, request: &RelayUploadRequest) -> anyhow::Result<RelayUploadResponse> {
        let response = self
            .client
            .post(self.upload_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body: RelayUploadResponse = response.json().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "relay responded with {}: {}",
                status,
                body.message
            ));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_branch_defaults_to_main() -> anyhow::Result<()> {
        let request: RelayUploadRequest = serde_json::from_value(json!({
            "fileName": "hello.txt",
            "content": "hi",
            "owner": "adeshgg",
            "repo": "test-upload"
        }))?;

        assert_eq!(request.encoding, ContentEncoding::Utf8);

        let upload = request.into_upload_request()?;
        assert_eq!(upload.coordinate.branch, "main");
        assert_eq!(upload.content, b"hi".to_vec());
        assert_eq!(upload.file_name, "hello.txt");

        Ok(())
    }

    #[test]
    fn test_base64_content_is_decoded() -> anyhow::Result<()> {
        let request: RelayUploadRequest = serde_json::from_value(json!({
            "fileName": "logo.png",
            "content": "iVBORw0=",
            "owner": "adeshgg",
            "repo": "test-upload",
            "branch": "assets",
            "encoding": "base64"
        }))?;

        let upload = request.into_upload_request()?;
        assert_eq!(upload.coordinate.branch, "assets");
        assert_eq!(upload.content, vec![0x89, 0x50, 0x4e, 0x47, 0x0d]);

        Ok(())
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let request = RelayUploadRequest {
            file_name: "logo.png".to_string(),
            content: "%%%".to_string(),
            owner: "adeshgg".to_string(),
            repo: "test-upload".to_string(),
            branch: None,
            encoding: ContentEncoding::Base64,
        };

        let err = request.into_upload_request().unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn test_wire_names() {
        let coordinate = RepositoryCoordinate::new("adeshgg", "test-upload", "main");
        let request = RelayUploadRequest::new("hello.txt", b"hi", &coordinate);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "fileName": "hello.txt",
                "content": "hi",
                "owner": "adeshgg",
                "repo": "test-upload",
                "branch": "main",
                "encoding": "utf-8"
            })
        );
    }

    #[test]
    fn test_upload_url() -> anyhow::Result<()> {
        let endpoint = Url::parse("http://localhost:3000")?;
        let relay = HttpRelay::new(&endpoint, Duration::from_secs(5))?;

        assert_eq!(
            relay.upload_url().as_str(),
            "http://localhost:3000/api/upload-to-github"
        );

        Ok(())
    }
}
