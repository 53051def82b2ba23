use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct RepositoryCoordinate {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepositoryCoordinate {
    pub fn new(owner: &str, repo: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        }
    }

    pub fn head_ref(&self) -> String {
        format!("heads/{}", self.branch)
    }
}

impl fmt::Display for RepositoryCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadRequest {
    pub file_name: String,
    pub content: Vec<u8>,
    pub coordinate: RepositoryCoordinate,
}

impl UploadRequest {
    pub fn new(
        file_name: &str,
        content: impl Into<Vec<u8>>,
        coordinate: RepositoryCoordinate,
    ) -> Self {
        Self {
            file_name: file_name.to_string(),
            content: content.into(),
            coordinate,
        }
    }

    pub fn commit_message(&self) -> String {
        format!("Upload {}", self.file_name)
    }
}

/// SHA handed back by the host for a blob, tree or commit.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GitObjectRef(pub String);

impl GitObjectRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GitObjectRef {
    fn from(sha: &str) -> Self {
        GitObjectRef(sha.to_string())
    }
}

impl fmt::Display for GitObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: &str) -> Self {
        AccessToken(token.to_string())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn authorization(&self) -> String {
        format!("token {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadReceipt {
    pub commit: GitObjectRef,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UploadOutcome {
    Success { url: String },
    Failure { reason: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn message(&self) -> String {
        match self {
            UploadOutcome::Success { url } => format!("File uploaded successfully @ {url}"),
            UploadOutcome::Failure { reason } => reason.clone(),
        }
    }
}
