use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::encoding::{encode_blob, BLOB_ENCODING};
use crate::error::HostError;
use crate::model::{AccessToken, GitObjectRef, RepositoryCoordinate};

pub const BLOB_MODE: &str = "100644";
pub const BLOB_TYPE: &str = "blob";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefResponse {
    pub object: RefObject,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefObject {
    pub sha: GitObjectRef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShaResponse {
    pub sha: GitObjectRef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateBlob {
    pub content: String,
    pub encoding: String,
}

impl CreateBlob {
    pub fn from_bytes(content: &[u8]) -> Self {
        Self {
            content: encode_blob(content),
            encoding: BLOB_ENCODING.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: GitObjectRef,
}

impl TreeEntry {
    /// Regular, non-executable file entry.
    pub fn file(path: &str, sha: &GitObjectRef) -> Self {
        Self {
            path: path.to_string(),
            mode: BLOB_MODE.to_string(),
            kind: BLOB_TYPE.to_string(),
            sha: sha.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateTree {
    pub base_tree: GitObjectRef,
    pub tree: Vec<TreeEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateCommit {
    pub message: String,
    pub tree: GitObjectRef,
    pub parents: Vec<GitObjectRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateRef {
    pub sha: GitObjectRef,
}

/// The subset of GitHub's Git Data API needed to land one file as one commit.
///
/// Every call is authorized with the caller-provided token and addressed to
/// the repository in `repo`. Implementations report host-level failures only;
/// deciding what a failure means for the upload is left to the caller.
#[async_trait]
pub trait GitDataApi: Send + Sync {
    async fn get_ref(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
    ) -> Result<GitObjectRef, HostError>;

    async fn create_blob(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        blob: &CreateBlob,
    ) -> Result<GitObjectRef, HostError>;

    async fn create_tree(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        tree: &CreateTree,
    ) -> Result<GitObjectRef, HostError>;

    async fn create_commit(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        commit: &CreateCommit,
    ) -> Result<GitObjectRef, HostError>;

    async fn update_ref(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        update: &UpdateRef,
    ) -> Result<(), HostError>;
}
