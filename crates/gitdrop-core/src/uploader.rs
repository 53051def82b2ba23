use std::sync::Arc;

use url::Url;
use uuid::Uuid;

use crate::error::{HostError, UploadError, UploadStep};
use crate::git::{CreateBlob, CreateCommit, CreateTree, GitDataApi, TreeEntry, UpdateRef};
use crate::model::{AccessToken, UploadOutcome, UploadReceipt, UploadRequest};

pub const DEFAULT_HTML_URL: &str = "https://github.com/";
pub const UPLOAD_FAILED_MESSAGE: &str = "Error uploading file";

/// Notified before each step of an upload starts.
pub trait UploadObserver: Send + Sync {
    fn on_step(&self, request: &UploadRequest, step: UploadStep);
}

/// Lands one file as one commit on the tip of a branch.
pub struct Uploader {
    host: Arc<dyn GitDataApi>,
    token: Option<AccessToken>,
    html_url: String,
    observer: Option<Arc<dyn UploadObserver>>,
}

impl Uploader {
    pub fn new(host: Arc<dyn GitDataApi>, token: Option<AccessToken>) -> Self {
        Self {
            host,
            token,
            html_url: DEFAULT_HTML_URL.to_string(),
            observer: None,
        }
    }

    pub fn with_html_url(mut self, html_url: &Url) -> Self {
        self.html_url = html_url.to_string();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Runs the upload and folds every failure into a generic outcome; the
    /// actual cause is only logged.
    #[tracing::instrument(
        name = "uploader::upload",
        skip_all,
        fields(
            upload_id = %Uuid::new_v4(),
            file_name = %request.file_name,
            repo = %request.coordinate,
        )
    )]
    pub async fn upload(&self, request: &UploadRequest) -> UploadOutcome {
        match self.try_upload(request).await {
            Ok(receipt) => {
                tracing::info!("uploaded as commit {}", receipt.commit);
                UploadOutcome::Success { url: receipt.url }
            }
            Err(err) => {
                tracing::error!(kind = err.kind(), step = ?err.step(), "upload failed: {}", err);

                let reason = if matches!(err, UploadError::Configuration) {
                    err.to_string()
                } else {
                    UPLOAD_FAILED_MESSAGE.to_string()
                };

                UploadOutcome::Failure { reason }
            }
        }
    }

    pub async fn try_upload(
        &self,
        request: &UploadRequest,
    ) -> Result<UploadReceipt, UploadError> {
        let token = self.token.as_ref().ok_or(UploadError::Configuration)?;

        if request.file_name.is_empty() {
            return Err(UploadError::InvalidRequest(
                "file name must not be empty".to_string(),
            ));
        }

        if is_suspicious_path(&request.file_name) {
            tracing::warn!("writing outside-looking path {:?} verbatim", request.file_name);
        }

        let repo = &request.coordinate;

        self.notify(request, UploadStep::ResolveHead);
        let parent = self
            .host
            .get_ref(token, repo)
            .await
            .map_err(|source| match source.status() {
                Some(404) | Some(403) => UploadError::RefNotFound {
                    owner: repo.owner.clone(),
                    repo: repo.repo.clone(),
                    branch: repo.branch.clone(),
                    source,
                },
                _ => step_failed(UploadStep::ResolveHead, source),
            })?;
        tracing::debug!("branch head is {}", parent);

        self.notify(request, UploadStep::CreateBlob);
        let blob = self
            .host
            .create_blob(token, repo, &CreateBlob::from_bytes(&request.content))
            .await
            .map_err(|source| step_failed(UploadStep::CreateBlob, source))?;

        self.notify(request, UploadStep::CreateTree);
        let tree = self
            .host
            .create_tree(
                token,
                repo,
                &CreateTree {
                    base_tree: parent.clone(),
                    tree: vec![TreeEntry::file(&request.file_name, &blob)],
                },
            )
            .await
            .map_err(|source| step_failed(UploadStep::CreateTree, source))?;

        self.notify(request, UploadStep::CreateCommit);
        let commit = self
            .host
            .create_commit(
                token,
                repo,
                &CreateCommit {
                    message: request.commit_message(),
                    tree,
                    parents: vec![parent],
                },
            )
            .await
            .map_err(|source| step_failed(UploadStep::CreateCommit, source))?;

        self.notify(request, UploadStep::UpdateRef);
        self.host
            .update_ref(
                token,
                repo,
                &UpdateRef {
                    sha: commit.clone(),
                },
            )
            .await
            .map_err(|source| match source.status() {
                Some(409) | Some(422) => UploadError::StaleRef {
                    branch: repo.branch.clone(),
                    source,
                },
                _ => step_failed(UploadStep::UpdateRef, source),
            })?;

        Ok(UploadReceipt {
            url: self.file_url(request),
            commit,
        })
    }

    pub fn file_url(&self, request: &UploadRequest) -> String {
        let repo = &request.coordinate;

        format!(
            "{}/{}/{}/blob/{}/{}",
            self.html_url.trim_end_matches('/'),
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.repo),
            encode_path(&repo.branch),
            encode_path(&request.file_name)
        )
    }

    fn notify(&self, request: &UploadRequest, step: UploadStep) {
        tracing::debug!("step {}/{}: {}", step.ordinal(), UploadStep::TOTAL, step);

        if let Some(observer) = &self.observer {
            observer.on_step(request, step);
        }
    }
}

fn step_failed(step: UploadStep, source: HostError) -> UploadError {
    UploadError::HostRequest { step, source }
}

/// Percent-encodes each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_suspicious_path(path: &str) -> bool {
    path.starts_with('/') || path.split('/').any(|segment| segment == "..")
}
