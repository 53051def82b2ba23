use std::fmt;

use thiserror::Error;

/// One of the five ordered Git Data API calls making up an upload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UploadStep {
    ResolveHead,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl UploadStep {
    pub const TOTAL: usize = 5;

    pub const ALL: [UploadStep; UploadStep::TOTAL] = [
        UploadStep::ResolveHead,
        UploadStep::CreateBlob,
        UploadStep::CreateTree,
        UploadStep::CreateCommit,
        UploadStep::UpdateRef,
    ];

    pub fn ordinal(&self) -> usize {
        match self {
            UploadStep::ResolveHead => 1,
            UploadStep::CreateBlob => 2,
            UploadStep::CreateTree => 3,
            UploadStep::CreateCommit => 4,
            UploadStep::UpdateRef => 5,
        }
    }

    pub fn progress(&self) -> f32 {
        self.ordinal() as f32 / UploadStep::TOTAL as f32
    }
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStep::ResolveHead => "resolve branch head",
            UploadStep::CreateBlob => "create blob",
            UploadStep::CreateTree => "create tree",
            UploadStep::CreateCommit => "create commit",
            UploadStep::UpdateRef => "update ref",
        };

        f.write_str(name)
    }
}

/// Failure reported by a Git Data API host for a single call.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HostError {
    #[error("host responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl HostError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HostError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HostError::Decode(err.to_string())
        } else {
            HostError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("GitHub token is not configured")]
    Configuration,

    #[error("branch {branch} not found in {owner}/{repo}: {source}")]
    RefNotFound {
        owner: String,
        repo: String,
        branch: String,
        source: HostError,
    },

    #[error("{step} failed: {source}")]
    HostRequest { step: UploadStep, source: HostError },

    #[error("branch {branch} moved before it could be updated: {source}")]
    StaleRef { branch: String, source: HostError },

    #[error("invalid upload request: {0}")]
    InvalidRequest(String),
}

impl UploadError {
    /// Short machine-friendly label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Configuration => "configuration",
            UploadError::RefNotFound { .. } => "ref_not_found",
            UploadError::HostRequest { .. } => "host_request",
            UploadError::StaleRef { .. } => "stale_ref",
            UploadError::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn step(&self) -> Option<UploadStep> {
        match self {
            UploadError::RefNotFound { .. } => Some(UploadStep::ResolveHead),
            UploadError::HostRequest { step, .. } => Some(*step),
            UploadError::StaleRef { .. } => Some(UploadStep::UpdateRef),
            _ => None,
        }
    }
}
