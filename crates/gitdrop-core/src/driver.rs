use std::fmt;
use std::sync::Arc;

use crate::model::RepositoryCoordinate;
use crate::relay::{RelayTransport, RelayUploadRequest};

pub const RETRY_HINT_MESSAGE: &str = "Error uploading file. Please try again.";

#[derive(Clone, Debug, PartialEq)]
pub enum FileStatus {
    Pending,
    Uploading,
    Success(String),
    Error(String),
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Success(_) | FileStatus::Error(_))
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Pending => f.write_str("pending"),
            FileStatus::Uploading => f.write_str("uploading"),
            FileStatus::Success(message) => write!(f, "success: {message}"),
            FileStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub status: FileStatus,
}

pub trait StatusObserver: Send + Sync {
    fn on_status(&self, file: &FileUpload);
}

/// Feeds files to the relay one at a time, in the order they were given.
pub struct UploadDriver {
    transport: Arc<dyn RelayTransport>,
    coordinate: RepositoryCoordinate,
    observer: Option<Arc<dyn StatusObserver>>,
}

impl UploadDriver {
    pub fn new(transport: Arc<dyn RelayTransport>, coordinate: RepositoryCoordinate) -> Self {
        Self {
            transport,
            coordinate,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn run(&self, files: Vec<(String, Vec<u8>)>) -> Vec<FileUpload> {
        let mut uploads: Vec<FileUpload> = files
            .into_iter()
            .map(|(file_name, content)| FileUpload {
                file_name,
                content,
                status: FileStatus::Pending,
            })
            .collect();

        for upload in &uploads {
            self.notify(upload);
        }

        for upload in uploads.iter_mut() {
            upload.status = FileStatus::Uploading;
            self.notify(upload);

            let request =
                RelayUploadRequest::new(&upload.file_name, &upload.content, &self.coordinate);

            upload.status = match self.transport.send(&request).await {
                Ok(response) => FileStatus::Success(response.message),
                Err(err) => {
                    tracing::error!("uploading {} failed: {:#}", upload.file_name, err);
                    FileStatus::Error(RETRY_HINT_MESSAGE.to_string())
                }
            };
            self.notify(upload);
        }

        uploads
    }

    fn notify(&self, upload: &FileUpload) {
        if let Some(observer) = &self.observer {
            observer.on_status(upload);
        }
    }
}
