pub mod driver;
pub mod encoding;
pub mod error;
pub mod git;
pub mod model;
pub mod relay;
pub mod uploader;

pub use driver::{FileStatus, FileUpload, StatusObserver, UploadDriver};
pub use error::{HostError, UploadError, UploadStep};
pub use model::{
    AccessToken, GitObjectRef, RepositoryCoordinate, UploadOutcome, UploadReceipt, UploadRequest,
};
pub use relay::{ContentEncoding, HttpRelay, RelayTransport, RelayUploadRequest, RelayUploadResponse};
pub use uploader::{UploadObserver, Uploader};
