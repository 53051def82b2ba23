mod api;
pub mod memory;
pub mod remote;

pub use api::{
    CreateBlob, CreateCommit, CreateTree, GitDataApi, RefObject, RefResponse, ShaResponse,
    TreeEntry, UpdateRef, BLOB_MODE, BLOB_TYPE,
};
pub use memory::{HostCall, HostOperation, MemoryGitHost};
pub use remote::GitHubGitDataApi;
