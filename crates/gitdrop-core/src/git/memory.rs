use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CreateBlob, CreateCommit, CreateTree, GitDataApi, UpdateRef, BLOB_TYPE};
use crate::encoding::{decode_blob, BLOB_ENCODING};
use crate::error::HostError;
use crate::model::{AccessToken, GitObjectRef, RepositoryCoordinate};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HostOperation {
    GetRef,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

/// A request as the host received it, kept in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum HostCall {
    GetRef {
        repo: RepositoryCoordinate,
    },
    CreateBlob {
        repo: RepositoryCoordinate,
        blob: CreateBlob,
    },
    CreateTree {
        repo: RepositoryCoordinate,
        tree: CreateTree,
    },
    CreateCommit {
        repo: RepositoryCoordinate,
        commit: CreateCommit,
    },
    UpdateRef {
        repo: RepositoryCoordinate,
        update: UpdateRef,
    },
}

impl HostCall {
    pub fn operation(&self) -> HostOperation {
        match self {
            HostCall::GetRef { .. } => HostOperation::GetRef,
            HostCall::CreateBlob { .. } => HostOperation::CreateBlob,
            HostCall::CreateTree { .. } => HostOperation::CreateTree,
            HostCall::CreateCommit { .. } => HostOperation::CreateCommit,
            HostCall::UpdateRef { .. } => HostOperation::UpdateRef,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryCommit {
    pub message: String,
    pub tree: GitObjectRef,
    pub parents: Vec<GitObjectRef>,
}

type RefKey = (String, String, String);

#[derive(Debug, Default)]
struct HostState {
    repositories: HashSet<(String, String)>,
    refs: HashMap<RefKey, GitObjectRef>,
    blobs: HashMap<GitObjectRef, Vec<u8>>,
    trees: HashMap<GitObjectRef, BTreeMap<String, GitObjectRef>>,
    commits: HashMap<GitObjectRef, MemoryCommit>,
    calls: Vec<HostCall>,
    failures: HashMap<HostOperation, HostError>,
    race_on_update: bool,
    next_id: u64,
}

impl HostState {
    fn next_sha(&mut self) -> GitObjectRef {
        self.next_id += 1;
        GitObjectRef(format!("{:040x}", self.next_id))
    }

    fn check(
        &self,
        token: &AccessToken,
        accepted: &AccessToken,
        operation: HostOperation,
        repo: &RepositoryCoordinate,
    ) -> Result<(), HostError> {
        if token != accepted {
            return Err(status(401, "Bad credentials"));
        }

        if let Some(failure) = self.failures.get(&operation) {
            return Err(failure.clone());
        }

        if !self
            .repositories
            .contains(&(repo.owner.clone(), repo.repo.clone()))
        {
            return Err(status(404, "Not Found"));
        }

        Ok(())
    }

    fn tree_of(&self, sha: &GitObjectRef) -> Option<&BTreeMap<String, GitObjectRef>> {
        match self.trees.get(sha) {
            Some(tree) => Some(tree),
            None => self
                .commits
                .get(sha)
                .and_then(|commit| self.trees.get(&commit.tree)),
        }
    }

    fn is_ancestor(&self, ancestor: &GitObjectRef, descendant: &GitObjectRef) -> bool {
        let mut pending = vec![descendant.clone()];
        let mut seen = HashSet::new();

        while let Some(sha) = pending.pop() {
            if &sha == ancestor {
                return true;
            }

            if !seen.insert(sha.clone()) {
                continue;
            }

            if let Some(commit) = self.commits.get(&sha) {
                pending.extend(commit.parents.iter().cloned());
            }
        }

        false
    }
}

fn status(status: u16, message: &str) -> HostError {
    HostError::Status {
        status,
        message: message.to_string(),
    }
}

fn ref_key(repo: &RepositoryCoordinate) -> RefKey {
    (repo.owner.clone(), repo.repo.clone(), repo.branch.clone())
}

/// In-process stand-in for GitHub's Git Data API.
///
/// Objects are content-free counters rather than real hashes, but the host
/// enforces the same rules that matter to an upload: credentials, existing
/// refs, valid object ids, and fast-forward-only ref updates.
#[derive(Debug)]
pub struct MemoryGitHost {
    token: AccessToken,
    state: Mutex<HostState>,
}

impl MemoryGitHost {
    pub fn new(token: &str) -> Self {
        MemoryGitHost {
            token: AccessToken::new(token),
            state: Mutex::new(HostState::default()),
        }
    }

    /// Creates `repo.branch` pointing at a root commit with the sha `head`
    /// whose tree holds `files`.
    pub fn seed_branch(&self, repo: &RepositoryCoordinate, head: &str, files: &[(&str, &[u8])]) {
        let mut state = self.state.lock().unwrap();

        let mut entries = BTreeMap::new();
        for (path, contents) in files {
            let blob_sha = state.next_sha();
            state.blobs.insert(blob_sha.clone(), contents.to_vec());
            entries.insert(path.to_string(), blob_sha);
        }

        let tree_sha = state.next_sha();
        state.trees.insert(tree_sha.clone(), entries);

        let head = GitObjectRef::from(head);
        state.commits.insert(
            head.clone(),
            MemoryCommit {
                message: "Initial commit".to_string(),
                tree: tree_sha,
                parents: vec![],
            },
        );

        state
            .repositories
            .insert((repo.owner.clone(), repo.repo.clone()));
        state.refs.insert(ref_key(repo), head);
    }

    /// Makes every later call of `operation` fail with `status`.
    pub fn fail_on(&self, operation: HostOperation, status_code: u16, message: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .failures
            .insert(operation, status(status_code, message));
    }

    /// Moves the branch to a foreign commit right before the next ref
    /// update, as a concurrent writer would.
    pub fn race_on_update(&self) {
        self.state.lock().unwrap().race_on_update = true;
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn operations(&self) -> Vec<HostOperation> {
        self.calls().iter().map(HostCall::operation).collect()
    }

    pub fn call_count(&self, operation: HostOperation) -> usize {
        self.operations()
            .into_iter()
            .filter(|recorded| *recorded == operation)
            .count()
    }

    pub fn head(&self, repo: &RepositoryCoordinate) -> Option<GitObjectRef> {
        self.state.lock().unwrap().refs.get(&ref_key(repo)).cloned()
    }

    pub fn commit(&self, sha: &GitObjectRef) -> Option<MemoryCommit> {
        self.state.lock().unwrap().commits.get(sha).cloned()
    }

    pub fn tree(&self, sha: &GitObjectRef) -> Option<BTreeMap<String, GitObjectRef>> {
        self.state.lock().unwrap().trees.get(sha).cloned()
    }

    pub fn blob(&self, sha: &GitObjectRef) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blobs.get(sha).cloned()
    }

    /// Reads `path` from the tree of the branch head.
    pub fn read_file(&self, repo: &RepositoryCoordinate, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();

        let head = state.refs.get(&ref_key(repo))?;
        let blob_sha = state.tree_of(head)?.get(path)?;

        state.blobs.get(blob_sha).cloned()
    }
}

#[async_trait]
impl GitDataApi for MemoryGitHost {
    async fn get_ref(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
    ) -> Result<GitObjectRef, HostError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::GetRef { repo: repo.clone() });
        state.check(token, &self.token, HostOperation::GetRef, repo)?;

        state
            .refs
            .get(&ref_key(repo))
            .cloned()
            .ok_or_else(|| status(404, "Not Found"))
    }

    async fn create_blob(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        blob: &CreateBlob,
    ) -> Result<GitObjectRef, HostError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::CreateBlob {
            repo: repo.clone(),
            blob: blob.clone(),
        });
        state.check(token, &self.token, HostOperation::CreateBlob, repo)?;

        let contents = match blob.encoding.as_str() {
            BLOB_ENCODING => decode_blob(&blob.content)
                .map_err(|err| status(422, &format!("content is not valid base64: {err}")))?,
            "utf-8" => blob.content.as_bytes().to_vec(),
            other => return Err(status(422, &format!("unsupported encoding {other}"))),
        };

        let sha = state.next_sha();
        state.blobs.insert(sha.clone(), contents);

        Ok(sha)
    }

    async fn create_tree(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        tree: &CreateTree,
    ) -> Result<GitObjectRef, HostError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::CreateTree {
            repo: repo.clone(),
            tree: tree.clone(),
        });
        state.check(token, &self.token, HostOperation::CreateTree, repo)?;

        let mut entries = state
            .tree_of(&tree.base_tree)
            .cloned()
            .ok_or_else(|| status(422, "base_tree is not a valid tree or commit"))?;

        for entry in &tree.tree {
            if entry.path.is_empty() {
                return Err(status(422, "tree entry path must not be empty"));
            }

            if entry.kind != BLOB_TYPE || !state.blobs.contains_key(&entry.sha) {
                return Err(status(422, &format!("{} is not a valid blob", entry.sha)));
            }

            entries.insert(entry.path.clone(), entry.sha.clone());
        }

        let sha = state.next_sha();
        state.trees.insert(sha.clone(), entries);

        Ok(sha)
    }

    async fn create_commit(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        commit: &CreateCommit,
    ) -> Result<GitObjectRef, HostError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::CreateCommit {
            repo: repo.clone(),
            commit: commit.clone(),
        });
        state.check(token, &self.token, HostOperation::CreateCommit, repo)?;

        if !state.trees.contains_key(&commit.tree) {
            return Err(status(422, &format!("tree {} does not exist", commit.tree)));
        }

        if let Some(parent) = commit
            .parents
            .iter()
            .find(|parent| !state.commits.contains_key(*parent))
        {
            return Err(status(422, &format!("parent {parent} does not exist")));
        }

        let sha = state.next_sha();
        state.commits.insert(
            sha.clone(),
            MemoryCommit {
                message: commit.message.clone(),
                tree: commit.tree.clone(),
                parents: commit.parents.clone(),
            },
        );

        Ok(sha)
    }

    async fn update_ref(
        &self,
        token: &AccessToken,
        repo: &RepositoryCoordinate,
        update: &UpdateRef,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HostCall::UpdateRef {
            repo: repo.clone(),
            update: update.clone(),
        });
        state.check(token, &self.token, HostOperation::UpdateRef, repo)?;

        let key = ref_key(repo);
        let mut current = state
            .refs
            .get(&key)
            .cloned()
            .ok_or_else(|| status(422, "Reference does not exist"))?;

        if !state.commits.contains_key(&update.sha) {
            return Err(status(422, "Object does not exist"));
        }

        if state.race_on_update {
            state.race_on_update = false;

            let tree = state.commits[&current].tree.clone();
            let foreign = state.next_sha();
            state.commits.insert(
                foreign.clone(),
                MemoryCommit {
                    message: "Concurrent commit".to_string(),
                    tree,
                    parents: vec![current],
                },
            );
            state.refs.insert(key.clone(), foreign.clone());
            current = foreign;
        }

        if !state.is_ancestor(&current, &update.sha) {
            return Err(status(422, "Update is not a fast forward"));
        }

        state.refs.insert(key, update.sha.clone());

        Ok(())
    }
}
