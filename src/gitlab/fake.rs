//! In-memory [`RepositoryApi`] used by the workflow and solver tests.
use crate::error::Error;
use crate::gitlab::{
    Branch, CreateMergeRequest, MergeRequest, RepositoryApi, RepositoryFile, UpdateFile,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenMergeRequest {
    pub iid: u64,
    pub title: String,
    pub source_branch: String,
    pub target_branch: String,
    pub approved: bool,
    pub merged: bool,
}

#[derive(Default, Debug)]
struct State {
    branches: HashSet<String>,
    // (branch, path) -> content
    files: HashMap<(String, String), String>,
    merge_requests: Vec<OpenMergeRequest>,
    calls: Vec<&'static str>,
    fail_on: Option<&'static str>,
}

impl State {
    fn open_merge_request(&self, source_branch: &str, target_branch: &str) -> Option<u64> {
        self.merge_requests
            .iter()
            .find(|mr| {
                !mr.merged && mr.source_branch == source_branch && mr.target_branch == target_branch
            })
            .map(|mr| mr.iid)
    }
}

#[derive(Default, Debug)]
pub(crate) struct FakeRepository {
    state: Mutex<State>,
}

impl FakeRepository {
    pub fn with_file(branch: &str, path: &str, content: &str) -> Self {
        let repo = FakeRepository::default();
        {
            let mut state = repo.state.lock().unwrap();
            state.branches.insert(branch.to_string());
            state
                .files
                .insert((branch.to_string(), path.to_string()), content.to_string());
        }
        repo
    }

    pub fn add_branch(&self, branch: &str) {
        self.state.lock().unwrap().branches.insert(branch.to_string());
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains(branch)
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(&(branch.to_string(), path.to_string()))
            .cloned()
    }

    pub fn merge_requests(&self) -> Vec<OpenMergeRequest> {
        self.state.lock().unwrap().merge_requests.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Make every later call to `operation` fail with a server error.
    pub fn fail_on(&self, operation: &'static str) {
        self.state.lock().unwrap().fail_on = Some(operation);
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail_on = None;
    }

    fn record(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, State>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation);
        if state.fail_on == Some(operation) {
            return Err(Error::RepositoryApi {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{operation} failed"),
            });
        }
        Ok(state)
    }
}

fn not_found(what: &str) -> Error {
    Error::RepositoryApi {
        status: StatusCode::NOT_FOUND,
        message: format!("404 {what} Not Found"),
    }
}

#[async_trait::async_trait]
impl RepositoryApi for FakeRepository {
    async fn get_branch(&self, _project: &str, name: &str) -> Result<Option<Branch>, Error> {
        let state = self.record("get_branch")?;
        Ok(state.branches.get(name).map(|name| Branch { name: name.clone() }))
    }

    async fn create_branch(
        &self,
        _project: &str,
        branch: &str,
        git_ref: &str,
    ) -> Result<Branch, Error> {
        let mut state = self.record("create_branch")?;
        if !state.branches.contains(git_ref) {
            return Err(not_found("Ref"));
        }
        let copied: Vec<_> = state
            .files
            .iter()
            .filter(|((b, _), _)| b == git_ref)
            .map(|((_, path), content)| ((branch.to_string(), path.clone()), content.clone()))
            .collect();
        state.files.extend(copied);
        state.branches.insert(branch.to_string());
        Ok(Branch {
            name: branch.to_string(),
        })
    }

    async fn get_file(
        &self,
        _project: &str,
        file: &str,
        git_ref: &str,
    ) -> Result<RepositoryFile, Error> {
        let state = self.record("get_file")?;
        let content = state
            .files
            .get(&(git_ref.to_string(), file.to_string()))
            .ok_or_else(|| not_found("File"))?;
        Ok(RepositoryFile {
            file_path: file.to_string(),
            content: STANDARD.encode(content),
        })
    }

    async fn update_file(
        &self,
        _project: &str,
        file: &str,
        update: &UpdateFile<'_>,
    ) -> Result<(), Error> {
        let mut state = self.record("update_file")?;
        let key = (update.branch.to_string(), file.to_string());
        if !state.files.contains_key(&key) {
            return Err(not_found("File"));
        }
        state.files.insert(key, update.content.to_string());
        Ok(())
    }

    async fn find_open_merge_request(
        &self,
        _project: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<Option<MergeRequest>, Error> {
        let state = self.record("find_open_merge_request")?;
        Ok(state
            .open_merge_request(source_branch, target_branch)
            .map(|iid| MergeRequest { iid, web_url: None }))
    }

    async fn create_merge_request(
        &self,
        _project: &str,
        request: &CreateMergeRequest<'_>,
    ) -> Result<MergeRequest, Error> {
        let mut state = self.record("create_merge_request")?;
        if let Some(iid) = state.open_merge_request(request.source_branch, request.target_branch) {
            return Err(Error::RepositoryApi {
                status: StatusCode::CONFLICT,
                message: format!(
                    "Another open merge request already exists for this source branch: !{iid}"
                ),
            });
        }
        let iid = state.merge_requests.len() as u64 + 1;
        state.merge_requests.push(OpenMergeRequest {
            iid,
            title: request.title.to_string(),
            source_branch: request.source_branch.to_string(),
            target_branch: request.target_branch.to_string(),
            approved: false,
            merged: false,
        });
        Ok(MergeRequest { iid, web_url: None })
    }

    async fn approve_merge_request(&self, _project: &str, iid: u64) -> Result<(), Error> {
        let mut state = self.record("approve_merge_request")?;
        let mr = state
            .merge_requests
            .iter_mut()
            .find(|mr| mr.iid == iid)
            .ok_or_else(|| not_found("Merge Request"))?;
        if mr.approved {
            return Err(Error::RepositoryApi {
                status: StatusCode::UNAUTHORIZED,
                message: "401 Unauthorized".to_string(),
            });
        }
        mr.approved = true;
        Ok(())
    }

    async fn accept_merge_request(
        &self,
        _project: &str,
        iid: u64,
        remove_source_branch: bool,
    ) -> Result<(), Error> {
        let mut state = self.record("accept_merge_request")?;
        let mr = state
            .merge_requests
            .iter_mut()
            .find(|mr| mr.iid == iid)
            .ok_or_else(|| not_found("Merge Request"))?;
        mr.merged = true;
        let (source, target) = (mr.source_branch.clone(), mr.target_branch.clone());
        let merged: Vec<_> = state
            .files
            .iter()
            .filter(|((b, _), _)| *b == source)
            .map(|((_, path), content)| ((target.clone(), path.clone()), content.clone()))
            .collect();
        state.files.extend(merged);
        if remove_source_branch {
            state.branches.remove(&source);
        }
        Ok(())
    }
}
