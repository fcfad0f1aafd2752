//! Repository hosting API.
//!
//! Zone Crab publishes zone file changes through a repository host rather than talking to DNS
//! servers. [`RepositoryApi`] is the narrow slice of that host's API the
//! [publication workflow][crate::publish] needs. [`GitlabClient`] implements it against the
//! GitLab v4 REST API.

use crate::error::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::GitlabClient;

/// `DynRepositoryApi` is a shareable handle to any [`RepositoryApi`] implementation.
pub type DynRepositoryApi = Arc<dyn RepositoryApi + Send + Sync>;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
}

/// A file as returned by the repository host, content BASE64 encoded.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFile {
    pub file_path: String,
    pub content: String,
}

impl RepositoryFile {
    /// Decode the file content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBase64`] or [`Error::InvalidUtf8`] for undecodable content.
    pub fn text(&self) -> Result<String, Error> {
        // Some hosts wrap long BASE64 payloads.
        let compact: String = self
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let raw = STANDARD.decode(compact)?;
        Ok(String::from_utf8(raw)?)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateFile<'a> {
    pub branch: &'a str,
    pub content: &'a str,
    pub commit_message: &'a str,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateMergeRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub source_branch: &'a str,
    pub target_branch: &'a str,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// Project-scoped merge request number.
    pub iid: u64,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Operations on a hosted repository, addressed by project path.
#[async_trait::async_trait]
pub trait RepositoryApi {
    /// Look up a branch, returning `None` if it doesn't exist.
    async fn get_branch(&self, project: &str, name: &str) -> Result<Option<Branch>, Error>;

    /// Create `branch` pointing at `git_ref`.
    async fn create_branch(&self, project: &str, branch: &str, git_ref: &str)
        -> Result<Branch, Error>;

    /// Fetch `file` as of `git_ref`.
    async fn get_file(&self, project: &str, file: &str, git_ref: &str)
        -> Result<RepositoryFile, Error>;

    /// Commit new content for an existing `file`.
    async fn update_file(
        &self,
        project: &str,
        file: &str,
        update: &UpdateFile<'_>,
    ) -> Result<(), Error>;

    /// Find the open merge request from `source_branch` into `target_branch`, if any. GitLab
    /// allows only one per branch pair.
    async fn find_open_merge_request(
        &self,
        project: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<Option<MergeRequest>, Error>;

    async fn create_merge_request(
        &self,
        project: &str,
        request: &CreateMergeRequest<'_>,
    ) -> Result<MergeRequest, Error>;

    async fn approve_merge_request(&self, project: &str, iid: u64) -> Result<(), Error>;

    /// Merge a merge request, optionally deleting its source branch.
    async fn accept_merge_request(
        &self,
        project: &str,
        iid: u64,
        remove_source_branch: bool,
    ) -> Result<(), Error>;
}
