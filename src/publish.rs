//! Publishing zone file changes through merge requests.
//!
//! Each change to the zone file is committed to the working branch, proposed as a merge request
//! into the target branch, approved and merged. The working branch is never deleted, so the next
//! change starts from it again.
//!
//! Nothing is rolled back. If a step fails after the zone file was written, the change stays on
//! the working branch unmerged; the next attempt re-reads the file from that branch and picks
//! up the merge request left open, if any.
use crate::config::Config;
use crate::error::Error;
use crate::gitlab::{CreateMergeRequest, DynRepositoryApi, MergeRequest, UpdateFile};
use reqwest::StatusCode;
use std::time::Duration;

/// A single zone file change to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<'a> {
    pub content: &'a str,
    pub commit_message: &'a str,
    pub title: &'a str,
}

pub struct Workflow {
    repository: DynRepositoryApi,
    project: String,
    zone_file: String,
    work_branch: String,
    target_branch: String,
    merge_cooldown: Duration,
    approve: bool,
}

impl Workflow {
    #[must_use]
    pub fn new(config: &Config, repository: DynRepositoryApi) -> Self {
        Workflow {
            repository,
            project: config.repository_path.clone(),
            zone_file: config.zone_file.clone(),
            work_branch: config.work_branch.clone(),
            target_branch: config.target_branch.clone(),
            merge_cooldown: config.merge_cooldown,
            approve: config.approve_merge_requests,
        }
    }

    /// Create the working branch from the target branch unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BranchNotFound`] when the target branch is missing too, or the repository
    /// error that stopped the lookup or creation.
    pub async fn ensure_branch(&self) -> Result<(), Error> {
        if self
            .repository
            .get_branch(&self.project, &self.work_branch)
            .await?
            .is_some()
        {
            tracing::debug!("branch \"{}\" already exists", self.work_branch);
            return Ok(());
        }
        if self
            .repository
            .get_branch(&self.project, &self.target_branch)
            .await?
            .is_none()
        {
            return Err(Error::BranchNotFound(self.target_branch.clone()));
        }
        tracing::info!(
            "creating branch \"{}\" from \"{}\"",
            self.work_branch,
            self.target_branch
        );
        self.repository
            .create_branch(&self.project, &self.work_branch, &self.target_branch)
            .await?;
        Ok(())
    }

    /// Read the zone file from the working branch.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the file can't be fetched or decoded.
    pub async fn read_zone_file(&self) -> Result<String, Error> {
        self.repository
            .get_file(&self.project, &self.zone_file, &self.work_branch)
            .await?
            .text()
    }

    /// Commit `change` to the working branch, then open, approve and merge a merge request for
    /// it. The approval waits out the configured cooldown first so that pipelines can start.
    ///
    /// # Errors
    ///
    /// Returns the first repository error; later steps are not attempted.
    pub async fn publish(&self, change: &Change<'_>) -> Result<(), Error> {
        self.repository
            .update_file(
                &self.project,
                &self.zone_file,
                &UpdateFile {
                    branch: &self.work_branch,
                    content: change.content,
                    commit_message: change.commit_message,
                },
            )
            .await?;

        let (mr, reused) = self.open_merge_request(change).await?;
        tracing::info!(
            "merge request !{} open, waiting {:?} before merging",
            mr.iid,
            self.merge_cooldown
        );
        tokio::time::sleep(self.merge_cooldown).await;

        if self.approve {
            match self
                .repository
                .approve_merge_request(&self.project, mr.iid)
                .await
            {
                // GitLab answers 401 when the token's user already approved.
                Err(Error::RepositoryApi { status, .. })
                    if reused && status == StatusCode::UNAUTHORIZED =>
                {
                    tracing::debug!("merge request !{} already approved", mr.iid);
                }
                res => res?,
            }
        }
        self.repository
            .accept_merge_request(&self.project, mr.iid, false)
            .await?;
        tracing::info!("merge request !{} merged", mr.iid);
        Ok(())
    }

    /// Reuse the merge request an earlier, unfinished publication left open, or create one.
    /// The host allows only one open merge request per branch pair.
    async fn open_merge_request(
        &self,
        change: &Change<'_>,
    ) -> Result<(MergeRequest, bool), Error> {
        if let Some(mr) = self
            .repository
            .find_open_merge_request(&self.project, &self.work_branch, &self.target_branch)
            .await?
        {
            tracing::info!("reusing open merge request !{}", mr.iid);
            return Ok((mr, true));
        }
        let mr = self
            .repository
            .create_merge_request(
                &self.project,
                &CreateMergeRequest {
                    title: change.title,
                    description: change.title,
                    source_branch: &self.work_branch,
                    target_branch: &self.target_branch,
                },
            )
            .await?;
        Ok((mr, false))
    }
}
