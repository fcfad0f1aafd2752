//! A reqwest-backed [`RepositoryApi`] for GitLab's v4 REST API.
use crate::error::Error;
use crate::gitlab::{
    Branch, CreateMergeRequest, MergeRequest, RepositoryApi, RepositoryFile, UpdateFile,
};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::json;

const API_PATH: &str = "/api/v4";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Clone)]
pub struct GitlabClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct CreateBranch<'a> {
    branch: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

impl GitlabClient {
    /// Build a client for the GitLab instance at `api_url`, with or without the `/api/v4` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `api_url` isn't an absolute URL, or
    /// [`Error::Transport`] if the HTTP client can't be built.
    pub fn new(api_url: &str, token: &str) -> Result<Self, Error> {
        let parsed = Url::parse(api_url).map_err(|err| Error::InvalidConfiguration {
            field: "api_url",
            reason: err.to_string(),
        })?;
        let base = parsed.as_str().trim_end_matches('/');
        let base_url = if base.ends_with(API_PATH) {
            base.to_string()
        } else {
            format!("{base}{API_PATH}")
        };
        let http = reqwest::Client::builder()
            .user_agent(concat!("zonecrab/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(GitlabClient {
            http,
            base_url,
            token: token.to_string(),
        })
    }

    fn project_url(&self, project: &str, rest: &str) -> String {
        format!(
            "{}/projects/{}{rest}",
            self.base_url,
            urlencoding::encode(project)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let response = request.header(TOKEN_HEADER, &self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        tracing::debug!("repository API returned {status}: {message}");
        Err(Error::RepositoryApi { status, message })
    }
}

#[async_trait::async_trait]
impl RepositoryApi for GitlabClient {
    async fn get_branch(&self, project: &str, name: &str) -> Result<Option<Branch>, Error> {
        let url = self.project_url(
            project,
            &format!("/repository/branches/{}", urlencoding::encode(name)),
        );
        match self.send(self.http.get(url)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(Error::RepositoryApi { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_branch(
        &self,
        project: &str,
        branch: &str,
        git_ref: &str,
    ) -> Result<Branch, Error> {
        let url = self.project_url(project, "/repository/branches");
        let body = CreateBranch { branch, git_ref };
        Ok(self
            .send(self.http.post(url).json(&body))
            .await?
            .json()
            .await?)
    }

    async fn get_file(
        &self,
        project: &str,
        file: &str,
        git_ref: &str,
    ) -> Result<RepositoryFile, Error> {
        let url = self.project_url(
            project,
            &format!("/repository/files/{}", urlencoding::encode(file)),
        );
        Ok(self
            .send(self.http.get(url).query(&[("ref", git_ref)]))
            .await?
            .json()
            .await?)
    }

    async fn update_file(
        &self,
        project: &str,
        file: &str,
        update: &UpdateFile<'_>,
    ) -> Result<(), Error> {
        let url = self.project_url(
            project,
            &format!("/repository/files/{}", urlencoding::encode(file)),
        );
        self.send(self.http.put(url).json(update)).await?;
        Ok(())
    }

    async fn find_open_merge_request(
        &self,
        project: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<Option<MergeRequest>, Error> {
        let url = self.project_url(project, "/merge_requests");
        let query = [
            ("state", "opened"),
            ("source_branch", source_branch),
            ("target_branch", target_branch),
        ];
        let open: Vec<MergeRequest> = self
            .send(self.http.get(url).query(&query))
            .await?
            .json()
            .await?;
        Ok(open.into_iter().next())
    }

    async fn create_merge_request(
        &self,
        project: &str,
        request: &CreateMergeRequest<'_>,
    ) -> Result<MergeRequest, Error> {
        let url = self.project_url(project, "/merge_requests");
        Ok(self
            .send(self.http.post(url).json(request))
            .await?
            .json()
            .await?)
    }

    async fn approve_merge_request(&self, project: &str, iid: u64) -> Result<(), Error> {
        let url = self.project_url(project, &format!("/merge_requests/{iid}/approve"));
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    async fn accept_merge_request(
        &self,
        project: &str,
        iid: u64,
        remove_source_branch: bool,
    ) -> Result<(), Error> {
        let url = self.project_url(project, &format!("/merge_requests/{iid}/merge"));
        let body = json!({ "should_remove_source_branch": remove_source_branch });
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }
}
