use crate::error::Error;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::env::VarError;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

const DEFAULT_TARGET_BRANCH: &str = "main";
const DEFAULT_SOLVER_NAME: &str = "git-solver";
const DEFAULT_MERGE_COOLDOWN: Duration = Duration::from_secs(30);
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_API_BIND_ADDR: &str = "127.0.0.1:8080";

/// Runtime configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Branch the zone file is edited on. Created from `target_branch` when missing.
    pub work_branch: String,
    /// Branch merge requests are merged into.
    pub target_branch: String,
    /// Repository (GitLab project path, e.g. `infra/dns`) holding the zone file.
    pub repository_path: String,
    /// Path of the zone file within the repository.
    pub zone_file: String,
    /// Prefix for the managed block markers. Empty selects the plain `; ACME-BOT` markers.
    pub marker_prefix: String,
    /// Zone origin. When set, record names in the managed block are written relative to it.
    pub root_domain: Option<String>,
    /// Base URL of the repository host, e.g. `https://gitlab.example.com`.
    pub api_url: String,
    pub api_token: String,
    /// Name the solver is registered under.
    pub solver_name: String,
    /// Pause between opening a merge request and approving it.
    pub merge_cooldown: Duration,
    /// Whether merge requests are explicitly approved before merging.
    pub approve_merge_requests: bool,
    pub api_bind_addr: SocketAddr,
    pub api_timeout: Duration,
}

/// The on-disk form of [`Config`]: everything optional so that each missing option can be
/// reported by name.
#[serde_as]
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    work_branch: Option<String>,
    target_branch: Option<String>,
    repository_path: Option<String>,
    zone_file: Option<String>,
    marker_prefix: Option<String>,
    root_domain: Option<String>,
    api_url: Option<String>,
    api_token: Option<String>,
    solver_name: Option<String>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    merge_cooldown: Option<Duration>,
    approve_merge_requests: Option<bool>,
    api_bind_addr: Option<SocketAddr>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    api_timeout: Option<Duration>,
}

impl Config {
    /// Load a [`Config`] from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it isn't valid
    /// config JSON, and [`Error::MissingConfiguration`] for the first required option it lacks.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let raw: RawConfig = serde_json::from_reader(reader)?;
        raw.validate()
    }

    /// Load a [`Config`] from the process environment.
    ///
    /// Only Zone Crab's own variables are read. Unrelated variables are never inspected, so
    /// they may hold anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfiguration`] for the first required variable that is unset and
    /// [`Error::InvalidConfiguration`] for values that don't parse or aren't valid unicode.
    pub fn try_from_env() -> Result<Self, Error> {
        Self::try_from_vars(env_var)
    }

    fn try_from_vars<F>(var: F) -> Result<Self, Error>
    where
        F: Fn(&'static str) -> Result<Option<String>, Error>,
    {
        let raw = RawConfig {
            work_branch: var("GITLAB_BRANCH")?,
            target_branch: var("GITLAB_TARGET_BRANCH")?,
            repository_path: var("GITLAB_PATH")?,
            zone_file: var("GITLAB_FILE")?,
            marker_prefix: var("ACME_BOT_PREFIX")?,
            root_domain: var("ROOT_DOMAIN")?,
            api_url: var("GITLAB_URL")?,
            api_token: var("GITLAB_TOKEN")?,
            solver_name: var("SOLVER_NAME")?,
            merge_cooldown: parse_var(&var, "MERGE_COOLDOWN_SECS")?.map(Duration::from_secs),
            approve_merge_requests: parse_var(&var, "APPROVE_MERGE_REQUESTS")?,
            api_bind_addr: parse_var(&var, "API_BIND_ADDR")?,
            api_timeout: parse_var(&var, "API_TIMEOUT_SECS")?.map(Duration::from_secs),
        };
        raw.validate()
    }
}

fn env_var(name: &'static str) -> Result<Option<String>, Error> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::InvalidConfiguration {
            field: name,
            reason: "value is not valid unicode".to_string(),
        }),
    }
}

fn parse_var<T, F>(var: &F, name: &'static str) -> Result<Option<T>, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&'static str) -> Result<Option<String>, Error>,
{
    match var(name)?.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|err: T::Err| Error::InvalidConfiguration {
                field: name,
                reason: err.to_string(),
            }),
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, Error> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingConfiguration(field))
}

impl RawConfig {
    fn validate(self) -> Result<Config, Error> {
        let api_bind_addr = match self.api_bind_addr {
            Some(addr) => addr,
            // NB: unwrap is safe: constant, well-formed socket address.
            None => DEFAULT_API_BIND_ADDR.parse().unwrap(),
        };
        Ok(Config {
            work_branch: required(self.work_branch, "work_branch")?,
            repository_path: required(self.repository_path, "repository_path")?,
            zone_file: required(self.zone_file, "zone_file")?,
            api_url: required(self.api_url, "api_url")?,
            api_token: required(self.api_token, "api_token")?,
            target_branch: self
                .target_branch
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| DEFAULT_TARGET_BRANCH.to_string()),
            marker_prefix: self.marker_prefix.unwrap_or_default(),
            root_domain: self
                .root_domain
                .map(|d| d.trim().trim_end_matches('.').to_string())
                .filter(|d| !d.is_empty()),
            solver_name: self
                .solver_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_SOLVER_NAME.to_string()),
            merge_cooldown: self.merge_cooldown.unwrap_or(DEFAULT_MERGE_COOLDOWN),
            approve_merge_requests: self.approve_merge_requests.unwrap_or(true),
            api_bind_addr,
            api_timeout: self.api_timeout.unwrap_or(DEFAULT_API_TIMEOUT),
        })
    }
}
