//! The DNS-01 challenge solver.
//!
//! A certificate manager drives a [`Solver`] through three calls:
//!
//! * [`Solver::initialize`] once at startup,
//! * [`Solver::present`] to publish the TXT record answering a challenge,
//! * [`Solver::clean_up`] to withdraw it after validation.
//!
//! Both `present` and `clean_up` may be repeated. A repeat that finds the record already in the
//! requested state fails with [`Error::AlreadyExists`] or [`Error::DoesNotExist`]; see
//! [`Error::is_idempotent_signal`].
//!
//! [`GitSolver`] publishes records by editing the managed block of a zone file kept in a GitLab
//! repository. Every call holds one lock for its whole duration, repository round trips and merge
//! cooldown included, so zone file edits are applied one at a time.
use crate::config::Config;
use crate::error::Error;
use crate::gitlab::{DynRepositoryApi, GitlabClient};
use crate::publish::{Change, Workflow};
use crate::record::Record;
use crate::txt_store::InMemoryTxtStore;
use crate::zone::{self, Markers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// `DynSolver` is a shareable handle to any [`Solver`] implementation.
pub type DynSolver = Arc<dyn Solver + Send + Sync>;

/// A DNS-01 challenge as handed to the solver.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// The name the TXT record must be published under, e.g. `_acme-challenge.example.com.`.
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,
    /// The TXT record value.
    pub key: String,
}

#[async_trait::async_trait]
pub trait Solver {
    /// The name the solver is registered under.
    fn name(&self) -> &str;

    /// Load the records already published.
    async fn initialize(&self) -> Result<(), Error>;

    /// Publish the TXT record for `challenge`.
    async fn present(&self, challenge: &ChallengeRequest) -> Result<(), Error>;

    /// Withdraw the TXT record for `challenge`.
    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<(), Error>;
}

pub struct GitSolver {
    name: String,
    root_domain: Option<String>,
    markers: Markers,
    workflow: Workflow,
    txt_store: Mutex<InMemoryTxtStore>,
}

impl GitSolver {
    #[must_use]
    pub fn new(config: &Config, repository: DynRepositoryApi) -> Self {
        GitSolver {
            name: config.solver_name.clone(),
            root_domain: config.root_domain.clone(),
            markers: Markers::new(&config.marker_prefix),
            workflow: Workflow::new(config, repository),
            txt_store: Mutex::new(InMemoryTxtStore::default()),
        }
    }

    /// Build a solver backed by the GitLab instance named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the API URL is malformed.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client = GitlabClient::new(&config.api_url, &config.api_token)?;
        Ok(GitSolver::new(config, Arc::new(client)))
    }

    #[cfg(test)]
    pub(crate) async fn txt_store(&self) -> InMemoryTxtStore {
        self.txt_store.lock().await.clone()
    }

    fn record(&self, challenge: &ChallengeRequest) -> (Record, String) {
        let root = self.root_domain.as_deref();
        let record = Record::new(&challenge.resolved_fqdn, &challenge.key, root);
        let fqdn = record.fqdn(root);
        (record, fqdn)
    }

    fn published_records(&self, zone: &str) -> Result<HashMap<String, String>, Error> {
        let block = zone::extract_managed_block(zone, &self.markers)?;
        zone::parse_records(block, self.root_domain.as_deref())
    }
}

#[async_trait::async_trait]
impl Solver for GitSolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), Error> {
        tracing::info!("initializing {}", self.name);
        let mut txt_store = self.txt_store.lock().await;

        self.workflow.ensure_branch().await?;
        let zone = self.workflow.read_zone_file().await?;
        let records = match self.published_records(&zone) {
            Ok(records) => records,
            Err(err @ (Error::ManagedBlockNotFound | Error::NoRecordsFound)) => {
                tracing::warn!("starting with no published TXT records: {err}");
                HashMap::new()
            }
            Err(err) => return Err(err),
        };

        *txt_store = InMemoryTxtStore::from_records(records);
        tracing::info!(
            "{} initialized with {} published TXT records",
            self.name,
            txt_store.len()
        );
        Ok(())
    }

    async fn present(&self, challenge: &ChallengeRequest) -> Result<(), Error> {
        let mut txt_store = self.txt_store.lock().await;

        let (record, fqdn) = self.record(challenge);
        if txt_store.contains(&fqdn) {
            tracing::debug!("TXT record for \"{fqdn}\" already published");
            return Err(Error::AlreadyExists(fqdn));
        }
        let line = record.render()?;

        self.workflow.ensure_branch().await?;
        let zone = self.workflow.read_zone_file().await?;
        // A previous attempt may have written the line without getting it merged.
        let zone = if zone::extract_managed_block(&zone, &self.markers)
            .map_or(false, |block| block.lines().any(|l| l == line))
        {
            tracing::debug!("TXT record for \"{fqdn}\" already in zone file");
            zone
        } else {
            zone::insert_record(&zone, &line, &self.markers)
        };
        let zone = zone::advance_serial(&zone)?;

        tracing::info!("adding TXT record for \"{fqdn}\"");
        self.workflow
            .publish(&Change {
                content: &zone,
                commit_message: &format!("Add TXT record: {fqdn}"),
                title: "Add TXT record",
            })
            .await?;

        txt_store.put(fqdn, record.key);
        Ok(())
    }

    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<(), Error> {
        let mut txt_store = self.txt_store.lock().await;

        let (record, fqdn) = self.record(challenge);
        let Some(published_key) = txt_store.get(&fqdn).cloned() else {
            tracing::debug!("no TXT record for \"{fqdn}\" published");
            return Err(Error::DoesNotExist(fqdn));
        };
        if published_key != record.key {
            tracing::warn!("clean up of \"{fqdn}\" requested with a key other than the published one");
        }
        let line = Record {
            key: published_key,
            ..record
        }
        .render()?;

        self.workflow.ensure_branch().await?;
        let zone = self.workflow.read_zone_file().await?;
        let zone = zone::advance_serial(&zone::remove_record(&zone, &line))?;

        tracing::info!("removing TXT record for \"{fqdn}\"");
        self.workflow
            .publish(&Change {
                content: &zone,
                commit_message: &format!("Remove TXT record: {fqdn}"),
                title: "Remove TXT record",
            })
            .await?;

        txt_store.delete(&fqdn);
        Ok(())
    }
}
