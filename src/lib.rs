//! Zone Crab
//!
//! Solves [RFC-8555][RFC-8555] [DNS-01] challenges by committing TXT records to a DNS zone file
//! kept in a GitLab repository.
//!
//! The zone file stays under version control and review. Zone Crab only edits a delimited
//! managed block inside it, bumps the SOA serial number, and publishes each edit as a merge
//! request that it approves and merges itself. Whatever deploys the zone from the repository
//! takes it from there.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod error;
pub mod gitlab;
pub mod publish;
pub mod record;
pub mod solver;
pub mod txt_store;
pub mod zone;

pub use api::new as new_http;
pub use config::{Config, Shared};
pub use gitlab::GitlabClient;
pub use solver::{ChallengeRequest, GitSolver, Solver};
pub use txt_store::InMemoryTxtStore;
