//! Error types.

use reqwest::StatusCode;

/// Error enumerates the possible Zone Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a challenge record can't be rendered into a TXT record line: the domain or
    /// key is empty, or the domain doesn't follow the label grammar accepted by
    /// [`Record::render`][crate::record::Record::render].
    #[error("invalid record: {0}")]
    InvalidRecord(&'static str),

    /// Returned when the zone file carries no non-empty managed block between the opening and
    /// closing bot markers.
    #[error("managed block markers not found")]
    ManagedBlockNotFound,

    /// Returned when a managed block holds no TXT record lines.
    #[error("no TXT records found")]
    NoRecordsFound,

    /// Returned when the zone file has no `<digits> ; serial number` field.
    #[error("serial number not found")]
    SerialNotFound,

    /// Returned by [`Solver::present`][crate::solver::Solver::present] when a record for the
    /// FQDN is already published. Callers should treat this as success.
    #[error("TXT record for \"{0}\" already exists")]
    AlreadyExists(String),

    /// Returned by [`Solver::clean_up`][crate::solver::Solver::clean_up] when no record for the
    /// FQDN is published. Callers should treat this as success.
    #[error("TXT record for \"{0}\" does not exist")]
    DoesNotExist(String),

    /// Returned when a required [`Config`][crate::config::Config] option is absent or empty.
    #[error("missing configuration: {0}")]
    MissingConfiguration(&'static str),

    /// Returned when a configuration option is present but can't be parsed.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// Returned when the working branch has to be created from a base ref that doesn't exist.
    #[error("branch \"{0}\" not found")]
    BranchNotFound(String),

    /// Returned when the repository host answers with a non-success HTTP status.
    #[error("repository API error ({status}): {message}")]
    RepositoryApi { status: StatusCode, message: String },

    /// Returned when the repository host can't be reached or its response can't be read.
    #[error("repository API transport error")]
    Transport(#[from] reqwest::Error),

    /// Returned when file content fetched from the repository isn't valid BASE64.
    #[error("invalid BASE64 file content")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Returned when decoded file content isn't valid UTF-8.
    #[error("file content is not UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON (e.g. when
    /// [trying to load a `Config`][crate::config::Config::try_from_file]) fails due to invalid
    /// JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}

impl Error {
    /// True for the two lifecycle outcomes that signal an idempotent repeat rather than a
    /// failure: [`Error::AlreadyExists`] and [`Error::DoesNotExist`].
    #[must_use]
    pub fn is_idempotent_signal(&self) -> bool {
        matches!(self, Error::AlreadyExists(_) | Error::DoesNotExist(_))
    }

    /// True for errors that originate with the repository host or its payloads.
    #[must_use]
    pub fn is_repository_error(&self) -> bool {
        matches!(
            self,
            Error::RepositoryApi { .. }
                | Error::Transport(_)
                | Error::BranchNotFound(_)
                | Error::InvalidBase64(_)
                | Error::InvalidUtf8(_)
        )
    }
}
