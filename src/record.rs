//! Challenge records and their zone-file rendering.
//!
//! A [`Record`] is built for every present/clean-up call from the challenge's resolved FQDN and
//! key. It is never stored as a struct, only rendered into a TXT record line for the managed
//! block of the zone file.
use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VALID_DOMAIN: Regex =
        Regex::new(r"^([_a-z0-9]+([-a-z0-9]+)*\.)+[a-z]{2,}\.?$").unwrap();
}

/// Padding between the record name and the `TXT` type in rendered record lines. Existing zone
/// files were written with exactly this spacing.
const NAME_PADDING: &str = "            ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub domain: String,
    pub key: String,
}

impl Record {
    /// Build a record for `fqdn`, storing its name relative to `root_domain` when one is
    /// configured.
    #[must_use]
    pub fn new(fqdn: &str, key: &str, root_domain: Option<&str>) -> Self {
        Record {
            domain: normalize(fqdn, root_domain),
            key: key.to_string(),
        }
    }

    /// The absolute FQDN the record's name stands for once written to the zone file.
    #[must_use]
    pub fn fqdn(&self, root_domain: Option<&str>) -> String {
        resolve_fqdn(&self.domain, root_domain)
    }

    /// Render the record as a zone-file TXT line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] when the domain or key is empty, or the domain isn't a
    /// lowercase `(label.)+tld` name.
    pub fn render(&self) -> Result<String, Error> {
        self.validate()?;
        Ok(format!("{}{NAME_PADDING}TXT \"{}\"", self.domain, self.key))
    }

    /// Check the record without rendering it.
    ///
    /// # Errors
    ///
    /// See [`Record::render`].
    pub fn validate(&self) -> Result<(), Error> {
        if self.domain.is_empty() {
            return Err(Error::InvalidRecord("domain is required"));
        }
        if self.key.is_empty() {
            return Err(Error::InvalidRecord("key is required"));
        }
        if !VALID_DOMAIN.is_match(&self.domain) {
            return Err(Error::InvalidRecord("invalid domain format"));
        }
        Ok(())
    }
}

/// Strip `root_domain` (with or without its trailing dot) from the end of `domain`, then any
/// trailing dot that remains.
#[must_use]
pub fn normalize(domain: &str, root_domain: Option<&str>) -> String {
    let mut domain = domain;
    if let Some(root) = root_domain.filter(|r| !r.is_empty()) {
        let root = root.trim_end_matches('.');
        let without_dot = domain.strip_suffix('.').unwrap_or(domain);
        // Only whole labels: "notexample.com" doesn't end in "example.com".
        if let Some(stripped) = without_dot
            .strip_suffix(root)
            .filter(|rest| rest.is_empty() || rest.ends_with('.'))
        {
            domain = stripped;
        }
    }
    domain.strip_suffix('.').unwrap_or(domain).to_string()
}

/// Turn a record name read back from the managed block into an absolute, dot-terminated FQDN.
#[must_use]
pub fn resolve_fqdn(name: &str, root_domain: Option<&str>) -> String {
    let name = name.trim_end_matches('.');
    match root_domain.map(|r| r.trim_end_matches('.')).filter(|r| !r.is_empty()) {
        Some(root) => format!("{name}.{root}."),
        None => format!("{name}."),
    }
}
