//! Zone file text surgery.
//!
//! Zone Crab doesn't parse zone files. It only understands two things inside an otherwise opaque
//! text blob:
//!
//! * A **managed block**, delimited by bot marker comments, that TXT record lines are added to
//!   and removed from:
//!
//!   ```text
//!   ; ACME-BOT
//!   _acme-challenge.www            TXT "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"
//!   ; ACME-BOT-END
//!   ```
//!
//!   With a configured [marker prefix][crate::config::Config::marker_prefix] of `DEV` the markers
//!   become `; DEV-ACME-BOT` and `; DEV-ACME-BOT-END`.
//!
//! * The SOA **serial number** field, written as `YYYYMMDDnn ; serial number`, which is advanced
//!   after every edit.
//!
//! Every function here is `(text) -> text`: the whole zone file goes in and a new zone file comes
//! out.
use crate::error::Error;
use crate::record::resolve_fqdn;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const BOT_MARKER: &str = "ACME-BOT";
const END_SUFFIX: &str = "-END";

const SERIAL_DATE: &[FormatItem<'static>] = format_description!("[year][month][day]");

lazy_static! {
    static ref SERIAL_FIELD: Regex = Regex::new(r"([0-9]+)\s?;\s?serial number").unwrap();
    static ref TXT_LINE: Regex =
        Regex::new(r#"(?m)^[ \t]*([^\s;"]+)[ \t]+TXT[ \t]+"([^"\n]*)""#).unwrap();
}

/// The opening and closing comments delimiting the managed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    open: String,
    close: String,
}

impl Markers {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        let open = if prefix.is_empty() {
            format!("; {BOT_MARKER}")
        } else {
            format!("; {prefix}-{BOT_MARKER}")
        };
        let close = format!("{open}{END_SUFFIX}");
        Markers { open, close }
    }

    #[must_use]
    pub fn open(&self) -> &str {
        &self.open
    }

    #[must_use]
    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for Markers {
    fn default() -> Self {
        Markers::new("")
    }
}

/// Return the text between the opening marker line and the first closing marker after it.
///
/// The newline ending the opening marker is not part of the block.
///
/// # Errors
///
/// Returns [`Error::ManagedBlockNotFound`] if either marker is missing or the block is empty.
pub fn extract_managed_block<'a>(zone: &'a str, markers: &Markers) -> Result<&'a str, Error> {
    // The opening marker is a prefix of the closing one; requiring the newline tells them apart.
    let open = format!("{}\n", markers.open);
    let start = zone.find(&open).ok_or(Error::ManagedBlockNotFound)? + open.len();
    let len = zone[start..]
        .find(&markers.close)
        .ok_or(Error::ManagedBlockNotFound)?;
    match &zone[start..start + len] {
        "" => Err(Error::ManagedBlockNotFound),
        block => Ok(block),
    }
}

/// Insert `record_line` just before the first closing marker.
///
/// Without a closing marker the zone is returned unchanged. Nothing prevents inserting the same
/// line twice; callers track what is already published.
#[must_use]
pub fn insert_record(zone: &str, record_line: &str, markers: &Markers) -> String {
    if !zone.contains(&markers.close) {
        tracing::debug!("no \"{}\" marker, zone left unchanged", markers.close);
    }
    zone.replacen(&markers.close, &format!("{record_line}\n{}", markers.close), 1)
}

/// Remove the first occurrence of `record_line` and its trailing newline.
#[must_use]
pub fn remove_record(zone: &str, record_line: &str) -> String {
    zone.replacen(&format!("{record_line}\n"), "", 1)
}

/// Collect every TXT record line in `block`, keyed by absolute FQDN.
///
/// # Errors
///
/// Returns [`Error::NoRecordsFound`] if the block holds no TXT record lines.
pub fn parse_records(
    block: &str,
    root_domain: Option<&str>,
) -> Result<HashMap<String, String>, Error> {
    let records: HashMap<String, String> = TXT_LINE
        .captures_iter(block)
        .map(|caps| {
            let fqdn = resolve_fqdn(&caps[1], root_domain);
            let value = caps[2].to_string();
            tracing::info!("found TXT record for \"{fqdn}\"");
            (fqdn, value)
        })
        .collect();
    if records.is_empty() {
        return Err(Error::NoRecordsFound);
    }
    Ok(records)
}

/// Advance the serial number field for today's date (UTC).
///
/// # Errors
///
/// See [`advance_serial_on`].
pub fn advance_serial(zone: &str) -> Result<String, Error> {
    advance_serial_on(zone, OffsetDateTime::now_utc().date())
}

/// Advance the serial number field as of `today`.
///
/// A serial from an earlier date restarts at `<today>01`. A serial already dated `today` has its
/// two digit counter incremented, rolling over from `99` to `00`. Only the first field is
/// rewritten.
///
/// # Errors
///
/// Returns [`Error::SerialNotFound`] if the zone has no serial number field.
pub fn advance_serial_on(zone: &str, today: Date) -> Result<String, Error> {
    let caps = SERIAL_FIELD.captures(zone).ok_or(Error::SerialNotFound)?;
    // NB: unwraps are safe: capture 0 always exists, and a fixed numeric date format always formats.
    let field = caps.get(0).unwrap();
    let digits = &caps[1];
    let today = today.format(SERIAL_DATE).unwrap();

    let serial = match digits.strip_prefix(today.as_str()) {
        Some(counter) => {
            let next = match counter.parse::<u32>() {
                Ok(n) if n >= 99 => 0,
                Ok(n) => n + 1,
                Err(_) => 1,
            };
            format!("{today}{next:02}")
        }
        None => format!("{today}01"),
    };
    tracing::debug!("serial number {digits} -> {serial}");

    Ok(format!(
        "{}{serial} ; serial number{}",
        &zone[..field.start()],
        &zone[field.end()..]
    ))
}
