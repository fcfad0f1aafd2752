//! HTTP API driving the [DNS-01 solver][crate::solver].
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/present` (POST)
//!
//!   Expects a JSON request body of the form:
//!
//!   ```json
//!   { "resolvedFQDN": "_acme-challenge.www.example.com.", "key": "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo" }
//!   ```
//!
//!   Adds the TXT record to the managed block of the zone file and merges the change. Returns
//!   HTTP 200 (OK) with `{"result":"presented"}`, or `{"result":"already-exists"}` if the record
//!   was already published.
//!
//!   The request blocks until the merge request is merged, which includes the configured
//!   [merge cooldown][crate::config::Config::merge_cooldown].
//!
//! ## `/cleanup` (POST)
//!
//!   Takes the same body as `/present` and removes the record again. Returns HTTP 200 (OK) with
//!   `{"result":"cleaned-up"}`, or `{"result":"does-not-exist"}` if no record was published.
//!
//! # Errors
//!
//! Failures return a JSON body `{"error": "..."}` with HTTP 400 for invalid records or malformed
//! JSON, 422 for JSON missing required fields, 502 when the repository host fails, and 500
//! otherwise. Failed calls can be retried as-is.
//!
//! Requests running longer than [`Config::api_timeout`][crate::config::Config::api_timeout]
//! get HTTP 408, but the solver call behind them runs to completion. A retry then reports
//! `already-exists` or `does-not-exist`.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
