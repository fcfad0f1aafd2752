//! Published TXT record tracking.
//!
//! The zone file is the source of truth for which [RFC-8555][RFC-8555] [DNS-01] challenge
//! responses are published. [`InMemoryTxtStore`] caches that knowledge by FQDN so that repeated
//! present and clean-up calls can be answered without another round trip to the repository.
//!
//! The store does no locking of its own. It lives inside the
//! [`GitSolver`][crate::solver::GitSolver] lock together with the publication workflow, so a
//! store update and the zone file change behind it are observed together.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryTxtStore;
