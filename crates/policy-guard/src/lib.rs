//! # Policy Guard
//!
//! A privilege-escalation checker for secrets-engine path policies.
//!
//! A policy maps path patterns (with `+` single-segment and trailing `*`
//! multi-segment wildcards) to capability sets such as `read`, `write`,
//! or the vetoing `deny`. Given a *current* policy and a *proposed*
//! replacement, this crate answers one question:
//!
//! > Does the proposed policy admit any `(path, capability)` pair that
//! > the current policy does not?
//!
//! Rather than enumerating paths, both policies are translated into
//! boolean formulas over two free string variables and the escalation
//! query `φ_new ∧ ¬φ_current` is discharged with the Z3 SMT solver in
//! its theory of strings and regular expressions. An `unsat` verdict is
//! a proof that no escalation exists over the entire path alphabet; a
//! `sat` verdict comes with a concrete witness pair extracted from the
//! model.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use policy_guard::{check, Capability, CheckOptions, PathPattern, Policy};
//!
//! let mut current = Policy::new();
//! current.insert(
//!     PathPattern::new("secret/app/db")?,
//!     BTreeSet::from([Capability::Read]),
//! )?;
//!
//! let mut proposed = Policy::new();
//! proposed.insert(
//!     PathPattern::new("secret/app/db")?,
//!     BTreeSet::from([Capability::Read, Capability::Write]),
//! )?;
//!
//! let report = check(&current, &proposed, &CheckOptions::default())?;
//! assert!(report.result.is_escalation());
//! # Ok::<(), policy_guard::CheckError>(())
//! ```
//!
//! ## Semantics
//!
//! - Among the patterns that match a path, the single highest-priority
//!   pattern's capability set governs; lower-priority matches are
//!   shadowed. See [`compare`] for the priority order.
//! - A matching `deny` rule vetoes every grant on that path regardless
//!   of priority.
//! - Each check owns its solver context end-to-end. Checks are pure
//!   functions of their inputs and can run concurrently from separate
//!   calls.

#![deny(missing_docs)]
#![deny(unsafe_code)]

mod checker;
mod error;
mod formula;
mod pattern;
mod policy;
mod priority;

pub use checker::{check, check_request, CheckOptions, CheckReport};
pub use error::{CheckError, Result};
pub use policy::{
    Capability, CheckRequest, CheckResponse, Diagnostics, EscalationResult, PathPattern, Policy,
    Witness,
};
pub use priority::compare;
