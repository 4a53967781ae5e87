//! Policy data model and the structured check boundary.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, Result};
use crate::pattern;

/// A path pattern over the policy alphabet.
///
/// Patterns are non-empty strings over lowercase, uppercase, digits,
/// `-`, `_`, `.`, `/`, `+`, and `*`. A `+` anywhere matches one or more
/// literal characters within a single path segment; a trailing `*`
/// matches any suffix including `/`. A `*` that is not the final
/// character is a literal of the pattern string (the policy syntax's
/// own contract).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern(String);

impl PathPattern {
    /// Validate and wrap a pattern string.
    ///
    /// Rejects the empty string and any character outside the pattern
    /// alphabet.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(CheckError::InvalidPattern {
                pattern,
                reason: "empty pattern".to_string(),
            });
        }
        if let Some(c) = pattern.chars().find(|c| !pattern::is_pattern_char(*c)) {
            return Err(CheckError::InvalidPattern {
                pattern: pattern.clone(),
                reason: format!("character '{}' outside the pattern alphabet", c),
            });
        }
        Ok(Self(pattern))
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PathPattern {
    type Error = CheckError;

    fn try_from(pattern: String) -> Result<Self> {
        Self::new(pattern)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.0
    }
}

impl FromStr for PathPattern {
    type Err = CheckError;

    fn from_str(pattern: &str) -> Result<Self> {
        Self::new(pattern)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A permitted action on a path.
///
/// `Deny` is the distinguished veto marker: it never grants anything and
/// overrides every grant on the paths it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Create a secret at a path.
    Create,
    /// Read a secret.
    Read,
    /// Update an existing secret.
    Update,
    /// Write a secret.
    Write,
    /// Delete a secret.
    Delete,
    /// List keys under a path.
    List,
    /// Root-protected operations.
    Sudo,
    /// Veto marker: reject every operation on matching paths.
    Deny,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Capability; 8] = [
        Capability::Create,
        Capability::Read,
        Capability::Update,
        Capability::Write,
        Capability::Delete,
        Capability::List,
        Capability::Sudo,
        Capability::Deny,
    ];

    /// The lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Write => "write",
            Capability::Delete => "delete",
            Capability::List => "list",
            Capability::Sudo => "sudo",
            Capability::Deny => "deny",
        }
    }

    /// Look up a capability by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Whether this is the veto marker.
    pub fn is_deny(self) -> bool {
        matches!(self, Capability::Deny)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mapping from path patterns to capability sets.
///
/// Pattern keys are unique; inserting a pattern twice merges the
/// capability sets. Iteration order is deterministic, and the priority
/// order among rules is imposed at formula-building time, so the map
/// order never affects a verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<PathPattern, BTreeSet<Capability>>",
    into = "BTreeMap<PathPattern, BTreeSet<Capability>>"
)]
pub struct Policy {
    rules: BTreeMap<PathPattern, BTreeSet<Capability>>,
}

impl Policy {
    /// Create an empty policy (grants nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, merging set-wise with any existing rule for the same
    /// pattern.
    ///
    /// An empty capability list is rejected: a rule that can grant
    /// nothing is a policy-source mistake, not a semantics.
    pub fn insert(&mut self, pattern: PathPattern, caps: BTreeSet<Capability>) -> Result<()> {
        if caps.is_empty() {
            return Err(CheckError::InvalidPattern {
                pattern: pattern.0,
                reason: "empty capability list".to_string(),
            });
        }
        self.rules.entry(pattern).or_default().extend(caps);
        Ok(())
    }

    /// Iterate over the rules in key order.
    pub fn rules(&self) -> impl Iterator<Item = (&PathPattern, &BTreeSet<Capability>)> {
        self.rules.iter()
    }

    /// The capability set for an exact pattern, if present.
    pub fn get(&self, pattern: &PathPattern) -> Option<&BTreeSet<Capability>> {
        self.rules.get(pattern)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the policy has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TryFrom<BTreeMap<PathPattern, BTreeSet<Capability>>> for Policy {
    type Error = CheckError;

    fn try_from(map: BTreeMap<PathPattern, BTreeSet<Capability>>) -> Result<Self> {
        let mut policy = Policy::new();
        for (pattern, caps) in map {
            policy.insert(pattern, caps)?;
        }
        Ok(policy)
    }
}

impl From<Policy> for BTreeMap<PathPattern, BTreeSet<Capability>> {
    fn from(policy: Policy) -> Self {
        policy.rules
    }
}

/// A pair of policy snapshots to compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// The currently deployed policy.
    pub current: Policy,
    /// The proposed replacement.
    pub new: Policy,
}

/// A concrete `(path, capability)` pair admitted by the new policy but
/// not by the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// The escalated path.
    pub path: String,
    /// The escalated capability.
    pub capability: String,
}

/// Textual rendering of both policy formulas, for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// The current policy's formula.
    pub current_formula: String,
    /// The proposed policy's formula.
    pub new_formula: String,
}

/// The verdict of an escalation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationResult {
    /// The proposed policy grants nothing the current one does not.
    NoEscalation,
    /// The proposed policy escalates, with a concrete witness.
    Escalation(Witness),
}

impl EscalationResult {
    /// Whether an escalation was found.
    pub fn is_escalation(&self) -> bool {
        matches!(self, EscalationResult::Escalation(_))
    }

    /// The witness, when an escalation was found.
    pub fn witness(&self) -> Option<&Witness> {
        match self {
            EscalationResult::NoEscalation => None,
            EscalationResult::Escalation(witness) => Some(witness),
        }
    }
}

/// Wire-level rendering of a check outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Whether the proposed policy escalates.
    pub escalation: bool,
    /// Present exactly when `escalation` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    /// Present when diagnostics were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}
