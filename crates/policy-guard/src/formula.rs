//! Translation of a policy into a boolean formula over `(path, cap)`.

use std::collections::BTreeSet;

use tracing::debug;
use z3::ast::{Ast, Bool, String as ZString};
use z3::Context;

use crate::pattern;
use crate::policy::{Capability, PathPattern, Policy};
use crate::priority;

/// The free string variables shared by both policy formulas in a check.
pub(crate) struct PolicyVars<'ctx> {
    pub(crate) path: ZString<'ctx>,
    pub(crate) cap: ZString<'ctx>,
}

impl<'ctx> PolicyVars<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context) -> Self {
        Self {
            path: ZString::new_const(ctx, "path"),
            cap: ZString::new_const(ctx, "cap"),
        }
    }
}

/// Build `φ_P(path, cap)`: true exactly when policy `P` grants `cap` on
/// `path`.
///
/// The allow side is an if-then-else cascade over the grant rules in
/// priority order, so the single highest-priority matching pattern
/// dictates the capability set and shadows every lower-priority match.
/// The deny side is a plain disjunction layered outside the cascade: a
/// matching `deny` rule vetoes the grant no matter where it ranks.
pub(crate) fn policy_formula<'ctx>(
    ctx: &'ctx Context,
    vars: &PolicyVars<'ctx>,
    policy: &Policy,
) -> Bool<'ctx> {
    let mut allow: Vec<(&PathPattern, &BTreeSet<Capability>)> = policy
        .rules()
        .filter(|(_, caps)| caps.iter().any(|c| !c.is_deny()))
        .collect();

    // Ascending priority: the fold below nests the last (highest) rule
    // outermost.
    allow.sort_by(|(a, _), (b, _)| priority::compare(a, b));

    let mut is_allowed = Bool::from_bool(ctx, false);
    for (pattern, caps) in &allow {
        let path_match = vars.path.regex_matches(&pattern::compile(ctx, pattern));
        let cap_match = capability_match(ctx, vars, caps);
        is_allowed = path_match.ite(&cap_match, &is_allowed);
    }

    let denies: Vec<Bool<'_>> = policy
        .rules()
        .filter(|(_, caps)| caps.contains(&Capability::Deny))
        .map(|(pattern, _)| vars.path.regex_matches(&pattern::compile(ctx, pattern)))
        .collect();
    let is_denied = any(ctx, denies);

    debug!(
        rules = policy.len(),
        grants = allow.len(),
        "policy formula built"
    );

    Bool::and(ctx, &[&is_allowed, &is_denied.not()])
}

/// Disjunction of `cap = c` over the non-deny capabilities of a rule.
fn capability_match<'ctx>(
    ctx: &'ctx Context,
    vars: &PolicyVars<'ctx>,
    caps: &BTreeSet<Capability>,
) -> Bool<'ctx> {
    let grants: Vec<Bool<'_>> = caps
        .iter()
        .filter(|c| !c.is_deny())
        .map(|c| vars.cap._eq(&string_literal(ctx, c.as_str())))
        .collect();
    any(ctx, grants)
}

fn any<'ctx>(ctx: &'ctx Context, clauses: Vec<Bool<'ctx>>) -> Bool<'ctx> {
    match clauses.as_slice() {
        [] => Bool::from_bool(ctx, false),
        [only] => only.clone(),
        _ => {
            let refs: Vec<&Bool<'_>> = clauses.iter().collect();
            Bool::or(ctx, &refs)
        }
    }
}

fn string_literal<'ctx>(ctx: &'ctx Context, s: &str) -> ZString<'ctx> {
    // Capability names and validated patterns never contain NUL.
    ZString::from_str(ctx, s).expect("policy strings contain no NUL bytes")
}
