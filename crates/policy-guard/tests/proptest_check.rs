//! Property-based tests that drive the solver on small random policies.
//!
//! Case counts are kept low: every case is a full solver run.

use std::collections::{BTreeMap, BTreeSet};

use policy_guard::{check, Capability, CheckOptions, EscalationResult, PathPattern, Policy};
use proptest::prelude::*;

fn arb_pattern() -> impl Strategy<Value = PathPattern> {
    ("[a-z]{1,4}(/[a-z+]{1,4}){0,2}", proptest::bool::ANY).prop_filter_map(
        "pattern must be valid",
        |(body, trailing_star)| {
            let raw = if trailing_star {
                format!("{body}/*")
            } else {
                body
            };
            PathPattern::new(raw).ok()
        },
    )
}

/// Patterns with no wildcards at all: they match exactly themselves.
fn arb_literal_pattern() -> impl Strategy<Value = PathPattern> {
    "[a-z]{1,4}(/[a-z]{1,4}){0,2}"
        .prop_filter_map("pattern must be valid", |raw| PathPattern::new(raw).ok())
}

fn arb_caps() -> impl Strategy<Value = BTreeSet<Capability>> {
    proptest::sample::subsequence(Capability::ALL.to_vec(), 1..=3)
        .prop_map(|caps| caps.into_iter().collect())
}

fn policy_from(map: BTreeMap<PathPattern, BTreeSet<Capability>>) -> Policy {
    Policy::try_from(map).expect("generated capability sets are non-empty")
}

fn arb_policy() -> impl Strategy<Value = Policy> {
    proptest::collection::btree_map(arb_pattern(), arb_caps(), 1..4).prop_map(policy_from)
}

fn arb_literal_policy() -> impl Strategy<Value = Policy> {
    proptest::collection::btree_map(arb_literal_pattern(), arb_caps(), 2..4).prop_map(policy_from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn a_policy_never_escalates_against_itself(p in arb_policy()) {
        let report = check(&p, &p, &CheckOptions::default()).expect("check succeeds");
        prop_assert_eq!(report.result, EscalationResult::NoEscalation);
    }

    #[test]
    fn a_blanket_deny_grants_nothing(p in arb_policy()) {
        // Adding `deny` on `*` vetoes every grant, so the result admits
        // no pair at all and cannot escalate over any current policy,
        // including the empty one.
        let mut map: BTreeMap<_, _> = p.into();
        map.entry(PathPattern::new("*").expect("valid pattern"))
            .or_default()
            .insert(Capability::Deny);
        let denied = policy_from(map);

        let report = check(&Policy::new(), &denied, &CheckOptions::default())
            .expect("check succeeds");
        prop_assert_eq!(report.result, EscalationResult::NoEscalation);
    }

    #[test]
    fn dropping_a_rule_from_a_literal_policy_never_escalates(p in arb_literal_policy()) {
        // Without wildcards every pattern matches only itself, so no
        // shadowing can widen a grant: removing a rule only shrinks the
        // admitted set.
        let mut map: BTreeMap<_, _> = p.clone().into();
        let last = map.keys().next_back().expect("policy is non-empty").clone();
        map.remove(&last);
        let narrowed = policy_from(map);

        let report = check(&p, &narrowed, &CheckOptions::default()).expect("check succeeds");
        prop_assert_eq!(report.result, EscalationResult::NoEscalation);
    }
}
