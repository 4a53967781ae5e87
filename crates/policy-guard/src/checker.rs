//! The escalation check: compose two policy formulas and discharge the
//! query with Z3.

use tracing::debug;
use z3::ast::{Bool, String as ZString};
use z3::{Config, Context, Model, SatResult, Solver};

use crate::error::{CheckError, Result};
use crate::formula::{self, PolicyVars};
use crate::policy::{
    CheckRequest, CheckResponse, Diagnostics, EscalationResult, Policy, Witness,
};

/// Options for a single escalation check.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Capture the textual rendering of both policy formulas.
    pub diagnostics: bool,
    /// Solver timeout in milliseconds. `None` runs unbounded.
    pub timeout_ms: Option<u64>,
}

/// Outcome of an escalation check.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// The verdict, with a witness when an escalation exists.
    pub result: EscalationResult,
    /// Formula text, present when requested via [`CheckOptions`].
    pub diagnostics: Option<Diagnostics>,
}

impl CheckReport {
    /// Render the report in the wire-level response shape.
    pub fn into_response(self) -> CheckResponse {
        let (escalation, witness) = match self.result {
            EscalationResult::NoEscalation => (false, None),
            EscalationResult::Escalation(witness) => (true, Some(witness)),
        };
        CheckResponse {
            escalation,
            witness,
            diagnostics: self.diagnostics,
        }
    }
}

/// Check whether `new` admits any `(path, capability)` pair that
/// `current` does not.
///
/// The query `φ_new ∧ ¬φ_current` has a model exactly when such a pair
/// exists; `unsat` is a proof that none does, over the entire path
/// alphabet. Every check owns a fresh solver context, released on all
/// exit paths; independent checks may run concurrently.
///
/// # Errors
///
/// [`CheckError::SolverUnknown`] when the solver gives up (for example
/// under [`CheckOptions::timeout_ms`]); [`CheckError::SolverInternal`]
/// when a satisfiable query yields no usable model.
pub fn check(current: &Policy, new: &Policy, options: &CheckOptions) -> Result<CheckReport> {
    let mut config = Config::new();
    if let Some(ms) = options.timeout_ms {
        config.set_timeout_msec(ms);
    }
    let ctx = Context::new(&config);
    let vars = PolicyVars::new(&ctx);

    let current_formula = formula::policy_formula(&ctx, &vars, current);
    let new_formula = formula::policy_formula(&ctx, &vars, new);

    let diagnostics = options.diagnostics.then(|| Diagnostics {
        current_formula: current_formula.to_string(),
        new_formula: new_formula.to_string(),
    });

    let solver = Solver::new(&ctx);
    solver.assert(&Bool::and(&ctx, &[&new_formula, &current_formula.not()]));

    match solver.check() {
        SatResult::Sat => {
            let model = solver.get_model().ok_or_else(|| CheckError::SolverInternal {
                detail: "satisfiable query produced no model".to_string(),
            })?;
            let path = eval_string(&model, &vars.path, "path")?;
            let capability = eval_string(&model, &vars.cap, "cap")?;
            debug!(path = %path, capability = %capability, "escalation witness found");
            Ok(CheckReport {
                result: EscalationResult::Escalation(Witness { path, capability }),
                diagnostics,
            })
        }
        SatResult::Unsat => {
            debug!("escalation query unsatisfiable");
            Ok(CheckReport {
                result: EscalationResult::NoEscalation,
                diagnostics,
            })
        }
        SatResult::Unknown => Err(CheckError::SolverUnknown {
            reason: solver
                .get_reason_unknown()
                .unwrap_or_else(|| "unspecified".to_string()),
        }),
    }
}

/// [`check`] over the structured request boundary.
pub fn check_request(request: &CheckRequest, options: &CheckOptions) -> Result<CheckResponse> {
    check(&request.current, &request.new, options).map(CheckReport::into_response)
}

fn eval_string<'ctx>(
    model: &Model<'ctx>,
    var: &ZString<'ctx>,
    name: &str,
) -> Result<String> {
    model
        .eval(var, true)
        .and_then(|value| value.as_string())
        .ok_or_else(|| CheckError::SolverInternal {
            detail: format!("model has no string value for '{}'", name),
        })
}
