//! Sequential execution of a [`ResetPlan`].
//!
//! Order is fixed: preflight probes, then the drop, then the rebuild. Each
//! step blocks until its child exits. A failed preflight or a runtime that
//! cannot be spawned always stops the run; a failed drop stops it only under
//! [`GatePolicy::AbortOnFailure`].

use crate::classify::classify;
use crate::config::GatePolicy;
use crate::error::ResetError;
use crate::plan::{Invocation, ResetPlan, Step};
use crate::runner::CommandRunner;

#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    pub container: String,
    pub command_line: String,
    /// `None` if the child never started or was killed by a signal.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub error: Option<ResetError>,
}

#[derive(Debug)]
pub struct RunReport {
    pub gate: GatePolicy,
    pub steps: Vec<StepReport>,
    /// The run stopped before the rebuild step.
    pub aborted: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        !self.aborted && self.steps.iter().all(|s| s.error.is_none())
    }

    pub fn ran(&self, step: Step) -> bool {
        self.steps.iter().any(|s| s.step == step)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ResetError> {
        self.steps.iter().filter_map(|s| s.error.as_ref())
    }

    /// Exit status of the last wrapped command that ran. Failures that
    /// happened before any wrapped command ran map to 1.
    pub fn exit_code(&self) -> i32 {
        let last = self.steps.iter().rev().find(|s| s.step != Step::Preflight);
        match last {
            Some(StepReport {
                exit_code: Some(code),
                ..
            }) => *code,
            Some(StepReport { error: None, .. }) => 0,
            Some(_) => 1,
            None if self.succeeded() => 0,
            None => 1,
        }
    }
}

fn run_step(
    runner: &mut dyn CommandRunner,
    invocation: &Invocation,
    db_user: &str,
) -> StepReport {
    tracing::info!(
        step = %invocation.step,
        container = %invocation.container,
        "running step"
    );
    let (exit_code, duration_ms, error) = match runner.run(invocation) {
        Ok(out) => (out.code, out.duration_ms, classify(invocation, db_user, &out)),
        Err(e) => (None, 0, Some(e)),
    };
    if let Some(e) = &error {
        tracing::warn!(step = %invocation.step, error = %e, "step failed");
    }
    StepReport {
        step: invocation.step,
        container: invocation.container.clone(),
        command_line: invocation.command_line(),
        exit_code,
        duration_ms,
        error,
    }
}

/// Run `plan` to completion or to the first gating failure.
pub fn execute(plan: &ResetPlan, db_user: &str, runner: &mut dyn CommandRunner) -> RunReport {
    let mut report = RunReport {
        gate: plan.gate,
        steps: Vec::new(),
        aborted: false,
    };

    for probe in &plan.preflight {
        let step = run_step(runner, probe, db_user);
        let failed = step.error.is_some();
        report.steps.push(step);
        if failed {
            report.aborted = true;
            return report;
        }
    }

    let drop = run_step(runner, &plan.drop, db_user);
    let stop = match &drop.error {
        Some(ResetError::SpawnFailed { .. }) => true,
        Some(e) => plan.gate == GatePolicy::AbortOnFailure && e.aborts(),
        None => false,
    };
    if drop.error.is_some() && !stop {
        tracing::warn!(gate = plan.gate.as_str(), "drop failed; rebuilding anyway");
    }
    report.steps.push(drop);
    if stop {
        report.aborted = true;
        return report;
    }

    let rebuild = run_step(runner, &plan.rebuild, db_user);
    report.steps.push(rebuild);
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
