use crate::output::{print_json, print_table};
use crate::GateArgs;
use anyhow::Context;
use dareset_core::reset::{execute, RunReport};
use dareset_core::runner::SystemRunner;
use dareset_core::runtime::resolve_runtime;
use std::path::Path;

/// `da-reset run`: drop the tables, then rebuild the schema.
///
/// Returns the process exit code: the last wrapped command's status, or 1 if
/// the run stopped before any wrapped command ran.
pub fn run(config_path: &Path, gate: GateArgs, json: bool) -> anyhow::Result<i32> {
    let config = super::load_effective(config_path, gate)?;
    let runtime = resolve_runtime(config.runtime.as_deref())
        .context("cannot locate a container runtime")?;
    let plan = super::plan_for(&config, &runtime)?;

    tracing::info!(
        runtime = %plan.runtime,
        gate = plan.gate.as_str(),
        tables = %config.qualified_tables().join(","),
        "starting reset"
    );

    let report = execute(&plan, &config.database.user, &mut SystemRunner);

    if json {
        print_json(&report_json(&report))?;
    } else {
        print_summary(&report);
    }

    Ok(report.exit_code())
}

fn report_json(report: &RunReport) -> serde_json::Value {
    let steps: Vec<serde_json::Value> = report
        .steps
        .iter()
        .map(|s| {
            let error = s.error.as_ref().map(|e| {
                serde_json::json!({
                    "kind": e.kind(),
                    "message": e.to_string(),
                })
            });
            serde_json::json!({
                "step": s.step,
                "container": s.container,
                "command": s.command_line,
                "exit_code": s.exit_code,
                "duration_ms": s.duration_ms,
                "error": error,
            })
        })
        .collect();
    serde_json::json!({
        "gate": report.gate,
        "succeeded": report.succeeded(),
        "aborted": report.aborted,
        "exit_code": report.exit_code(),
        "steps": steps,
    })
}

fn print_summary(report: &RunReport) {
    let rows: Vec<Vec<String>> = report
        .steps
        .iter()
        .map(|s| {
            vec![
                s.step.to_string(),
                s.container.clone(),
                s.exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                format!("{}ms", s.duration_ms),
                (if s.error.is_some() { "failed" } else { "ok" }).to_string(),
            ]
        })
        .collect();
    println!();
    print_table(&["STEP", "CONTAINER", "EXIT", "DURATION", "RESULT"], rows);

    for e in report.errors() {
        eprintln!("error: {e}");
    }
    if report.aborted {
        eprintln!(
            "rebuild skipped: run stopped early (gate: {})",
            report.gate.as_str()
        );
    } else if report.succeeded() {
        println!("\nData accounting tables dropped and recreated.");
    }
}
