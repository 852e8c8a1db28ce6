use crate::output::{print_json, print_table};
use crate::GateArgs;
use dareset_core::runtime::{resolve_runtime, Runtime};
use std::path::Path;

/// `da-reset plan`: show the exact commands `run` would execute, in order.
pub fn run(config_path: &Path, gate: GateArgs, json: bool) -> anyhow::Result<()> {
    let config = super::load_effective(config_path, gate)?;

    // A dry run is still useful on a host without a runtime installed.
    let runtime = match resolve_runtime(config.runtime.as_deref()) {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!("{e}; showing commands for docker");
            Runtime::Docker
        }
    };
    let plan = super::plan_for(&config, &runtime)?;

    if json {
        print_json(&plan)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = plan
        .steps()
        .enumerate()
        .map(|(i, inv)| {
            vec![
                (i + 1).to_string(),
                inv.step.to_string(),
                inv.container.clone(),
                inv.command_line(),
            ]
        })
        .collect();
    print_table(&["#", "STEP", "CONTAINER", "COMMAND"], rows);
    println!("\ngate: {}", plan.gate.as_str());
    Ok(())
}
