pub mod config;
pub mod plan;
pub mod run;

use anyhow::Context;
use dareset_core::config::{Config, GatePolicy};
use dareset_core::plan::{build_plan, PlanContext, ResetPlan};
use dareset_core::runtime::Runtime;
use std::path::Path;

use crate::GateArgs;

/// Load the config (defaults if the file is absent) and apply flag overrides.
fn load_effective(config_path: &Path, gate: GateArgs) -> anyhow::Result<Config> {
    let mut config = Config::load_or_default(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if gate.unconditional {
        config.gate = GatePolicy::Unconditional;
    }
    if gate.no_preflight {
        config.preflight = false;
    }
    Ok(config)
}

fn plan_for(config: &Config, runtime: &Runtime) -> anyhow::Result<ResetPlan> {
    let ctx = PlanContext::detect(config);
    build_plan(config, runtime, ctx).context("invalid configuration")
}
