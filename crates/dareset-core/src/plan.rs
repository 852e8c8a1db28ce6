//! Turns a [`Config`] into the exact command lines that will run.
//!
//! Building a plan never touches the container runtime, so `da-reset plan`
//! and the tests can inspect argv without side effects.

use crate::config::Config;
use crate::error::Result;
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variable the MySQL client reads its password from.
pub const PASSWORD_VAR: &str = "MYSQL_PWD";

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Preflight,
    Drop,
    Rebuild,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Preflight => "preflight",
            Step::Drop => "drop",
            Step::Rebuild => "rebuild",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A password forwarded into the container through the child environment.
/// Only the variable names are recorded; the value is read at spawn time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedEnv {
    /// Name inside the container (`MYSQL_PWD`).
    pub name: String,
    /// Name in our own environment that holds the value.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub step: Step,
    pub container: String,
    pub program: String,
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_env: Option<ForwardedEnv>,
    /// The child reads from our stdin (runtime `-i`).
    #[serde(default)]
    pub stdin: bool,
    /// A terminal is allocated (runtime `-t`); stderr is merged into stdout.
    #[serde(default)]
    pub tty: bool,
}

impl Invocation {
    /// Shell-style rendering for display. Not meant to be fed back to a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@{}$".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ---------------------------------------------------------------------------
// PlanContext / ResetPlan
// ---------------------------------------------------------------------------

/// Facts about the invoking process that shape argv.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanContext {
    pub stdin_is_terminal: bool,
    /// `database.password_env` is configured and set in our environment.
    pub password_available: bool,
}

impl PlanContext {
    /// Probe the current process.
    pub fn detect(config: &Config) -> Self {
        use std::io::IsTerminal;
        Self {
            stdin_is_terminal: std::io::stdin().is_terminal(),
            password_available: config
                .database
                .password_env
                .as_deref()
                .is_some_and(|var| std::env::var_os(var).is_some()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPlan {
    pub runtime: String,
    pub gate: crate::config::GatePolicy,
    pub preflight: Vec<Invocation>,
    pub drop: Invocation,
    pub rebuild: Invocation,
}

impl ResetPlan {
    /// Every invocation in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &Invocation> {
        self.preflight
            .iter()
            .chain(std::iter::once(&self.drop))
            .chain(std::iter::once(&self.rebuild))
    }
}

/// `DROP TABLE IF EXISTS a,b,c;` with no spaces between names.
pub fn render_drop_sql(tables: &[String]) -> String {
    format!("DROP TABLE IF EXISTS {};", tables.join(","))
}

pub fn build_plan(config: &Config, runtime: &Runtime, ctx: PlanContext) -> Result<ResetPlan> {
    config.check()?;
    let program = runtime.program().to_string();

    let preflight = if config.preflight {
        [&config.database.container, &config.application.container]
            .into_iter()
            .map(|container| Invocation {
                step: Step::Preflight,
                container: container.clone(),
                program: program.clone(),
                args: vec![
                    "inspect".to_string(),
                    "--format".to_string(),
                    "{{.State.Running}}".to_string(),
                    container.clone(),
                ],
                forward_env: None,
                stdin: false,
                tty: false,
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(ResetPlan {
        runtime: program.clone(),
        gate: config.gate,
        preflight,
        drop: drop_invocation(config, &program, ctx),
        rebuild: rebuild_invocation(config, &program),
    })
}

fn drop_invocation(config: &Config, program: &str, ctx: PlanContext) -> Invocation {
    let db = &config.database;
    let stdin = db.interactive;
    let tty = db.interactive && ctx.stdin_is_terminal;
    let forward_env = match &db.password_env {
        Some(source) if ctx.password_available => Some(ForwardedEnv {
            name: PASSWORD_VAR.to_string(),
            source: source.clone(),
        }),
        _ => None,
    };

    let mut args = vec!["exec".to_string()];
    if stdin {
        args.push("-i".to_string());
    }
    if tty {
        args.push("-t".to_string());
    }
    if let Some(env) = &forward_env {
        args.push("-e".to_string());
        args.push(env.name.clone());
    }
    args.push(db.container.clone());
    args.push(db.client.clone());
    args.push("-u".to_string());
    args.push(db.user.clone());
    if forward_env.is_none() {
        args.push("-p".to_string());
    }
    args.push(db.name.clone());
    args.push(format!(
        "--execute={}",
        render_drop_sql(&config.qualified_tables())
    ));

    Invocation {
        step: Step::Drop,
        container: db.container.clone(),
        program: program.to_string(),
        args,
        forward_env,
        stdin,
        tty,
    }
}

fn rebuild_invocation(config: &Config, program: &str) -> Invocation {
    let app = &config.application;
    let mut args = vec![
        "exec".to_string(),
        app.container.clone(),
        app.php.clone(),
        app.update_script.clone(),
    ];
    args.extend(app.update_args.iter().cloned());

    Invocation {
        step: Step::Rebuild,
        container: app.container.clone(),
        program: program.to_string(),
        args,
        forward_env: None,
        stdin: false,
        tty: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
