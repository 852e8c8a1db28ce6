//! Map a finished step onto the failure taxonomy.
//!
//! Classification reads the exit status first and the stderr tail second.
//! With a terminal allocated the runtime folds stderr into stdout, so for the
//! interactive drop step only the exit status is available and anything
//! non-zero falls through to `SqlFailed`.

use crate::error::ResetError;
use crate::plan::{Invocation, Step};
use crate::runner::StepOutput;

/// Runtime messages meaning the target container cannot be exec'd into.
const CONTAINER_MARKERS: &[&str] = &[
    "No such container",
    "is not running",
    "is paused",
    "Cannot connect to the Docker daemon",
    "no container with name or ID",
    "container state improper",
];

/// Exit status the runtime uses for its own failures (daemon down, bad
/// container) as opposed to the exec'd command's.
const RUNTIME_ERROR_EXIT: i32 = 125;

/// MySQL client errors for credentials or database grants.
const AUTH_MARKERS: &[&str] = &["ERROR 1045", "ERROR 1044", "Access denied"];

/// MySQL client errors for a server that cannot be reached.
const DB_UNREACHABLE_MARKERS: &[&str] = &[
    "ERROR 2002",
    "ERROR 2003",
    "ERROR 2005",
    "ERROR 2006",
    "ERROR 2013",
];

fn has_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

fn detail(out: &StepOutput) -> String {
    let tail = out.stderr_tail.trim();
    if tail.is_empty() {
        match out.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    } else {
        tail.lines().last().unwrap_or(tail).to_string()
    }
}

/// Returns the failure for `out`, or `None` when the step succeeded.
pub fn classify(invocation: &Invocation, db_user: &str, out: &StepOutput) -> Option<ResetError> {
    if invocation.step == Step::Preflight {
        return classify_preflight(invocation, out);
    }
    if out.success() {
        return None;
    }

    let container = invocation.container.clone();
    let stderr = out.stderr_tail.as_str();
    if out.code == Some(RUNTIME_ERROR_EXIT) || has_any(stderr, CONTAINER_MARKERS) {
        return Some(ResetError::ContainerUnreachable {
            container,
            detail: detail(out),
        });
    }

    let code = out.code.unwrap_or(-1);
    match invocation.step {
        Step::Drop if has_any(stderr, AUTH_MARKERS) => Some(ResetError::AuthenticationFailed {
            user: db_user.to_string(),
            detail: detail(out),
        }),
        Step::Drop if has_any(stderr, DB_UNREACHABLE_MARKERS) => {
            Some(ResetError::DatabaseUnreachable {
                container,
                detail: detail(out),
            })
        }
        Step::Drop => Some(ResetError::SqlFailed {
            code,
            detail: detail(out),
        }),
        _ => Some(ResetError::MaintenanceFailed {
            code,
            detail: detail(out),
        }),
    }
}

fn classify_preflight(invocation: &Invocation, out: &StepOutput) -> Option<ResetError> {
    if out.success() && out.stdout.trim() == "true" {
        return None;
    }
    let detail = if out.success() {
        "container exists but is not running".to_string()
    } else {
        detail(out)
    };
    Some(ResetError::ContainerUnreachable {
        container: invocation.container.clone(),
        detail,
    })
}
