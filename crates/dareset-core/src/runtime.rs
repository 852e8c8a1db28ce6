//! Container runtime detection.
//!
//! Both steps go through the runtime's `exec` subcommand, so anything that
//! accepts `<bin> exec [-i] [-t] [-e VAR] <container> <cmd...>` and
//! `<bin> inspect --format <tmpl> <container>` works.
//!
//! # Runtime priority
//! 1. explicit `runtime` from config
//! 2. docker
//! 3. podman

use crate::error::{ResetError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    Docker,
    Podman,
    /// Binary named in config; used as-is without a PATH check.
    Custom(String),
}

impl Runtime {
    pub fn program(&self) -> &str {
        match self {
            Runtime::Docker => "docker",
            Runtime::Podman => "podman",
            Runtime::Custom(bin) => bin,
        }
    }
}

/// Detect an installed runtime. Returns None if neither docker nor podman is on PATH.
pub fn detect_runtime() -> Option<Runtime> {
    detect_with(|bin| which::which(bin).is_ok())
}

fn detect_with(installed: impl Fn(&str) -> bool) -> Option<Runtime> {
    [Runtime::Docker, Runtime::Podman]
        .into_iter()
        .find(|rt| installed(rt.program()))
}

/// Resolve the runtime to use, preferring the configured binary.
pub fn resolve_runtime(configured: Option<&str>) -> Result<Runtime> {
    match configured {
        Some(bin) if !bin.trim().is_empty() => Ok(match bin {
            "docker" => Runtime::Docker,
            "podman" => Runtime::Podman,
            other => Runtime::Custom(other.to_string()),
        }),
        _ => detect_runtime().ok_or(ResetError::NoContainerRuntime),
    }
}
