pub mod classify;
pub mod config;
pub mod error;
pub mod ident;
pub mod io;
pub mod paths;
pub mod plan;
pub mod reset;
pub mod runner;
pub mod runtime;

pub use error::{ResetError, Result};
