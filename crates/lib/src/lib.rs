//! matrixbuild-lib: Core types and logic for matrixbuild
//!
//! This crate drives a build matrix of compiler × platform × project:
//! - `config`: the declarative configuration and its resolution
//! - `orchestrator`: the two-phase build-then-test run and its report
//! - `execute`: toolchain invocation and test-executable runs
//! - `env` / `placeholder`: environment scopes and template substitution

pub mod config;
pub mod consts;
pub mod context;
pub mod env;
pub mod execute;
pub mod orchestrator;
pub mod placeholder;
pub mod platform;
pub mod util;
pub mod vcs;
