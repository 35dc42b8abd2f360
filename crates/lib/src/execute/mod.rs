//! External process execution for builds and tests.
//!
//! - [`toolchain`] builds one project through the compiler toolchain
//! - [`test_runner`] runs a built test executable across dependency versions
//! - [`process`] spawns processes with an explicit environment and working directory
//! - [`log`] appends to the per (compiler, platform) build log

pub mod log;
pub mod process;
pub mod test_runner;
pub mod toolchain;

pub use log::BuildLog;
pub use process::ProcessError;
pub use test_runner::{TestRunner, VersionSlot};
pub use toolchain::{MsBuildToolchain, Toolchain};
