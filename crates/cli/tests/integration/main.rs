//! End-to-end runs of mbuild against scripted toolchains.

mod common;
#[cfg(unix)]
mod run_tests;
