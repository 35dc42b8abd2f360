//! Shared utilities.
//!
//! Lexical path handling used by the resolvers, plus test helpers.

pub mod path;

#[cfg(test)]
pub mod testutil;
