//! keyward - resolve build secrets from the command line
//!
//! Thin front end over [`keyward_secrets`]: flags select the local store and
//! the secret server, commands resolve identifiers and write the payloads.

// CLI output goes to stdout/stderr directly
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing setup.
pub mod tracing;
