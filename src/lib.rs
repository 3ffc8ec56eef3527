//! codemend library crate
//!
//! Verify-and-repair harness for AI-generated code: sanitizes a snippet,
//! classifies its language, synthesizes a runnable test entry point,
//! executes it in an isolated subprocess, and iteratively repairs it from
//! compiler/runtime diagnostics, bounded by attempt count and wall-clock
//! timeout.

pub mod config;
pub mod defaults;
pub mod executor;
pub mod harness;
pub mod language;
pub mod oracle;
pub mod repair;
pub mod sanitize;
pub mod sig;
pub mod util;

pub use config::Config;
pub use executor::{ExecutionResult, Runner, SandboxedExecutor};
pub use language::{classify, LanguageVariant};
pub use oracle::{OpenRouterOracle, RepairOracle};
pub use repair::{verify_and_repair, RepairConfig, RepairOutcome};
