//! Background watcher that discards git's phantom "modified" files.
//!
//! When a content filter or line-ending normalization is pending, git reports
//! files as changed even though nothing meaningful differs, and warns that the
//! file will be rewritten "the next time Git touches it". This crate spots those
//! reports and restores the affected files. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (report parsing, classification,
//!   repair planning). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (processes, git, filesystem, config).
//!   Isolated behind traits to enable fakes in tests.
//!
//! Orchestration modules ([`check`], [`watch`], [`control`]) coordinate core
//! logic with I/O to implement the CLI commands.

pub mod check;
pub mod control;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod watch;
