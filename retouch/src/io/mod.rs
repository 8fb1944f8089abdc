//! I/O helpers: processes, git, filesystem and configuration.

pub mod config;
pub mod git;
pub mod opener;
pub mod probe;
pub mod process;
