//! E2E test harness.
//!
//! This module contains test infrastructure with intentionally unused
//! helpers that will be used as more e2e scenarios are written.

#![allow(dead_code)]

pub mod remote;
pub mod workspace;

// Re-export commonly used types
pub use remote::ScriptedRemote;
pub use workspace::TestWorkspace;
