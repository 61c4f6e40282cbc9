//! Sheetflow Common Library
//!
//! Shared plumbing for the sheetflow workspace. Currently this is the
//! centralized tracing/logging setup used by both the library and the CLI.

pub mod logging;
