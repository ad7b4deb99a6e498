// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Command execution for the trellis harness.
//!
//! This crate provides:
//! - The [`CommandRunner`] trait used by every component that shells out
//! - [`ShellRunner`], which runs commands through `sh -c`, optionally
//!   wrapped in `sudo`
//! - [`ScriptedRunner`], a recording mock for tests
//!
//! Runners never retry. Retrying is the caller's decision.

mod error;
mod runner;
mod scripted;

pub use error::{ExecError, ExecResult};
pub use runner::{wrap_command, CommandRunner, ShellRunner, ELEVATION_PREFIX};
pub use scripted::{RecordedCommand, ScriptedRunner};
