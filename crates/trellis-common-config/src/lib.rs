// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration for the trellis test harness.
//!
//! Values are resolved from three layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. An optional TOML config file
//! 3. Environment variables
//!
//! String keys only exist at the environment boundary; everything past
//! [`HarnessConfig`] is typed.

mod config;
pub mod env;
mod error;
mod layer;

pub use config::{ConfigKey, HarnessConfig, Platform};
pub use env::{env_layer, env_layer_from};
pub use error::ConfigError;
pub use layer::ConfigLayer;
