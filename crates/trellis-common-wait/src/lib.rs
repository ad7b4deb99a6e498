// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded polling for "wait until X becomes Y".
//!
//! [`wait_until`] knows nothing about the resource it polls. Every wait in the
//! harness (directories appearing, pods being scheduled, container statuses
//! filling in, the node list becoming non-empty) is this loop with a
//! different probe and predicate.

mod error;
mod policy;
mod wait;

pub use error::WaitError;
pub use policy::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
pub use wait::wait_until;
