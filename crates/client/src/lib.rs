// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-client: control-plane client for the muster master.
//!
//! [`LocalClient`] publishes one command to a dynamically matched set of
//! agents and gathers their replies from two channels (per-job return files
//! under the master's cache directory, and the live event socket) under a
//! single convergence rule with adaptive timeout extension. Results surface
//! as a complete aggregate ([`LocalClient::cmd`]), a lazy stream
//! ([`LocalClient::cmd_iter`]), or a formatted operator feed
//! ([`LocalClient::cmd_cli`]).

pub mod client;
pub mod error;
pub mod event;
pub mod facade;
mod gather;
mod identity;
pub mod iter_returns;
pub mod job_dir;
pub mod prober;
pub mod publish;
pub mod resolve;

#[cfg(test)]
mod test_helpers;

pub use client::LocalClient;
pub use error::ClientError;
pub use event::{EventSource, MasterEventSource};
pub use facade::{FunctionWrapper, RemoteFunction};
pub use iter_returns::ReturnIter;
pub use job_dir::jid_dir;
pub use prober::{FindJobProber, Prober};
pub use publish::{MasterPublisher, PublishError, Publisher};
pub use resolve::{resolve_target, RangeError, RangeExpander};

#[cfg(any(test, feature = "test-support"))]
pub use event::FakeEventSource;
#[cfg(any(test, feature = "test-support"))]
pub use prober::FakeProber;
#[cfg(any(test, feature = "test-support"))]
pub use publish::{FakePublisher, FakeResponse};
