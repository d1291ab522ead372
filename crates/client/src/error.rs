// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use muster_core::ConfigError;
use thiserror::Error;

/// Errors surfaced to callers.
///
/// Only invocation and authentication failures are raised; transport
/// unreachability, unknown jobs, and transient decode anomalies are
/// reflected in the shape of the result (emptiness, missing agents) so a
/// remote-agent failure never crashes the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed or unresolvable request; nothing was published.
    #[error("{0}")]
    Invocation(String),
    /// The master rejected the publish.
    #[error("{0}")]
    Auth(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The facade was asked for a function the agent does not expose.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
}
