// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target-expression normalization before publishing.

use async_trait::async_trait;
use muster_core::{ClientConfig, Target, TargetKind};
use thiserror::Error;

use crate::error::ClientError;

#[derive(Debug, Error)]
#[error("range server error: {0}")]
pub struct RangeError(pub String);

/// Adapter for expanding range expressions against a range server.
#[async_trait]
pub trait RangeExpander: Send + Sync {
    async fn expand(&self, expr: &str) -> Result<Vec<String>, RangeError>;
}

/// Normalize a target before it reaches the wire.
///
/// Nodegroups compose into compound expressions; range expressions expand
/// into id lists when a backend is configured. Everything else passes
/// through untouched.
pub async fn resolve_target(
    target: Target,
    config: &ClientConfig,
    range: Option<&dyn RangeExpander>,
) -> Result<Target, ClientError> {
    match target.kind {
        TargetKind::Nodegroup => {
            let Some(composed) = config.nodegroups.get(&target.expr) else {
                return Err(ClientError::Invocation(format!(
                    "Node group {} unavailable in {}",
                    target.expr,
                    config.conf_file.display()
                )));
            };
            Ok(Target::new(composed.clone(), TargetKind::Compound))
        }
        TargetKind::Range => match range {
            Some(backend) => {
                let ids = match backend.expand(&target.expr).await {
                    Ok(ids) => ids,
                    Err(err) => {
                        tracing::warn!(expr = %target.expr, error = %err, "range expansion failed");
                        Vec::new()
                    }
                };
                Ok(Target::new(ids.join(","), TargetKind::List))
            }
            None => Ok(target),
        },
        _ => Ok(target),
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
