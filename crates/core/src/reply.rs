// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::AgentId;

/// One agent's answer to a published command.
///
/// `ret` is the structure-preserving user payload produced by the remote
/// function; `out` is an optional presentation hint (an output-formatter
/// name) and is omitted from serialized forms when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ret: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<Value>,
}

impl Reply {
    pub fn new(ret: Value) -> Self {
        Self { ret, out: None }
    }

    pub fn with_out(ret: Value, out: Value) -> Self {
        Self { ret, out: Some(out) }
    }
}

/// Replies keyed by the agent that produced them.
pub type ReturnMap = HashMap<AgentId, Reply>;
