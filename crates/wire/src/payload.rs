// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use muster_core::{AgentId, JobId, TargetKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The publish request sent to the master's return port.
///
/// Field names are the wire contract. `kwargs` is present only when named
/// arguments were passed; `user` only when an effective user was resolved;
/// `to` only when publishing through a forwarding master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub cmd: String,
    pub tgt: String,
    pub fun: String,
    pub arg: Vec<Value>,
    pub key: String,
    pub tgt_type: String,
    pub ret: String,
    pub jid: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl PublishPayload {
    pub fn new(
        tgt: impl Into<String>,
        fun: impl Into<String>,
        arg: Vec<Value>,
        key: impl Into<String>,
        tgt_type: TargetKind,
        ret: impl Into<String>,
        jid: JobId,
    ) -> Self {
        Self {
            cmd: "publish".to_string(),
            tgt: tgt.into(),
            fun: fun.into(),
            arg,
            key: key.into(),
            tgt_type: tgt_type.as_str().to_string(),
            ret: ret.into(),
            jid,
            kwargs: None,
            user: None,
            to: None,
        }
    }
}

/// The master's acknowledgement of a publish: the allocated job id and the
/// agents the target expression matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishAck {
    pub jid: JobId,
    pub minions: Vec<AgentId>,
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
