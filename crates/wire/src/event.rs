// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use muster_core::{AgentId, JobId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event published for a job.
///
/// Untagged on the wire: a forwarder announcement carries a `syndic` key, a
/// terminal per-agent reply carries `id`/`return`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobEvent {
    Syndic { syndic: Vec<AgentId> },
    Return(ReturnEvent),
}

/// A terminal per-agent reply delivered over the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnEvent {
    pub id: AgentId,
    #[serde(rename = "return")]
    pub ret: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<Value>,
}

/// Frame shape on the event socket: the job id plus the event fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub jid: JobId,
    #[serde(flatten)]
    pub event: JobEvent,
}

impl EventEnvelope {
    pub fn new(jid: JobId, event: JobEvent) -> Self {
        Self { jid, event }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
