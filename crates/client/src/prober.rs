// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probing: should a timed-out gather keep waiting?

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use muster_core::{AgentId, Clock, JobId, Target};
use serde_json::Value;

use crate::client::ClientCore;
use crate::publish::Publisher;

pub(crate) const FIND_JOB_FUN: &str = "saltutil.find_job";
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension policy for timed-out gathers.
///
/// The default implementation asks the agents themselves; tests inject
/// scripted answers to pin down extension behavior.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Which agents matched by `target` report `jid` as still running.
    async fn probe(&self, jid: &JobId, target: &Target) -> HashMap<AgentId, bool>;
}

/// Probes by re-publishing `find_job` through the blocking-all path with a
/// small fixed timeout. A truthy reply means the agent is still working.
pub struct FindJobProber<P, C> {
    core: Arc<ClientCore<P, C>>,
}

impl<P, C> FindJobProber<P, C> {
    pub(crate) fn new(core: Arc<ClientCore<P, C>>) -> Self {
        Self { core }
    }
}

#[async_trait]
impl<P, C> Prober for FindJobProber<P, C>
where
    P: Publisher + 'static,
    C: Clock + 'static,
{
    async fn probe(&self, jid: &JobId, target: &Target) -> HashMap<AgentId, bool> {
        self.core
            .gather_job_info(jid, target)
            .await
            .into_iter()
            .map(|(id, value)| (id, value_truthy(&value)))
            .collect()
    }
}

/// Python-style truthiness: null, false, zero, and empty containers are
/// falsy; everything else is truthy.
pub(crate) fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Scripted prober: replays one answer per probe, then reports nothing
    /// running.
    pub struct FakeProber {
        inner: Mutex<FakeProbeState>,
    }

    struct FakeProbeState {
        answers: VecDeque<HashMap<AgentId, bool>>,
        probes: usize,
    }

    impl FakeProber {
        pub fn new() -> Self {
            Self { inner: Mutex::new(FakeProbeState { answers: VecDeque::new(), probes: 0 }) }
        }

        pub fn with_answer(self, answer: impl IntoIterator<Item = (&'static str, bool)>) -> Self {
            self.inner
                .lock()
                .answers
                .push_back(answer.into_iter().map(|(id, live)| (AgentId::new(id), live)).collect());
            self
        }

        /// How many times the gather asked for an extension verdict.
        pub fn probes(&self) -> usize {
            self.inner.lock().probes
        }
    }

    impl Default for FakeProber {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, _jid: &JobId, _target: &Target) -> HashMap<AgentId, bool> {
            let mut state = self.inner.lock();
            state.probes += 1;
            state.answers.pop_front().unwrap_or_default()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProber;

#[cfg(test)]
#[path = "prober_tests.rs"]
mod tests;
