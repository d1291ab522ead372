// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking reply gathers: the convergence loop over both result channels.
//!
//! Per iteration: drain the job directory (and one bounded event wait when
//! the source is available), re-check convergence, honor the write-tag
//! hold, then the timeout with its probe-driven extension. The timeout only
//! ever grows, by exactly the base quantum per extension.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use muster_core::{AgentId, Clock, JobHandle, JobId, Reply, ReturnMap, Target};
use muster_wire::JobEvent;
use serde_json::Value;
use tokio::time::sleep;

use crate::client::ClientCore;
use crate::event::{EventSource, NoEvents};
use crate::job_dir::{jid_dir, scan_returns, wtag_present};
use crate::prober::{Prober, FIND_JOB_FUN, PROBE_TIMEOUT};
use crate::publish::Publisher;

/// Event-wait slice and idle backoff for event-merged loops.
pub(crate) const POLL_DELAY: Duration = Duration::from_millis(10);
/// Idle backoff between pure filesystem scans.
pub(crate) const POLL_DELAY_FS: Duration = Duration::from_millis(20);
/// How long a write-tag may suppress the timeout past its deadline.
pub(crate) const WTAG_GRACE: Duration = Duration::from_secs(1);

/// `|found ∩ expected| >= |expected|`. Unexpected repliers count toward
/// `found` but never toward convergence; an empty expected set is
/// immediately convergent.
pub(crate) fn converged(found: &HashSet<AgentId>, expected: &HashSet<AgentId>) -> bool {
    expected.iter().filter(|id| found.contains(*id)).count() >= expected.len()
}

impl<P: Publisher, C: Clock> ClientCore<P, C> {
    /// Gather replies until convergence, expiry, or an unknown job.
    ///
    /// The timeout epoch starts at an infinite-future sentinel and becomes
    /// real when the first reply lands, so slow jobs get the full budget
    /// measured from their first sign of life; a separate cutoff from call
    /// entry bounds the no-replies-at-all case.
    pub(crate) async fn gather_returns<E: EventSource>(
        &self,
        job: &JobHandle,
        mut events: Option<&mut E>,
        prober: Option<&dyn Prober>,
        want_out: bool,
    ) -> ReturnMap {
        let dir = jid_dir(&self.config.cachedir, &self.config.hash_type, &job.jid);
        let quantum = job.base_timeout;
        let mut timeout = job.base_timeout;
        let gstart = self.clock.now();
        let mut start: Option<tokio::time::Instant> = None;
        let mut expected = job.expected.clone();
        let mut found: HashSet<AgentId> = HashSet::new();
        let mut ret = ReturnMap::new();

        if job.jid.is_failed() {
            return ret;
        }
        if !dir.is_dir() {
            tracing::debug!(jid = %job.jid, "unknown job: directory missing");
            return ret;
        }

        loop {
            for (id, reply) in scan_returns(&dir, &found, want_out) {
                found.insert(id.clone());
                ret.insert(id, reply);
            }
            if let Some(source) = events.as_deref_mut() {
                if let Some(event) = source.next_event(POLL_DELAY, Some(&job.jid)).await {
                    match event {
                        JobEvent::Syndic { syndic } => {
                            tracing::debug!(
                                jid = %job.jid,
                                count = syndic.len(),
                                "forwarder announced agents"
                            );
                            expected.extend(syndic);
                        }
                        JobEvent::Return(ev) => {
                            if found.insert(ev.id.clone()) {
                                ret.insert(ev.id, Reply { ret: ev.ret, out: ev.out });
                            }
                        }
                    }
                }
            }

            let now = self.clock.now();
            if start.is_none() && !ret.is_empty() {
                start = Some(now);
            }
            if converged(&found, &expected) {
                return ret;
            }
            let epoch = start.unwrap_or(gstart);
            if wtag_present(&dir) && now <= epoch + timeout + WTAG_GRACE {
                if events.is_none() {
                    sleep(POLL_DELAY_FS).await;
                }
                continue;
            }
            if now > epoch + timeout {
                if let Some(prober) = prober {
                    let running = prober.probe(&job.jid, &job.target).await;
                    if running.values().any(|live| *live) {
                        timeout += quantum;
                        tracing::debug!(
                            jid = %job.jid,
                            timeout = ?timeout,
                            "agents still running; extending timeout"
                        );
                        continue;
                    }
                }
                tracing::debug!(
                    jid = %job.jid,
                    found = found.len(),
                    expected = expected.len(),
                    "gather expired"
                );
                return ret;
            }
            if events.is_none() {
                sleep(POLL_DELAY_FS).await;
            }
        }
    }

    /// Filesystem-only, non-extending gather for the liveness probe itself.
    pub(crate) async fn probe_returns(&self, job: &JobHandle) -> HashMap<AgentId, Value> {
        self.gather_returns::<NoEvents>(job, None, None, false)
            .await
            .into_iter()
            .map(|(id, reply)| (id, reply.ret))
            .collect()
    }

    /// Re-enter the publish path with a `find_job` probe against the
    /// original target. Probe failures are an empty map, never an error.
    pub(crate) async fn gather_job_info(
        &self,
        jid: &JobId,
        target: &Target,
    ) -> HashMap<AgentId, Value> {
        let arg = vec![Value::String(jid.to_string())];
        let probe = self
            .run_job(&target.expr, FIND_JOB_FUN, arg, target.kind, "", Some(PROBE_TIMEOUT), None)
            .await;
        match probe {
            Ok(Some(job)) => self.probe_returns(&job).await,
            Ok(None) => HashMap::new(),
            Err(err) => {
                tracing::warn!(jid = %jid, error = %err, "liveness probe failed");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "gather_tests.rs"]
mod tests;
