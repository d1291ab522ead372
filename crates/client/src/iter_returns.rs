// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazy reply streams over one result channel.
//!
//! A [`ReturnIter`] is a one-shot, non-restartable sequence of per-agent
//! reply mappings. Event-driven flavors hold the event source exclusively
//! for their lifetime; the directory flavor polls the job tree. Once the
//! iterator signals completion it never yields again.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use muster_core::{AgentId, Clock, JobHandle, JobId, Reply, ReturnMap, Target, TargetKind};
use muster_wire::JobEvent;
use tokio::sync::OwnedMutexGuard;
use tokio::time::{sleep, Instant};

use crate::client::ClientCore;
use crate::event::EventSource;
use crate::gather::{converged, POLL_DELAY, WTAG_GRACE};
use crate::job_dir::{jid_dir, scan_returns, wtag_present};
use crate::prober::Prober;
use crate::publish::Publisher;

/// Lazy stream of per-agent reply mappings for one job.
pub struct ReturnIter<P, E, C> {
    inner: Inner<P, E, C>,
}

enum Inner<P, E, C> {
    /// Publish failed or the job is unknown: one empty yield, then done.
    Empty { yielded: bool },
    Active(Box<Active<P, E, C>>),
    Done,
}

enum SourceKind<E> {
    /// Poll the job directory.
    Dir,
    /// Pull from the event source, held exclusively for this job.
    Events(OwnedMutexGuard<E>),
}

struct Active<P, E, C> {
    core: Arc<ClientCore<P, C>>,
    source: SourceKind<E>,
    prober: Option<Arc<dyn Prober>>,
    verbose: bool,
    jid: JobId,
    target: Target,
    dir: PathBuf,
    expected: HashSet<AgentId>,
    found: HashSet<AgentId>,
    t0: Instant,
    timeout: Duration,
    quantum: Duration,
}

enum Step {
    Yield(ReturnMap),
    Finished,
}

impl<P, E, C> ReturnIter<P, E, C>
where
    P: Publisher,
    E: EventSource,
    C: Clock,
{
    /// A stream that yields one empty mapping and stops, for jobs that never
    /// made it to the broker.
    pub(crate) fn empty() -> Self {
        Self { inner: Inner::Empty { yielded: false } }
    }

    pub(crate) fn events(
        core: Arc<ClientCore<P, C>>,
        guard: OwnedMutexGuard<E>,
        job: JobHandle,
        prober: Option<Arc<dyn Prober>>,
        verbose: bool,
    ) -> Self {
        Self::build(core, SourceKind::Events(guard), job, prober, verbose)
    }

    pub(crate) fn dir(
        core: Arc<ClientCore<P, C>>,
        job: JobHandle,
        prober: Option<Arc<dyn Prober>>,
        verbose: bool,
    ) -> Self {
        Self::build(core, SourceKind::Dir, job, prober, verbose)
    }

    fn build(
        core: Arc<ClientCore<P, C>>,
        source: SourceKind<E>,
        job: JobHandle,
        prober: Option<Arc<dyn Prober>>,
        verbose: bool,
    ) -> Self {
        let dir = jid_dir(&core.config.cachedir, &core.config.hash_type, &job.jid);
        if job.jid.is_failed() || !dir.is_dir() {
            tracing::debug!(jid = %job.jid, "unknown job or failed publish");
            return Self::empty();
        }
        let t0 = core.clock.now();
        let JobHandle { jid, expected, base_timeout, target } = job;
        Self {
            inner: Inner::Active(Box::new(Active {
                core,
                source,
                prober,
                verbose,
                jid,
                target,
                dir,
                expected,
                found: HashSet::new(),
                t0,
                timeout: base_timeout,
                quantum: base_timeout,
            })),
        }
    }

    /// The next batch of replies, or `None` once the stream is exhausted.
    pub async fn next(&mut self) -> Option<ReturnMap> {
        match &mut self.inner {
            Inner::Done => None,
            Inner::Empty { yielded } => {
                if *yielded {
                    self.inner = Inner::Done;
                    return None;
                }
                *yielded = true;
                Some(ReturnMap::new())
            }
            Inner::Active(active) => match active.step().await {
                Step::Yield(batch) => Some(batch),
                Step::Finished => {
                    self.inner = Inner::Done;
                    None
                }
            },
        }
    }
}

impl<P, E, C> Active<P, E, C>
where
    P: Publisher,
    E: EventSource,
    C: Clock,
{
    async fn step(&mut self) -> Step {
        loop {
            if converged(&self.found, &self.expected) {
                return Step::Finished;
            }
            let wait = self.event_wait();
            match &mut self.source {
                SourceKind::Dir => {
                    let fresh = scan_returns(&self.dir, &self.found, true);
                    if !fresh.is_empty() {
                        let mut batch = ReturnMap::new();
                        for (id, reply) in fresh {
                            self.found.insert(id.clone());
                            batch.insert(id, reply);
                        }
                        return Step::Yield(batch);
                    }
                }
                SourceKind::Events(source) => {
                    match source.next_event(wait, Some(&self.jid)).await {
                        Some(JobEvent::Syndic { syndic }) => {
                            tracing::debug!(
                                jid = %self.jid,
                                count = syndic.len(),
                                "forwarder announced agents"
                            );
                            self.expected.extend(syndic);
                            continue;
                        }
                        Some(JobEvent::Return(ev)) => {
                            // first observation wins; a duplicate from the
                            // other channel is dropped silently
                            if self.found.insert(ev.id.clone()) {
                                let mut batch = ReturnMap::new();
                                batch.insert(ev.id, Reply { ret: ev.ret, out: ev.out });
                                return Step::Yield(batch);
                            }
                            continue;
                        }
                        None => {}
                    }
                }
            }

            let now = self.core.clock.now();
            if wtag_present(&self.dir) && now <= self.t0 + self.timeout + WTAG_GRACE {
                sleep(POLL_DELAY).await;
                continue;
            }
            if now > self.t0 + self.timeout {
                if let Some(prober) = &self.prober {
                    let running = prober.probe(&self.jid, &self.target).await;
                    let mut more_time = false;
                    for (id, live) in &running {
                        if *live {
                            if self.verbose {
                                println!("Execution is still running on {}", id);
                            }
                            more_time = true;
                        }
                    }
                    if more_time {
                        self.timeout += self.quantum;
                        tracing::debug!(
                            jid = %self.jid,
                            timeout = ?self.timeout,
                            "agents still running; extending timeout"
                        );
                        continue;
                    }
                }
                self.report_missing();
                tracing::debug!(
                    jid = %self.jid,
                    found = self.found.len(),
                    expected = self.expected.len(),
                    "gather expired"
                );
                return Step::Finished;
            }
            sleep(POLL_DELAY).await;
        }
    }

    /// Bounded event wait: up to the current deadline, then short polls
    /// while a write-tag or probe decision is pending.
    fn event_wait(&self) -> Duration {
        let deadline = self.t0 + self.timeout;
        let remain = deadline.saturating_duration_since(self.core.clock.now());
        if remain.is_zero() {
            POLL_DELAY
        } else {
            remain
        }
    }

    fn report_missing(&self) {
        if !self.verbose {
            return;
        }
        if !matches!(self.target.kind, TargetKind::Glob | TargetKind::Pcre) {
            return;
        }
        if self.found.len() >= self.expected.len() {
            return;
        }
        let mut missing: Vec<&AgentId> = self.expected.difference(&self.found).collect();
        missing.sort();
        println!("\nThe following minions did not return:");
        for id in missing {
            println!("{}", id);
        }
    }
}

#[cfg(test)]
#[path = "iter_returns_tests.rs"]
mod tests;
