// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking pull source of job events.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use muster_core::{ClientConfig, JobId};
use muster_wire::{read_message, EventEnvelope, JobEvent};
use tokio::net::UnixStream;
use tokio::time::Instant;

pub(crate) const EVENT_SOCK: &str = "master_event_pub.ipc";

/// A blocking pull source of events for one job at a time.
///
/// The source is exclusive per job: the client serializes access so only one
/// aggregator consumes it at any moment.
#[async_trait]
pub trait EventSource: Send {
    /// Wait up to `wait` for the next event addressed to `jid` (any job when
    /// `None`). Returns `None` when the wait elapses, promptly enough for
    /// the caller to advance its own clock.
    async fn next_event(&mut self, wait: Duration, jid: Option<&JobId>) -> Option<JobEvent>;
}

/// Reads framed event envelopes from the master's event socket, discarding
/// frames addressed to other jobs.
pub struct MasterEventSource {
    sock: PathBuf,
    stream: Option<UnixStream>,
}

impl MasterEventSource {
    pub fn new(config: &ClientConfig) -> Self {
        Self { sock: config.sock_dir.join(EVENT_SOCK), stream: None }
    }

    async fn connect(&mut self) -> bool {
        if self.stream.is_none() {
            match UnixStream::connect(&self.sock).await {
                Ok(stream) => self.stream = Some(stream),
                Err(err) => {
                    tracing::debug!(path = %self.sock.display(), error = %err, "event socket unavailable");
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl EventSource for MasterEventSource {
    async fn next_event(&mut self, wait: Duration, jid: Option<&JobId>) -> Option<JobEvent> {
        let deadline = Instant::now() + wait;
        loop {
            let remain = deadline.saturating_duration_since(Instant::now());
            if remain.is_zero() {
                return None;
            }
            if !self.connect().await {
                tokio::time::sleep(remain).await;
                return None;
            }
            let Some(stream) = self.stream.as_mut() else { return None };
            let read = tokio::time::timeout(remain, read_message::<EventEnvelope, _>(stream)).await;
            match read {
                Err(_) => return None,
                Ok(Err(err)) => {
                    // reconnect on the next call; a half-read frame is unrecoverable
                    tracing::debug!(error = %err, "event stream error; dropping connection");
                    self.stream = None;
                    tokio::time::sleep(remain.min(Duration::from_millis(10))).await;
                }
                Ok(Ok(envelope)) => match jid {
                    Some(jid) if envelope.jid != *jid => continue,
                    _ => return Some(envelope.event),
                },
            }
        }
    }
}

/// Placeholder source for gathers that only watch the filesystem.
pub(crate) struct NoEvents;

#[async_trait]
impl EventSource for NoEvents {
    async fn next_event(&mut self, wait: Duration, _jid: Option<&JobId>) -> Option<JobEvent> {
        tokio::time::sleep(wait).await;
        None
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted event source: each entry is delivered after its delay,
    /// measured from when the previous entry was consumed.
    pub struct FakeEventSource {
        queue: VecDeque<(Duration, EventEnvelope)>,
    }

    impl FakeEventSource {
        pub fn new() -> Self {
            Self { queue: VecDeque::new() }
        }

        /// Queue an event to fire `after` the previous one (or the start of
        /// consumption for the first entry).
        pub fn with_event(mut self, after: Duration, jid: &JobId, event: JobEvent) -> Self {
            self.queue.push_back((after, EventEnvelope::new(jid.clone(), event)));
            self
        }
    }

    impl Default for FakeEventSource {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl EventSource for FakeEventSource {
        async fn next_event(&mut self, wait: Duration, jid: Option<&JobId>) -> Option<JobEvent> {
            let mut budget = wait;
            loop {
                let Some((after, _)) = self.queue.front() else {
                    tokio::time::sleep(budget).await;
                    return None;
                };
                if *after > budget {
                    tokio::time::sleep(budget).await;
                    if let Some(front) = self.queue.front_mut() {
                        front.0 -= budget;
                    }
                    return None;
                }
                let Some((after, envelope)) = self.queue.pop_front() else { return None };
                tokio::time::sleep(after).await;
                budget = budget.saturating_sub(after);
                match jid {
                    Some(jid) if envelope.jid != *jid => continue,
                    _ => return Some(envelope.event),
                }
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEventSource;

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
