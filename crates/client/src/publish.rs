// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single publish request/reply against the master.

use std::path::PathBuf;

use async_trait::async_trait;
use muster_core::ClientConfig;
use muster_wire::{read_message, write_message, PublishAck, PublishPayload};
use thiserror::Error;
use tokio::net::TcpStream;

pub(crate) const PUBLISH_SOCK: &str = "publish_pull.ipc";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] muster_wire::ProtocolError),
    /// The master answered but refused the publish.
    #[error("empty reply from master")]
    Rejected,
}

/// Adapter for the one-shot publish against the master's return port.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// `Ok(None)` means the transport is unreachable: the local publisher
    /// socket is missing or the master is bouncing. Callers short-circuit to
    /// an empty result rather than treating it as an error.
    async fn publish(&self, payload: &PublishPayload) -> Result<Option<PublishAck>, PublishError>;
}

/// Publishes over TCP to the master's return port, pre-checking the local
/// publisher socket so a stopped master is detected without a connect
/// timeout.
#[derive(Debug, Clone)]
pub struct MasterPublisher {
    sock: PathBuf,
    addr: String,
}

impl MasterPublisher {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            sock: config.sock_dir.join(PUBLISH_SOCK),
            addr: format!("{}:{}", config.interface, config.ret_port),
        }
    }
}

#[async_trait]
impl Publisher for MasterPublisher {
    async fn publish(&self, payload: &PublishPayload) -> Result<Option<PublishAck>, PublishError> {
        if !self.sock.exists() {
            tracing::debug!(path = %self.sock.display(), "publisher socket missing; master not running");
            return Ok(None);
        }
        let mut stream = match TcpStream::connect(&self.addr).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::debug!(addr = %self.addr, error = %err, "master return port unreachable");
                return Ok(None);
            }
        };
        write_message(&mut stream, payload).await?;
        let ack: Option<PublishAck> = read_message(&mut stream).await?;
        ack.map(Some).ok_or(PublishError::Rejected)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use muster_core::JobId;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted response for one publish call.
    #[derive(Debug, Clone)]
    pub enum FakeResponse {
        Ack(PublishAck),
        /// Transport unreachable.
        Offline,
        /// Master answered but refused.
        Reject,
    }

    struct FakePubState {
        calls: Vec<PublishPayload>,
        script: VecDeque<FakeResponse>,
        minions: Vec<muster_core::AgentId>,
        seq: u64,
    }

    /// Recording publisher for tests.
    ///
    /// Scripted responses are replayed in order; once the script runs dry it
    /// acknowledges every publish with the configured minion set, allocating
    /// a jid when the payload carries an empty one.
    #[derive(Clone)]
    pub struct FakePublisher {
        inner: Arc<Mutex<FakePubState>>,
    }

    impl FakePublisher {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakePubState {
                    calls: Vec::new(),
                    script: VecDeque::new(),
                    minions: Vec::new(),
                    seq: 0,
                })),
            }
        }

        /// Default minion set acknowledged once the script is exhausted.
        pub fn with_minions(self, minions: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
            self.inner.lock().minions =
                minions.into_iter().map(|m| muster_core::AgentId::new(m.as_ref())).collect();
            self
        }

        pub fn with_response(self, response: FakeResponse) -> Self {
            self.inner.lock().script.push_back(response);
            self
        }

        pub fn push_response(&self, response: FakeResponse) {
            self.inner.lock().script.push_back(response);
        }

        /// All payloads published so far.
        pub fn calls(&self) -> Vec<PublishPayload> {
            self.inner.lock().calls.clone()
        }
    }

    impl Default for FakePublisher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(
            &self,
            payload: &PublishPayload,
        ) -> Result<Option<PublishAck>, PublishError> {
            let mut state = self.inner.lock();
            state.calls.push(payload.clone());
            match state.script.pop_front() {
                Some(FakeResponse::Offline) => Ok(None),
                Some(FakeResponse::Reject) => Err(PublishError::Rejected),
                Some(FakeResponse::Ack(ack)) => Ok(Some(ack)),
                None => {
                    let jid = if payload.jid.is_empty() {
                        state.seq += 1;
                        JobId::new(format!("fake-jid-{:04}", state.seq))
                    } else {
                        payload.jid.clone()
                    };
                    Ok(Some(PublishAck { jid, minions: state.minions.clone() }))
                }
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePublisher, FakeResponse};

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
