// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for client tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use muster_core::{AgentId, ClientConfig, JobId, SystemClock};
use muster_wire::{JobEvent, ReturnEvent};
use serde_json::Value;

use crate::client::LocalClient;
use crate::event::FakeEventSource;
use crate::job_dir::jid_dir;
use crate::publish::FakePublisher;

pub(crate) type TestClient = LocalClient<FakePublisher, FakeEventSource, SystemClock>;

pub(crate) fn test_config(cachedir: &Path) -> ClientConfig {
    ClientConfig { cachedir: cachedir.to_path_buf(), ..ClientConfig::default() }
}

pub(crate) fn test_client(
    config: ClientConfig,
    publisher: FakePublisher,
    events: FakeEventSource,
) -> TestClient {
    LocalClient::assemble(config, publisher, events, SystemClock, None)
}

/// Create the on-disk job directory the master would have prepared.
pub(crate) fn make_job_dir(config: &ClientConfig, jid: &JobId) -> PathBuf {
    let dir = jid_dir(&config.cachedir, &config.hash_type, jid);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub(crate) fn write_return(dir: &Path, agent: &str, value: &Value) {
    let agent_dir = dir.join(agent);
    std::fs::create_dir_all(&agent_dir).unwrap();
    std::fs::write(agent_dir.join("return.p"), serde_json::to_vec(value).unwrap()).unwrap();
}

/// Spawn a writer that commits `agent`'s return after a delay.
pub(crate) fn write_return_later(dir: PathBuf, agent: &'static str, value: Value, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        write_return(&dir, agent, &value);
    });
}

pub(crate) fn reply_event(id: &str, ret: Value) -> JobEvent {
    JobEvent::Return(ReturnEvent { id: AgentId::new(id), ret, out: None })
}

pub(crate) fn syndic_event(ids: &[&str]) -> JobEvent {
    JobEvent::Syndic { syndic: ids.iter().map(AgentId::new).collect() }
}
