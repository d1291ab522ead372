// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture: a client wired to scripted fakes over a temp cache tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use muster_client::{jid_dir, FakeEventSource, FakePublisher, FakeResponse, LocalClient};
use muster_core::{AgentId, ClientConfig, JobId, SystemClock};
use muster_wire::{JobEvent, PublishAck, ReturnEvent};
use serde_json::Value;

pub type SpecClient = LocalClient<FakePublisher, FakeEventSource, SystemClock>;

pub fn spec_config(cachedir: &Path) -> ClientConfig {
    ClientConfig { cachedir: cachedir.to_path_buf(), ..ClientConfig::default() }
}

pub fn spec_client(
    config: ClientConfig,
    publisher: FakePublisher,
    events: FakeEventSource,
) -> SpecClient {
    LocalClient::assemble(config, publisher, events, SystemClock, None)
}

pub fn ack(jid: &str, minions: &[&str]) -> FakeResponse {
    FakeResponse::Ack(PublishAck {
        jid: JobId::new(jid),
        minions: minions.iter().map(AgentId::new).collect(),
    })
}

pub fn make_job_dir(config: &ClientConfig, jid: &JobId) -> PathBuf {
    let dir = jid_dir(&config.cachedir, &config.hash_type, jid);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_return(dir: &Path, agent: &str, value: &Value) {
    let agent_dir = dir.join(agent);
    std::fs::create_dir_all(&agent_dir).unwrap();
    std::fs::write(agent_dir.join("return.p"), serde_json::to_vec(value).unwrap()).unwrap();
}

pub fn write_return_later(dir: PathBuf, agent: &'static str, value: Value, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        write_return(&dir, agent, &value);
    });
}

pub fn reply_event(id: &str, ret: Value) -> JobEvent {
    JobEvent::Return(ReturnEvent { id: AgentId::new(id), ret, out: None })
}

pub fn syndic_event(ids: &[&str]) -> JobEvent {
    JobEvent::Syndic { syndic: ids.iter().map(AgentId::new).collect() }
}
