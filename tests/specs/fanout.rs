// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking fan-out: publish once, gather from both channels.

use std::sync::Arc;
use std::time::Duration;

use muster_client::{FakeEventSource, FakePublisher, FakeProber, FakeResponse};
use muster_core::{AgentId, JobId, TargetKind};
use serde_json::json;
use tempfile::TempDir;
use tokio::time::Instant;

use super::harness::*;

#[tokio::test(start_paused = true)]
async fn one_command_converges_from_disk_and_events() {
    let cache = TempDir::new().unwrap();
    let config = spec_config(cache.path());
    let jid = JobId::new("spec-1");
    let dir = make_job_dir(&config, &jid);

    let publisher = FakePublisher::new().with_response(ack("spec-1", &["a", "b"]));
    let events = FakeEventSource::new().with_event(
        Duration::from_millis(200),
        &jid,
        reply_event("b", json!(7)),
    );
    let client = spec_client(config, publisher, events);

    write_return_later(dir, "a", json!("pong"), Duration::from_millis(100));

    let t0 = Instant::now();
    let ret = client
        .cmd("*", "test.ping", vec![], Some(Duration::from_secs(5)), TargetKind::Glob, "", None)
        .await
        .unwrap();

    assert_eq!(ret.len(), 2);
    assert_eq!(ret[&AgentId::new("a")], json!("pong"));
    assert_eq!(ret[&AgentId::new("b")], json!(7));
    assert!(t0.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn slow_but_alive_agents_buy_more_time() {
    let cache = TempDir::new().unwrap();
    let config = spec_config(cache.path());
    let jid = JobId::new("spec-2");
    let dir = make_job_dir(&config, &jid);
    write_return(&dir, "a", &json!(1));

    let publisher = FakePublisher::new().with_response(ack("spec-2", &["a", "b"]));
    let prober =
        Arc::new(FakeProber::new().with_answer([("b", true)]).with_answer([("b", false)]));
    let client =
        spec_client(config, publisher, FakeEventSource::new()).with_prober(prober.clone());

    let t0 = Instant::now();
    let ret = client
        .cmd("*", "test.ping", vec![], Some(Duration::from_secs(2)), TargetKind::Glob, "", None)
        .await
        .unwrap();
    let elapsed = t0.elapsed();

    assert_eq!(ret.len(), 1);
    assert_eq!(prober.probes(), 2);
    assert!(elapsed >= Duration::from_secs(4), "took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn forwarder_announcements_grow_the_quorum() {
    let cache = TempDir::new().unwrap();
    let config = spec_config(cache.path());
    let jid = JobId::new("spec-3");
    let dir = make_job_dir(&config, &jid);

    let publisher = FakePublisher::new().with_response(ack("spec-3", &["a"]));
    let events = FakeEventSource::new()
        .with_event(Duration::from_millis(100), &jid, syndic_event(&["c"]))
        .with_event(Duration::from_millis(100), &jid, reply_event("c", json!(3)));
    let client = spec_client(config, publisher, events);

    write_return_later(dir, "a", json!(1), Duration::from_millis(50));

    let t0 = Instant::now();
    let ret = client
        .cmd("*", "test.ping", vec![], Some(Duration::from_secs(5)), TargetKind::Glob, "", None)
        .await
        .unwrap();

    // a alone no longer converges once the forwarder announces c
    assert_eq!(ret.len(), 2);
    assert!(ret.contains_key(&AgentId::new("c")));
    assert!(t0.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn a_stopped_master_means_an_empty_result() {
    let cache = TempDir::new().unwrap();
    let publisher = FakePublisher::new().with_response(FakeResponse::Offline);
    let client = spec_client(spec_config(cache.path()), publisher, FakeEventSource::new());

    let ret = client
        .cmd("*", "test.ping", vec![], None, TargetKind::Glob, "", None)
        .await
        .unwrap();
    assert!(ret.is_empty());
}
