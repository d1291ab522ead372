// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming fan-out: lazy per-agent yields.

use std::time::Duration;

use muster_client::{FakeEventSource, FakePublisher, FakeResponse};
use muster_core::{AgentId, JobId, ReturnMap, TargetKind};
use serde_json::json;
use tempfile::TempDir;
use tokio::time::Instant;

use super::harness::*;

#[tokio::test(start_paused = true)]
async fn replies_stream_in_arrival_order() {
    let cache = TempDir::new().unwrap();
    let config = spec_config(cache.path());
    let jid = JobId::new("spec-10");
    make_job_dir(&config, &jid);

    let publisher = FakePublisher::new().with_response(ack("spec-10", &["a", "b"]));
    let events = FakeEventSource::new()
        .with_event(Duration::from_millis(100), &jid, reply_event("b", json!(2)))
        .with_event(Duration::from_millis(100), &jid, reply_event("a", json!(1)));
    let client = spec_client(config, publisher, events);

    let mut iter = client
        .cmd_iter("*", "test.ping", vec![], Some(Duration::from_secs(5)), TargetKind::Glob, "", None)
        .await
        .unwrap();

    let first = iter.next().await.unwrap();
    assert_eq!(first[&AgentId::new("b")].ret, json!(2));
    let second = iter.next().await.unwrap();
    assert_eq!(second[&AgentId::new("a")].ret, json!(1));
    assert!(iter.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn no_block_stops_hard_at_the_base_timeout() {
    let cache = TempDir::new().unwrap();
    let config = spec_config(cache.path());
    let jid = JobId::new("spec-11");
    make_job_dir(&config, &jid);

    let publisher = FakePublisher::new().with_response(ack("spec-11", &["a"]));
    let client = spec_client(config, publisher, FakeEventSource::new());

    let t0 = Instant::now();
    let mut iter = client
        .cmd_iter_no_block(
            "*",
            "test.ping",
            vec![],
            Some(Duration::from_secs(1)),
            TargetKind::Glob,
            "",
            None,
        )
        .await
        .unwrap();
    assert!(iter.next().await.is_none());
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn a_failed_publish_yields_one_empty_mapping() {
    let cache = TempDir::new().unwrap();
    let publisher = FakePublisher::new().with_response(FakeResponse::Offline);
    let client = spec_client(spec_config(cache.path()), publisher, FakeEventSource::new());

    let mut iter = client
        .cmd_cli("*", "test.ping", vec![], None, TargetKind::Glob, "", false, None)
        .await
        .unwrap();
    assert_eq!(iter.next().await, Some(ReturnMap::new()));
    assert!(iter.next().await.is_none());
}
