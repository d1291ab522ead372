// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::TempDir;

fn write_return(dir: &Path, agent: &str, value: &Value) {
    let agent_dir = dir.join(agent);
    fs::create_dir_all(&agent_dir).unwrap();
    fs::write(agent_dir.join(RETURN_FILE), serde_json::to_vec(value).unwrap()).unwrap();
}

fn scan(dir: &Path, seen: &[&str], want_out: bool) -> Vec<(AgentId, Reply)> {
    let seen: HashSet<AgentId> = seen.iter().map(AgentId::new).collect();
    let mut found = scan_returns(dir, &seen, want_out);
    found.sort_by(|a, b| a.0.cmp(&b.0));
    found
}

#[test]
fn jid_dir_is_deterministic() {
    let jid = JobId::new("20260801120000123");
    let a = jid_dir(Path::new("/var/cache/muster"), "sha256", &jid);
    let b = jid_dir(Path::new("/var/cache/muster"), "sha256", &jid);
    assert_eq!(a, b);
    assert!(a.starts_with("/var/cache/muster/jobs"));
}

#[test]
fn jid_dir_varies_with_jid_and_hash() {
    let cache = Path::new("/c");
    let a = jid_dir(cache, "sha256", &JobId::new("j1"));
    let b = jid_dir(cache, "sha256", &JobId::new("j2"));
    let c = jid_dir(cache, "sha512", &JobId::new("j1"));
    assert_ne!(a, b);
    assert_ne!(a, c);
}

#[test]
fn scan_yields_committed_returns() {
    let dir = TempDir::new().unwrap();
    write_return(dir.path(), "a", &json!({"ok": true}));
    write_return(dir.path(), "b", &json!(7));

    let found = scan(dir.path(), &[], false);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].0, "a");
    assert_eq!(found[0].1.ret, json!({"ok": true}));
    assert_eq!(found[1].1.ret, json!(7));
}

#[test]
fn scan_skips_seen_agents() {
    let dir = TempDir::new().unwrap();
    write_return(dir.path(), "a", &json!(1));
    write_return(dir.path(), "b", &json!(2));

    let found = scan(dir.path(), &["a"], false);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "b");
}

#[test]
fn scan_skips_hidden_names() {
    let dir = TempDir::new().unwrap();
    write_return(dir.path(), ".in-progress", &json!(1));
    assert!(scan(dir.path(), &[], false).is_empty());
}

#[test]
fn scan_skips_uncommitted_entries() {
    let dir = TempDir::new().unwrap();
    // agent directory exists but return.p has not landed yet
    fs::create_dir_all(dir.path().join("a")).unwrap();
    assert!(scan(dir.path(), &[], false).is_empty());
}

#[test]
fn scan_skips_null_returns_until_rewritten() {
    let dir = TempDir::new().unwrap();
    write_return(dir.path(), "a", &Value::Null);
    assert!(scan(dir.path(), &[], false).is_empty());

    // the writer finishes its rename; the next pass picks it up
    write_return(dir.path(), "a", &json!("done"));
    let found = scan(dir.path(), &[], false);
    assert_eq!(found[0].1.ret, json!("done"));
}

#[test]
fn scan_skips_undecodable_returns() {
    let dir = TempDir::new().unwrap();
    let agent_dir = dir.path().join("a");
    fs::create_dir_all(&agent_dir).unwrap();
    fs::write(agent_dir.join(RETURN_FILE), b"{truncated").unwrap();
    assert!(scan(dir.path(), &[], false).is_empty());
}

#[test]
fn scan_reads_out_hint_only_when_asked() {
    let dir = TempDir::new().unwrap();
    write_return(dir.path(), "a", &json!(1));
    fs::write(
        dir.path().join("a").join(OUT_FILE),
        serde_json::to_vec(&json!("highstate")).unwrap(),
    )
    .unwrap();

    let bare = scan(dir.path(), &[], false);
    assert_eq!(bare[0].1.out, None);

    let full = scan(dir.path(), &[], true);
    assert_eq!(full[0].1.out, Some(json!("highstate")));
}

#[test]
fn scan_of_missing_dir_is_empty() {
    assert!(scan(Path::new("/nonexistent/job/dir"), &[], false).is_empty());
}

#[test]
fn wtag_detection() {
    let dir = TempDir::new().unwrap();
    assert!(!wtag_present(dir.path()));
    fs::write(dir.path().join("wtag-forwarder1"), b"").unwrap();
    assert!(wtag_present(dir.path()));
}
