// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reader for the per-job return tree on disk.
//!
//! Layout under the job directory: one subdirectory per agent, holding
//! `return.p` (the commit marker) and optionally `out.p`. Hidden names
//! (leading `.`) are reserved for in-progress writes; `wtag*` entries mean a
//! forwarder is still flushing. The client is strictly a reader of this
//! tree.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use muster_core::{AgentId, JobId, Reply};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};

const RETURN_FILE: &str = "return.p";
const OUT_FILE: &str = "out.p";
const WTAG_PREFIX: &str = "wtag";

/// Deterministic job directory for a jid:
/// `<cachedir>/jobs/<digest[..2]>/<digest[2..]>`.
pub fn jid_dir(cachedir: &Path, hash_type: &str, jid: &JobId) -> PathBuf {
    let digest = match hash_type {
        "sha512" => hex::encode(Sha512::digest(jid.as_str().as_bytes())),
        _ => hex::encode(Sha256::digest(jid.as_str().as_bytes())),
    };
    cachedir.join("jobs").join(&digest[..2]).join(&digest[2..])
}

/// One pass over the job directory, yielding agents not yet in `seen`.
///
/// Each subdirectory is yielded at most once per pass; entries without a
/// committed `return.p` are left for the next poll cycle.
pub(crate) fn scan_returns(
    dir: &Path,
    seen: &HashSet<AgentId>,
    want_out: bool,
) -> Vec<(AgentId, Reply)> {
    let mut fresh = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return fresh,
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') {
            continue;
        }
        if seen.contains(name) {
            continue;
        }
        let retp = entry.path().join(RETURN_FILE);
        if !retp.is_file() {
            continue;
        }
        let Some(ret) = read_return(&retp) else { continue };
        let mut reply = Reply::new(ret);
        if want_out {
            let outp = entry.path().join(OUT_FILE);
            if outp.is_file() {
                reply.out = read_json(&outp);
            }
        }
        fresh.push((AgentId::new(name), reply));
    }
    fresh
}

/// Any `wtag*` entry directly under the job directory.
pub(crate) fn wtag_present(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(WTAG_PREFIX))
            })
        })
        .unwrap_or(false)
}

/// Read and decode `return.p`.
///
/// A null decode is re-attempted once in the same pass: the writer may be
/// mid-rename. Persistent failures skip the entry; the next poll retries.
fn read_return(path: &Path) -> Option<Value> {
    match read_json(path)? {
        Value::Null => match read_json(path)? {
            Value::Null => {
                tracing::debug!(path = %path.display(), "null return payload after re-read");
                None
            }
            value => Some(value),
        },
        value => Some(value),
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "undecodable return payload");
            None
        }
    }
}

#[cfg(test)]
#[path = "job_dir_tests.rs"]
mod tests;
