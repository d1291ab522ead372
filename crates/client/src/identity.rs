// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective-user resolution and master key loading.
//!
//! Both are derived once at client construction and frozen for the lifetime
//! of the instance.

use std::path::Path;

use muster_core::ClientConfig;

const ROOT: &str = "root";
const SUDO_USER: &str = "SUDO_USER";

/// Determine the effective user running the client.
///
/// A superuser (or anything invoked through sudo) is attributed as
/// `sudo_<SUDO_USER>` so the master can audit who really ran the command.
pub(crate) fn resolve_user(_config: &ClientConfig) -> String {
    let user = login_user();
    if user == ROOT || std::env::var_os(SUDO_USER).is_some() {
        if let Ok(sudo) = std::env::var(SUDO_USER) {
            return format!("sudo_{}", sudo);
        }
    }
    user
}

fn login_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| ROOT.to_string())
}

/// Which user's key file to read.
///
/// Root acting for a configured non-root master user reads that user's key;
/// sudo identities always fall back to the configured user.
pub(crate) fn key_user(config: &ClientConfig, user: &str) -> String {
    let mut key_user = user.to_string();
    if key_user == ROOT && config.user != ROOT {
        key_user = config.user.clone();
    }
    if key_user.starts_with("sudo_") {
        key_user = config.user.clone();
    }
    key_user
}

/// Read the rotating master key from `<cachedir>/.<key_user>_key`.
///
/// Every parent directory must be reachable first. An unreadable key file
/// yields an empty key; the master then falls back to external auth.
pub(crate) fn read_master_key(config: &ClientConfig, user: &str) -> String {
    let key_user = key_user(config, user);
    let keyfile = config.cachedir.join(format!(".{}_key", key_user));
    if !parent_dirs_accessible(&keyfile) {
        tracing::warn!(path = %keyfile.display(), "key file parent directories inaccessible");
        return String::new();
    }
    match std::fs::read_to_string(&keyfile) {
        Ok(key) => key,
        Err(err) => {
            tracing::debug!(
                path = %keyfile.display(),
                error = %err,
                "master key unreadable; relying on external auth"
            );
            String::new()
        }
    }
}

fn parent_dirs_accessible(path: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .filter(|dir| !dir.as_os_str().is_empty())
        .all(|dir| dir.metadata().is_ok())
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
