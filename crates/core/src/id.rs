// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! String-backed identifier newtypes

use smol_str::SmolStr;

/// Define a newtype ID wrapper around [`SmolStr`].
///
/// Both identifier kinds here are opaque strings handed to us from outside
/// (agents name themselves; job ids come back from the master), so the
/// wrapper only provides cheap-clone storage, `Borrow<str>` map lookups, and
/// transparent serde.
macro_rules! define_str_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(SmolStr);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(SmolStr::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

define_str_id! {
    /// Unique identifier of a remote execution agent.
    pub struct AgentId;
}

define_str_id! {
    /// Identifier of a single fan-out command invocation.
    pub struct JobId;
}

impl JobId {
    /// Sentinel jid meaning "the publish never reached the broker".
    pub const FAILED: &'static str = "0";

    pub fn is_failed(&self) -> bool {
        self.0 == Self::FAILED
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
