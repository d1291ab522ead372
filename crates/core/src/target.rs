// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a target expression matches agent ids.
///
/// Serializes to/from the wire names (`glob`, `grain_pcre`, ...). Nodegroup
/// and Range never reach the wire: the resolver rewrites them to Compound and
/// List before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Glob,
    Pcre,
    List,
    Grain,
    GrainPcre,
    Pillar,
    Nodegroup,
    Range,
    Compound,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Glob => "glob",
            TargetKind::Pcre => "pcre",
            TargetKind::List => "list",
            TargetKind::Grain => "grain",
            TargetKind::GrainPcre => "grain_pcre",
            TargetKind::Pillar => "pillar",
            TargetKind::Nodegroup => "nodegroup",
            TargetKind::Range => "range",
            TargetKind::Compound => "compound",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown target kind: {0}")]
pub struct UnknownTargetKind(pub String);

impl FromStr for TargetKind {
    type Err = UnknownTargetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "glob" => Ok(TargetKind::Glob),
            "pcre" => Ok(TargetKind::Pcre),
            "list" => Ok(TargetKind::List),
            "grain" => Ok(TargetKind::Grain),
            "grain_pcre" => Ok(TargetKind::GrainPcre),
            "pillar" => Ok(TargetKind::Pillar),
            "nodegroup" => Ok(TargetKind::Nodegroup),
            "range" => Ok(TargetKind::Range),
            "compound" => Ok(TargetKind::Compound),
            other => Err(UnknownTargetKind(other.to_string())),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TargetKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TargetKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A target expression paired with its matching kind.
///
/// The expression is opaque to the gather engine; only the expected-id set
/// resolved from it matters for convergence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub expr: String,
    pub kind: TargetKind,
}

impl Target {
    pub fn new(expr: impl Into<String>, kind: TargetKind) -> Self {
        Self { expr: expr.into(), kind }
    }

    pub fn glob(expr: impl Into<String>) -> Self {
        Self::new(expr, TargetKind::Glob)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.expr)
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
