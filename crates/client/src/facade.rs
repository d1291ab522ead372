// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote functions of a single agent, exposed as callable entries.

use std::collections::{BTreeMap, HashSet};

use muster_core::{AgentId, Clock, TargetKind};
use serde_json::Value;

use crate::client::LocalClient;
use crate::error::ClientError;
use crate::event::EventSource;
use crate::publish::Publisher;

const LIST_FUNCTIONS_FUN: &str = "sys.list_functions";

/// The function set of one agent, resolved once at load time.
///
/// Looking up a name yields a callable that re-enters the blocking-all
/// aggregator against the same agent, so remote functions read like local
/// ones at the call site.
pub struct FunctionWrapper<'c, P, E, C> {
    client: &'c LocalClient<P, E, C>,
    agent: AgentId,
    functions: HashSet<String>,
}

impl<'c, P, E, C> FunctionWrapper<'c, P, E, C>
where
    P: Publisher + 'static,
    E: EventSource,
    C: Clock + 'static,
{
    /// Ask the agent for its function list and freeze it.
    pub async fn load(
        client: &'c LocalClient<P, E, C>,
        agent: AgentId,
    ) -> Result<FunctionWrapper<'c, P, E, C>, ClientError> {
        let mut listed = client
            .cmd(agent.as_str(), LIST_FUNCTIONS_FUN, Vec::new(), None, TargetKind::Glob, "", None)
            .await?;
        let functions = match listed.remove(&agent) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect(),
            _ => HashSet::new(),
        };
        Ok(Self { client, agent, functions })
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn functions(&self) -> &HashSet<String> {
        &self.functions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Look up a callable by name.
    pub fn get(&self, name: &str) -> Result<RemoteFunction<'_, P, E, C>, ClientError> {
        if !self.functions.contains(name) {
            return Err(ClientError::UnknownFunction(name.to_string()));
        }
        Ok(RemoteFunction { wrapper: self, name: name.to_string() })
    }
}

/// A bound remote function.
pub struct RemoteFunction<'w, P, E, C> {
    wrapper: &'w FunctionWrapper<'w, P, E, C>,
    name: String,
}

impl<P, E, C> std::fmt::Debug for RemoteFunction<'_, P, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFunction").field("name", &self.name).finish()
    }
}

impl<P, E, C> RemoteFunction<'_, P, E, C>
where
    P: Publisher + 'static,
    E: EventSource,
    C: Clock + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function with positional and named arguments; named
    /// arguments travel as `"k=v"` tokens appended to the positional list.
    /// Returns the agent's entry from the result mapping.
    pub async fn call(
        &self,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Option<Value>, ClientError> {
        let mut ret = self
            .wrapper
            .client
            .cmd(
                self.wrapper.agent.as_str(),
                &self.name,
                args,
                None,
                TargetKind::Glob,
                "",
                Some(kwargs),
            )
            .await?;
        Ok(ret.remove(&self.wrapper.agent))
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
