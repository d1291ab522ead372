// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operator-facing client: publish one command, gather the replies.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use muster_core::{
    AgentId, ClientConfig, Clock, JobHandle, JobId, ReturnMap, SystemClock, Target, TargetKind,
};
use muster_wire::{PublishAck, PublishPayload};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::event::{EventSource, MasterEventSource};
use crate::identity;
use crate::iter_returns::ReturnIter;
use crate::prober::{FindJobProber, Prober};
use crate::publish::{MasterPublisher, PublishError, Publisher};
use crate::resolve::{resolve_target, RangeExpander};

/// Shared innards of [`LocalClient`].
///
/// Split out so the liveness prober can re-enter the publish path without
/// touching the event source (which the outer aggregator may be holding).
pub(crate) struct ClientCore<P, C> {
    pub(crate) config: ClientConfig,
    pub(crate) user: String,
    pub(crate) key: String,
    pub(crate) publisher: P,
    pub(crate) clock: C,
    pub(crate) range: Option<Arc<dyn RangeExpander>>,
}

impl<P: Publisher, C: Clock> ClientCore<P, C> {
    fn fresh_jid(&self) -> JobId {
        let ms = self.clock.epoch_ms();
        let dt = chrono::DateTime::from_timestamp_millis(ms as i64)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
        JobId::new(dt.format("%Y%m%d%H%M%S%3f").to_string())
    }

    /// Publish one command against a pre-resolved target.
    pub(crate) async fn publish(
        &self,
        target: &Target,
        fun: &str,
        arg: Vec<Value>,
        ret: &str,
        jid: JobId,
        timeout: Duration,
        kwarg: Option<&BTreeMap<String, Value>>,
    ) -> Result<Option<PublishAck>, ClientError> {
        let mut ret_sinks = ret.to_string();
        if !self.config.ext_job_cache.is_empty() {
            if ret_sinks.is_empty() {
                ret_sinks = self.config.ext_job_cache.clone();
            } else {
                ret_sinks = format!("{},{}", ret_sinks, self.config.ext_job_cache);
            }
        }
        let mut payload = PublishPayload::new(
            target.expr.clone(),
            fun,
            arg,
            self.key.clone(),
            target.kind,
            ret_sinks,
            jid,
        );
        if let Some(kwarg) = kwarg.filter(|map| !map.is_empty()) {
            payload.kwargs = Some(Value::Object(
                kwarg.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ));
        }
        if !self.user.is_empty() {
            payload.user = Some(self.user.clone());
        }
        if self.config.order_masters {
            payload.to = Some(timeout.as_secs());
        }
        tracing::debug!(jid = %payload.jid, fun, tgt = %payload.tgt, "publishing");
        match self.publisher.publish(&payload).await {
            Ok(ack) => Ok(ack),
            Err(PublishError::Rejected) => Err(ClientError::Auth(
                "failed to authenticate; is this user permitted to execute commands?".to_string(),
            )),
            Err(err) => {
                // expected while the master bounces; callers get an empty result
                tracing::warn!(fun, error = %err, "publish transport failed");
                Ok(None)
            }
        }
    }

    /// Resolve, publish, and wrap the acknowledgement into a job handle.
    ///
    /// `None` means the publish never reached the broker; aggregators yield
    /// empty results for it.
    pub(crate) async fn run_job(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        kind: TargetKind,
        ret: &str,
        timeout: Option<Duration>,
        kwarg: Option<&BTreeMap<String, Value>>,
    ) -> Result<Option<JobHandle>, ClientError> {
        let target =
            resolve_target(Target::new(tgt, kind), &self.config, self.range.as_deref()).await?;
        let base_timeout = timeout.unwrap_or_else(|| self.config.base_timeout());
        let jid = self.fresh_jid();
        let Some(ack) = self.publish(&target, fun, arg, ret, jid, base_timeout, kwarg).await?
        else {
            return Ok(None);
        };
        if ack.jid.is_failed() {
            tracing::debug!(fun, "publish failed to reach the broker");
            return Ok(None);
        }
        Ok(Some(JobHandle::new(ack.jid, ack.minions, base_timeout, target)))
    }
}

/// Fold named arguments into the positional list as `"k=v"` tokens.
pub(crate) fn condition_kwarg(
    mut arg: Vec<Value>,
    kwarg: Option<&BTreeMap<String, Value>>,
) -> Vec<Value> {
    if let Some(kwarg) = kwarg {
        for (key, value) in kwarg {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            arg.push(Value::String(format!("{}={}", key, rendered)));
        }
    }
    arg
}

fn print_job_header(jid: &JobId) {
    let msg = format!("Executing job with jid {}", jid);
    println!("{}", msg);
    println!("{}\n", "-".repeat(msg.len()));
}

/// Client connection to the local master.
///
/// One instance freezes its identity and key at construction. Aggregator
/// calls are one-shot: each drives its own gather over the job directory
/// and/or the event source until convergence, expiry, or an unknown job.
pub struct LocalClient<P = MasterPublisher, E = MasterEventSource, C = SystemClock> {
    core: Arc<ClientCore<P, C>>,
    events: Arc<Mutex<E>>,
    prober: Arc<dyn Prober>,
}

impl LocalClient {
    /// Open a client from a configuration file path.
    pub fn open(config_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        Ok(Self::from_config(ClientConfig::load(config_path)?))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let publisher = MasterPublisher::new(&config);
        let events = MasterEventSource::new(&config);
        Self::assemble(config, publisher, events, SystemClock, None)
    }
}

impl<P, E, C> LocalClient<P, E, C>
where
    P: Publisher + 'static,
    E: EventSource,
    C: Clock + 'static,
{
    /// Assemble a client from its parts. The production constructors wire in
    /// the real transport; tests inject fakes here.
    pub fn assemble(
        config: ClientConfig,
        publisher: P,
        events: E,
        clock: C,
        range: Option<Arc<dyn RangeExpander>>,
    ) -> Self {
        let user = identity::resolve_user(&config);
        let key = identity::read_master_key(&config, &user);
        let core = Arc::new(ClientCore { config, user, key, publisher, clock, range });
        let prober = Arc::new(FindJobProber::new(core.clone()));
        Self { core, events: Arc::new(Mutex::new(events)), prober }
    }

    /// Replace the extension policy (the default probes with `find_job`).
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    pub(crate) fn core(&self) -> &Arc<ClientCore<P, C>> {
        &self.core
    }

    /// The effective user this client publishes as.
    pub fn user(&self) -> &str {
        &self.core.user
    }

    /// Publish a command and return the raw acknowledgement, if any.
    ///
    /// An empty `jid` asks the master to allocate one; the returned jid
    /// routes all subsequent reads.
    pub async fn publish(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        kind: TargetKind,
        ret: &str,
        jid: JobId,
        timeout: Duration,
    ) -> Result<Option<PublishAck>, ClientError> {
        let target =
            resolve_target(Target::new(tgt, kind), &self.core.config, self.core.range.as_deref())
                .await?;
        self.core.publish(&target, fun, arg, ret, jid, timeout, None).await
    }

    /// Publish and wrap the acknowledgement into a [`JobHandle`].
    pub async fn run_job(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        kind: TargetKind,
        ret: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<JobHandle>, ClientError> {
        self.core.run_job(tgt, fun, arg, kind, ret, timeout, None).await
    }

    /// Execute a command and block until all expected agents reply (or the
    /// gather expires). Returns the bare per-agent payloads.
    pub async fn cmd(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        timeout: Option<Duration>,
        kind: TargetKind,
        ret: &str,
        kwarg: Option<BTreeMap<String, Value>>,
    ) -> Result<HashMap<AgentId, Value>, ClientError> {
        let arg = condition_kwarg(arg, kwarg.as_ref());
        match self.core.run_job(tgt, fun, arg, kind, ret, timeout, kwarg.as_ref()).await? {
            None => Ok(HashMap::new()),
            Some(job) => Ok(self.get_returns(&job).await),
        }
    }

    /// Like [`LocalClient::cmd`] but keeps the full reply records (payload
    /// plus presentation hint) and prints CLI furniture when `verbose`.
    pub async fn cmd_full_return(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        timeout: Option<Duration>,
        kind: TargetKind,
        ret: &str,
        verbose: bool,
        kwarg: Option<BTreeMap<String, Value>>,
    ) -> Result<ReturnMap, ClientError> {
        let arg = condition_kwarg(arg, kwarg.as_ref());
        match self.core.run_job(tgt, fun, arg, kind, ret, timeout, kwarg.as_ref()).await? {
            None => Ok(ReturnMap::new()),
            Some(job) => Ok(self.get_cli_static_event_returns(&job, verbose).await),
        }
    }

    /// Execute a command and stream replies as they arrive.
    pub async fn cmd_iter(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        timeout: Option<Duration>,
        kind: TargetKind,
        ret: &str,
        kwarg: Option<BTreeMap<String, Value>>,
    ) -> Result<ReturnIter<P, E, C>, ClientError> {
        let arg = condition_kwarg(arg, kwarg.as_ref());
        match self.core.run_job(tgt, fun, arg, kind, ret, timeout, kwarg.as_ref()).await? {
            None => Ok(ReturnIter::empty()),
            Some(job) => Ok(self.get_iter_returns(job).await),
        }
    }

    /// Streaming flavor with a hard timeout: no liveness probing, the base
    /// timeout is final.
    pub async fn cmd_iter_no_block(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        timeout: Option<Duration>,
        kind: TargetKind,
        ret: &str,
        kwarg: Option<BTreeMap<String, Value>>,
    ) -> Result<ReturnIter<P, E, C>, ClientError> {
        let arg = condition_kwarg(arg, kwarg.as_ref());
        match self.core.run_job(tgt, fun, arg, kind, ret, timeout, kwarg.as_ref()).await? {
            None => Ok(ReturnIter::empty()),
            Some(job) => Ok(self.get_event_iter_returns(job).await),
        }
    }

    /// Streaming flavor conditioned for command-line output.
    pub async fn cmd_cli(
        &self,
        tgt: &str,
        fun: &str,
        arg: Vec<Value>,
        timeout: Option<Duration>,
        kind: TargetKind,
        ret: &str,
        verbose: bool,
        kwarg: Option<BTreeMap<String, Value>>,
    ) -> Result<ReturnIter<P, E, C>, ClientError> {
        let arg = condition_kwarg(arg, kwarg.as_ref());
        match self.core.run_job(tgt, fun, arg, kind, ret, timeout, kwarg.as_ref()).await? {
            None => Ok(ReturnIter::empty()),
            Some(job) => Ok(self.get_cli_event_returns(job, verbose).await),
        }
    }

    /// Block until the job converges, merging the on-disk returns with the
    /// event stream when the event source is free. Bare payloads only.
    pub async fn get_returns(&self, job: &JobHandle) -> HashMap<AgentId, Value> {
        let mut guard = self.events.clone().try_lock_owned().ok();
        self.core
            .gather_returns(job, guard.as_deref_mut(), Some(self.prober.as_ref()), false)
            .await
            .into_iter()
            .map(|(id, reply)| (id, reply.ret))
            .collect()
    }

    /// Like [`LocalClient::get_returns`] but keeps the full reply records.
    pub async fn get_full_returns(&self, job: &JobHandle) -> ReturnMap {
        let mut guard = self.events.clone().try_lock_owned().ok();
        self.core
            .gather_returns(job, guard.as_deref_mut(), Some(self.prober.as_ref()), true)
            .await
    }

    /// Lazily stream replies from the event source, extending the timeout
    /// while missing agents still report the job as running.
    pub async fn get_iter_returns(&self, job: JobHandle) -> ReturnIter<P, E, C> {
        let guard = self.events.clone().lock_owned().await;
        ReturnIter::events(self.core.clone(), guard, job, Some(self.prober.clone()), false)
    }

    /// Stream replies from the event source under a fixed timeout; never
    /// extends, never probes.
    pub async fn get_event_iter_returns(&self, job: JobHandle) -> ReturnIter<P, E, C> {
        let guard = self.events.clone().lock_owned().await;
        ReturnIter::events(self.core.clone(), guard, job, None, false)
    }

    /// Event-driven streaming flavor with CLI printing.
    pub async fn get_cli_event_returns(
        &self,
        job: JobHandle,
        verbose: bool,
    ) -> ReturnIter<P, E, C> {
        if verbose {
            print_job_header(&job.jid);
        }
        let guard = self.events.clone().lock_owned().await;
        ReturnIter::events(self.core.clone(), guard, job, Some(self.prober.clone()), verbose)
    }

    /// Directory-scanning streaming flavor with CLI printing.
    pub fn get_cli_returns(&self, job: JobHandle, verbose: bool) -> ReturnIter<P, E, C> {
        if verbose {
            print_job_header(&job.jid);
        }
        ReturnIter::dir(self.core.clone(), job, Some(self.prober.clone()), verbose)
    }

    /// Event-driven blocking gather with CLI printing and a fixed timeout.
    pub async fn get_cli_static_event_returns(&self, job: &JobHandle, verbose: bool) -> ReturnMap {
        if verbose {
            print_job_header(&job.jid);
        }
        let guard = self.events.clone().lock_owned().await;
        let mut iter = ReturnIter::events(self.core.clone(), guard, job.clone(), None, verbose);
        let mut ret = ReturnMap::new();
        while let Some(batch) = iter.next().await {
            ret.extend(batch);
        }
        ret
    }

    /// Ask every agent matched by `target` whether `jid` is still running.
    pub async fn gather_job_info(&self, jid: &JobId, target: &Target) -> HashMap<AgentId, Value> {
        self.core.gather_job_info(jid, target).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
