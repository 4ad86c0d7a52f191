//! Aggregation sessions.
//!
//! A session binds one [`LogSourceSpec`] to its output channel and
//! cancellation token and starts exactly one top-level worker for it. The
//! caller drains lines with [`AggregationSession::next_line`] and ends the
//! session with [`AggregationSession::cancel`]. Cancelling does not wait for
//! workers; each one notices within its own polling interval.
//! [`AggregationSession::shutdown`] additionally waits until all have exited.
//! Dropping a session cancels it.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::app::config::TailConfig;

use super::backend::Backends;
use super::cloudwatch::StreamPoller;
use super::kinesis::enumerate_shards;
use super::rds::RotatingFileTailer;
use super::sink::{log_channel, LogOutput, WorkerContext};
use super::types::LogSourceSpec;

#[derive(Debug)]
pub struct AggregationSession {
    spec: LogSourceSpec,
    output: LogOutput,
    cancel: CancellationToken,
    tracker: TaskTracker,
    _guard: DropGuard,
}

impl AggregationSession {
    /// Open a session and start its top-level worker.
    ///
    /// Fails if the backend for the source kind is not configured, or, for a
    /// database instance, if its current log file cannot be located and seeded.
    pub async fn open(
        spec: LogSourceSpec,
        backends: &Backends,
        config: TailConfig,
    ) -> Result<Self> {
        let (sink, output) = log_channel(config.sink_capacity);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let ctx = WorkerContext::new(sink, cancel.clone(), tracker.clone(), Arc::new(config));

        match &spec {
            LogSourceSpec::LogGroup { group } => {
                let backend = backends.log_groups(&spec)?;
                let poller = StreamPoller::new(backend, group.clone(), ctx.clone());
                ctx.spawn(poller.run());
            }
            LogSourceSpec::EventStream { stream } => {
                let backend = backends.event_streams(&spec)?;
                ctx.spawn(enumerate_shards(backend, stream.clone(), ctx.clone()));
            }
            LogSourceSpec::DatabaseInstance {
                instance_id,
                prefix,
            } => {
                let tailer = RotatingFileTailer::start(
                    backends.db_logs(&spec)?,
                    prefix.clone(),
                    instance_id.clone(),
                    ctx.clone(),
                )
                .await?;
                ctx.spawn(tailer.run());
            }
        }

        info!(source = %spec, "Aggregation session opened");

        Ok(Self {
            spec,
            output,
            _guard: cancel.clone().drop_guard(),
            cancel,
            tracker,
        })
    }

    pub fn spec(&self) -> &LogSourceSpec {
        &self.spec
    }

    /// Next newline-terminated line from any source of the session
    pub async fn next_line(&mut self) -> Option<Vec<u8>> {
        self.output.recv().await
    }

    /// A line that is already buffered, without waiting
    pub fn try_next_line(&mut self) -> Option<Vec<u8>> {
        self.output.try_recv()
    }

    /// Raise the session's cancellation signal. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!(source = %self.spec, "Aggregation session cancelled");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by every worker; cancelling it ends the session
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Workers still running (top-level plus per-stream/per-shard)
    pub fn active_workers(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel and wait until every worker has exited
    pub async fn shutdown(self) {
        self.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Split into the output channel and the cancellation token.
    /// The caller becomes responsible for cancelling.
    pub fn into_parts(self) -> (LogOutput, CancellationToken) {
        let Self {
            output,
            cancel,
            _guard,
            ..
        } = self;
        _guard.disarm();
        (output, cancel)
    }
}
