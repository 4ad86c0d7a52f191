//! Backend seams for the three log sources.
//!
//! The aggregation engine only talks to these traits. [`super::aws`] provides
//! the AWS SDK implementations; tests substitute scripted fakes.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::types::{
    LogFilePage, LogFilePortion, LogSourceSpec, LogStreamSummary, PortionRequest, RecordBatch,
    StreamEvent,
};

/// Group/stream log storage (CloudWatch Logs)
#[async_trait]
pub trait LogGroupBackend: Send + Sync {
    /// List the streams of a group, most recent event first
    async fn describe_log_streams(&self, group: &str) -> Result<Vec<LogStreamSummary>>;

    /// Fetch events of one stream at or after `start_time` (Unix milliseconds), oldest first
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<StreamEvent>>;
}

/// Shard-partitioned event streams (Kinesis)
#[async_trait]
pub trait EventStreamBackend: Send + Sync {
    async fn list_shards(&self, stream: &str) -> Result<Vec<String>>;

    /// Iterator positioned after the newest record of the shard
    async fn latest_shard_iterator(&self, stream: &str, shard_id: &str) -> Result<String>;

    async fn get_records(&self, iterator: &str) -> Result<RecordBatch>;
}

/// Rotating database log files (RDS)
#[async_trait]
pub trait DbLogBackend: Send + Sync {
    /// One page of the instance's log files; pass the previous page's marker to continue
    async fn describe_log_files(
        &self,
        instance_id: &str,
        marker: Option<&str>,
        page_size: i32,
    ) -> Result<LogFilePage>;

    async fn download_log_file_portion(
        &self,
        instance_id: &str,
        file_name: &str,
        request: &PortionRequest,
    ) -> Result<LogFilePortion>;
}

/// The backends a session may be opened against. Only the ones a caller
/// actually tails need to be present.
#[derive(Clone, Default)]
pub struct Backends {
    log_groups: Option<Arc<dyn LogGroupBackend>>,
    event_streams: Option<Arc<dyn EventStreamBackend>>,
    db_logs: Option<Arc<dyn DbLogBackend>>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("log_groups", &self.log_groups.is_some())
            .field("event_streams", &self.event_streams.is_some())
            .field("db_logs", &self.db_logs.is_some())
            .finish()
    }
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_groups(mut self, backend: Arc<dyn LogGroupBackend>) -> Self {
        self.log_groups = Some(backend);
        self
    }

    pub fn with_event_streams(mut self, backend: Arc<dyn EventStreamBackend>) -> Self {
        self.event_streams = Some(backend);
        self
    }

    pub fn with_db_logs(mut self, backend: Arc<dyn DbLogBackend>) -> Self {
        self.db_logs = Some(backend);
        self
    }

    pub fn log_groups(&self, spec: &LogSourceSpec) -> Result<Arc<dyn LogGroupBackend>> {
        self.log_groups
            .clone()
            .ok_or_else(|| missing_backend(spec))
    }

    pub fn event_streams(&self, spec: &LogSourceSpec) -> Result<Arc<dyn EventStreamBackend>> {
        self.event_streams
            .clone()
            .ok_or_else(|| missing_backend(spec))
    }

    pub fn db_logs(&self, spec: &LogSourceSpec) -> Result<Arc<dyn DbLogBackend>> {
        self.db_logs.clone().ok_or_else(|| missing_backend(spec))
    }
}

fn missing_backend(spec: &LogSourceSpec) -> anyhow::Error {
    anyhow!(
        "No {} backend configured for {}",
        spec.backend_name(),
        spec
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_backend_is_reported() {
        let backends = Backends::new();
        let spec = LogSourceSpec::event_stream("app-events");

        let err = backends.event_streams(&spec).err().unwrap();
        assert_eq!(
            err.to_string(),
            "No Kinesis backend configured for event stream app-events"
        );
    }

    #[test]
    fn test_debug_shows_configured_backends() {
        let debug = format!("{:?}", Backends::new());
        assert!(debug.contains("log_groups: false"));
    }
}
