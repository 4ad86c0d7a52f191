//! Log group tailing.
//!
//! An application writes to many streams in one group, one per container.
//! [`StreamPoller`] periodically lists the group's streams and starts one
//! [`StreamReader`] for every stream that wrote an event after the discovery
//! horizon. A stream, once active, is tailed for the rest of the session.

#![warn(clippy::all, rust_2018_idioms)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::LogGroupBackend;
use super::cursor::TimestampCursor;
use super::sdk_errors::log_backend_error;
use super::sink::{line_from, WorkerContext};
use super::types::LogStreamSummary;

const SERVICE: &str = "CloudWatchLogs";

/// Streams that already have a reader. Owned by the poller alone.
#[derive(Debug, Default)]
pub struct ActiveStreamSet {
    streams: HashMap<String, bool>,
}

impl ActiveStreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, stream: &str) -> bool {
        self.streams.get(stream).copied().unwrap_or(false)
    }

    /// Mark a stream active. Returns false if it already was.
    pub fn mark_active(&mut self, stream: &str) -> bool {
        if self.is_active(stream) {
            return false;
        }
        self.streams.insert(stream.to_string(), true);
        true
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Decides which listed streams need a new reader.
///
/// Streams are classified against the full-precision horizon; readers start
/// from the horizon truncated to whole seconds.
#[derive(Debug)]
pub struct StreamDiscovery {
    horizon_ms: i64,
    active: ActiveStreamSet,
}

impl StreamDiscovery {
    pub fn new(horizon_ms: i64) -> Self {
        Self {
            horizon_ms,
            active: ActiveStreamSet::new(),
        }
    }

    /// Horizon `lookback` before `now` (Unix milliseconds)
    pub fn horizon_before(now: DateTime<Utc>, lookback: std::time::Duration) -> i64 {
        let lookback = chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::zero());
        (now - lookback).timestamp_millis()
    }

    pub fn horizon_ms(&self) -> i64 {
        self.horizon_ms
    }

    /// Where a new reader's cursor starts: the horizon's whole second
    pub fn reader_start_ms(&self) -> i64 {
        self.horizon_ms.div_euclid(1000) * 1000
    }

    pub fn active_streams(&self) -> &ActiveStreamSet {
        &self.active
    }

    /// Mark and return the streams of this listing that should start tailing.
    ///
    /// Already active streams are skipped without looking at them again;
    /// streams that never wrote an event are ignored.
    pub fn classify(&mut self, streams: &[LogStreamSummary]) -> Vec<String> {
        let mut started = Vec::new();

        for stream in streams {
            if self.active.is_active(&stream.name) {
                continue;
            }

            let Some(last_event) = stream.last_event_timestamp else {
                continue;
            };

            debug!(
                stream = %stream.name,
                last_event_timestamp = last_event,
                age_ms = Utc::now().timestamp_millis() - last_event,
                "Evaluating log stream"
            );

            if last_event > self.horizon_ms && self.active.mark_active(&stream.name) {
                started.push(stream.name.clone());
            }
        }

        started
    }
}

/// Top-level worker for a log group
pub struct StreamPoller {
    backend: Arc<dyn LogGroupBackend>,
    group: String,
    discovery: StreamDiscovery,
    ctx: WorkerContext,
}

impl StreamPoller {
    /// The discovery horizon is fixed here, at poller start
    pub fn new(backend: Arc<dyn LogGroupBackend>, group: String, ctx: WorkerContext) -> Self {
        let horizon_ms =
            StreamDiscovery::horizon_before(Utc::now(), ctx.config().discovery_horizon());
        Self {
            backend,
            group,
            discovery: StreamDiscovery::new(horizon_ms),
            ctx,
        }
    }

    pub async fn run(mut self) {
        info!(
            group = %self.group,
            horizon_ms = self.discovery.horizon_ms(),
            "Stream poller started"
        );

        loop {
            if self.ctx.is_cancelled() {
                break;
            }

            match self.backend.describe_log_streams(&self.group).await {
                Ok(streams) => {
                    debug!(group = %self.group, num = streams.len(), "Listed log streams");
                    for stream in self.discovery.classify(&streams) {
                        self.start_reader(stream);
                    }
                }
                Err(e) => {
                    log_backend_error(SERVICE, "DescribeLogStreams", &e);
                    // naive backoff in case the failure is rate limiting
                    if !self.ctx.pause(self.ctx.config().discovery_backoff()).await {
                        break;
                    }
                }
            }

            if !self.ctx.pause(self.ctx.config().poll_interval()).await {
                break;
            }
        }

        if self.discovery.active_streams().is_empty() {
            trace_warn!("Stream poller for {} stopped before any stream was active", self.group);
        }
        info!(
            group = %self.group,
            active_streams = self.discovery.active_streams().len(),
            "Stream poller stopped"
        );
    }

    fn start_reader(&self, stream: String) {
        trace_info!("Tailing log stream {} in {}", stream, self.group);
        let reader = StreamReader::new(
            self.backend.clone(),
            self.group.clone(),
            stream,
            TimestampCursor::new(self.discovery.reader_start_ms()),
            self.ctx.clone(),
        );
        self.ctx.spawn(reader.run());
    }
}

/// Follows one stream from a timestamp cursor
pub struct StreamReader {
    backend: Arc<dyn LogGroupBackend>,
    group: String,
    stream: String,
    cursor: TimestampCursor,
    ctx: WorkerContext,
}

impl StreamReader {
    pub fn new(
        backend: Arc<dyn LogGroupBackend>,
        group: String,
        stream: String,
        cursor: TimestampCursor,
        ctx: WorkerContext,
    ) -> Self {
        Self {
            backend,
            group,
            stream,
            cursor,
            ctx,
        }
    }

    pub async fn run(mut self) {
        debug!(
            group = %self.group,
            stream = %self.stream,
            start_time = self.cursor.start_time(),
            "Stream reader started"
        );

        while !self.ctx.is_cancelled() {
            if !self.poll_once().await {
                break;
            }
            if !self.ctx.pause(self.ctx.config().poll_interval()).await {
                break;
            }
        }

        debug!(group = %self.group, stream = %self.stream, "Stream reader stopped");
    }

    /// One fetch. Failures leave the cursor where it was for the next poll.
    /// Returns false once the sink refuses lines.
    async fn poll_once(&mut self) -> bool {
        let events = match self
            .backend
            .get_log_events(&self.group, &self.stream, self.cursor.start_time())
            .await
        {
            Ok(events) => events,
            Err(e) => {
                log_backend_error(SERVICE, "GetLogEvents", &e);
                return true;
            }
        };

        for event in events {
            if !self.ctx.emit(line_from(event.message.as_bytes())).await {
                return false;
            }
            self.cursor.advance_past(event.timestamp);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_active_set_marks_once() {
        let mut set = ActiveStreamSet::new();

        assert!(set.is_empty());
        assert!(set.mark_active("web/1"));
        assert!(!set.mark_active("web/1"));
        assert!(set.is_active("web/1"));
        assert!(!set.is_active("web/2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_reader_start_is_truncated_to_seconds() {
        let now = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        let discovery =
            StreamDiscovery::new(StreamDiscovery::horizon_before(now, Duration::from_secs(120)));

        assert_eq!(discovery.horizon_ms(), 1_700_000_003_456);
        assert_eq!(discovery.reader_start_ms(), 1_700_000_003_000);
    }

    #[test]
    fn test_classify_uses_full_precision_horizon() {
        let mut discovery = StreamDiscovery::new(10_500);
        let listing = vec![
            LogStreamSummary::new("inside-truncated-second", Some(10_200)),
            LogStreamSummary::new("after-horizon", Some(10_501)),
        ];

        assert_eq!(
            discovery.classify(&listing),
            vec!["after-horizon".to_string()]
        );
        assert_eq!(discovery.reader_start_ms(), 10_000);
    }

    #[test]
    fn test_classify_starts_each_stream_once() {
        let mut discovery = StreamDiscovery::new(10_000);
        let listing = vec![LogStreamSummary::new("web/1", Some(20_000))];

        let mut started = Vec::new();
        for _ in 0..5 {
            started.extend(discovery.classify(&listing));
        }

        assert_eq!(started, vec!["web/1".to_string()]);
    }

    #[test]
    fn test_classify_skips_quiet_and_stale_streams() {
        let mut discovery = StreamDiscovery::new(10_000);
        let listing = vec![
            LogStreamSummary::new("fresh", Some(10_001)),
            LogStreamSummary::new("never-wrote", None),
            LogStreamSummary::new("stale", Some(9_000)),
            LogStreamSummary::new("at-horizon", Some(10_000)),
        ];

        assert_eq!(discovery.classify(&listing), vec!["fresh".to_string()]);
        assert!(!discovery.active_streams().is_active("stale"));
        assert!(!discovery.active_streams().is_active("never-wrote"));
    }

    #[test]
    fn test_classify_picks_up_stream_that_becomes_active_later() {
        let mut discovery = StreamDiscovery::new(10_000);

        let first = vec![LogStreamSummary::new("worker/1", None)];
        assert!(discovery.classify(&first).is_empty());

        let second = vec![LogStreamSummary::new("worker/1", Some(15_000))];
        assert_eq!(discovery.classify(&second), vec!["worker/1".to_string()]);
    }

    #[test]
    fn test_active_stream_stays_active_after_going_quiet() {
        let mut discovery = StreamDiscovery::new(10_000);
        discovery.classify(&[LogStreamSummary::new("web/1", Some(20_000))]);

        assert!(discovery
            .classify(&[LogStreamSummary::new("web/1", Some(1_000))])
            .is_empty());
        assert!(discovery.active_streams().is_active("web/1"));
    }
}
