//! Per-backend read positions.
//!
//! Each backend advances differently, so each gets its own cursor type rather
//! than a shared interface:
//!
//! - [`TimestampCursor`]: exclusive-next millisecond timestamp for log streams
//! - [`ShardIterator`]: single-use iterator token for shards
//! - [`FileMarker`]: content marker for rotating log files

#![warn(clippy::all, rust_2018_idioms)]

/// Start time for the next log stream read (Unix milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampCursor {
    next_start_ms: i64,
}

impl TimestampCursor {
    pub fn new(start_ms: i64) -> Self {
        Self {
            next_start_ms: start_ms,
        }
    }

    pub fn start_time(&self) -> i64 {
        self.next_start_ms
    }

    /// Move past an emitted event so the next read excludes it
    pub fn advance_past(&mut self, event_timestamp: i64) {
        self.next_start_ms = event_timestamp + 1;
    }
}

/// Shard iterator token. Tokens are single-use and must be replaced after every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardIterator {
    token: String,
}

impl ShardIterator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Swap in the continuation token, returning the consumed one
    pub fn replace(&mut self, next: String) -> String {
        std::mem::replace(&mut self.token, next)
    }
}

/// Last marker seen for a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMarker {
    token: String,
}

impl FileMarker {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Adopt `returned` and report whether the file moved.
    /// A missing marker is treated as "unchanged".
    pub fn advance(&mut self, returned: Option<&str>) -> bool {
        match returned {
            Some(marker) if marker != self.token => {
                self.token = marker.to_string();
                true
            }
            _ => false,
        }
    }
}
