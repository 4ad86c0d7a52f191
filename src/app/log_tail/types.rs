//! Log Tail Data Types
//!
//! Source specifications and the record shapes returned by the three log backends.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a tailing session follows. Fixed for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogSourceSpec {
    /// A CloudWatch-style log group; every recently active stream is tailed
    LogGroup { group: String },
    /// A shard-partitioned event stream; every shard is tailed from "latest"
    EventStream { stream: String },
    /// A managed database instance; its current log file is tailed
    DatabaseInstance { instance_id: String, prefix: String },
}

impl LogSourceSpec {
    pub fn log_group(group: impl Into<String>) -> Self {
        Self::LogGroup {
            group: group.into(),
        }
    }

    pub fn event_stream(stream: impl Into<String>) -> Self {
        Self::EventStream {
            stream: stream.into(),
        }
    }

    pub fn database_instance(instance_id: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::DatabaseInstance {
            instance_id: instance_id.into(),
            prefix: prefix.into(),
        }
    }

    /// Short backend label used in logs and error messages
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::LogGroup { .. } => "CloudWatchLogs",
            Self::EventStream { .. } => "Kinesis",
            Self::DatabaseInstance { .. } => "RDS",
        }
    }
}

impl fmt::Display for LogSourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogGroup { group } => write!(f, "log group {}", group),
            Self::EventStream { stream } => write!(f, "event stream {}", stream),
            Self::DatabaseInstance { instance_id, .. } => {
                write!(f, "database instance {}", instance_id)
            }
        }
    }
}

/// One entry of a log group's stream listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamSummary {
    /// Stream name, unique within the group
    pub name: String,
    /// Timestamp of the most recent event (Unix milliseconds), absent for streams that never wrote
    pub last_event_timestamp: Option<i64>,
}

impl LogStreamSummary {
    pub fn new(name: impl Into<String>, last_event_timestamp: Option<i64>) -> Self {
        Self {
            name: name.into(),
            last_event_timestamp,
        }
    }
}

/// A single event read from a log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Event timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub message: String,
}

impl StreamEvent {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

/// Records fetched from a shard together with the iterator for the next fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    /// Raw record payloads in shard order
    pub records: Vec<Vec<u8>>,
    /// Continuation iterator; `None` once the shard has been closed
    pub next_iterator: Option<String>,
}

/// One page of a database instance's log file listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilePage {
    pub file_names: Vec<String>,
    /// Pagination marker; `None` on the final page
    pub marker: Option<String>,
}

/// A downloaded portion of a database log file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilePortion {
    pub data: String,
    /// Position marker returned by the backend for the next download
    pub marker: Option<String>,
}

/// Parameters for a log file portion download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortionRequest {
    /// Only return the last N lines when set
    pub number_of_lines: Option<i32>,
    /// Resume from this marker when set
    pub marker: Option<String>,
}
