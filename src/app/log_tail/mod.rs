//! Live Log Tailing Module
//!
//! Streams live logs from the backends an application writes to and merges
//! them into one line stream per subscription.
//!
//! ## Sources
//!
//! - **Log groups** (CloudWatch Logs): streams are discovered continuously;
//!   each recently active stream is read from a timestamp cursor, starting
//!   at the discovery horizon
//! - **Event streams** (Kinesis): every shard is read from its latest position
//!   by threading shard iterators
//! - **Database instances** (RDS): the current log file is seeded with its last
//!   lines, then re-emitted whenever its marker moves
//!
//! ## Usage
//!
//! ```rust,no_run
//! use racklog::app::config::TailConfig;
//! use racklog::app::log_tail::{AggregationSession, Backends, LogSourceSpec};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TailConfig::default();
//! let backends = Backends::from_sdk_config(&config.aws_config().await);
//!
//! let mut session =
//!     AggregationSession::open(LogSourceSpec::log_group("/convox/web"), &backends, config).await?;
//!
//! while let Some(line) = session.next_line().await {
//!     print!("{}", String::from_utf8_lossy(&line));
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod aws;
pub mod backend;
pub mod cloudwatch;
pub mod cursor;
pub mod kinesis;
pub mod rds;
pub mod sdk_errors;
pub mod session;
pub mod sink;
pub mod types;

pub use backend::{Backends, DbLogBackend, EventStreamBackend, LogGroupBackend};
pub use session::AggregationSession;
pub use sink::{LogOutput, LogSink};
pub use types::{
    LogFilePage, LogFilePortion, LogSourceSpec, LogStreamSummary, PortionRequest, RecordBatch,
    StreamEvent,
};
