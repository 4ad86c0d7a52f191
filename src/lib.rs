//! racklog - live log tailing for a deployed rack
//!
//! racklog follows the logs an application and its managed databases write to
//! AWS and merges them into a single line stream per subscription.
//!
//! # Architecture Overview
//!
//! - **Sessions** ([`app::log_tail::AggregationSession`]): one per subscription; own the
//!   output channel and the cancellation token shared by every worker
//! - **Workers** ([`app::log_tail::cloudwatch`], [`app::log_tail::kinesis`],
//!   [`app::log_tail::rds`]): one top-level worker per session plus one per
//!   discovered stream or shard
//! - **Backends** ([`app::log_tail::backend`]): traits over the three AWS services,
//!   implemented with the AWS SDK in [`app::log_tail::aws`]
//! - **Configuration** ([`app::config`]): polling intervals, limits and AWS settings
//!
//! Backend failures never reach the caller. Depending on the source they are
//! retried on the next poll or end the affected worker; the caller only sees
//! the gap in output.

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;
