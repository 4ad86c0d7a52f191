//! Core modules for racklog.
//!
//! - [`log_tail`] - live log aggregation across CloudWatch Logs, Kinesis and RDS
//! - [`config`] - tailing configuration and AWS SDK setup
//! - [`cli`] - argument parsing for the binary

pub mod cli;
pub mod config;
pub mod log_tail;
