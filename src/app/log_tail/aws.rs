//! AWS SDK implementations of the log backends.
//!
//! Thin wrappers that translate SDK responses into the engine's record types.
//! Every call is a single request; polling and retry policy live in the workers.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use aws_sdk_cloudwatchlogs::error::ProvideErrorMetadata;
use aws_sdk_kinesis as kinesis;
use aws_sdk_rds as rds;
use std::sync::Arc;

use super::backend::{Backends, DbLogBackend, EventStreamBackend, LogGroupBackend};
use super::types::{
    LogFilePage, LogFilePortion, LogStreamSummary, PortionRequest, RecordBatch, StreamEvent,
};

impl Backends {
    /// Wire all three AWS backends from one shared SDK configuration
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Backends::new()
            .with_log_groups(Arc::new(CloudWatchLogsBackend::new(
                cloudwatchlogs::Client::new(config),
            )))
            .with_event_streams(Arc::new(KinesisBackend::new(kinesis::Client::new(config))))
            .with_db_logs(Arc::new(RdsLogBackend::new(rds::Client::new(config))))
    }
}

/// Wrap an SDK failure so the error code leads the message
fn sdk_failure<E>(err: E, operation: &str, target: &str) -> anyhow::Error
where
    E: ProvideErrorMetadata + std::error::Error + std::fmt::Debug + Send + Sync + 'static,
{
    let summary = match err.code() {
        Some(code) => format!(
            "{}: {} failed for {}: {}",
            code,
            operation,
            target,
            err.message().unwrap_or("no message")
        ),
        None => format!("{} failed for {}: {:?}", operation, target, err),
    };
    anyhow::Error::new(err).context(summary)
}

/// CloudWatch Logs group/stream backend
#[derive(Clone)]
pub struct CloudWatchLogsBackend {
    client: cloudwatchlogs::Client,
}

impl CloudWatchLogsBackend {
    pub fn new(client: cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogGroupBackend for CloudWatchLogsBackend {
    async fn describe_log_streams(&self, group: &str) -> Result<Vec<LogStreamSummary>> {
        let response = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .order_by(cloudwatchlogs::types::OrderBy::LastEventTime)
            .descending(true)
            .send()
            .await
            .map_err(|e| sdk_failure(e, "DescribeLogStreams", group))?;

        let streams = response
            .log_streams()
            .iter()
            .filter_map(|stream| {
                stream
                    .log_stream_name()
                    .map(|name| LogStreamSummary::new(name, stream.last_event_timestamp()))
            })
            .collect();

        Ok(streams)
    }

    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<StreamEvent>> {
        let response = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .start_time(start_time)
            .start_from_head(true)
            .send()
            .await
            .map_err(|e| sdk_failure(e, "GetLogEvents", stream))?;

        let events = response
            .events()
            .iter()
            .filter_map(|event| {
                let timestamp = event.timestamp()?;
                Some(StreamEvent::new(
                    timestamp,
                    event.message().unwrap_or_default(),
                ))
            })
            .collect();

        Ok(events)
    }
}

/// Kinesis shard backend
#[derive(Clone)]
pub struct KinesisBackend {
    client: kinesis::Client,
}

impl KinesisBackend {
    pub fn new(client: kinesis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventStreamBackend for KinesisBackend {
    async fn list_shards(&self, stream: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_stream()
            .stream_name(stream)
            .send()
            .await
            .map_err(|e| sdk_failure(e, "DescribeStream", stream))?;

        let description = response
            .stream_description()
            .ok_or_else(|| anyhow!("Stream {} not found", stream))?;

        Ok(description
            .shards()
            .iter()
            .map(|shard| shard.shard_id().to_string())
            .collect())
    }

    async fn latest_shard_iterator(&self, stream: &str, shard_id: &str) -> Result<String> {
        let response = self
            .client
            .get_shard_iterator()
            .stream_name(stream)
            .shard_id(shard_id)
            .shard_iterator_type(kinesis::types::ShardIteratorType::Latest)
            .send()
            .await
            .map_err(|e| sdk_failure(e, "GetShardIterator", shard_id))?;

        response
            .shard_iterator()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No shard iterator returned for {}/{}", stream, shard_id))
    }

    async fn get_records(&self, iterator: &str) -> Result<RecordBatch> {
        let response = self
            .client
            .get_records()
            .shard_iterator(iterator)
            .send()
            .await
            .map_err(|e| sdk_failure(e, "GetRecords", "shard iterator"))?;

        Ok(RecordBatch {
            records: response
                .records()
                .iter()
                .map(|record| record.data().as_ref().to_vec())
                .collect(),
            next_iterator: response.next_shard_iterator().map(str::to_string),
        })
    }
}

/// RDS database log file backend
#[derive(Clone)]
pub struct RdsLogBackend {
    client: rds::Client,
}

impl RdsLogBackend {
    pub fn new(client: rds::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DbLogBackend for RdsLogBackend {
    async fn describe_log_files(
        &self,
        instance_id: &str,
        marker: Option<&str>,
        page_size: i32,
    ) -> Result<LogFilePage> {
        let response = self
            .client
            .describe_db_log_files()
            .db_instance_identifier(instance_id)
            .max_records(page_size)
            .set_marker(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_failure(e, "DescribeDBLogFiles", instance_id))?;

        Ok(LogFilePage {
            file_names: response
                .describe_db_log_files()
                .iter()
                .filter_map(|details| details.log_file_name().map(str::to_string))
                .collect(),
            marker: response
                .marker()
                .filter(|marker| !marker.is_empty())
                .map(str::to_string),
        })
    }

    async fn download_log_file_portion(
        &self,
        instance_id: &str,
        file_name: &str,
        request: &PortionRequest,
    ) -> Result<LogFilePortion> {
        let response = self
            .client
            .download_db_log_file_portion()
            .db_instance_identifier(instance_id)
            .log_file_name(file_name)
            .set_number_of_lines(request.number_of_lines)
            .set_marker(request.marker.clone())
            .send()
            .await
            .map_err(|e| sdk_failure(e, "DownloadDBLogFilePortion", file_name))?;

        Ok(LogFilePortion {
            data: response.log_file_data().unwrap_or_default().to_string(),
            marker: response.marker().map(str::to_string),
        })
    }
}
