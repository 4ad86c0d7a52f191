//! Event stream tailing.
//!
//! The shard set is listed once when the session opens and each shard gets its
//! own [`ShardReader`]. Readers start at the latest position, so only records
//! written after the session opened are seen. A failed fetch ends that reader
//! for good; the other shards keep going.

#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;
use tracing::{debug, info};

use super::backend::EventStreamBackend;
use super::cursor::ShardIterator;
use super::sdk_errors::log_backend_error;
use super::sink::{line_from, WorkerContext};

const SERVICE: &str = "Kinesis";

/// Top-level worker for an event stream: list shards, start a reader per shard, return
pub async fn enumerate_shards(
    backend: Arc<dyn EventStreamBackend>,
    stream: String,
    ctx: WorkerContext,
) {
    let shards = match backend.list_shards(&stream).await {
        Ok(shards) => shards,
        Err(e) => {
            log_backend_error(SERVICE, "DescribeStream", &e);
            return;
        }
    };

    info!(stream = %stream, shards = shards.len(), "Tailing event stream shards");

    for shard_id in shards {
        let reader = ShardReader::new(backend.clone(), stream.clone(), shard_id, ctx.clone());
        ctx.spawn(reader.run());
    }
}

/// Follows one shard by threading its iterator through every fetch
pub struct ShardReader {
    backend: Arc<dyn EventStreamBackend>,
    stream: String,
    shard_id: String,
    ctx: WorkerContext,
}

impl ShardReader {
    pub fn new(
        backend: Arc<dyn EventStreamBackend>,
        stream: String,
        shard_id: String,
        ctx: WorkerContext,
    ) -> Self {
        Self {
            backend,
            stream,
            shard_id,
            ctx,
        }
    }

    pub async fn run(self) {
        let mut iterator = match self
            .backend
            .latest_shard_iterator(&self.stream, &self.shard_id)
            .await
        {
            Ok(token) => ShardIterator::new(token),
            Err(e) => {
                log_backend_error(SERVICE, "GetShardIterator", &e);
                return;
            }
        };

        debug!(stream = %self.stream, shard = %self.shard_id, "Shard reader started");

        while !self.ctx.is_cancelled() {
            let batch = match self.backend.get_records(iterator.token()).await {
                Ok(batch) => batch,
                Err(e) => {
                    log_backend_error(SERVICE, "GetRecords", &e);
                    trace_warn!(
                        "Shard {} of {} stopped after failed fetch",
                        self.shard_id,
                        self.stream
                    );
                    return;
                }
            };

            let closed = match batch.next_iterator {
                Some(next) => {
                    iterator.replace(next);
                    false
                }
                None => true,
            };

            for record in &batch.records {
                if !self.ctx.emit(line_from(record)).await {
                    return;
                }
            }

            if closed {
                info!(stream = %self.stream, shard = %self.shard_id, "Shard closed");
                return;
            }

            if !self.ctx.pause(self.ctx.config().shard_poll_interval()).await {
                break;
            }
        }

        debug!(stream = %self.stream, shard = %self.shard_id, "Shard reader stopped");
    }
}
