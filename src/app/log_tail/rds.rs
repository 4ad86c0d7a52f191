//! Database log file tailing.
//!
//! The current log file is the last entry of the final page of the instance's
//! file listing. Tailing starts by emitting the last lines of that file, then
//! re-downloads from the returned marker every interval and emits whatever
//! came back whenever the marker moves.
//!
//! Locating the file and seeding are part of opening the session: a failure
//! there aborts the session. Once tailing, a failed download stops the worker.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::backend::DbLogBackend;
use super::cursor::FileMarker;
use super::sdk_errors::log_backend_error;
use super::sink::WorkerContext;
use super::types::PortionRequest;

const SERVICE: &str = "RDS";

/// Follows the current log file of one database instance
pub struct RotatingFileTailer {
    backend: Arc<dyn DbLogBackend>,
    prefix: String,
    instance_id: String,
    file_name: String,
    request: PortionRequest,
    marker: FileMarker,
    ctx: WorkerContext,
}

/// Walk the paginated listing and return the last file of the final page
pub async fn resolve_current_log_file(
    backend: &dyn DbLogBackend,
    instance_id: &str,
    page_size: i32,
) -> Result<String> {
    let mut marker: Option<String> = None;

    loop {
        let page = backend
            .describe_log_files(instance_id, marker.as_deref(), page_size)
            .await
            .with_context(|| format!("Failed to list log files for {}", instance_id))?;

        match page.marker {
            Some(next) => marker = Some(next),
            None => {
                return page
                    .file_names
                    .last()
                    .cloned()
                    .ok_or_else(|| anyhow!("No log files found for {}", instance_id));
            }
        }
    }
}

/// Tag downloaded content with the session's label prefix
fn tagged(prefix: &str, data: &str) -> Vec<u8> {
    format!("{}: {}\n", prefix, data).into_bytes()
}

impl RotatingFileTailer {
    /// Locate the current file and emit its tail as the seed.
    /// Errors here are fatal to opening the session.
    pub async fn start(
        backend: Arc<dyn DbLogBackend>,
        prefix: String,
        instance_id: String,
        ctx: WorkerContext,
    ) -> Result<Self> {
        let config = ctx.config();
        let file_name =
            resolve_current_log_file(backend.as_ref(), &instance_id, config.log_file_page_size)
                .await?;

        info!(instance = %instance_id, file = %file_name, "Tailing database log file");

        let mut request = PortionRequest {
            number_of_lines: Some(config.seed_lines),
            marker: None,
        };
        let seed = backend
            .download_log_file_portion(&instance_id, &file_name, &request)
            .await
            .with_context(|| format!("Failed to download {} for {}", file_name, instance_id))?;

        let marker = seed
            .marker
            .ok_or_else(|| anyhow!("No marker returned for {} of {}", file_name, instance_id))?;

        if !ctx.emit(tagged(&prefix, &seed.data)).await {
            // run() stops at its first loop check or emit
            debug!(instance = %instance_id, "Seed not emitted, session already closed");
        }
        request.marker = Some(marker.clone());

        Ok(Self {
            backend,
            prefix,
            instance_id,
            file_name,
            request,
            marker: FileMarker::new(marker),
            ctx,
        })
    }

    pub async fn run(mut self) {
        while !self.ctx.is_cancelled() {
            let portion = match self
                .backend
                .download_log_file_portion(&self.instance_id, &self.file_name, &self.request)
                .await
            {
                Ok(portion) => portion,
                Err(e) => {
                    log_backend_error(SERVICE, "DownloadDBLogFilePortion", &e);
                    error!(
                        instance = %self.instance_id,
                        file = %self.file_name,
                        "Database log tailing stopped"
                    );
                    return;
                }
            };

            if self.marker.advance(portion.marker.as_deref()) {
                self.request.marker = Some(self.marker.token().to_string());
                if !self.ctx.emit(tagged(&self.prefix, &portion.data)).await {
                    return;
                }
            }

            if !self.ctx.pause(self.ctx.config().file_poll_interval()).await {
                break;
            }
        }

        debug!(instance = %self.instance_id, "Database log tailer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::TailConfig;
    use crate::app::log_tail::sink::log_channel;
    use crate::app::log_tail::types::{LogFilePage, LogFilePortion};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;

    struct SingleFile;

    #[async_trait]
    impl DbLogBackend for SingleFile {
        async fn describe_log_files(
            &self,
            _instance_id: &str,
            _marker: Option<&str>,
            _page_size: i32,
        ) -> Result<LogFilePage> {
            Ok(LogFilePage {
                file_names: vec!["error/postgresql.log".into()],
                marker: None,
            })
        }

        async fn download_log_file_portion(
            &self,
            _instance_id: &str,
            _file_name: &str,
            _request: &PortionRequest,
        ) -> Result<LogFilePortion> {
            Ok(LogFilePortion {
                data: "LOG: ready".into(),
                marker: Some("M0".into()),
            })
        }
    }

    #[test]
    fn test_tagged_prefixes_and_terminates() {
        assert_eq!(tagged("pg", "LOG: ready"), b"pg: LOG: ready\n".to_vec());
    }

    #[tokio::test]
    async fn test_refused_seed_still_starts_and_run_stops() {
        let (sink, mut output) = log_channel(None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = WorkerContext::new(
            sink,
            cancel,
            TaskTracker::new(),
            Arc::new(TailConfig::default()),
        );

        let tailer = RotatingFileTailer::start(Arc::new(SingleFile), "pg".into(), "db".into(), ctx)
            .await
            .unwrap();
        assert_eq!(tailer.marker.token(), "M0");
        assert_eq!(tailer.request.marker.as_deref(), Some("M0"));

        tailer.run().await;
        assert!(output.try_recv().is_none());
    }
}
