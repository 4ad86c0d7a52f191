//! Output sink and shared worker plumbing.
//!
//! Every worker of a session holds a [`WorkerContext`]: a producer handle on the
//! session's output channel, the session's cancellation token, and the task
//! tracker new workers are spawned on. Workers never talk to each other; they
//! only append lines and watch the token.

#![warn(clippy::all, rust_2018_idioms)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::app::config::TailConfig;

/// Producer side of a session's output. Cheap to clone, one per worker.
#[derive(Debug, Clone)]
pub enum LogSink {
    Unbounded(mpsc::UnboundedSender<Vec<u8>>),
    Bounded(mpsc::Sender<Vec<u8>>),
}

/// Consumer side of a session's output
#[derive(Debug)]
pub enum LogOutput {
    Unbounded(mpsc::UnboundedReceiver<Vec<u8>>),
    Bounded(mpsc::Receiver<Vec<u8>>),
}

/// Create a sink/output pair; `capacity` of `None` means unbounded
pub fn log_channel(capacity: Option<usize>) -> (LogSink, LogOutput) {
    match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (LogSink::Bounded(tx), LogOutput::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (LogSink::Unbounded(tx), LogOutput::Unbounded(rx))
        }
    }
}

impl LogSink {
    /// Append one line. Waits for capacity on a bounded sink.
    /// Returns false once the consumer is gone.
    pub async fn send(&self, line: Vec<u8>) -> bool {
        match self {
            LogSink::Unbounded(tx) => tx.send(line).is_ok(),
            LogSink::Bounded(tx) => tx.send(line).await.is_ok(),
        }
    }
}

impl LogOutput {
    /// Next line, or `None` once every producer has finished
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        match self {
            LogOutput::Unbounded(rx) => rx.recv().await,
            LogOutput::Bounded(rx) => rx.recv().await,
        }
    }

    /// Next line if one is already buffered
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        match self {
            LogOutput::Unbounded(rx) => rx.try_recv().ok(),
            LogOutput::Bounded(rx) => rx.try_recv().ok(),
        }
    }
}

/// State shared by every worker of one session
#[derive(Debug, Clone)]
pub struct WorkerContext {
    sink: LogSink,
    cancel: CancellationToken,
    tracker: TaskTracker,
    config: Arc<TailConfig>,
}

impl WorkerContext {
    pub fn new(
        sink: LogSink,
        cancel: CancellationToken,
        tracker: TaskTracker,
        config: Arc<TailConfig>,
    ) -> Self {
        Self {
            sink,
            cancel,
            tracker,
            config,
        }
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Append a line unless the session has been cancelled. A send blocked on
    /// a full bounded sink is abandoned when cancellation is raised.
    /// Returns false when the worker should stop.
    pub async fn emit(&self, line: Vec<u8>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.sink.send(line) => sent,
        }
    }

    /// Sleep for one polling interval. Returns false if cancellation was
    /// raised before the interval elapsed.
    pub async fn pause(&self, interval: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }

    /// Start a worker that shares this session's sink and cancellation
    pub fn spawn<F>(&self, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(worker);
    }
}

/// Terminate a log payload with a newline
pub fn line_from(payload: &[u8]) -> Vec<u8> {
    let mut line = Vec::with_capacity(payload.len() + 1);
    line.extend_from_slice(payload);
    line.push(b'\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(capacity: Option<usize>) -> (WorkerContext, LogOutput) {
        let (sink, output) = log_channel(capacity);
        let ctx = WorkerContext::new(
            sink,
            CancellationToken::new(),
            TaskTracker::new(),
            Arc::new(TailConfig::default()),
        );
        (ctx, output)
    }

    #[tokio::test]
    async fn test_emit_delivers_in_order() {
        let (ctx, mut output) = context(None);

        assert!(ctx.emit(b"one\n".to_vec()).await);
        assert!(ctx.emit(b"two\n".to_vec()).await);

        assert_eq!(output.recv().await, Some(b"one\n".to_vec()));
        assert_eq!(output.recv().await, Some(b"two\n".to_vec()));
    }

    #[tokio::test]
    async fn test_emit_refused_after_cancel() {
        let (ctx, mut output) = context(Some(4));
        ctx.cancel.cancel();

        assert!(!ctx.emit(b"late\n".to_vec()).await);
        assert!(output.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_emit_reports_dropped_consumer() {
        let (ctx, output) = context(None);
        drop(output);

        assert!(!ctx.emit(b"nobody\n".to_vec()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_interrupted_by_cancel() {
        let (ctx, _output) = context(None);
        let cancel = ctx.cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let started = tokio::time::Instant::now();
        assert!(!ctx.pause(Duration::from_secs(60)).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_emit_released_by_cancel() {
        let (ctx, _output) = context(Some(1));
        assert!(ctx.emit(b"fills\n".to_vec()).await);

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        assert!(!ctx.emit(b"blocked\n".to_vec()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_completes_interval() {
        let (ctx, _output) = context(None);
        assert!(ctx.pause(Duration::from_millis(500)).await);
    }

    #[test]
    fn test_line_from_appends_newline() {
        assert_eq!(line_from(b"hello"), b"hello\n".to_vec());
        assert_eq!(line_from(b""), b"\n".to_vec());
    }
}
