//! The read → reframe → forward loop.

use klogd_frame::{Facility, FrameProcessor, Priority};
use klogd_source::{ConsoleLevel, LogSource, SourceError};
use tracing::{debug, error, info, trace, warn};

use crate::shutdown::Shutdown;
use crate::sink::LogSink;

/// Notice forwarded when the source cannot change the console level.
pub const UNSUPPORTED_LEVEL_WARNING: &str =
    "klogd warning: this build does not support changing the console log level";

/// Notice forwarded as the very last message on shutdown.
pub const EXITING_NOTICE: &str = "klogd: exiting";

/// Lifecycle of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Draining,
    Stopped,
}

/// Why [`Dispatcher::run`] returned.
#[derive(Debug)]
pub enum StopReason {
    /// A shutdown was requested and the source has been closed.
    Shutdown,
    /// A read failed in a way that cannot be retried.
    ReadFailed(SourceError),
}

/// Counters kept across the dispatcher's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub reads: u64,
    pub retries: u64,
    pub forwarded: u64,
    pub overflow_flushes: u64,
}

/// Drives a [`LogSource`] through a [`FrameProcessor`] into a [`LogSink`].
///
/// Single-threaded: the only blocking point is `LogSource::read`, which
/// returns at least once per poll interval so that shutdown is noticed.
pub struct Dispatcher<S, K> {
    source: S,
    sink: K,
    frames: FrameProcessor,
    shutdown: Shutdown,
    state: State,
    stats: DispatchStats,
}

impl<S: LogSource, K: LogSink> Dispatcher<S, K> {
    pub fn new(source: S, sink: K, frames: FrameProcessor, shutdown: Shutdown) -> Self {
        Self {
            source,
            sink,
            frames,
            shutdown,
            state: State::Running,
            stats: DispatchStats::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consume the dispatcher and return the source and sink.
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }

    /// Forward one of klogd's own messages.
    pub fn notice(&mut self, priority: Priority, text: &str) {
        self.sink.forward(priority, Facility::Kernel, text.as_bytes());
    }

    /// Ask the source to apply a console printk level. Best-effort.
    pub fn apply_console_level(&mut self, level: ConsoleLevel) {
        match self.source.set_console_level(level) {
            Ok(()) => info!(%level, source = self.source.name(), "console log level set"),
            Err(SourceError::Unsupported(what)) => {
                warn!(%level, source = self.source.name(), "{what} is not supported");
                self.notice(Priority::WARNING, UNSUPPORTED_LEVEL_WARNING);
            }
            Err(err) => warn!(%level, error = %err, "failed to set console log level"),
        }
    }

    /// Forward the startup notice.
    pub fn announce_start(&mut self) {
        let text = format!("klogd started: klogd v{}", env!("CARGO_PKG_VERSION"));
        info!(source = self.source.name(), "{text}");
        self.notice(Priority::NOTICE, &text);
    }

    /// Run until shutdown is requested or a read fails fatally.
    pub fn run(&mut self) -> StopReason {
        while self.state == State::Running {
            if self.shutdown.is_requested() {
                self.drain();
                return StopReason::Shutdown;
            }

            match self.frames.read_from(&mut self.source) {
                Ok(n) => {
                    self.stats.reads += 1;
                    trace!(bytes = n, used = self.frames.buffer().used(), "read kernel log");
                    self.forward_pending();
                }
                Err(err) if err.is_retryable() => {
                    self.stats.retries += 1;
                    trace!(reason = %err, "retrying read");
                }
                Err(err) => {
                    error!(source = self.source.name(), error = %err, "kernel log read failed");
                    let text = fatal_read_notice(self.source.name(), &err);
                    self.notice(Priority::ERR, &text);
                    self.state = State::Stopped;
                    return StopReason::ReadFailed(err);
                }
            }
        }
        StopReason::Shutdown
    }

    fn forward_pending(&mut self) {
        for msg in self.frames.process() {
            if msg.truncated {
                self.stats.overflow_flushes += 1;
                debug!(
                    priority = msg.priority.name(),
                    text = %msg.text_lossy(),
                    "forwarding overflow-flushed line"
                );
            }
            self.sink.forward(msg.priority, Facility::Kernel, &msg.text);
            self.stats.forwarded += 1;
        }
    }

    fn drain(&mut self) {
        self.state = State::Draining;
        debug!(
            discarded = %String::from_utf8_lossy(self.frames.buffer().as_bytes()),
            "shutdown requested, closing kernel log"
        );
        self.source.close();
        self.frames.reset();
        self.notice(Priority::NOTICE, EXITING_NOTICE);
        self.state = State::Stopped;
        info!(
            reads = self.stats.reads,
            forwarded = self.stats.forwarded,
            "klogd stopped"
        );
    }
}

impl<S, K> std::fmt::Debug for Dispatcher<S, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

fn fatal_read_notice(source: &str, err: &SourceError) -> String {
    let detail = match err {
        SourceError::Read(io) => io.to_string(),
        other => other.to_string(),
    };
    match err.raw_os_error() {
        Some(errno) => format!("klogd: error {errno} in {source} read: {detail}"),
        None => format!("klogd: {source} read failed: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_notice_includes_errno() {
        let err = SourceError::Read(std::io::Error::from_raw_os_error(5));
        let text = fatal_read_notice("klogctl", &err);
        assert!(text.starts_with("klogd: error 5 in klogctl read: "), "{text}");
    }

    #[test]
    fn fatal_notice_without_errno() {
        let text = fatal_read_notice("device", &SourceError::Closed);
        assert_eq!(text, "klogd: device read failed: source closed");
    }
}
