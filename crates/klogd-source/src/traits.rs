use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Default device path for the device-file source.
pub const DEFAULT_DEVICE_PATH: &str = "/proc/kmsg";

/// Default wait before an empty read is reported as idle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Console printk level, valid between 1 and 8 inclusive.
///
/// The kernel prints a message on the console only if its level is lower
/// than the console level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleLevel(u8);

impl ConsoleLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    /// Returns `None` when `level` is outside `1..=8`.
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source of raw kernel log bytes.
///
/// Implementations are opened by their constructors. `read` fills `buf` with
/// up to `buf.len()` pending bytes and must not block for longer than the
/// source's poll interval, so callers get a chance to observe shutdown.
pub trait LogSource {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Read pending bytes into `buf`.
    ///
    /// Returns [`SourceError::Interrupted`](crate::SourceError::Interrupted)
    /// or [`SourceError::Idle`](crate::SourceError::Idle) when the caller
    /// should simply try again.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the stream. Calling it more than once is a no-op.
    fn close(&mut self);

    /// Apply the console printk level. Best-effort.
    fn set_console_level(&mut self, level: ConsoleLevel) -> Result<()>;
}

impl<S: LogSource + ?Sized> LogSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn set_console_level(&mut self, level: ConsoleLevel) -> Result<()> {
        (**self).set_console_level(level)
    }
}

/// Which source implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// `klogctl` on Linux, the device file elsewhere.
    #[default]
    Auto,
    /// The `syslog(2)` control interface.
    Klogctl,
    /// A special device file such as `/proc/kmsg`.
    Device,
}

impl SourceKind {
    /// Resolve `Auto` for the current platform.
    pub fn resolve(self) -> Self {
        match self {
            SourceKind::Auto if cfg!(target_os = "linux") => SourceKind::Klogctl,
            SourceKind::Auto => SourceKind::Device,
            other => other,
        }
    }
}

/// Options for opening a source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Used by the device source only.
    pub device_path: PathBuf,
    pub poll_interval: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Auto,
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_level_range() {
        assert!(ConsoleLevel::new(0).is_none());
        assert_eq!(ConsoleLevel::new(1).map(ConsoleLevel::get), Some(1));
        assert_eq!(ConsoleLevel::new(8).map(ConsoleLevel::get), Some(8));
        assert!(ConsoleLevel::new(9).is_none());
    }

    #[test]
    fn auto_resolves_per_platform() {
        let resolved = SourceKind::Auto.resolve();
        if cfg!(target_os = "linux") {
            assert_eq!(resolved, SourceKind::Klogctl);
        } else {
            assert_eq!(resolved, SourceKind::Device);
        }
        assert_eq!(SourceKind::Device.resolve(), SourceKind::Device);
    }

    #[test]
    fn default_config_uses_proc_kmsg() {
        let config = SourceConfig::default();
        assert_eq!(config.device_path, PathBuf::from("/proc/kmsg"));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }
}
