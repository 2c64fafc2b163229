//! Kernel log sources.
//!
//! Provides a unified interface over the two ways of draining the kernel
//! message backlog:
//! - the `syslog(2)` control interface, a.k.a. `klogctl` (Linux)
//! - a special device file such as `/proc/kmsg` (any Unix)
//!
//! This is the lowest layer of klogd. Everything else builds on top of the
//! [`LogSource`] trait provided here.

pub mod error;
pub mod kernel_log;
pub mod traits;

#[cfg(unix)]
pub mod device;
#[cfg(target_os = "linux")]
pub mod klogctl;

pub use error::{Result, SourceError};
pub use kernel_log::KernelLog;
pub use traits::{
    ConsoleLevel, LogSource, SourceConfig, SourceKind, DEFAULT_DEVICE_PATH, DEFAULT_POLL_INTERVAL,
};

#[cfg(unix)]
pub use device::DeviceSource;
#[cfg(target_os = "linux")]
pub use klogctl::KlogctlSource;
