//! Kernel log daemon.
//!
//! klogd drains the kernel message backlog, splits it into lines, decodes
//! each line's priority tag and forwards the result to the system logger.
//!
//! # Crate Structure
//!
//! - [`source`] - Kernel log sources (klogctl, device file)
//! - [`frame`] - Line reframing and priority-tag decoding
//! - [`sink`] - Destinations for decoded messages
//! - [`dispatcher`] - The read → reframe → forward loop
//! - [`shutdown`] - Cooperative shutdown flag

pub mod dispatcher;
pub mod shutdown;
pub mod sink;

/// Re-export source types.
pub mod source {
    pub use klogd_source::*;
}

/// Re-export frame types.
pub mod frame {
    pub use klogd_frame::*;
}

pub use dispatcher::{DispatchStats, Dispatcher, State, StopReason};
pub use shutdown::Shutdown;
pub use sink::{LogSink, SyslogSink, WriterSink};
