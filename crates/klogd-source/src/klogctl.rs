use std::io::ErrorKind;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::traits::{ConsoleLevel, LogSource};

// syslog(2) actions.
const ACTION_CLOSE: libc::c_int = 0;
const ACTION_OPEN: libc::c_int = 1;
const ACTION_READ: libc::c_int = 2;
const ACTION_CONSOLE_ON: libc::c_int = 7;
const ACTION_CONSOLE_LEVEL: libc::c_int = 8;
const ACTION_SIZE_UNREAD: libc::c_int = 9;

/// Kernel log read through the `syslog(2)` control interface.
///
/// Reads are destructive: each byte returned is consumed from the kernel
/// backlog. Before blocking in a read the source asks how many bytes are
/// unread, and sleeps one poll interval instead when there are none.
pub struct KlogctlSource {
    open: bool,
    poll_interval: Duration,
}

impl KlogctlSource {
    /// Open the kernel log. Currently a no-op on Linux, kept for symmetry.
    pub fn open(poll_interval: Duration) -> Result<Self> {
        syslog_call(ACTION_OPEN, std::ptr::null_mut(), 0).map_err(|e| SourceError::Open {
            what: "kernel log (klogctl)".to_string(),
            source: e,
        })?;

        info!("opened kernel log via klogctl");

        Ok(Self {
            open: true,
            poll_interval,
        })
    }
}

impl LogSource for KlogctlSource {
    fn name(&self) -> &'static str {
        "klogctl"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(SourceError::Closed);
        }

        let pending = syslog_call(ACTION_SIZE_UNREAD, std::ptr::null_mut(), 0).map_err(classify)?;
        if pending == 0 {
            std::thread::sleep(self.poll_interval);
            return Err(SourceError::Idle);
        }

        let len = buf.len().min(libc::c_int::MAX as usize) as libc::c_int;
        let n = syslog_call(ACTION_READ, buf.as_mut_ptr().cast::<libc::c_char>(), len)
            .map_err(classify)?;
        Ok(n as usize)
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        // Re-enable printk to the console before letting go of the log.
        let _ = syslog_call(ACTION_CONSOLE_ON, std::ptr::null_mut(), 0);
        let _ = syslog_call(ACTION_CLOSE, std::ptr::null_mut(), 0);
        debug!("closed kernel log via klogctl");
    }

    fn set_console_level(&mut self, level: ConsoleLevel) -> Result<()> {
        syslog_call(
            ACTION_CONSOLE_LEVEL,
            std::ptr::null_mut(),
            libc::c_int::from(level.get()),
        )
        .map(|_| ())
        .map_err(SourceError::Control)
    }
}

impl Drop for KlogctlSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for KlogctlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlogctlSource")
            .field("open", &self.open)
            .finish()
    }
}

fn classify(err: std::io::Error) -> SourceError {
    if err.kind() == ErrorKind::Interrupted {
        SourceError::Interrupted
    } else {
        SourceError::Read(err)
    }
}

fn syslog_call(
    action: libc::c_int,
    bufp: *mut libc::c_char,
    len: libc::c_int,
) -> std::io::Result<usize> {
    // SAFETY: for ACTION_READ `bufp` points at `len` writable bytes owned by
    // the caller; every other action ignores `bufp`.
    let rc = unsafe { libc::syscall(libc::SYS_syslog, action, bufp, len) };
    if rc < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_errno_is_retryable() {
        let err = classify(std::io::Error::from_raw_os_error(libc::EINTR));
        assert!(matches!(err, SourceError::Interrupted));
    }

    #[test]
    fn other_errno_is_fatal_read() {
        let err = classify(std::io::Error::from_raw_os_error(libc::EPERM));
        assert!(matches!(err, SourceError::Read(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EPERM));
    }

    #[test]
    fn closed_source_refuses_reads() {
        let mut source = KlogctlSource {
            open: false,
            poll_interval: Duration::from_millis(1),
        };
        let mut buf = [0u8; 8];
        assert!(matches!(source.read(&mut buf), Err(SourceError::Closed)));
        // Closing an already closed source issues no syscalls.
        source.close();
    }
}
