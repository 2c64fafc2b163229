use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::traits::{ConsoleLevel, LogSource};

/// Kernel log read from a special device file (`/proc/kmsg`, `/dev/klog`).
///
/// Reads wait in `poll(2)` for at most the poll interval. A zero-byte read
/// (end of a regular file or an unconnected FIFO) is treated as "nothing
/// pending yet", which lets the source follow an ordinary file as well.
pub struct DeviceSource {
    file: Option<File>,
    path: PathBuf,
    poll_interval: Duration,
}

impl DeviceSource {
    /// Open the device read-only.
    pub fn open(path: impl AsRef<Path>, poll_interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| SourceError::Open {
            what: path.display().to_string(),
            source: e,
        })?;

        info!(?path, "opened kernel log device");

        Ok(Self {
            file: Some(file),
            path,
            poll_interval,
        })
    }

    /// The device path this source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn wait_readable(&self, file: &File) -> Result<()> {
        let mut pfd = libc::pollfd {
            fd: file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout = self.poll_interval.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `pfd` is a single valid pollfd and `fd` stays open for the
        // duration of the call because `file` is borrowed.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout) };
        match rc {
            0 => Err(SourceError::Idle),
            n if n > 0 => Ok(()),
            _ => {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    Err(SourceError::Interrupted)
                } else {
                    Err(SourceError::Read(err))
                }
            }
        }
    }
}

impl LogSource for DeviceSource {
    fn name(&self) -> &'static str {
        "device"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file.as_ref().ok_or(SourceError::Closed)?;
        self.wait_readable(file)?;

        let mut file = file;
        match file.read(buf) {
            Ok(0) if !buf.is_empty() => {
                std::thread::sleep(self.poll_interval);
                Err(SourceError::Idle)
            }
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => Err(SourceError::Interrupted),
            Err(err) => Err(SourceError::Read(err)),
        }
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = ?self.path(), "closed kernel log device");
        }
    }

    fn set_console_level(&mut self, _level: ConsoleLevel) -> Result<()> {
        Err(SourceError::Unsupported("changing the console log level"))
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeviceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSource")
            .field("path", &self.path())
            .field("open", &self.file.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("klogd-device-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kmsg");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_pending_bytes() {
        let path = temp_file("read", b"<6>hello\n");
        let mut source = DeviceSource::open(&path, Duration::from_millis(10)).unwrap();
        assert_eq!(source.path(), path.as_path());
        assert!(format!("{source:?}").contains("kmsg"));

        let mut buf = [0u8; 64];
        let n = source.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"<6>hello\n");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn end_of_file_is_idle() {
        let path = temp_file("eof", b"");
        let mut source = DeviceSource::open(&path, Duration::from_millis(5)).unwrap();

        let mut buf = [0u8; 16];
        let err = source.read(&mut buf).unwrap_err();
        assert!(matches!(err, SourceError::Idle));
        assert!(err.is_retryable());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_device_is_open_error() {
        let err = DeviceSource::open("/nonexistent/klogd/kmsg", Duration::from_millis(5))
            .unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
    }

    #[test]
    fn close_is_idempotent_and_stops_reads() {
        let path = temp_file("close", b"data\n");
        let mut source = DeviceSource::open(&path, Duration::from_millis(5)).unwrap();

        source.close();
        source.close();

        let mut buf = [0u8; 16];
        assert!(matches!(source.read(&mut buf), Err(SourceError::Closed)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn console_level_is_unsupported() {
        let path = temp_file("level", b"");
        let mut source = DeviceSource::open(&path, Duration::from_millis(5)).unwrap();

        let err = source
            .set_console_level(ConsoleLevel::new(4).unwrap())
            .unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(_)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
