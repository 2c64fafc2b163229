//! Destinations for decoded kernel messages.

use std::ffi::CString;
use std::io::Write;

use klogd_frame::{Facility, Priority};
use tracing::warn;

/// Accepts decoded messages for delivery.
///
/// Delivery failures are the sink's own concern; nothing is reported back.
pub trait LogSink {
    fn forward(&mut self, priority: Priority, facility: Facility, text: &[u8]);
}

impl<K: LogSink + ?Sized> LogSink for Box<K> {
    fn forward(&mut self, priority: Priority, facility: Facility, text: &[u8]) {
        (**self).forward(priority, facility, text)
    }
}

impl<K: LogSink + ?Sized> LogSink for &mut K {
    fn forward(&mut self, priority: Priority, facility: Facility, text: &[u8]) {
        (**self).forward(priority, facility, text)
    }
}

/// Delivers messages to the system logger through `syslog(3)`.
///
/// The connection is opened with the identity `kernel` and the `LOG_KERN`
/// facility, and closed again on drop.
#[derive(Debug)]
pub struct SyslogSink {
    _private: (),
}

impl SyslogSink {
    pub fn open() -> Self {
        // SAFETY: the ident is a 'static C string, as openlog(3) keeps the
        // pointer for the lifetime of the connection.
        unsafe { libc::openlog(c"kernel".as_ptr(), 0, libc::LOG_KERN) };
        Self { _private: () }
    }
}

impl LogSink for SyslogSink {
    fn forward(&mut self, priority: Priority, facility: Facility, text: &[u8]) {
        let text = c_text(text);
        let pri =
            (libc::c_int::from(facility.code()) << 3) | libc::c_int::from(priority.severity());
        // SAFETY: both pointers are valid NUL-terminated strings, and the
        // format consumes exactly one string argument.
        unsafe { libc::syslog(pri, c"%s".as_ptr(), text.as_ptr()) };
    }
}

impl Drop for SyslogSink {
    fn drop(&mut self) {
        // SAFETY: closelog(3) has no preconditions.
        unsafe { libc::closelog() };
    }
}

/// Writes `<priority>facility: text` lines to any `Write` stream.
///
/// Each line is flushed as soon as it is written.
#[derive(Debug)]
pub struct WriterSink<W> {
    inner: W,
    failed: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    /// Consume the sink and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_line(
        &mut self,
        priority: Priority,
        facility: Facility,
        text: &[u8],
    ) -> std::io::Result<()> {
        write!(self.inner, "<{priority}>{facility}: ")?;
        self.inner.write_all(text)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> LogSink for WriterSink<W> {
    fn forward(&mut self, priority: Priority, facility: Facility, text: &[u8]) {
        match self.write_line(priority, facility, text) {
            Ok(()) => self.failed = false,
            Err(err) => {
                // Warn once per run of failures.
                if !self.failed {
                    warn!(error = %err, "failed writing kernel message");
                }
                self.failed = true;
            }
        }
    }
}

/// Cut `text` at the first NUL byte, as a C `%s` would.
fn c_text(text: &[u8]) -> CString {
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    CString::new(&text[..end]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sink_formats_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.forward(Priority::ERR, Facility::Kernel, b"disk error");
        sink.forward(Priority::INFO, Facility::Kernel, b"hello world");

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "<3>kernel: disk error\n<6>kernel: hello world\n");
    }

    #[test]
    fn writer_sink_passes_raw_bytes() {
        let mut sink = WriterSink::new(Vec::new());
        sink.forward(Priority::INFO, Facility::Kernel, b"\xffbin");
        assert_eq!(sink.into_inner(), b"<6>kernel: \xffbin\n");
    }

    #[test]
    fn writer_sink_survives_write_errors() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = WriterSink::new(Broken);
        sink.forward(Priority::INFO, Facility::Kernel, b"lost");
        sink.forward(Priority::INFO, Facility::Kernel, b"lost again");
        assert!(sink.failed);
    }

    #[test]
    fn c_text_stops_at_nul() {
        assert_eq!(c_text(b"abc\0def").as_bytes(), b"abc");
        assert_eq!(c_text(b"plain").as_bytes(), b"plain");
        assert_eq!(c_text(b"").as_bytes(), b"");
    }
}
