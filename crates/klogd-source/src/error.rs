/// Errors that can occur in kernel log source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to open the kernel log.
    #[error("can't open {what}: {source}")]
    Open {
        what: String,
        source: std::io::Error,
    },

    /// The read was interrupted by a signal before any data arrived.
    #[error("read interrupted")]
    Interrupted,

    /// Nothing was pending within the poll interval.
    #[error("no pending kernel messages")]
    Idle,

    /// Any other read failure.
    #[error("read failed: {0}")]
    Read(std::io::Error),

    /// A control request (such as setting the console level) was refused.
    #[error("control request failed: {0}")]
    Control(std::io::Error),

    /// The operation is not supported by this source.
    #[error("{0} is not supported by this source")]
    Unsupported(&'static str),

    /// The source has already been closed.
    #[error("source closed")]
    Closed,
}

impl SourceError {
    /// Whether the failed read can be retried without any state change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Interrupted | SourceError::Idle)
    }

    /// The OS error number behind this failure, if there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SourceError::Open { source, .. }
            | SourceError::Read(source)
            | SourceError::Control(source) => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_interrupted_and_idle_are_retryable() {
        assert!(SourceError::Interrupted.is_retryable());
        assert!(SourceError::Idle.is_retryable());
        assert!(!SourceError::Closed.is_retryable());
        assert!(!SourceError::Unsupported("console level").is_retryable());
        assert!(!SourceError::Read(std::io::Error::from_raw_os_error(5)).is_retryable());
    }

    #[test]
    fn raw_os_error_comes_from_io_source() {
        let err = SourceError::Read(std::io::Error::from_raw_os_error(5));
        assert_eq!(err.raw_os_error(), Some(5));
        assert_eq!(SourceError::Idle.raw_os_error(), None);
    }

    #[test]
    fn control_failure_is_not_a_read_failure() {
        let err = SourceError::Control(std::io::Error::from_raw_os_error(1));
        assert!(!err.is_retryable());
        assert_eq!(err.raw_os_error(), Some(1));
        assert!(err.to_string().starts_with("control request failed: "), "{err}");
    }

    #[test]
    fn open_error_names_the_target() {
        let err = SourceError::Open {
            what: "/proc/kmsg".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("can't open /proc/kmsg: "));
    }
}
