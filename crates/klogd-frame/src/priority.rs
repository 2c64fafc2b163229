//! Message priorities and the `<d>` priority tag.
//!
//! Kernel lines may start with a tag carrying a single decimal digit:
//!
//! ```text
//! <3>disk error      priority 3, text "disk error"
//! <3disk error       priority 3, text "disk error" (closing '>' missing)
//! disk error         priority 6 (informational), text unchanged
//! ```

use std::fmt;

/// Syslog severity of a decoded message.
///
/// Holds the raw tag digit, so values 8 and 9 survive decoding even though
/// syslog only defines 0 through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const EMERG: Priority = Priority(0);
    pub const ALERT: Priority = Priority(1);
    pub const CRIT: Priority = Priority(2);
    pub const ERR: Priority = Priority(3);
    pub const WARNING: Priority = Priority(4);
    pub const NOTICE: Priority = Priority(5);
    pub const INFO: Priority = Priority(6);
    pub const DEBUG: Priority = Priority(7);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The syslog severity bits (`value & 7`).
    pub const fn severity(self) -> u8 {
        self.0 & 0x07
    }

    /// Human-readable severity name.
    pub fn name(self) -> &'static str {
        match self.severity() {
            0 => "emerg",
            1 => "alert",
            2 => "crit",
            3 => "err",
            4 => "warning",
            5 => "notice",
            6 => "info",
            _ => "debug",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::INFO
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logging category attached to every forwarded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facility {
    #[default]
    Kernel,
}

impl Facility {
    /// Numeric syslog facility code (`LOG_KERN` is 0).
    pub const fn code(self) -> u8 {
        match self {
            Facility::Kernel => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facility::Kernel => "kernel",
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode an optional priority tag at the start of `line`.
///
/// Returns the priority and the number of tag bytes to strip. The kernel
/// never emits multi-digit priorities, so only one digit is read; a missing
/// closing `>` still consumes `<` and the digit.
pub fn decode_tag(line: &[u8]) -> (Priority, usize) {
    match line {
        [b'<', d @ b'0'..=b'9', b'>', ..] => (Priority::new(d - b'0'), 3),
        [b'<', d @ b'0'..=b'9', ..] => (Priority::new(d - b'0'), 2),
        _ => (Priority::INFO, 0),
    }
}
