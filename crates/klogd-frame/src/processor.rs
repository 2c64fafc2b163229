use std::borrow::Cow;
use std::iter::FusedIterator;

use bytes::{Bytes, BytesMut};
use klogd_source::LogSource;
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::priority::{decode_tag, Priority};

/// Default carry buffer capacity.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Smallest usable capacity: one byte of data plus the reserved slot.
pub const MIN_CAPACITY: usize = 2;

/// One kernel log line with its tag and newline removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub priority: Priority,
    pub text: Bytes,
    /// Set when the line was force-flushed because it filled the whole
    /// buffer without a newline.
    pub truncated: bool,
}

impl DecodedMessage {
    /// The text as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}

/// Fixed-capacity storage for bytes that do not yet form a complete line.
///
/// At most `capacity - 1` bytes are ever held. Between read cycles the held
/// bytes never contain a newline.
#[derive(Debug)]
pub struct CarryBuffer {
    capacity: usize,
    data: BytesMut,
}

impl CarryBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_CAPACITY {
            return Err(FrameError::CapacityTooSmall {
                capacity,
                min: MIN_CAPACITY,
            });
        }
        Ok(Self {
            capacity,
            data: BytesMut::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently carried over.
    pub fn used(&self) -> usize {
        self.data.len()
    }

    /// How many bytes the next read may append.
    pub fn free(&self) -> usize {
        (self.capacity - 1).saturating_sub(self.data.len())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Drop any carried-over bytes.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Turns raw kernel log reads into decoded messages.
///
/// Each cycle appends new bytes to the carry buffer with [`fill`] (or
/// [`read_from`]) and then drains [`process`]. Incomplete trailing lines are
/// kept for the next cycle.
///
/// [`fill`]: FrameProcessor::fill
/// [`read_from`]: FrameProcessor::read_from
/// [`process`]: FrameProcessor::process
#[derive(Debug)]
pub struct FrameProcessor {
    buf: CarryBuffer,
}

impl FrameProcessor {
    pub fn new(buf: CarryBuffer) -> Self {
        Self { buf }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        CarryBuffer::new(capacity).map(Self::new)
    }

    pub fn buffer(&self) -> &CarryBuffer {
        &self.buf
    }

    /// Let `read` write into the free tail of the buffer.
    ///
    /// `read` gets a slice of exactly [`CarryBuffer::free`] bytes and returns
    /// how many it filled. On error the buffer is left as it was.
    pub fn fill<E>(
        &mut self,
        read: impl FnOnce(&mut [u8]) -> std::result::Result<usize, E>,
    ) -> std::result::Result<usize, E> {
        let used = self.buf.data.len();
        let free = self.buf.free();
        self.buf.data.resize(used + free, 0);

        match read(&mut self.buf.data[used..]) {
            Ok(n) => {
                let n = n.min(free);
                self.buf.data.truncate(used + n);
                Ok(n)
            }
            Err(err) => {
                self.buf.data.truncate(used);
                Err(err)
            }
        }
    }

    /// Read the next chunk from `source` into the free tail.
    pub fn read_from<S: LogSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> klogd_source::Result<usize> {
        self.fill(|tail| source.read(tail))
    }

    /// Decode every complete line currently buffered.
    ///
    /// The iterator is lazy. Once it is exhausted the carry buffer holds only
    /// the incomplete trailing line, if any.
    pub fn process(&mut self) -> Messages<'_> {
        Messages {
            buf: &mut self.buf,
            consumed_line: false,
            finished: false,
        }
    }

    /// Append `bytes` and collect the resulting messages.
    ///
    /// Input longer than the free space is split at free-space boundaries,
    /// exactly as a sequence of short reads would be.
    pub fn feed(&mut self, mut bytes: &[u8]) -> Vec<DecodedMessage> {
        let mut out = Vec::new();
        loop {
            let take = bytes.len().min(self.buf.free());
            let (head, rest) = bytes.split_at(take);
            self.buf.data.extend_from_slice(head);
            bytes = rest;
            out.extend(self.process());
            if bytes.is_empty() {
                return out;
            }
        }
    }

    /// Discard any carried-over partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Messages decoded from one read cycle, in stream order.
#[derive(Debug)]
pub struct Messages<'a> {
    buf: &'a mut CarryBuffer,
    consumed_line: bool,
    finished: bool,
}

impl Iterator for Messages<'_> {
    type Item = DecodedMessage;

    fn next(&mut self) -> Option<DecodedMessage> {
        while !self.finished {
            if let Some(pos) = self.buf.data.iter().position(|&b| b == b'\n') {
                let mut line = self.buf.data.split_to(pos + 1);
                line.truncate(pos);
                self.consumed_line = true;
                match decode_line(line.freeze(), false) {
                    Some(msg) => return Some(msg),
                    None => continue,
                }
            }

            self.finished = true;

            // A full buffer with no newline at all is flushed as one line.
            if !self.consumed_line && self.buf.data.len() >= self.buf.capacity - 1 {
                let line = self.buf.data.split().freeze();
                debug!(len = line.len(), "flushing unterminated line that filled the buffer");
                return decode_line(line, true);
            }
        }
        None
    }
}

impl FusedIterator for Messages<'_> {}

fn decode_line(line: Bytes, truncated: bool) -> Option<DecodedMessage> {
    let (priority, tag_len) = decode_tag(&line);
    let text = line.slice(tag_len..);
    if text.is_empty() {
        return None;
    }
    Some(DecodedMessage {
        priority,
        text,
        truncated,
    })
}
