//! Multichannel circular buffer with deferred cursor commit.
//!
//! [`RingBuffer`] decouples a host's arbitrary block size from the fixed
//! internal frame size. All channels share a single pair of cursors: writing
//! or reading channels `0..channels-1` touches data only, and the cursors
//! advance when the **last** channel is serviced. This keeps every channel
//! sample-aligned without per-channel bookkeeping.
//!
//! # Overlapped reads
//!
//! [`RingBuffer::pop_with_overlap`] reads a full frame but advances the read
//! cursor by `len - overlap` only, so the tail of one frame is re-read as the
//! head of the next. This is how overlapping analysis frames are produced
//! from a contiguous input stream.
//!
//! # Real-time use
//!
//! Storage is a single flat `channels x size` allocation made in
//! [`RingBuffer::new`]. Push, pop and skip never allocate. There is no
//! locking: one producer and one consumer on the same thread.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Errors from ring buffer transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingBufferError {
    /// More samples were pushed than there is free space.
    Overflow {
        /// Samples offered.
        requested: usize,
        /// Free space at the time of the call.
        available: usize,
    },
    /// More samples were popped than are buffered.
    Underflow {
        /// Samples requested.
        requested: usize,
        /// Samples buffered at the time of the call.
        available: usize,
    },
    /// Channel index outside `0..channels`.
    InvalidChannel(usize),
}

impl fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow {
                requested,
                available,
            } => write!(
                f,
                "ring buffer overflow: {requested} samples offered, {available} free"
            ),
            Self::Underflow {
                requested,
                available,
            } => write!(
                f,
                "ring buffer underflow: {requested} samples requested, {available} buffered"
            ),
            Self::InvalidChannel(ch) => write!(f, "ring buffer channel {ch} out of range"),
        }
    }
}

impl core::error::Error for RingBufferError {}

/// Fixed-capacity multichannel circular buffer.
///
/// # Example
///
/// ```rust
/// use sarita_core::RingBuffer;
///
/// let mut ring = RingBuffer::new(2, 8);
/// ring.push(0, &[1.0, 2.0, 3.0]).unwrap();
/// ring.push(1, &[4.0, 5.0, 6.0]).unwrap(); // last channel commits
/// assert_eq!(ring.buffered(), 3);
///
/// let mut out = [0.0; 3];
/// ring.pop(0, &mut out).unwrap();
/// assert_eq!(out, [1.0, 2.0, 3.0]);
/// ring.pop(1, &mut out).unwrap();
/// assert!(ring.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// Channel-major storage, `channels * size` samples.
    data: Vec<f32>,
    channels: usize,
    size: usize,
    read_index: usize,
    write_index: usize,
    buffered: usize,
}

impl RingBuffer {
    /// Allocates a zeroed buffer of `channels` channels, each `size` samples.
    ///
    /// # Panics
    ///
    /// Panics if `channels` or `size` is 0.
    pub fn new(channels: usize, size: usize) -> Self {
        assert!(channels > 0, "RingBuffer needs at least one channel");
        assert!(size > 0, "RingBuffer size must be > 0");

        #[cfg(feature = "tracing")]
        tracing::debug!("ring_buffer: allocated {channels} x {size}");

        Self {
            data: vec![0.0; channels * size],
            channels,
            size,
            read_index: 0,
            write_index: 0,
            buffered: 0,
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Physical length of each channel.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Samples per channel that can still be pushed.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.size - self.buffered
    }

    /// Samples per channel available to pop.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// True when no further sample fits.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.buffered == self.size
    }

    /// True when nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    /// Current read cursor.
    #[inline]
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Current write cursor.
    #[inline]
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Writes `samples` into `channel` at the write cursor.
    ///
    /// The cursor (and the buffered count) advance only when `channel` is
    /// the last channel, so push every channel with the same length.
    pub fn push(&mut self, channel: usize, samples: &[f32]) -> Result<(), RingBufferError> {
        self.check_channel(channel)?;
        let len = samples.len();
        if len > self.capacity() {
            return Err(RingBufferError::Overflow {
                requested: len,
                available: self.capacity(),
            });
        }

        let base = channel * self.size;
        let first = len.min(self.size - self.write_index);
        let start = base + self.write_index;
        self.data[start..start + first].copy_from_slice(&samples[..first]);
        self.data[base..base + len - first].copy_from_slice(&samples[first..]);

        if channel == self.channels - 1 {
            self.commit_write(len);
        }
        Ok(())
    }

    /// Reads `out.len()` samples of `channel` from the read cursor.
    ///
    /// Commits on the last channel like [`push`](Self::push).
    pub fn pop(&mut self, channel: usize, out: &mut [f32]) -> Result<(), RingBufferError> {
        let len = out.len();
        self.read_into(channel, out)?;
        if channel == self.channels - 1 {
            self.commit_read(len);
        }
        Ok(())
    }

    /// Reads `out.len()` samples but advances by `out.len() - overlap` on commit.
    ///
    /// `overlap` is clamped to `out.len()`.
    pub fn pop_with_overlap(
        &mut self,
        channel: usize,
        out: &mut [f32],
        overlap: usize,
    ) -> Result<(), RingBufferError> {
        let len = out.len();
        self.read_into(channel, out)?;
        if channel == self.channels - 1 {
            self.commit_read(len - overlap.min(len));
        }
        Ok(())
    }

    /// Advances the read cursor without reading.
    ///
    /// Used when the consumer services fewer channels than the buffer holds
    /// and the last channel is therefore never popped.
    pub fn skip_pop(&mut self, len: usize) -> Result<(), RingBufferError> {
        if len > self.buffered {
            return Err(RingBufferError::Underflow {
                requested: len,
                available: self.buffered,
            });
        }
        self.commit_read(len);
        Ok(())
    }

    /// Zeroes storage and rewinds both cursors.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
        self.read_index = 0;
        self.write_index = 0;
        self.buffered = 0;
    }

    fn check_channel(&self, channel: usize) -> Result<(), RingBufferError> {
        if channel < self.channels {
            Ok(())
        } else {
            Err(RingBufferError::InvalidChannel(channel))
        }
    }

    fn read_into(&self, channel: usize, out: &mut [f32]) -> Result<(), RingBufferError> {
        self.check_channel(channel)?;
        let len = out.len();
        if len > self.buffered {
            return Err(RingBufferError::Underflow {
                requested: len,
                available: self.buffered,
            });
        }

        let base = channel * self.size;
        let first = len.min(self.size - self.read_index);
        let start = base + self.read_index;
        out[..first].copy_from_slice(&self.data[start..start + first]);
        out[first..].copy_from_slice(&self.data[base..base + len - first]);
        Ok(())
    }

    #[inline]
    fn commit_write(&mut self, len: usize) {
        self.write_index = (self.write_index + len) % self.size;
        self.buffered += len;
    }

    #[inline]
    fn commit_read(&mut self, len: usize) {
        self.read_index = (self.read_index + len) % self.size;
        self.buffered -= len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: f32, len: usize) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    #[test]
    fn test_push_commits_on_last_channel() {
        let mut ring = RingBuffer::new(3, 16);
        ring.push(0, &[1.0; 4]).unwrap();
        ring.push(1, &[2.0; 4]).unwrap();
        assert_eq!(ring.buffered(), 0, "non-final channels must not commit");
        ring.push(2, &[3.0; 4]).unwrap();
        assert_eq!(ring.buffered(), 4);
        assert_eq!(ring.write_index(), 4);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let mut ring = RingBuffer::new(1, 8);
        let mut out = [0.0; 6];

        ring.push(0, &ramp(0.0, 6)).unwrap();
        ring.pop(0, &mut out).unwrap();
        // Cursor now at 6, next push wraps
        let data = ramp(100.0, 7);
        ring.push(0, &data).unwrap();
        let mut wrapped = [0.0; 7];
        ring.pop(0, &mut wrapped).unwrap();
        assert_eq!(&wrapped[..], &data[..]);
        assert_eq!(ring.read_index(), 5);
    }

    #[test]
    fn test_overflow_and_underflow() {
        let mut ring = RingBuffer::new(1, 4);
        assert_eq!(
            ring.push(0, &[0.0; 5]),
            Err(RingBufferError::Overflow {
                requested: 5,
                available: 4
            })
        );
        ring.push(0, &[0.0; 3]).unwrap();
        let mut out = [0.0; 4];
        assert_eq!(
            ring.pop(0, &mut out),
            Err(RingBufferError::Underflow {
                requested: 4,
                available: 3
            })
        );
    }

    #[test]
    fn test_pop_with_overlap_rereads_tail() {
        let mut ring = RingBuffer::new(1, 32);
        ring.push(0, &ramp(0.0, 16)).unwrap();

        let mut frame = [0.0; 8];
        ring.pop_with_overlap(0, &mut frame, 2).unwrap();
        assert_eq!(frame, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(ring.buffered(), 10);

        ring.pop_with_overlap(0, &mut frame, 2).unwrap();
        assert_eq!(frame[0], 6.0, "second frame starts at the re-read tail");
        assert_eq!(frame[7], 13.0);
    }

    #[test]
    fn test_skip_pop_commits_unread_channels() {
        let mut ring = RingBuffer::new(4, 16);
        for ch in 0..4 {
            ring.push(ch, &[ch as f32; 8]).unwrap();
        }
        let mut out = [0.0; 8];
        ring.pop(0, &mut out).unwrap();
        ring.pop(1, &mut out).unwrap();
        assert_eq!(ring.buffered(), 8);
        ring.skip_pop(8).unwrap();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_invalid_channel() {
        let mut ring = RingBuffer::new(2, 4);
        assert_eq!(
            ring.push(2, &[0.0]),
            Err(RingBufferError::InvalidChannel(2))
        );
    }

    #[test]
    fn test_reset() {
        let mut ring = RingBuffer::new(2, 4);
        ring.push(0, &[1.0, 2.0, 3.0]).unwrap();
        ring.push(1, &[1.0, 2.0, 3.0]).unwrap();
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.write_index(), 0);
    }
}
