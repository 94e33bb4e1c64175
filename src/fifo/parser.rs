//! Resumable FIFO frame decoder
//!
//! The decoder owns a host-side mirror of the bytes drained from the sensor FIFO. A decoding
//! pass ([`FifoDecoder::frames`]) walks the mirror frame by frame, and when the pass ends the
//! consumed bytes are removed. A frame cut by the end of a read stays in the mirror (subject to
//! the [`TailPolicy`]) and is completed by the bytes of the next read, so splitting a byte
//! stream into reads of any size yields the same frames.
//!
//! # Example
//!
//! ```ignore
//! # use bmp3xx::{fifo::{parser::FifoDecoder, TailPolicy}, registers::BMP3XX, compensation::Compensation};
//! let mut decoder = FifoDecoder::new(TailPolicy::Retain);
//! let comp = Compensation::default();
//!
//! decoder.extend_from_slice(&[0x94, 0x00, 0x00]);
//! assert_eq!(decoder.frames(&BMP3XX, &comp).count(), 0);
//!
//! decoder.extend_from_slice(&[0x80, 0x00, 0x00, 0x00, 0x00]);
//! assert_eq!(decoder.frames(&BMP3XX, &comp).count(), 1);
//! ```

use super::{DecodedFrame, FIFO_MIRROR_SIZE, FrameType, TailPolicy};
use crate::catalog::Catalog;
use crate::compensation::Compensation;
use crate::model::Value;

/// Host-side FIFO mirror with resumable frame decoding
#[derive(Debug, Clone)]
pub struct FifoDecoder {
    mirror: heapless::Vec<u8, FIFO_MIRROR_SIZE>,
    policy: TailPolicy,
    /// Number of passes the current tail survived without completing
    tail_age: Option<u8>,
}

impl Default for FifoDecoder {
    fn default() -> Self {
        Self::new(TailPolicy::default())
    }
}

impl FifoDecoder {
    /// Create an empty decoder
    #[must_use]
    pub const fn new(policy: TailPolicy) -> Self {
        Self {
            mirror: heapless::Vec::new(),
            policy,
            tail_age: None,
        }
    }

    /// Current tail policy
    #[must_use]
    pub const fn policy(&self) -> TailPolicy {
        self.policy
    }

    /// Change the tail policy, applied from the next pass on
    pub fn set_policy(&mut self, policy: TailPolicy) {
        self.policy = policy;
    }

    /// Bytes waiting to be decoded
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.mirror
    }

    /// Number of bytes waiting to be decoded
    #[must_use]
    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    /// Check if no bytes are waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// Room left in the mirror
    #[must_use]
    pub fn spare_capacity(&self) -> usize {
        FIFO_MIRROR_SIZE - self.mirror.len()
    }

    /// Drop every buffered byte, including a retained tail
    pub fn clear(&mut self) {
        self.mirror.clear();
        self.tail_age = None;
    }

    /// Append bytes, returns how many fit
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.spare_capacity());
        // Cannot fail, count is bounded by the spare capacity
        let _ = self.mirror.extend_from_slice(&bytes[..count]);
        count
    }

    /// Append `count` bytes produced by `read`, which fills the slice it is given
    ///
    /// `count` is clamped to the spare capacity. If `read` fails the mirror is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the error of `read`.
    pub fn fill<E, F>(&mut self, count: usize, read: F) -> Result<usize, E>
    where
        F: FnOnce(&mut [u8]) -> Result<(), E>,
    {
        let start = self.mirror.len();
        let count = count.min(self.spare_capacity());
        // Cannot fail, the new length is bounded by the capacity
        let _ = self.mirror.resize(start + count, 0);

        match read(&mut self.mirror[start..]) {
            Ok(()) => Ok(count),
            Err(error) => {
                self.mirror.truncate(start);
                Err(error)
            }
        }
    }

    /// Start a decoding pass over the buffered bytes
    ///
    /// The returned iterator yields frames in stream order. Bytes of the frames it yields are
    /// removed from the mirror when it is dropped, so a pass abandoned half way leaves the
    /// remaining frames for the next one.
    pub fn frames<'a>(
        &'a mut self,
        catalog: &'a Catalog,
        compensation: &'a Compensation,
    ) -> Frames<'a> {
        Frames {
            decoder: self,
            catalog,
            compensation,
            position: 0,
            stalled: false,
        }
    }

    fn consume(&mut self, consumed: usize, stalled: bool) {
        let len = self.mirror.len();
        let consumed = consumed.min(len);
        self.mirror.copy_within(consumed..len, 0);
        self.mirror.truncate(len - consumed);

        if consumed > 0 {
            self.tail_age = None;
        }
        if !stalled {
            return;
        }

        let age = self.tail_age.map_or(0, |age| age.saturating_add(1));
        self.tail_age = Some(age);

        let drop_tail = match self.policy {
            TailPolicy::Retain => false,
            TailPolicy::Discard => true,
            TailPolicy::RetainFor(passes) => age >= passes,
        };
        if drop_tail {
            #[cfg(feature = "defmt")]
            defmt::debug!("Dropping incomplete FIFO frame ({} bytes)", self.mirror.len());
            self.clear();
        }
    }
}

/// Decoding pass over the FIFO mirror, see [`FifoDecoder::frames`]
pub struct Frames<'a> {
    decoder: &'a mut FifoDecoder,
    catalog: &'a Catalog,
    compensation: &'a Compensation,
    position: usize,
    stalled: bool,
}

impl Frames<'_> {
    /// Bytes not yet decoded in this pass
    #[must_use]
    pub fn remaining(&self) -> &[u8] {
        &self.decoder.mirror[self.position..]
    }
}

impl Iterator for Frames<'_> {
    type Item = DecodedFrame;

    fn next(&mut self) -> Option<DecodedFrame> {
        if self.stalled {
            return None;
        }
        let buffered = &self.decoder.mirror[self.position..];
        let &tag = buffered.first()?;

        let Some((frame_type, container)) = self.catalog.frame(tag) else {
            #[cfg(feature = "defmt")]
            defmt::trace!("Unknown FIFO header {=u8:#x}", tag);
            self.position += 1;
            return Some(DecodedFrame {
                frame_type: FrameType::Error,
                tag,
                payload: Value::Empty,
                size: 1,
            });
        };

        let size = usize::from(container.size_bytes);
        let Some(bytes) = buffered.get(..size) else {
            self.stalled = true;
            return None;
        };

        let raw = self.catalog.byte_order.decode(&bytes[1..]);
        // A validated catalog has at most one unit per frame
        let payload = container.units.first().map_or(Value::Empty, |unit| {
            unit.unpack(unit.extract(raw), self.compensation)
        });
        self.position += size;

        Some(DecodedFrame {
            frame_type,
            tag,
            payload,
            size,
        })
    }
}

impl core::iter::FusedIterator for Frames<'_> {}

impl Drop for Frames<'_> {
    fn drop(&mut self) {
        self.decoder.consume(self.position, self.stalled);
    }
}
