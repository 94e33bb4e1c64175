//! FIFO buffer decoding and streaming
//!
//! The BMP3xx has a 512-byte FIFO that stores a stream of variable-length frames. Each frame
//! starts with a header byte (its tag) followed by a payload whose size depends on the frame
//! type:
//!
//! | Tag    | Frame                      | Size |
//! |--------|----------------------------|------|
//! | `0x94` | pressure + temperature     | 7    |
//! | `0x90` | temperature                | 4    |
//! | `0x84` | pressure                   | 4    |
//! | `0xA0` | sensor time                | 4    |
//! | `0x48` | configuration change       | 2    |
//! | `0x44` | configuration error        | 2    |
//! | `0x80` | empty (FIFO drained)       | 2    |
//!
//! Reading the FIFO can split a frame in two. [`parser::FifoDecoder`] keeps the incomplete tail
//! in a host-side mirror so it is completed by the next read, and [`queue::AutoQueue`] builds a
//! self-refilling sample queue on top of it.
//!
//! # Example
//!
//! ```ignore
//! # use bmp3xx::{Bmp3xx, fifo::FrameType};
//! # let mut sensor: Bmp3xx<_> = todo!();
//! sensor.config_write(&[("fifo_mode", 1.into()), ("mode", "normal".into())], true)?;
//!
//! for frame in sensor.fifo_read(None)? {
//!     if frame.frame_type == FrameType::PressureTemperature {
//!         // frame.payload is a Value::Measurement
//!     }
//! }
//! # Ok::<(), bmp3xx::Error<()>>(())
//! ```

pub mod parser;
pub mod queue;

use crate::model::Value;

/// FIFO size in bytes
pub const FIFO_SIZE: usize = 512;

/// Extra bytes requested on top of the reported FIFO length
///
/// The sensor may append a sensor-time frame after the last data frame when the FIFO is
/// drained, the default read size leaves room for it.
pub const FIFO_READ_OVERHEAD: usize = 4;

/// Capacity of the host-side mirror: one full read plus room for a retained partial frame
pub const FIFO_MIRROR_SIZE: usize = FIFO_SIZE + FIFO_READ_OVERHEAD + 8;

/// Register the FIFO is drained through
pub const FIFO_DATA_ADDRESS: u8 = 0x14;

/// Classification of a FIFO frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    /// Pressure only
    Pressure,
    /// Temperature only
    Temperature,
    /// Pressure and temperature
    PressureTemperature,
    /// Sensor time, appended when the FIFO runs empty
    SensorTime,
    /// Configuration was changed while the FIFO was running
    ConfigChange,
    /// FIFO drained, the sensor returns this while no data is available
    Empty,
    /// Configuration error frame, also reported for unknown headers
    Error,
}

impl FrameType {
    /// Whether the frame carries a measurement
    #[must_use]
    pub const fn is_measurement(self) -> bool {
        matches!(
            self,
            Self::Pressure | Self::Temperature | Self::PressureTemperature
        )
    }
}

/// One decoded FIFO frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedFrame {
    /// Classification of the frame
    pub frame_type: FrameType,
    /// Header byte as read from the FIFO
    pub tag: u8,
    /// Unpacked payload ([`Value::Empty`] for unknown headers and special frames)
    pub payload: Value,
    /// Number of bytes consumed from the stream, header included
    pub size: usize,
}

/// What happens to an incomplete frame left at the end of a decoding pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TailPolicy {
    /// Keep it until the rest of the frame arrives
    #[default]
    Retain,
    /// Drop it, the frame is lost
    Discard,
    /// Keep it for at most this many further passes that fail to complete it
    RetainFor(u8),
}
