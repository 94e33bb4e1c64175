#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod catalog;
pub mod compensation;
pub mod device;
pub mod fifo;
pub mod interface;
pub mod model;
pub mod registers;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

// Re-export main types
pub use catalog::{Catalog, CatalogError, Preset};
pub use compensation::{Calibration, Compensation, conversion_time_ms};
pub use device::{AltimeterReference, Bmp3xx, Sample};
pub use fifo::parser::{FifoDecoder, Frames};
pub use fifo::queue::{AutoQueue, Clock, QueueConfig, QueueReport};
pub use fifo::{DecodedFrame, FIFO_SIZE, FrameType, TailPolicy};
pub use interface::{I2cInterface, SpiInterface};
pub use model::{Container, Domain, InfoUnit, Kind, Snapshot, Value};
pub use registers::BMP3XX;

#[cfg(feature = "std")]
pub use fifo::queue::StdClock;

/// BMP3xx I2C address when the SDO pin is high (default: 0x77)
///
/// Use [`I2cInterface::default()`] for this configuration.
pub const I2C_ADDRESS_SDO_HIGH: u8 = 0x77;

/// BMP3xx I2C address when the SDO pin is low (alternative: 0x76)
///
/// Use [`I2cInterface::alternative()`] for this configuration.
pub const I2C_ADDRESS_SDO_LOW: u8 = 0x76;

/// Chip id of the BMP388
pub const CHIP_ID_BMP388: u8 = 0x50;

/// Chip id of the BMP390
pub const CHIP_ID_BMP390: u8 = 0x60;

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Value not accepted by an info unit
    Domain {
        /// Unit name
        name: &'static str,
        /// Rejected value
        value: Value,
        /// Accepted values
        allowed: Domain,
        /// Unit description
        help: &'static str,
    },
    /// Name not found in the catalog
    UnknownInfoUnit {
        /// Requested name
        name: String,
        /// Every valid unit name
        valid: Vec<&'static str>,
    },
    /// Unit used with an operation meant for another kind
    WrongInfoUnitKind {
        /// Unit name
        name: &'static str,
        /// Kind the operation works on
        expected: Kind,
        /// Kind of the unit
        found: Kind,
    },
    /// Operation not available for this unit (reading a command, writing a frame)
    UnsupportedOperation {
        /// Unit or container name
        name: &'static str,
        /// Attempted operation
        operation: &'static str,
    },
    /// Data was not ready in time
    Timeout,
    /// Invalid chip id (contains the actual value read)
    InvalidDevice(u8),
    /// Preset not found in the catalog
    UnknownPreset {
        /// Requested name
        name: String,
        /// Every valid preset name
        valid: Vec<&'static str>,
    },
    /// The device flagged the written configuration as invalid
    ConfigRejected,
    /// The catalog breaks a structural rule
    InvalidCatalog(CatalogError),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(error) => write!(f, "bus error: {error:?}"),
            Self::Domain {
                name,
                value,
                allowed,
                help,
            } => write!(
                f,
                "{value} is not a valid value for '{name}', allowed: {allowed} ({help})"
            ),
            Self::UnknownInfoUnit { name, valid } => {
                write!(f, "unknown info unit '{name}', valid names: {}", valid.join(", "))
            }
            Self::WrongInfoUnitKind {
                name,
                expected,
                found,
            } => write!(f, "'{name}' is a {found} unit, expected a {expected} unit"),
            Self::UnsupportedOperation { name, operation } => {
                write!(f, "'{name}' does not support {operation}")
            }
            Self::Timeout => f.write_str("timed out waiting for data ready"),
            Self::InvalidDevice(id) => write!(f, "unexpected chip id {id:#04x}"),
            Self::UnknownPreset { name, valid } => {
                write!(f, "unknown preset '{name}', valid presets: {}", valid.join(", "))
            }
            Self::ConfigRejected => f.write_str("configuration rejected by the device"),
            Self::InvalidCatalog(error) => write!(f, "invalid catalog: {error}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
