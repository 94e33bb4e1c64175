//! Information units and the containers that hold them
//!
//! Every parameter of the sensor is described by an [`InfoUnit`]: a named bit span inside a
//! [`Container`] together with the rules to translate between the raw bits and a
//! human-meaningful [`Value`]. Containers are either device registers (located by address) or
//! FIFO frames (located by their header tag).
//!
//! Nothing in this module talks to the bus. The engine in [`crate::device`] reads raw container
//! content, hands it to [`Container::disassemble`], and builds writes with
//! [`Container::assemble`].
//!
//! # Example
//!
//! ```ignore
//! # use bmp3xx::{registers::BMP3XX, model::Value};
//! let (osr, unit) = BMP3XX.find("osr_p").unwrap();
//! assert!(unit.pack::<()>(Value::Int(3)).is_err());
//! let bits = osr.assemble::<()>(osr.default_bits(), &[("osr_p", Value::Int(16))])?;
//! ```

use alloc::collections::BTreeMap;
use alloc::string::ToString;
use core::fmt;

use crate::Error;
use crate::compensation::Compensation;
use crate::fifo::FrameType;

/// Name → value mapping produced by a single read or write call
pub type Snapshot = BTreeMap<&'static str, Value>;

/// Kind of an information unit (or of the container holding it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    /// Read-only measurement or status
    Data,
    /// Read/write configuration parameter
    Config,
    /// Write-only command
    Command,
    /// Payload of a FIFO frame
    Frame,
}

impl Kind {
    /// Whether units of this kind can be packed into a register write
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Config | Self::Command)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Data => "data",
            Self::Config => "config",
            Self::Command => "command",
            Self::Frame => "frame",
        };
        f.write_str(name)
    }
}

/// Human-meaningful value of an information unit
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    /// Integer parameter or raw field
    Int(i64),
    /// Physical quantity (Pa, °C, m)
    Float(f64),
    /// Symbolic setting such as `"normal"` or `"fifo_flush"`
    Symbol(&'static str),
    /// Compensated pressure (Pa) and temperature (°C) taken from one conversion
    Measurement {
        /// Pressure in Pa
        pressure: f64,
        /// Temperature in °C
        temperature: f64,
    },
    /// Raw 24-bit ADC readings
    Adc {
        /// Pressure ADC value
        pressure: u32,
        /// Temperature ADC value
        temperature: u32,
    },
    /// Unit without payload (special FIFO frames)
    Empty,
}

impl Value {
    /// Integer content, if this is an `Int`
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Floating point content, integers are widened
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Symbol content, if this is a `Symbol`
    #[must_use]
    pub const fn as_symbol(&self) -> Option<&'static str> {
        match self {
            Self::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Interpret the value as a flag (`Int(0)` is false, any other integer is true)
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Int(value) => Some(*value != 0),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Self::Symbol(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Symbol(symbol) => write!(f, "'{symbol}'"),
            Self::Measurement {
                pressure,
                temperature,
            } => write!(f, "({pressure} Pa, {temperature} °C)"),
            Self::Adc {
                pressure,
                temperature,
            } => write!(f, "(adc {pressure}, adc {temperature})"),
            Self::Empty => f.write_str("-"),
        }
    }
}

/// Set of values an information unit accepts
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    /// No restriction (read-only units)
    Any,
    /// Enumerated values
    Set(&'static [Value]),
    /// Inclusive integer range
    Range {
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
}

impl Domain {
    /// Check if `value` belongs to the domain
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Set(values) => values.contains(value),
            Self::Range { min, max } => value
                .as_int()
                .is_some_and(|value| (*min..=*max).contains(&value)),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any value"),
            Self::Range { min, max } => write!(f, "{min}..={max}"),
            Self::Set(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Physical quantity produced by a compensated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Measure {
    /// Pressure in Pa
    Pressure,
    /// Temperature in °C
    Temperature,
    /// Pressure and temperature as a [`Value::Measurement`]
    Both,
    /// Altitude in m, relative to the engine's sea-level reference
    Altitude,
    /// Uncompensated readings as a [`Value::Adc`]
    Adc,
}

/// Position of the 24-bit ADC readings inside a compensated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcLayout {
    /// Pressure in bits 0..24, temperature in bits 24..48 (data registers)
    PressureFirst,
    /// Temperature in bits 0..24, pressure in bits 24..48 (FIFO frames)
    TemperatureFirst,
    /// Pressure only, in bits 0..24
    PressureOnly,
    /// Temperature only, in bits 0..24
    TemperatureOnly,
}

impl AdcLayout {
    const fn split(self, bits: u64) -> (Option<u32>, Option<u32>) {
        #[allow(clippy::cast_possible_truncation)]
        let low = (bits & 0x00FF_FFFF) as u32;
        #[allow(clippy::cast_possible_truncation)]
        let high = ((bits >> 24) & 0x00FF_FFFF) as u32;
        match self {
            Self::PressureFirst => (Some(low), Some(high)),
            Self::TemperatureFirst => (Some(high), Some(low)),
            Self::PressureOnly => (Some(low), None),
            Self::TemperatureOnly => (None, Some(low)),
        }
    }
}

/// Translation between raw bits and [`Value`]s
#[derive(Debug, Clone, Copy)]
pub enum Codec {
    /// Bits are the integer value
    Raw,
    /// Value is `scale * 2^bits`
    Log2 {
        /// Multiplier applied to the power of two
        scale: u32,
    },
    /// Like `Log2 { scale: 1 }`, except that bits `0` mean value `0`
    Log2OrZero,
    /// Symbol table; several bit patterns may map to the same symbol, packing uses the first
    Symbols(&'static [(&'static str, u64)]),
    /// Compensated physical value computed from ADC readings
    Compensated {
        /// Quantity produced
        measure: Measure,
        /// Where the ADC readings sit
        layout: AdcLayout,
    },
    /// No payload, always unpacks to [`Value::Empty`]
    Empty,
    /// User supplied conversion
    Custom {
        /// Value → bits, `None` when the value cannot be represented
        pack: fn(Value) -> Option<u64>,
        /// Bits → value, must accept every bit pattern
        unpack: fn(u64) -> Value,
    },
}

impl Codec {
    fn encode(&self, value: Value) -> Option<u64> {
        match *self {
            Self::Raw => value.as_int().and_then(|value| u64::try_from(value).ok()),
            Self::Log2 { scale } => {
                let value = u64::try_from(value.as_int()?).ok()?;
                let scale = u64::from(scale);
                if scale == 0 || value % scale != 0 {
                    return None;
                }
                let ratio = value / scale;
                ratio
                    .is_power_of_two()
                    .then(|| u64::from(ratio.trailing_zeros()))
            }
            Self::Log2OrZero => match value.as_int()? {
                0 => Some(0),
                value => {
                    let value = u64::try_from(value).ok()?;
                    value
                        .is_power_of_two()
                        .then(|| u64::from(value.trailing_zeros()))
                }
            },
            Self::Symbols(table) => {
                let symbol = value.as_symbol()?;
                table
                    .iter()
                    .find(|(name, _)| *name == symbol)
                    .map(|&(_, bits)| bits)
            }
            Self::Compensated { .. } | Self::Empty => None,
            Self::Custom { pack, .. } => pack(value),
        }
    }

    fn decode(&self, bits: u64, compensation: &Compensation) -> Value {
        match *self {
            Self::Raw => Value::Int(saturate(bits)),
            Self::Log2 { scale } => Value::Int(saturate(power_of_two(bits).saturating_mul(u64::from(scale)))),
            Self::Log2OrZero => match bits {
                0 => Value::Int(0),
                bits => Value::Int(saturate(power_of_two(bits))),
            },
            Self::Symbols(table) => table
                .iter()
                .find(|&&(_, pattern)| pattern == bits)
                .map_or(Value::Int(saturate(bits)), |&(symbol, _)| Value::Symbol(symbol)),
            Self::Compensated { measure, layout } => {
                let (adc_pressure, adc_temperature) = layout.split(bits);
                if measure == Measure::Adc {
                    return Value::Adc {
                        pressure: adc_pressure.unwrap_or(0),
                        temperature: adc_temperature.unwrap_or(0),
                    };
                }
                let (pressure, temperature) =
                    compensation.compensate_partial(adc_pressure, adc_temperature);
                match measure {
                    Measure::Pressure => Value::Float(pressure),
                    Measure::Temperature => Value::Float(temperature),
                    Measure::Altitude => Value::Float(compensation.altitude(pressure)),
                    Measure::Both | Measure::Adc => Value::Measurement {
                        pressure,
                        temperature,
                    },
                }
            }
            Self::Empty => Value::Empty,
            Self::Custom { unpack, .. } => unpack(bits),
        }
    }
}

fn saturate(bits: u64) -> i64 {
    i64::try_from(bits).unwrap_or(i64::MAX)
}

fn power_of_two(exponent: u64) -> u64 {
    u32::try_from(exponent)
        .ok()
        .and_then(|exponent| 1u64.checked_shl(exponent))
        .unwrap_or(u64::MAX)
}

/// Named bit span inside a container
#[derive(Debug, Clone, Copy)]
pub struct InfoUnit {
    /// Unique name, ideally the datasheet name
    pub name: &'static str,
    /// Kind of unit
    pub kind: Kind,
    /// Position of the least significant bit inside the container (frames: inside the payload)
    pub offset: u8,
    /// Width in bits (1..=64)
    pub width: u8,
    /// Accepted values for writes
    pub domain: Domain,
    /// Conversion between bits and values
    pub codec: Codec,
    /// Raw bits programmed when a write does not start from the device state
    pub default_bits: u64,
    /// Explanation shown in domain errors
    pub help: &'static str,
}

impl InfoUnit {
    /// Read-only data unit
    #[must_use]
    pub const fn data(
        name: &'static str,
        offset: u8,
        width: u8,
        codec: Codec,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind: Kind::Data,
            offset,
            width,
            domain: Domain::Any,
            codec,
            default_bits: 0,
            help,
        }
    }

    /// Read/write configuration unit
    #[must_use]
    pub const fn config(
        name: &'static str,
        offset: u8,
        width: u8,
        domain: Domain,
        codec: Codec,
        default_bits: u64,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind: Kind::Config,
            offset,
            width,
            domain,
            codec,
            default_bits,
            help,
        }
    }

    /// Write-only command unit, `actions` maps each action symbol to its opcode
    #[must_use]
    pub const fn command(
        name: &'static str,
        offset: u8,
        width: u8,
        domain: Domain,
        actions: &'static [(&'static str, u64)],
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind: Kind::Command,
            offset,
            width,
            domain,
            codec: Codec::Symbols(actions),
            default_bits: 0,
            help,
        }
    }

    /// FIFO frame payload unit
    #[must_use]
    pub const fn frame(
        name: &'static str,
        offset: u8,
        width: u8,
        codec: Codec,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind: Kind::Frame,
            offset,
            width,
            domain: Domain::Any,
            codec,
            default_bits: 0,
            help,
        }
    }

    /// Mask covering `width` bits, not shifted
    #[must_use]
    pub const fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Mask covering the unit's bits at their position in the container
    #[must_use]
    pub const fn span(&self) -> u64 {
        match self.mask().checked_shl(self.offset as u32) {
            Some(span) => span,
            None => 0,
        }
    }

    /// Last bit position (exclusive) occupied by the unit
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset as u32 + self.width as u32
    }

    /// Extract the unit's bits from raw container content
    #[must_use]
    pub const fn extract(&self, raw: u64) -> u64 {
        match raw.checked_shr(self.offset as u32) {
            Some(bits) => bits & self.mask(),
            None => 0,
        }
    }

    /// Convert a value into the unit's raw bits
    ///
    /// # Errors
    ///
    /// - `Domain` if `value` is outside the unit's domain or cannot be represented in its width
    /// - `UnsupportedOperation` for read-only (data and frame) units
    pub fn pack<E>(&self, value: Value) -> Result<u64, Error<E>> {
        if !self.kind.is_writable() {
            return Err(Error::UnsupportedOperation {
                name: self.name,
                operation: "pack",
            });
        }
        if !self.domain.contains(&value) {
            return Err(self.domain_error(value));
        }
        match self.codec.encode(value) {
            Some(bits) if bits & !self.mask() == 0 => Ok(bits),
            _ => Err(self.domain_error(value)),
        }
    }

    /// Convert raw bits (already extracted, see [`Self::extract`]) into a value
    #[must_use]
    pub fn unpack(&self, bits: u64, compensation: &Compensation) -> Value {
        self.codec.decode(bits & self.mask(), compensation)
    }

    const fn domain_error<E>(&self, value: Value) -> Error<E> {
        Error::Domain {
            name: self.name,
            value,
            allowed: self.domain,
            help: self.help,
        }
    }
}

/// Byte order of multi-byte container content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    /// Least significant byte at the lowest address
    Little,
    /// Most significant byte at the lowest address
    Big,
}

impl ByteOrder {
    /// Assemble up to 8 bytes into an integer
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> u64 {
        let fold = |acc: u64, &byte: &u8| (acc << 8) | u64::from(byte);
        match self {
            Self::Little => bytes.iter().rev().fold(0, fold),
            Self::Big => bytes.iter().fold(0, fold),
        }
    }

    /// Split an integer into `out.len()` bytes (at most 8)
    pub fn encode(self, bits: u64, out: &mut [u8]) {
        let len = out.len();
        for (i, byte) in out.iter_mut().enumerate() {
            let shift = match self {
                Self::Little => i,
                Self::Big => len - 1 - i,
            };
            #[allow(clippy::cast_possible_truncation)]
            {
                *byte = bits.checked_shr(8 * shift as u32).unwrap_or(0) as u8;
            }
        }
    }
}

/// Where a container lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Locator {
    /// Device register (or burst of consecutive registers) at this address
    Register(u8),
    /// FIFO frame introduced by this header byte
    Frame {
        /// Header byte
        tag: u8,
        /// Classification of the frame
        frame_type: FrameType,
    },
}

/// Fixed-width holder of information units: a register or a FIFO frame
#[derive(Debug, Clone, Copy)]
pub struct Container {
    /// Unique name
    pub name: &'static str,
    /// Kind of the units it holds
    pub kind: Kind,
    /// Register address or frame header
    pub locator: Locator,
    /// Total size in bytes (frames: header included)
    pub size_bytes: u8,
    /// Units held by the container
    pub units: &'static [InfoUnit],
    /// Short description
    pub help: &'static str,
}

impl Container {
    /// Register container
    #[must_use]
    pub const fn register(
        name: &'static str,
        kind: Kind,
        address: u8,
        size_bytes: u8,
        units: &'static [InfoUnit],
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            locator: Locator::Register(address),
            size_bytes,
            units,
            help,
        }
    }

    /// FIFO frame container, `size_bytes` includes the header byte
    #[must_use]
    pub const fn frame(
        name: &'static str,
        tag: u8,
        frame_type: FrameType,
        size_bytes: u8,
        units: &'static [InfoUnit],
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind: Kind::Frame,
            locator: Locator::Frame { tag, frame_type },
            size_bytes,
            units,
            help,
        }
    }

    /// Register address, `None` for frames
    #[must_use]
    pub const fn address(&self) -> Option<u8> {
        match self.locator {
            Locator::Register(address) => Some(address),
            Locator::Frame { .. } => None,
        }
    }

    /// Number of content bytes (frames: without the header)
    #[must_use]
    pub const fn payload_bytes(&self) -> u8 {
        match self.locator {
            Locator::Register(_) => self.size_bytes,
            Locator::Frame { .. } => self.size_bytes.saturating_sub(1),
        }
    }

    /// Number of content bits
    #[must_use]
    pub const fn size_bits(&self) -> u32 {
        self.payload_bytes() as u32 * 8
    }

    /// Find an owned unit by name
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&'static InfoUnit> {
        self.units.iter().find(|unit| unit.name == name)
    }

    /// Raw content obtained by placing every writable unit's default bits
    #[must_use]
    pub fn default_bits(&self) -> u64 {
        self.units
            .iter()
            .filter(|unit| unit.kind.is_writable())
            .fold(0, |bits, unit| {
                bits | (unit.default_bits & unit.mask())
                    .checked_shl(u32::from(unit.offset))
                    .unwrap_or(0)
            })
    }

    /// Overwrite the spans of the named units in `base`, leaving every other bit untouched
    ///
    /// All assignments are validated before anything is returned, so a failure never yields
    /// partially merged content.
    ///
    /// # Errors
    ///
    /// - `UnknownInfoUnit` if a name does not belong to this container
    /// - `Domain` / `UnsupportedOperation` from [`InfoUnit::pack`]
    pub fn assemble<E>(&self, base: u64, assignments: &[(&str, Value)]) -> Result<u64, Error<E>> {
        let mut raw = base;
        for &(name, value) in assignments {
            let Some(unit) = self.unit(name) else {
                return Err(Error::UnknownInfoUnit {
                    name: name.to_string(),
                    valid: self.units.iter().map(|unit| unit.name).collect(),
                });
            };
            let bits = unit.pack::<E>(value)?;
            raw = (raw & !unit.span()) | (bits << unit.offset);
        }
        Ok(raw)
    }

    /// Unpack every owned unit from raw content
    #[must_use]
    pub fn disassemble(&self, raw: u64, compensation: &Compensation) -> Snapshot {
        self.units
            .iter()
            .map(|unit| (unit.name, unit.unpack(unit.extract(raw), compensation)))
            .collect()
    }
}
