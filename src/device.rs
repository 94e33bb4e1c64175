//! High-level driver API for the BMP3xx
//!
//! [`Bmp3xx`] is the sensor engine: it resolves info unit names through the [`Catalog`], groups
//! them by container, and turns each container into exactly one bus transaction. On top of the
//! three generic operations ([`Bmp3xx::data_read`], [`Bmp3xx::config_read`] and
//! [`Bmp3xx::config_write`]) it offers presets, compensated readings, altimeter calibration and
//! FIFO access.
//!
//! # Example
//!
//! ```ignore
//! use bmp3xx::{Bmp3xx, I2cInterface};
//!
//! let mut sensor = Bmp3xx::new(I2cInterface::default(i2c))?;
//! sensor.apply_preset("drone", &mut delay)?;
//!
//! let config = sensor.config_read(&["osr_p", "odr_sel"])?;
//! let data = sensor.data_read(&["press", "temp"])?;
//! ```

use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use core::ptr;

use device_driver::RegisterInterface;
use embedded_hal::delay::DelayNs;

use crate::catalog::Catalog;
use crate::compensation::{
    CALIBRATION_ADDRESS, CALIBRATION_SIZE, Calibration, Compensation, conversion_time_ms,
};
use crate::fifo::parser::{FifoDecoder, Frames};
use crate::fifo::{FIFO_DATA_ADDRESS, FIFO_READ_OVERHEAD, TailPolicy};
use crate::model::{Container, Domain, InfoUnit, Kind, Snapshot, Value};
use crate::registers::BMP3XX;
use crate::{CHIP_ID_BMP388, CHIP_ID_BMP390, Error};

/// Interval between two data-ready polls in [`Bmp3xx::forced_read`]
pub const DATA_READY_POLL_MS: u32 = 5;

/// Number of data-ready polls before [`Bmp3xx::forced_read`] gives up (2 s)
pub const DATA_READY_MAX_POLLS: u32 = 400;

/// Start-up time after a soft reset
const SOFTRESET_DELAY_MS: u32 = 5;

/// Configuration error flag checked after every configuration write
const CONF_ERR: &str = "conf_err";

/// One measurement, fields are `None` when the matching sensor is disabled
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Pressure in Pa
    pub pressure: Option<f64>,
    /// Temperature in °C
    pub temperature: Option<f64>,
    /// Altitude in m, relative to the sea-level reference
    pub altitude: Option<f64>,
}

/// Reference used to calibrate the altimeter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AltimeterReference {
    /// Known altitude of the sensor, in m
    LocalAltitude(f64),
    /// Known sea-level pressure, in Pa
    SeaLevelPressure(f64),
}

/// Main driver for the BMP3xx
pub struct Bmp3xx<I> {
    interface: I,
    catalog: &'static Catalog,
    compensation: Compensation,
    fifo: FifoDecoder,
}

impl<I> Bmp3xx<I>
where
    I: RegisterInterface<AddressType = u8>,
{
    /// Create a new BMP3xx driver instance with the built-in register catalog
    ///
    /// Verifies the chip id and reads the calibration coefficients. The device configuration
    /// is not touched, call [`Self::init`] or [`Self::apply_preset`] to configure it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The chip id is neither BMP388 nor BMP390
    pub fn new(interface: I) -> Result<Self, Error<I::Error>> {
        Self::with_catalog(interface, &BMP3XX)
    }

    /// Create a driver instance over a custom catalog
    ///
    /// The catalog must describe a BMP3xx compatible register map (`chip_id` unit, calibration
    /// NVM at 0x31).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The catalog is malformed (`InvalidCatalog`)
    /// - Communication with the device fails
    /// - The chip id is neither BMP388 nor BMP390
    pub fn with_catalog(interface: I, catalog: &'static Catalog) -> Result<Self, Error<I::Error>> {
        if let Err(error) = catalog.validate() {
            return Err(Error::InvalidCatalog(error));
        }

        let mut sensor = Self {
            interface,
            catalog,
            compensation: Compensation::default(),
            fifo: FifoDecoder::default(),
        };

        let chip_id = sensor.chip_id()?;
        if chip_id != CHIP_ID_BMP388 && chip_id != CHIP_ID_BMP390 {
            return Err(Error::InvalidDevice(chip_id));
        }

        let mut nvm = [0u8; CALIBRATION_SIZE];
        sensor
            .interface
            .read_register(CALIBRATION_ADDRESS, 8 * CALIBRATION_SIZE as u32, &mut nvm)?;
        sensor.compensation = Compensation::new(Calibration::from_nvm(&nvm));

        #[cfg(feature = "defmt")]
        defmt::debug!("{} found, chip id {=u8:#x}", catalog.name, chip_id);

        Ok(sensor)
    }

    /// Read the chip id register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn chip_id(&mut self) -> Result<u8, Error<I::Error>> {
        let data = self.data_read(&["chip_id"])?;
        let id = data.get("chip_id").and_then(Value::as_int).unwrap_or(0);
        Ok(u8::try_from(id).unwrap_or(0))
    }

    /// Consume the driver and return the bus interface
    pub fn release(self) -> I {
        self.interface
    }

    /// Catalog the driver works with
    pub const fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    /// Current compensation state (calibration and sea-level reference)
    pub const fn compensation(&self) -> &Compensation {
        &self.compensation
    }

    /// Read data units
    ///
    /// Issues exactly one bus read per distinct container, in order of first appearance, and
    /// returns only the requested units. All names are checked before any bus traffic; an
    /// empty request does nothing.
    ///
    /// # Arguments
    /// * `names` - Data unit names, e.g. `["press", "drdy_temp"]`
    ///
    /// # Errors
    ///
    /// - `UnknownInfoUnit` if a name is not in the catalog
    /// - `UnsupportedOperation` for command units
    /// - `WrongInfoUnitKind` for config or frame units
    /// - `Bus` if communication with the device fails
    pub fn data_read(&mut self, names: &[&str]) -> Result<Snapshot, Error<I::Error>> {
        let containers = self.resolve(names, Kind::Data)?;
        self.read_units(&containers, names)
    }

    /// Read configuration units
    ///
    /// Same discipline as [`Self::data_read`]. With an empty `names`, every config container
    /// is read and returned in full.
    ///
    /// # Errors
    ///
    /// - `UnknownInfoUnit` if a name is not in the catalog
    /// - `UnsupportedOperation` for command units
    /// - `WrongInfoUnitKind` for data or frame units
    /// - `Bus` if communication with the device fails
    pub fn config_read(&mut self, names: &[&str]) -> Result<Snapshot, Error<I::Error>> {
        if names.is_empty() {
            let catalog = self.catalog;
            let mut snapshot = Snapshot::new();
            for container in catalog.containers_of(Kind::Config) {
                let raw = self.read_container(container)?;
                snapshot.extend(container.disassemble(raw, &self.compensation));
            }
            return Ok(snapshot);
        }

        let containers = self.resolve(names, Kind::Config)?;
        self.read_units(&containers, names)
    }

    /// Write configuration units
    ///
    /// Assignments are grouped by container. For each container, in order of first
    /// appearance, every assignment is validated, then the base content is taken from the
    /// device (`update = true`) or from the unit defaults (`update = false`), the assigned spans
    /// are overwritten and the result is written back. Units of the container that are not
    /// assigned keep their base value.
    ///
    /// A failure stops at the failing container; containers written before it stay written.
    /// Once every container is written the device's configuration error flag is read, which
    /// also clears it.
    ///
    /// # Arguments
    /// * `assignments` - `(unit name, value)` pairs
    /// * `update` - Start from the current device state instead of the defaults
    ///
    /// # Returns
    /// The values now programmed in every container that was written
    ///
    /// # Errors
    ///
    /// - `UnknownInfoUnit` if a name is not in the catalog
    /// - `WrongInfoUnitKind` for non-config units
    /// - `Domain` if a value is not allowed
    /// - `ConfigRejected` if the device flags the written configuration as invalid
    /// - `Bus` if communication with the device fails
    pub fn config_write(
        &mut self,
        assignments: &[(&str, Value)],
        update: bool,
    ) -> Result<Snapshot, Error<I::Error>> {
        let mut groups: Vec<(&'static Container, Vec<(&str, Value)>)> = Vec::new();
        for &(name, value) in assignments {
            let (container, unit) = self.lookup(name)?;
            if unit.kind != Kind::Config {
                return Err(Error::WrongInfoUnitKind {
                    name: unit.name,
                    expected: Kind::Config,
                    found: unit.kind,
                });
            }
            match groups.iter_mut().find(|(c, _)| ptr::eq(*c, container)) {
                Some((_, group)) => group.push((name, value)),
                None => groups.push((container, vec![(name, value)])),
            }
        }

        let mut applied = Snapshot::new();
        for (container, group) in &groups {
            container.assemble::<I::Error>(0, group)?;

            let base = if update {
                self.read_container(container)?
            } else {
                container.default_bits()
            };
            let bits = container.assemble::<I::Error>(base, group)?;

            #[cfg(feature = "defmt")]
            defmt::debug!(
                "{}: {=u64:#x} -> {=u64:#x}",
                container.name,
                base,
                bits
            );

            self.write_container(container, bits)?;
            applied.extend(container.disassemble(bits, &self.compensation));
        }

        if !groups.is_empty() && self.catalog.find(CONF_ERR).is_some() && self.config_error()? {
            #[cfg(feature = "defmt")]
            defmt::warn!("Configuration rejected by the device");
            return Err(Error::ConfigRejected);
        }

        Ok(applied)
    }

    /// Execute `action` through the catalog's command unit
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if the catalog has no command unit
    /// - `Domain` if `action` is not a known command
    /// - `Bus` if communication with the device fails
    pub fn send_command(&mut self, action: &'static str) -> Result<(), Error<I::Error>> {
        let Some((container, unit)) = self
            .catalog
            .units()
            .find(|(_, unit)| unit.kind == Kind::Command)
        else {
            return Err(Error::UnsupportedOperation {
                name: action,
                operation: "command",
            });
        };

        let bits = container.assemble::<I::Error>(0, &[(unit.name, Value::Symbol(action))])?;

        #[cfg(feature = "defmt")]
        defmt::debug!("Sending command {}", action);

        self.write_container(container, bits)
    }

    /// Soft reset, every register goes back to its power-on value
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn softreset(&mut self) -> Result<(), Error<I::Error>> {
        self.send_command("softreset")?;
        self.fifo.clear();
        Ok(())
    }

    /// Initialize the device with default settings
    ///
    /// Performs a soft reset and applies the `init` preset (normal mode, 25 Hz, no
    /// oversampling).
    ///
    /// # Arguments
    ///
    /// * `delay` - Delay provider implementing `embedded_hal::delay::DelayNs`
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or the device rejects the
    /// configuration.
    pub fn init<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: DelayNs,
    {
        self.apply_preset("init", delay).map(|_| ())
    }

    /// Soft reset the device and apply a named preset
    ///
    /// # Errors
    ///
    /// - `UnknownPreset` if the catalog has no preset with this name
    /// - `ConfigRejected` if the device flags the resulting configuration as invalid
    /// - `Bus` if communication with the device fails
    pub fn apply_preset<D>(&mut self, name: &str, delay: &mut D) -> Result<Snapshot, Error<I::Error>>
    where
        D: DelayNs,
    {
        let Some(preset) = self.catalog.preset(name) else {
            return Err(Error::UnknownPreset {
                name: name.to_string(),
                valid: self.catalog.preset_names(),
            });
        };

        self.softreset()?;
        delay.delay_ms(SOFTRESET_DELAY_MS);

        self.config_write(preset.assignments, true)
    }

    /// Check the configuration error flag (cleared by the read)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn config_error(&mut self) -> Result<bool, Error<I::Error>> {
        let data = self.data_read(&[CONF_ERR])?;
        Ok(flag(&data, CONF_ERR))
    }

    /// Read pressure and temperature from the data registers, honouring the enable flags
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn sample(&mut self) -> Result<Sample, Error<I::Error>> {
        let config = self.config_read(&["press_en", "temp_en"])?;
        self.sample_with(&config)
    }

    /// Compensated pressure in Pa
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn pressure(&mut self) -> Result<f64, Error<I::Error>> {
        self.read_float("press")
    }

    /// Compensated temperature in °C
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn temperature(&mut self) -> Result<f64, Error<I::Error>> {
        self.read_float("temp")
    }

    /// Altitude in m, relative to the sea-level reference
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn altitude(&mut self) -> Result<f64, Error<I::Error>> {
        self.read_float("altitude")
    }

    /// Wait for a fresh conversion and read it
    ///
    /// A sensor in sleep mode is switched to forced mode first, triggering one conversion.
    /// Data-ready flags are polled every [`DATA_READY_POLL_MS`] ms.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the data is not ready after [`DATA_READY_MAX_POLLS`] polls
    /// - `Bus` if communication with the device fails
    pub fn forced_read<D>(&mut self, delay: &mut D) -> Result<Sample, Error<I::Error>>
    where
        D: DelayNs,
    {
        let config = self.config_read(&["press_en", "temp_en", "mode"])?;
        if config.get("mode") == Some(&Value::Symbol("sleep")) {
            self.config_write(&[("mode", Value::Symbol("forced"))], true)?;
        }

        let wait_pressure = flag(&config, "press_en");
        let wait_temperature = flag(&config, "temp_en");
        let mut ready = false;
        for _ in 0..DATA_READY_MAX_POLLS {
            let status = self.data_read(&["drdy_press", "drdy_temp"])?;
            if (!wait_pressure || flag(&status, "drdy_press"))
                && (!wait_temperature || flag(&status, "drdy_temp"))
            {
                ready = true;
                break;
            }
            delay.delay_ms(DATA_READY_POLL_MS);
        }
        if !ready {
            #[cfg(feature = "defmt")]
            defmt::warn!("Data ready timeout");
            return Err(Error::Timeout);
        }

        self.sample_with(&config)
    }

    /// Set the altitude reference
    ///
    /// With [`AltimeterReference::LocalAltitude`] the current pressure is measured and the
    /// sea-level pressure that matches the given altitude is derived from it.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn calibrate_altimeter(
        &mut self,
        reference: AltimeterReference,
    ) -> Result<(), Error<I::Error>> {
        let sea_level = match reference {
            AltimeterReference::SeaLevelPressure(pressure) => pressure,
            AltimeterReference::LocalAltitude(altitude) => {
                let pressure = self.pressure()?;
                Compensation::sea_level_pressure_at(pressure, altitude)
            }
        };
        self.set_sea_level_pressure(sea_level);
        Ok(())
    }

    /// Set the sea-level pressure (Pa) used for altitude
    pub fn set_sea_level_pressure(&mut self, pressure: f64) {
        self.compensation.sea_level_pressure = pressure;
    }

    /// Conversion time in ms of the current configuration, see [`conversion_time_ms`]
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn conversion_time(&mut self) -> Result<f64, Error<I::Error>> {
        let config = self.config_read(&["press_en", "temp_en", "osr_p", "osr_t"])?;
        let oversampling = |name: &str| {
            config
                .get(name)
                .and_then(Value::as_int)
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(1)
        };
        Ok(conversion_time_ms(
            flag(&config, "press_en"),
            flag(&config, "temp_en"),
            oversampling("osr_p"),
            oversampling("osr_t"),
        ))
    }

    /// Shortest sampling period (ms) of `odr_sel` that leaves room for a conversion
    #[must_use]
    pub fn min_odr_for(&self, conversion_ms: f64) -> Option<i64> {
        let (_, unit) = self.catalog.find("odr_sel")?;
        let Domain::Set(periods) = unit.domain else {
            return None;
        };
        periods
            .iter()
            .filter_map(Value::as_int)
            .filter(|&period| {
                #[allow(clippy::cast_precision_loss)]
                let period = period as f64;
                period > conversion_ms
            })
            .min()
    }

    /// Number of bytes in the device FIFO
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn fifo_length(&mut self) -> Result<usize, Error<I::Error>> {
        let data = self.data_read(&["fifo_length"])?;
        let length = data.get("fifo_length").and_then(Value::as_int).unwrap_or(0);
        Ok(usize::try_from(length).unwrap_or(0))
    }

    /// Flush the device FIFO and the host-side mirror
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn fifo_flush(&mut self) -> Result<(), Error<I::Error>> {
        self.send_command("fifo_flush")?;
        self.fifo.clear();
        Ok(())
    }

    /// Drain bytes from the device FIFO into the host-side mirror
    ///
    /// # Arguments
    /// * `num_bytes` - Bytes to read, `None` reads the FIFO length plus
    ///   [`FIFO_READ_OVERHEAD`]. Clamped to the room left in the mirror.
    ///
    /// # Returns
    /// Number of bytes read
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails, the mirror is unchanged.
    pub fn fifo_sync(&mut self, num_bytes: Option<usize>) -> Result<usize, Error<I::Error>> {
        let requested = match num_bytes {
            Some(count) => count,
            None => self.fifo_length()? + FIFO_READ_OVERHEAD,
        };
        let count = requested.min(self.fifo.spare_capacity());
        if count == 0 {
            return Ok(0);
        }

        let interface = &mut self.interface;
        let size_bits = u32::try_from(count * 8).unwrap_or(u32::MAX);
        let read = self.fifo.fill(count, |buffer| {
            interface.read_register(FIFO_DATA_ADDRESS, size_bits, buffer)
        })?;

        #[cfg(feature = "defmt")]
        defmt::trace!("FIFO sync: {} bytes, {} buffered", read, self.fifo.len());

        Ok(read)
    }

    /// Drain the device FIFO and start a decoding pass
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn fifo_read(&mut self, num_bytes: Option<usize>) -> Result<Frames<'_>, Error<I::Error>> {
        self.fifo_sync(num_bytes)?;
        Ok(self.fifo_frames())
    }

    /// Start a decoding pass over the bytes already in the mirror
    pub fn fifo_frames(&mut self) -> Frames<'_> {
        self.fifo.frames(self.catalog, &self.compensation)
    }

    /// Bytes in the mirror waiting to be decoded
    pub fn fifo_buffered(&self) -> &[u8] {
        self.fifo.buffered()
    }

    /// Policy for frames cut by the end of a FIFO read
    pub const fn fifo_tail_policy(&self) -> TailPolicy {
        self.fifo.policy()
    }

    /// Change the policy for frames cut by the end of a FIFO read
    pub fn set_fifo_tail_policy(&mut self, policy: TailPolicy) {
        self.fifo.set_policy(policy);
    }

    fn sample_with(&mut self, config: &Snapshot) -> Result<Sample, Error<I::Error>> {
        let data = self.data_read(&["press_and_temp"])?;
        let Some(Value::Measurement {
            pressure,
            temperature,
        }) = data.get("press_and_temp").copied()
        else {
            return Ok(Sample::default());
        };

        let pressure = flag(config, "press_en").then_some(pressure);
        Ok(Sample {
            pressure,
            temperature: flag(config, "temp_en").then_some(temperature),
            altitude: pressure.map(|p| self.compensation.altitude(p)),
        })
    }

    fn read_float(&mut self, name: &'static str) -> Result<f64, Error<I::Error>> {
        let data = self.data_read(&[name])?;
        Ok(data.get(name).and_then(Value::as_float).unwrap_or(f64::NAN))
    }

    fn lookup(&self, name: &str) -> Result<(&'static Container, &'static InfoUnit), Error<I::Error>> {
        self.catalog
            .find(name)
            .ok_or_else(|| Error::UnknownInfoUnit {
                name: name.to_string(),
                valid: self.catalog.unit_names(),
            })
    }

    /// Check every name, then return the distinct containers in order of first appearance
    fn resolve(
        &self,
        names: &[&str],
        expected: Kind,
    ) -> Result<Vec<&'static Container>, Error<I::Error>> {
        let mut containers: Vec<&'static Container> = Vec::new();
        for &name in names {
            let (container, unit) = self.lookup(name)?;
            if unit.kind == Kind::Command {
                return Err(Error::UnsupportedOperation {
                    name: unit.name,
                    operation: "read",
                });
            }
            if unit.kind != expected {
                return Err(Error::WrongInfoUnitKind {
                    name: unit.name,
                    expected,
                    found: unit.kind,
                });
            }
            if !containers.iter().any(|c| ptr::eq(*c, container)) {
                containers.push(container);
            }
        }
        Ok(containers)
    }

    fn read_units(
        &mut self,
        containers: &[&'static Container],
        names: &[&str],
    ) -> Result<Snapshot, Error<I::Error>> {
        let mut snapshot = Snapshot::new();
        for container in containers {
            let raw = self.read_container(container)?;
            for unit in container.units.iter().filter(|unit| names.contains(&unit.name)) {
                snapshot.insert(unit.name, unit.unpack(unit.extract(raw), &self.compensation));
            }
        }
        Ok(snapshot)
    }

    fn read_container(&mut self, container: &Container) -> Result<u64, Error<I::Error>> {
        let Some(address) = container.address() else {
            return Err(Error::UnsupportedOperation {
                name: container.name,
                operation: "read",
            });
        };
        let len = usize::from(container.size_bytes);
        let mut buffer = [0u8; 8];
        self.interface
            .read_register(address, container.size_bits(), &mut buffer[..len])?;
        Ok(self.catalog.byte_order.decode(&buffer[..len]))
    }

    fn write_container(&mut self, container: &Container, bits: u64) -> Result<(), Error<I::Error>> {
        let Some(address) = container.address() else {
            return Err(Error::UnsupportedOperation {
                name: container.name,
                operation: "write",
            });
        };
        let len = usize::from(container.size_bytes);
        let mut buffer = [0u8; 8];
        self.catalog.byte_order.encode(bits, &mut buffer[..len]);
        self.interface
            .write_register(address, container.size_bits(), &buffer[..len])?;
        Ok(())
    }
}

fn flag(snapshot: &Snapshot, name: &str) -> bool {
    snapshot
        .get(name)
        .and_then(Value::as_flag)
        .unwrap_or(false)
}
