//! Bus interface implementations for the BMP3xx
//!
//! This module provides implementations of the `device-driver` traits for
//! I2C and SPI communication with the BMP3xx.
//!
//! Reads are bursts starting at the given register, the address auto-increments. Multi-byte
//! writes use the BMP3xx register/data pair format: every data byte is preceded by its own
//! register address.

use device_driver::RegisterInterface;

use crate::{I2C_ADDRESS_SDO_HIGH, I2C_ADDRESS_SDO_LOW};

/// Largest number of register/data pairs sent in one bus transaction
const MAX_WRITE_PAIRS: usize = 16;

/// I2C interface for the BMP3xx
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    /// Create a new I2C interface with the default address (0x77, SDO pin HIGH)
    ///
    /// This is the address of most breakout boards, where SDO is pulled up.
    ///
    /// # Arguments
    /// * `i2c` - The I2C peripheral
    ///
    /// # Example
    /// ```ignore
    /// let interface = I2cInterface::default(i2c);
    /// let mut sensor = Bmp3xx::new(interface)?;
    /// ```
    pub const fn default(i2c: I2C) -> Self {
        Self {
            i2c,
            address: I2C_ADDRESS_SDO_HIGH,
        }
    }

    /// Create a new I2C interface with the alternative address (0x76, SDO pin LOW)
    ///
    /// # Arguments
    /// * `i2c` - The I2C peripheral
    pub const fn alternative(i2c: I2C) -> Self {
        Self {
            i2c,
            address: I2C_ADDRESS_SDO_LOW,
        }
    }

    /// Create a new I2C interface with a custom device address
    ///
    /// # Arguments
    /// * `i2c` - The I2C peripheral
    /// * `address` - The I2C device address
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Device address used on the bus
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> RegisterInterface for I2cInterface<I2C>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[address], read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let mut buffer = [0u8; 2 * MAX_WRITE_PAIRS];
        for (chunk_index, chunk) in write_data.chunks(MAX_WRITE_PAIRS).enumerate() {
            let first = chunk_address(address, chunk_index);
            let len = fill_pairs(&mut buffer, first, chunk, 0xFF);
            self.i2c.write(self.address, &buffer[..len])?;
        }
        Ok(())
    }
}

/// SPI interface for the BMP3xx
///
/// # Note on Chip Select
///
/// This interface uses the `SpiDevice` trait from `embedded-hal`, which manages
/// the chip select (CS) pin automatically.
///
/// If using `embedded-hal-bus`, you would typically create an `SpiDevice` like:
/// ```ignore
/// let spi_device = embedded_hal_bus::spi::ExclusiveDevice::new(spi_bus, cs_pin, delay);
/// let interface = SpiInterface::new(spi_device);
/// ```
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    /// Create a new SPI interface with the given SPI device
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Consume the interface and return the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI, E> RegisterInterface for SpiInterface<SPI>
where
    SPI: embedded_hal::spi::SpiDevice<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        // Read bit set, followed by one dummy byte before the data
        let header = [address | 0x80, 0x00];
        let mut operations = [
            embedded_hal::spi::Operation::Write(&header),
            embedded_hal::spi::Operation::Read(read_data),
        ];
        self.spi.transaction(&mut operations)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let mut buffer = [0u8; 2 * MAX_WRITE_PAIRS];
        for (chunk_index, chunk) in write_data.chunks(MAX_WRITE_PAIRS).enumerate() {
            let first = chunk_address(address, chunk_index);
            let len = fill_pairs(&mut buffer, first, chunk, 0x7F);
            self.spi.write(&buffer[..len])?;
        }
        Ok(())
    }
}

/// First register address of write chunk `chunk_index`
fn chunk_address(address: u8, chunk_index: usize) -> u8 {
    let offset = chunk_index.saturating_mul(MAX_WRITE_PAIRS);
    address.wrapping_add(u8::try_from(offset).unwrap_or(u8::MAX))
}

/// Interleave register addresses and data bytes, returns the number of bytes used
fn fill_pairs(buffer: &mut [u8], first: u8, data: &[u8], address_mask: u8) -> usize {
    for (i, (pair, &byte)) in buffer.chunks_exact_mut(2).zip(data).enumerate() {
        pair[0] = first.wrapping_add(u8::try_from(i).unwrap_or(u8::MAX)) & address_mask;
        pair[1] = byte;
    }
    2 * data.len().min(buffer.len() / 2)
}
