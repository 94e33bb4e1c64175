//! Calibration data and compensation formulas
//!
//! The BMP3xx stores 21 bytes of factory trimming coefficients in NVM starting at
//! [`CALIBRATION_ADDRESS`]. They are read once when the engine is created and turned into
//! floating point coefficients that convert raw 24-bit ADC readings into °C and Pa.

/// First register of the calibration NVM
pub const CALIBRATION_ADDRESS: u8 = 0x31;

/// Number of calibration bytes
pub const CALIBRATION_SIZE: usize = 21;

/// Standard atmosphere at sea level, in Pa
pub const STANDARD_SEA_LEVEL_PRESSURE: f64 = 101_325.0;

/// ADC temperature (about 25 °C) used for pressure-only conversions
const REFERENCE_ADC_TEMPERATURE: f64 = 8.436_92e6;

const BAROMETRIC_HEIGHT: f64 = 44_307.69;
const BAROMETRIC_EXPONENT: f64 = 0.190_284;

/// Scaled calibration coefficients
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct Calibration {
    pub par_t1: f64,
    pub par_t2: f64,
    pub par_t3: f64,
    pub par_p1: f64,
    pub par_p2: f64,
    pub par_p3: f64,
    pub par_p4: f64,
    pub par_p5: f64,
    pub par_p6: f64,
    pub par_p7: f64,
    pub par_p8: f64,
    pub par_p9: f64,
    pub par_p10: f64,
    pub par_p11: f64,
}

impl Calibration {
    /// Decode and scale the raw NVM content
    #[must_use]
    pub fn from_nvm(nvm: &[u8; CALIBRATION_SIZE]) -> Self {
        let u16_at = |i: usize| f64::from(u16::from_le_bytes([nvm[i], nvm[i + 1]]));
        let i16_at = |i: usize| f64::from(i16::from_le_bytes([nvm[i], nvm[i + 1]]));
        let i8_at = |i: usize| f64::from(i8::from_le_bytes([nvm[i]]));

        Self {
            par_t1: libm::ldexp(u16_at(0), 8),
            par_t2: libm::ldexp(u16_at(2), -30),
            par_t3: libm::ldexp(i8_at(4), -48),
            par_p1: libm::ldexp(i16_at(5) - 16_384.0, -20),
            par_p2: libm::ldexp(i16_at(7) - 16_384.0, -29),
            par_p3: libm::ldexp(i8_at(9), -32),
            par_p4: libm::ldexp(i8_at(10), -37),
            par_p5: libm::ldexp(u16_at(11), 3),
            par_p6: libm::ldexp(u16_at(13), -6),
            par_p7: libm::ldexp(i8_at(15), -8),
            par_p8: libm::ldexp(i8_at(16), -15),
            par_p9: libm::ldexp(i16_at(17), -48),
            par_p10: libm::ldexp(i8_at(19), -48),
            par_p11: libm::ldexp(i8_at(20), -65),
        }
    }
}

/// Everything needed to turn ADC readings into physical values
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Compensation {
    /// Device coefficients
    pub calibration: Calibration,
    /// Reference pressure for altitude, in Pa
    pub sea_level_pressure: f64,
}

impl Default for Compensation {
    fn default() -> Self {
        Self::new(Calibration::default())
    }
}

impl Compensation {
    /// Create with the standard sea-level reference
    #[must_use]
    pub const fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            sea_level_pressure: STANDARD_SEA_LEVEL_PRESSURE,
        }
    }

    /// Compensated temperature in °C
    #[must_use]
    pub fn temperature(&self, adc_temperature: f64) -> f64 {
        let c = &self.calibration;
        let partial = adc_temperature - c.par_t1;
        partial * c.par_t2 + partial * partial * c.par_t3
    }

    /// Compensated pressure in Pa, given the compensated temperature in °C
    #[must_use]
    pub fn pressure(&self, adc_pressure: f64, temperature: f64) -> f64 {
        let c = &self.calibration;
        let t = temperature;
        let t2 = t * t;
        let t3 = t2 * t;

        let offset = c.par_p5 + c.par_p6 * t + c.par_p7 * t2 + c.par_p8 * t3;
        let sensitivity =
            adc_pressure * (c.par_p1 + c.par_p2 * t + c.par_p3 * t2 + c.par_p4 * t3);
        let adc2 = adc_pressure * adc_pressure;
        let quadratic =
            adc2 * (c.par_p9 + c.par_p10 * t) + adc2 * adc_pressure * c.par_p11;

        offset + sensitivity + quadratic
    }

    /// Compensate a pressure/temperature ADC pair, returns `(Pa, °C)`
    #[must_use]
    pub fn compensate(&self, adc_pressure: u32, adc_temperature: u32) -> (f64, f64) {
        self.compensate_partial(Some(adc_pressure), Some(adc_temperature))
    }

    /// Compensate readings where one of the channels may be missing
    ///
    /// A missing temperature is replaced by a reference reading of about 25 °C, a missing
    /// pressure by zero.
    #[must_use]
    pub fn compensate_partial(
        &self,
        adc_pressure: Option<u32>,
        adc_temperature: Option<u32>,
    ) -> (f64, f64) {
        let temperature =
            self.temperature(adc_temperature.map_or(REFERENCE_ADC_TEMPERATURE, f64::from));
        let pressure = self.pressure(adc_pressure.map_or(0.0, f64::from), temperature);
        (pressure, temperature)
    }

    /// Altitude in m for `pressure` (Pa), relative to [`Self::sea_level_pressure`]
    #[must_use]
    pub fn altitude(&self, pressure: f64) -> f64 {
        BAROMETRIC_HEIGHT
            * (1.0 - libm::pow(pressure / self.sea_level_pressure, BAROMETRIC_EXPONENT))
    }

    /// Sea-level pressure that makes `pressure` (Pa) correspond to `altitude` (m)
    #[must_use]
    pub fn sea_level_pressure_at(pressure: f64, altitude: f64) -> f64 {
        pressure
            / libm::pow(
                1.0 - altitude / BAROMETRIC_HEIGHT,
                1.0 / BAROMETRIC_EXPONENT,
            )
    }
}

/// Conversion time in ms for a configuration (datasheet section 3.9.2)
#[must_use]
pub fn conversion_time_ms(press_en: bool, temp_en: bool, osr_p: u32, osr_t: u32) -> f64 {
    let mut time = 0.234;
    if press_en {
        time += 0.392 + 2.020 * f64::from(osr_p);
    }
    if temp_en {
        time += 0.163 + 2.020 * f64::from(osr_t);
    }
    time
}
