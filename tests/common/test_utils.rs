//! Test utilities and helper functions

use crate::common::mock_interface::MockInterface;
use bmp3xx::Bmp3xx;
use bmp3xx::fifo::queue::Clock;
use std::cell::Cell;
use std::rc::Rc;

/// Mock delay implementation for testing
///
/// This is a no-op delay that implements the embedded-hal DelayNs trait
/// for use in tests where actual delays are not needed.
#[derive(Debug, Clone, Copy)]
pub struct MockDelay;

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {
        // No-op for testing
    }

    fn delay_us(&mut self, _us: u32) {
        // No-op for testing
    }

    fn delay_ms(&mut self, _ms: u32) {
        // No-op for testing
    }
}

/// Manually advanced clock, clones share the same time
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
}

impl MockClock {
    /// Move time forward
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&mut self) -> u64 {
        self.now.get()
    }
}

/// Create a mock sensor for testing
/// Returns (sensor, interface) where interface is a clone that shares state with the sensor
pub fn create_mock_sensor() -> (Bmp3xx<MockInterface>, MockInterface) {
    let interface = MockInterface::new();
    let interface_clone = interface.clone();
    let sensor = Bmp3xx::new(interface).expect("Failed to create mock sensor");
    (sensor, interface_clone)
}

/// Encode a pressure + temperature FIFO frame
pub fn press_and_temp_frame(adc_pressure: u32, adc_temperature: u32) -> [u8; 7] {
    let p = adc_pressure.to_le_bytes();
    let t = adc_temperature.to_le_bytes();
    [0x94, t[0], t[1], t[2], p[0], p[1], p[2]]
}

/// Encode a temperature FIFO frame
pub fn temp_frame(adc_temperature: u32) -> [u8; 4] {
    let t = adc_temperature.to_le_bytes();
    [0x90, t[0], t[1], t[2]]
}

/// Encode a sensor time FIFO frame
pub fn sensortime_frame(time: u32) -> [u8; 4] {
    let t = time.to_le_bytes();
    [0xA0, t[0], t[1], t[2]]
}

/// Assert that two floating point values are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    let diff = (a - b).abs();
    assert!(
        diff < epsilon,
        "Values not equal within epsilon: {} vs {} (diff: {}, epsilon: {})",
        a,
        b,
        diff,
        epsilon
    );
}
