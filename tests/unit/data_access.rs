//! Unit tests for data unit reads

use crate::common::mock_interface::LINEAR_PRESSURE;
use crate::common::{Operation, create_mock_sensor};
use bmp3xx::Value;

#[test]
fn test_chip_id() {
    let (mut sensor, _interface) = create_mock_sensor();
    assert_eq!(sensor.chip_id().unwrap(), bmp3xx::CHIP_ID_BMP390);
}

#[test]
fn test_one_read_per_container() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.set_adc(0x6B_0000, 25 * 65_536);
    interface.clear_operations();

    let data = sensor
        .data_read(&["press", "drdy_temp", "temp", "drdy_press", "press_and_temp"])
        .unwrap();

    assert_eq!(
        interface.operations(),
        vec![
            Operation::Read {
                address: 0x04,
                len: 6
            },
            Operation::Read {
                address: 0x03,
                len: 1
            },
        ]
    );
    assert_eq!(data.len(), 5);
    assert_eq!(data["press"], Value::Float(LINEAR_PRESSURE));
    assert_eq!(data["temp"], Value::Float(25.0));
    assert_eq!(
        data["press_and_temp"],
        Value::Measurement {
            pressure: LINEAR_PRESSURE,
            temperature: 25.0
        }
    );
    assert_eq!(data["drdy_press"], Value::Int(1));
}

#[test]
fn test_only_requested_units_are_returned() {
    let (mut sensor, _interface) = create_mock_sensor();

    let data = sensor.data_read(&["conf_err"]).unwrap();
    assert_eq!(data.keys().copied().collect::<Vec<_>>(), vec!["conf_err"]);
}

#[test]
fn test_adc_readings() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.set_adc(0x12_3456, 0x65_4321);

    let data = sensor.data_read(&["press_and_temp_adc"]).unwrap();
    assert_eq!(
        data["press_and_temp_adc"],
        Value::Adc {
            pressure: 0x12_3456,
            temperature: 0x65_4321
        }
    );
}

#[test]
fn test_fifo_length() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.push_fifo(&[0u8; 300]);
    assert_eq!(sensor.fifo_length().unwrap(), 300);
}

#[test]
fn test_empty_request_does_nothing() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.clear_operations();

    assert!(sensor.data_read(&[]).unwrap().is_empty());
    assert!(interface.operations().is_empty());
}
