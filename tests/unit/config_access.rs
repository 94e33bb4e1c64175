//! Unit tests for configuration reads and writes

use crate::common::{Operation, create_mock_sensor};
use bmp3xx::{Error, Value, conversion_time_ms};

#[test]
fn test_power_on_configuration() {
    let (mut sensor, _interface) = create_mock_sensor();

    let config = sensor.config_read(&["mode", "osr_p", "osr_t", "odr_sel"]).unwrap();
    assert_eq!(config["mode"], Value::Symbol("sleep"));
    assert_eq!(config["osr_p"], Value::Int(2));
    assert_eq!(config["osr_t"], Value::Int(1));
    assert_eq!(config["odr_sel"], Value::Int(10));
}

#[test]
fn test_read_all_config() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.clear_operations();

    let config = sensor.config_read(&[]).unwrap();

    let config_units = sensor
        .catalog()
        .units()
        .filter(|(_, unit)| unit.kind == bmp3xx::Kind::Config)
        .count();
    assert_eq!(config.len(), config_units);
    assert_eq!(interface.read_count(), 9);
}

#[test]
fn test_write_groups_by_container() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.clear_operations();

    sensor
        .config_write(
            &[
                ("osr_p", Value::Int(8)),
                ("mode", Value::Symbol("normal")),
                ("osr_t", Value::Int(2)),
            ],
            false,
        )
        .unwrap();

    // OSR: osr_p = 8 (0b011), osr_t = 2 (0b001 << 3)
    // PWR_CTRL: press_en and temp_en defaults, normal mode (0b11 << 4)
    assert_eq!(
        interface.operations(),
        vec![
            Operation::Write {
                address: 0x1C,
                data: vec![0x0B]
            },
            Operation::Write {
                address: 0x1B,
                data: vec![0x33]
            },
            Operation::Read {
                address: 0x02,
                len: 1
            },
        ]
    );
}

#[test]
fn test_write_without_update_resets_siblings() {
    let (mut sensor, _interface) = create_mock_sensor();

    sensor
        .config_write(&[("osr_p", Value::Int(4)), ("osr_t", Value::Int(32))], true)
        .unwrap();
    sensor.config_write(&[("osr_p", Value::Int(16))], false).unwrap();

    let config = sensor.config_read(&["osr_p", "osr_t"]).unwrap();
    assert_eq!(config["osr_p"], Value::Int(16));
    assert_eq!(config["osr_t"], Value::Int(1));
}

#[test]
fn test_write_with_update_preserves_siblings() {
    let (mut sensor, interface) = create_mock_sensor();

    sensor
        .config_write(&[("osr_p", Value::Int(4)), ("osr_t", Value::Int(32))], true)
        .unwrap();
    interface.clear_operations();
    sensor.config_write(&[("osr_p", Value::Int(16))], true).unwrap();

    // OSR read-back, then the error flag
    assert_eq!(interface.read_count(), 2);
    let config = sensor.config_read(&["osr_p", "osr_t"]).unwrap();
    assert_eq!(config["osr_p"], Value::Int(16));
    assert_eq!(config["osr_t"], Value::Int(32));
}

#[test]
fn test_sequential_updates_match_single_write() {
    let (mut split, split_interface) = create_mock_sensor();
    split.config_write(&[("osr_p", Value::Int(4))], true).unwrap();
    split.config_write(&[("osr_t", Value::Int(32))], true).unwrap();

    let (mut joined, joined_interface) = create_mock_sensor();
    joined
        .config_write(&[("osr_p", Value::Int(4)), ("osr_t", Value::Int(32))], true)
        .unwrap();

    // osr_p = 4 (0b010), osr_t = 32 (0b101 << 3)
    assert_eq!(split_interface.get_register(0x1C), 0x2A);
    assert_eq!(joined_interface.get_register(0x1C), 0x2A);
}

#[test]
fn test_rejected_write() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.reject_config(true);
    interface.clear_operations();

    assert!(matches!(
        sensor.config_write(&[("odr_sel", Value::Int(5))], true),
        Err(Error::ConfigRejected)
    ));
    // The write reached the device, the flag was cleared by the check
    assert_eq!(interface.write_count(), 1);
    assert!(!sensor.config_error().unwrap());

    interface.reject_config(false);
    assert!(sensor.config_write(&[("odr_sel", Value::Int(80))], true).is_ok());
}

#[test]
fn test_write_returns_programmed_values() {
    let (mut sensor, _interface) = create_mock_sensor();

    let applied = sensor
        .config_write(&[("iir_filter", Value::Int(8))], false)
        .unwrap();
    assert_eq!(applied["iir_filter"], Value::Int(8));
    assert_eq!(applied["short_in"], Value::Int(0));
}

#[test]
fn test_fifo_watermark_spans_two_bytes() {
    let (mut sensor, interface) = create_mock_sensor();

    sensor
        .config_write(&[("fifo_water_mark", Value::Int(300))], false)
        .unwrap();
    assert_eq!(interface.get_register(0x15), 0x2C);
    assert_eq!(interface.get_register(0x16), 0x01);

    let config = sensor.config_read(&["fifo_water_mark"]).unwrap();
    assert_eq!(config["fifo_water_mark"], Value::Int(300));
}

#[test]
fn test_commands() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.push_fifo(&[0x80, 0x00]);
    interface.clear_operations();

    sensor.fifo_flush().unwrap();

    assert_eq!(
        interface.operations(),
        vec![Operation::Write {
            address: 0x7E,
            data: vec![0xB0]
        }]
    );
    assert_eq!(interface.fifo_len(), 0);
}

#[test]
fn test_conversion_time() {
    let (mut sensor, _interface) = create_mock_sensor();
    sensor
        .config_write(&[("osr_p", Value::Int(8)), ("osr_t", Value::Int(1))], false)
        .unwrap();

    let time = sensor.conversion_time().unwrap();
    let expected = 0.234 + 0.392 + 2.020 * 8.0 + 0.163 + 2.020;
    assert!((time - expected).abs() < 1e-9);
    assert!((conversion_time_ms(true, true, 8, 1) - expected).abs() < 1e-9);

    assert_eq!(sensor.min_odr_for(time), Some(20));
    assert_eq!(sensor.min_odr_for(1e9), None);
}
