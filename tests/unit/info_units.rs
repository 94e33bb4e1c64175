//! Unit tests for info unit packing against the built-in catalog

use bmp3xx::model::Kind;
use bmp3xx::{BMP3XX, Compensation, Domain, Error, Value};

#[test]
fn test_catalog_is_valid() {
    assert!(BMP3XX.validate().is_ok());
}

#[test]
fn test_oversampling_domain() {
    let (_, osr_p) = BMP3XX.find("osr_p").unwrap();
    let comp = Compensation::default();

    let result = osr_p.pack::<()>(Value::Int(3));
    assert!(matches!(
        result,
        Err(Error::Domain {
            name: "osr_p",
            value: Value::Int(3),
            allowed: Domain::Set(_),
            ..
        })
    ));

    let bits = osr_p.pack::<()>(Value::Int(16)).unwrap();
    assert_eq!(osr_p.unpack(bits, &comp), Value::Int(16));
}

#[test]
fn test_every_set_value_round_trips() {
    let comp = Compensation::default();
    for (_, unit) in BMP3XX.units().filter(|(_, unit)| unit.kind == Kind::Config) {
        let Domain::Set(values) = unit.domain else {
            continue;
        };
        for &value in values {
            let bits = unit.pack::<()>(value).unwrap();
            assert_eq!(unit.unpack(bits, &comp), value, "{}", unit.name);
        }
    }
}

#[test]
fn test_range_domain_bounds() {
    let (_, wtm) = BMP3XX.find("fifo_water_mark").unwrap();
    let comp = Compensation::default();

    assert_eq!(wtm.unpack(wtm.pack::<()>(Value::Int(511)).unwrap(), &comp), Value::Int(511));
    assert_eq!(wtm.pack::<()>(Value::Int(0)).unwrap(), 0);
    assert!(wtm.pack::<()>(Value::Int(512)).is_err());
    assert!(wtm.pack::<()>(Value::Int(-1)).is_err());
}

#[test]
fn test_wrong_value_type_is_a_domain_error() {
    let (_, mode) = BMP3XX.find("mode").unwrap();
    assert!(matches!(
        mode.pack::<()>(Value::Int(3)),
        Err(Error::Domain { name: "mode", .. })
    ));
    assert!(mode.pack::<()>(Value::Symbol("turbo")).is_err());
}

#[test]
fn test_data_units_cannot_be_packed() {
    let (_, chip_id) = BMP3XX.find("chip_id").unwrap();
    assert!(matches!(
        chip_id.pack::<()>(Value::Int(0x60)),
        Err(Error::UnsupportedOperation { name: "chip_id", .. })
    ));
}

#[test]
fn test_domain_error_message_carries_help() {
    let (_, iir) = BMP3XX.find("iir_filter").unwrap();
    let error = iir.pack::<()>(Value::Int(3)).unwrap_err();
    let message = error.to_string();
    assert!(message.contains("iir_filter"));
    assert!(message.contains("IIR filter coefficient"));
}
