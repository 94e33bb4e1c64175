//! Integration tests for FIFO draining and decoding through the driver

use crate::common::mock_interface::LINEAR_PRESSURE;
use crate::common::test_utils::{press_and_temp_frame, sensortime_frame, temp_frame};
use crate::common::{MockError, Operation, create_mock_sensor};
use bmp3xx::{DecodedFrame, Error, FrameType, TailPolicy, Value};

#[test]
fn test_read_whole_fifo() {
    let (mut sensor, interface) = create_mock_sensor();
    for i in 0..3 {
        interface.push_fifo(&press_and_temp_frame(0x6B_0000, (20 + i) * 65_536));
    }
    interface.clear_operations();

    let frames: Vec<DecodedFrame> = sensor.fifo_read(None).unwrap().collect();

    // Length, then length + 4 bytes of FIFO data
    assert_eq!(
        interface.operations(),
        vec![
            Operation::Read {
                address: 0x12,
                len: 2
            },
            Operation::Read {
                address: 0x14,
                len: 25
            },
        ]
    );

    let measurements: Vec<_> = frames
        .iter()
        .filter(|frame| frame.frame_type == FrameType::PressureTemperature)
        .map(|frame| frame.payload)
        .collect();
    assert_eq!(
        measurements,
        vec![
            Value::Measurement {
                pressure: LINEAR_PRESSURE,
                temperature: 20.0
            },
            Value::Measurement {
                pressure: LINEAR_PRESSURE,
                temperature: 21.0
            },
            Value::Measurement {
                pressure: LINEAR_PRESSURE,
                temperature: 22.0
            },
        ]
    );
    // The over-read lands on empty frames
    assert_eq!(frames.len(), 5);
    assert!(frames[3..].iter().all(|frame| frame.frame_type == FrameType::Empty));
    assert!(sensor.fifo_buffered().is_empty());
}

#[test]
fn test_chunked_reads_complete_split_frames() {
    let (mut sensor, interface) = create_mock_sensor();
    for i in 0..7 {
        interface.push_fifo(&press_and_temp_frame(0, i * 65_536));
    }

    let mut frames = Vec::new();
    while interface.fifo_len() > 0 {
        let count = interface.fifo_len().min(10);
        frames.extend(sensor.fifo_read(Some(count)).unwrap());
    }

    let temperatures: Vec<_> = frames
        .iter()
        .map(|frame| match frame.payload {
            Value::Measurement { temperature, .. } => temperature,
            other => panic!("unexpected payload {other:?}"),
        })
        .collect();
    assert_eq!(temperatures, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert!(sensor.fifo_buffered().is_empty());
}

#[test]
fn test_mixed_frames() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.push_fifo(&temp_frame(25 * 65_536));
    interface.push_fifo(&[0x48, 0x00]);
    interface.push_fifo(&[0x12]);
    interface.push_fifo(&sensortime_frame(0x00_2010));

    let frames: Vec<_> = sensor.fifo_read(Some(11)).unwrap().collect();
    let kinds: Vec<_> = frames.iter().map(|frame| frame.frame_type).collect();
    assert_eq!(
        kinds,
        vec![
            FrameType::Temperature,
            FrameType::ConfigChange,
            FrameType::Error,
            FrameType::SensorTime,
        ]
    );
    assert_eq!(frames[0].payload, Value::Float(25.0));
    assert_eq!(frames[2].tag, 0x12);
    assert_eq!(frames[2].size, 1);
    assert_eq!(frames[3].payload, Value::Int(0x2010));
}

#[test]
fn test_retained_tail_and_flush() {
    let (mut sensor, interface) = create_mock_sensor();
    let frame = press_and_temp_frame(0, 65_536);
    interface.push_fifo(&frame);

    assert_eq!(sensor.fifo_read(Some(3)).unwrap().count(), 0);
    assert_eq!(sensor.fifo_buffered(), &frame[..3]);

    sensor.fifo_flush().unwrap();
    assert!(sensor.fifo_buffered().is_empty());
    assert_eq!(interface.fifo_len(), 0);
}

#[test]
fn test_discard_policy_drops_tail() {
    let (mut sensor, interface) = create_mock_sensor();
    sensor.set_fifo_tail_policy(TailPolicy::Discard);
    assert_eq!(sensor.fifo_tail_policy(), TailPolicy::Discard);

    interface.push_fifo(&press_and_temp_frame(0, 65_536));
    interface.push_fifo(&press_and_temp_frame(0, 2 * 65_536));

    assert_eq!(sensor.fifo_read(Some(10)).unwrap().count(), 1);
    assert!(sensor.fifo_buffered().is_empty());
}

#[test]
fn test_abandoned_pass_keeps_frames() {
    let (mut sensor, interface) = create_mock_sensor();
    for i in 0..3 {
        interface.push_fifo(&press_and_temp_frame(0, i * 65_536));
    }

    let first = sensor.fifo_read(Some(21)).unwrap().next().unwrap();
    assert_eq!(first.size, 7);
    assert_eq!(sensor.fifo_buffered().len(), 14);

    let rest: Vec<_> = sensor.fifo_frames().collect();
    assert_eq!(rest.len(), 2);
    assert!(sensor.fifo_buffered().is_empty());
}

#[test]
fn test_transport_error_leaves_mirror_unchanged() {
    let (mut sensor, interface) = create_mock_sensor();
    let frame = press_and_temp_frame(0, 65_536);
    interface.push_fifo(&frame);
    sensor.fifo_sync(Some(4)).unwrap();

    interface.fail_next_read();
    assert!(matches!(
        sensor.fifo_sync(Some(3)),
        Err(Error::Bus(MockError::Communication))
    ));
    assert_eq!(sensor.fifo_buffered(), &frame[..4]);

    assert_eq!(sensor.fifo_read(Some(3)).unwrap().count(), 1);
}

#[test]
fn test_softreset_clears_mirror() {
    let (mut sensor, interface) = create_mock_sensor();
    interface.push_fifo(&press_and_temp_frame(0, 0));
    sensor.fifo_sync(Some(5)).unwrap();

    sensor.softreset().unwrap();
    assert!(sensor.fifo_buffered().is_empty());
}
