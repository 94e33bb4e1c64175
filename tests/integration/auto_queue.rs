//! Integration tests for the FIFO-backed sample queue

use crate::common::mock_interface::LINEAR_PRESSURE;
use crate::common::test_utils::press_and_temp_frame;
use crate::common::{MockClock, create_mock_sensor};
use bmp3xx::{AutoQueue, QueueConfig, QueueReport, Value};

#[test]
fn test_streaming_configuration() {
    let (mut sensor, interface) = create_mock_sensor();
    let queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, MockClock::default(), QueueConfig::default()).unwrap();

    // ODR 10 ms, no subsampling
    assert_eq!(queue.interval_ms(), 10);
    assert_eq!(queue.capacity(), 100);
    assert!(queue.is_empty());

    // Normal mode, both sensors on; FIFO on with pressure and temperature, no sensor time
    assert_eq!(interface.get_register(0x1B), 0x33);
    assert_eq!(interface.get_register(0x17), 0x19);
}

#[test]
fn test_no_data_returns_none() {
    let (mut sensor, _interface) = create_mock_sensor();
    let clock = MockClock::default();
    let mut queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, clock.clone(), QueueConfig::default()).unwrap();

    clock.advance(10);
    assert_eq!(queue.get().unwrap(), None);
}

#[test]
fn test_empty_queue_pulls_without_waiting() {
    let (mut sensor, interface) = create_mock_sensor();
    let clock = MockClock::default();
    let mut queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, clock.clone(), QueueConfig::default()).unwrap();
    assert!(queue.is_empty());

    interface.push_fifo(&press_and_temp_frame(0, 7 * 65_536));
    clock.advance(3);

    let sample = queue.get().unwrap().unwrap();
    assert_eq!(sample.temperature, Some(7.0));
    assert_eq!(interface.fifo_len(), 0);
}

#[test]
fn test_throttled_empty_queue_waits_one_interval() {
    let (mut sensor, interface) = create_mock_sensor();
    let clock = MockClock::default();
    let config = QueueConfig {
        throttle_when_empty: true,
        ..QueueConfig::default()
    };
    let mut queue: AutoQueue<_, _> = AutoQueue::new(&mut sensor, clock.clone(), config).unwrap();

    interface.push_fifo(&press_and_temp_frame(0, 65_536));
    clock.advance(3);
    interface.clear_operations();
    assert_eq!(queue.get().unwrap(), None);
    assert!(interface.operations().is_empty());

    clock.advance(7);
    let sample = queue.get().unwrap().unwrap();
    assert_eq!(sample.temperature, Some(1.0));
}

#[test]
fn test_no_bus_traffic_while_above_watermark() {
    let (mut sensor, interface) = create_mock_sensor();
    let clock = MockClock::default();
    let mut queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, clock.clone(), QueueConfig::default()).unwrap();

    for i in 0..20 {
        interface.push_fifo(&press_and_temp_frame(0, i * 65_536));
    }
    clock.advance(10);

    let first = queue.get().unwrap().unwrap();
    assert_eq!(first.temperature, Some(0.0));
    assert_eq!(first.pressure, Some(LINEAR_PRESSURE));
    assert!(first.altitude.is_some());
    assert_eq!(queue.len(), 19);

    interface.clear_operations();
    for i in 1..12 {
        let sample = queue.get().unwrap().unwrap();
        assert_eq!(sample.temperature, Some(f64::from(i)));
    }
    assert!(interface.operations().is_empty());
    assert_eq!(queue.len(), 8);

    // Below the watermark, a pull waits for half a watermark worth of samples
    clock.advance(50);
    interface.push_fifo(&press_and_temp_frame(0, 0));
    queue.get().unwrap();
    assert!(!interface.operations().is_empty());
    assert_eq!(queue.len(), 8);
}

#[test]
fn test_overflow_drops_oldest() {
    let (mut sensor, interface) = create_mock_sensor();
    for i in 0..6 {
        interface.push_fifo(&press_and_temp_frame(0, i * 65_536));
    }

    let mut queue: AutoQueue<_, _, 4> =
        AutoQueue::new(&mut sensor, MockClock::default(), QueueConfig::default()).unwrap();

    assert!(queue.is_full());
    assert_eq!(queue.lost_samples(), 2);
    assert_eq!(
        queue.report(),
        QueueReport {
            discarded_frames: 0,
            lost_samples: 2
        }
    );
    assert_eq!(queue.report(), QueueReport::default());

    let oldest = queue.get().unwrap().unwrap();
    assert_eq!(oldest.temperature, Some(2.0));
}

#[test]
fn test_config_change_rederives_interval() {
    let (mut sensor, interface) = create_mock_sensor();
    let clock = MockClock::default();
    let mut queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, clock.clone(), QueueConfig::default()).unwrap();
    assert_eq!(queue.interval_ms(), 10);

    queue
        .sensor()
        .config_write(
            &[("odr_sel", Value::Int(80)), ("fifo_subsampling", Value::Int(2))],
            true,
        )
        .unwrap();
    interface.push_fifo(&[0x48, 0x00]);
    interface.push_fifo(&press_and_temp_frame(0, 65_536));

    assert_eq!(queue.pull().unwrap(), 1);
    assert_eq!(queue.interval_ms(), 160);
    assert_eq!(queue.discarded_frames(), 1);
}

#[test]
fn test_fixed_interval() {
    let (mut sensor, _interface) = create_mock_sensor();
    let config = QueueConfig {
        min_interval_ms: Some(25),
        altitude: false,
        ..QueueConfig::default()
    };
    let clock = MockClock::default();
    let mut queue: AutoQueue<_, _> = AutoQueue::new(&mut sensor, clock.clone(), config).unwrap();
    assert_eq!(queue.interval_ms(), 25);
    assert_eq!(queue.config().min_interval_ms, Some(25));

    queue
        .sensor()
        .config_write(&[("odr_sel", Value::Int(80))], true)
        .unwrap();
    assert_eq!(queue.interval_ms(), 25);
}

#[test]
fn test_burst_limit_and_altitude_off() {
    let (mut sensor, interface) = create_mock_sensor();
    let config = QueueConfig {
        max_burst: 14,
        altitude: false,
        ..QueueConfig::default()
    };
    let mut queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, MockClock::default(), config).unwrap();

    for i in 0..5 {
        interface.push_fifo(&press_and_temp_frame(0, i * 65_536));
    }
    assert_eq!(queue.pull().unwrap(), 2);
    assert_eq!(interface.fifo_len(), 21);

    let sample = queue.get().unwrap().unwrap();
    assert_eq!(sample.altitude, None);
}

#[test]
fn test_flush() {
    let (mut sensor, interface) = create_mock_sensor();
    for i in 0..3 {
        interface.push_fifo(&press_and_temp_frame(0, i * 65_536));
    }
    let mut queue: AutoQueue<_, _> =
        AutoQueue::new(&mut sensor, MockClock::default(), QueueConfig::default()).unwrap();
    assert_eq!(queue.len(), 3);

    interface.push_fifo(&press_and_temp_frame(0, 0));
    queue.flush().unwrap();
    assert!(queue.is_empty());
    assert_eq!(interface.fifo_len(), 0);
}
