//! Self-refilling sample queue fed by the FIFO
//!
//! [`AutoQueue`] puts the sensor in streaming mode and pulls FIFO bursts ahead of demand, so
//! [`AutoQueue::get`] usually returns a buffered sample without touching the bus. Pulls are
//! paced by the sensor's output data rate: nothing is read while enough samples are queued, an
//! empty queue always pulls, and a queue that runs low pulls once enough time has passed for new
//! frames to arrive.
//!
//! The queue is bounded. When it is full the oldest samples are dropped and counted, frames
//! that do not carry a measurement are skipped and counted too, see [`AutoQueue::report`].
//!
//! # Example
//!
//! ```ignore
//! # use bmp3xx::fifo::queue::{AutoQueue, QueueConfig, StdClock};
//! let mut queue: AutoQueue<_, _> = AutoQueue::new(&mut sensor, StdClock::new(), QueueConfig::default())?;
//! loop {
//!     if let Some(sample) = queue.get()? {
//!         // sample.pressure, sample.temperature, sample.altitude
//!     }
//! }
//! ```

use device_driver::RegisterInterface;
use heapless::Deque;

use super::{DecodedFrame, FIFO_READ_OVERHEAD, FIFO_SIZE, FrameType};
use crate::Error;
use crate::compensation::Compensation;
use crate::device::{Bmp3xx, Sample};
use crate::model::Value;

/// Default number of queued samples
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Configuration written by [`AutoQueue::new`]
const STREAMING_CONFIG: [(&str, Value); 7] = [
    ("mode", Value::Symbol("normal")),
    ("press_en", Value::Int(1)),
    ("temp_en", Value::Int(1)),
    ("fifo_mode", Value::Int(1)),
    ("fifo_press_en", Value::Int(1)),
    ("fifo_temp_en", Value::Int(1)),
    ("fifo_time_en", Value::Int(0)),
];

/// Millisecond time source
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin
    fn now_ms(&mut self) -> u64;
}

/// [`Clock`] backed by [`std::time::Instant`]
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Start counting from now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Auto-queue tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueConfig {
    /// Below this many queued samples a pull is considered
    pub low_watermark: usize,
    /// Largest FIFO burst per pull, in bytes
    pub max_burst: usize,
    /// Pull interval in ms, `None` derives it from the output data rate
    pub min_interval_ms: Option<u32>,
    /// Compute the altitude of every sample
    pub altitude: bool,
    /// Rate-limit pulls on an empty queue to one per interval
    pub throttle_when_empty: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            low_watermark: 10,
            max_burst: FIFO_SIZE + FIFO_READ_OVERHEAD,
            min_interval_ms: None,
            altitude: true,
            throttle_when_empty: false,
        }
    }
}

/// Counters returned by [`AutoQueue::report`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueReport {
    /// Frames skipped because they carry no measurement
    pub discarded_frames: u32,
    /// Samples evicted because the queue was full
    pub lost_samples: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intake {
    Queued,
    Discarded,
    ConfigChanged,
}

/// Bounded drop-oldest sample storage
#[derive(Debug)]
struct Backlog<const N: usize> {
    samples: Deque<Sample, N>,
    report: QueueReport,
}

impl<const N: usize> Backlog<N> {
    const fn new() -> Self {
        Self {
            samples: Deque::new(),
            report: QueueReport {
                discarded_frames: 0,
                lost_samples: 0,
            },
        }
    }

    fn push(&mut self, sample: Sample) {
        if self.samples.is_full() && self.samples.pop_front().is_some() {
            self.report.lost_samples = self.report.lost_samples.saturating_add(1);
        }
        if self.samples.push_back(sample).is_err() {
            self.report.lost_samples = self.report.lost_samples.saturating_add(1);
        }
    }

    fn absorb(&mut self, frame: &DecodedFrame, altitude: Option<&Compensation>) -> Intake {
        let (pressure, temperature) = match (frame.frame_type, frame.payload) {
            (
                FrameType::PressureTemperature,
                Value::Measurement {
                    pressure,
                    temperature,
                },
            ) => (Some(pressure), Some(temperature)),
            (FrameType::Pressure, Value::Float(pressure)) => (Some(pressure), None),
            (FrameType::Temperature, Value::Float(temperature)) => (None, Some(temperature)),
            (frame_type, _) => {
                self.report.discarded_frames = self.report.discarded_frames.saturating_add(1);
                return if frame_type == FrameType::ConfigChange {
                    Intake::ConfigChanged
                } else {
                    Intake::Discarded
                };
            }
        };

        self.push(Sample {
            pressure,
            temperature,
            altitude: pressure
                .zip(altitude)
                .map(|(pressure, compensation)| compensation.altitude(pressure)),
        });
        Intake::Queued
    }
}

/// Pull-ahead sample queue over the sensor FIFO
///
/// Borrows the sensor for its whole lifetime. `N` is the queue capacity.
pub struct AutoQueue<'a, I, C, const N: usize = DEFAULT_QUEUE_CAPACITY> {
    sensor: &'a mut Bmp3xx<I>,
    clock: C,
    config: QueueConfig,
    backlog: Backlog<N>,
    interval_ms: u32,
    last_pull_ms: u64,
}

impl<'a, I, C, const N: usize> AutoQueue<'a, I, C, N>
where
    I: RegisterInterface<AddressType = u8>,
    C: Clock,
{
    /// Put the sensor in FIFO streaming mode and fill the queue once
    ///
    /// Enables pressure and temperature, normal mode, and a FIFO holding pressure and
    /// temperature frames without sensor time. Other settings (oversampling, data rate,
    /// filter) are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn new(sensor: &'a mut Bmp3xx<I>, clock: C, config: QueueConfig) -> Result<Self, Error<I::Error>> {
        sensor.config_write(&STREAMING_CONFIG, true)?;

        let mut queue = Self {
            sensor,
            clock,
            config,
            backlog: Backlog::new(),
            interval_ms: 0,
            last_pull_ms: 0,
        };
        queue.interval_ms = queue.resolve_interval()?;
        queue.pull()?;

        Ok(queue)
    }

    /// Next sample, oldest first
    ///
    /// Pulls from the FIFO first when the queue is empty, or when it runs low and a pull is
    /// due. Returns `Ok(None)` when neither the queue nor the device FIFO holds a sample.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn get(&mut self) -> Result<Option<Sample>, Error<I::Error>> {
        if self.pull_due() {
            self.pull()?;
        }
        Ok(self.backlog.samples.pop_front())
    }

    /// Drain the FIFO into the queue now
    ///
    /// # Returns
    /// Number of samples queued
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn pull(&mut self) -> Result<usize, Error<I::Error>> {
        let count = self.sensor.fifo_length()?.min(self.config.max_burst);
        let altitude = self.config.altitude.then(|| *self.sensor.compensation());

        let mut queued = 0;
        let mut config_changed = false;
        if count > 0 {
            for frame in self.sensor.fifo_read(Some(count))? {
                match self.backlog.absorb(&frame, altitude.as_ref()) {
                    Intake::Queued => queued += 1,
                    Intake::ConfigChanged => config_changed = true,
                    Intake::Discarded => {}
                }
            }
        }
        self.last_pull_ms = self.clock.now_ms();

        if config_changed {
            self.interval_ms = self.resolve_interval()?;
            #[cfg(feature = "defmt")]
            defmt::debug!("FIFO configuration changed, pull interval {} ms", self.interval_ms);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Pulled {} bytes, {} samples queued", count, queued);

        Ok(queued)
    }

    /// Flush the device FIFO and empty the queue, counters are kept
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn flush(&mut self) -> Result<(), Error<I::Error>> {
        self.sensor.fifo_flush()?;
        self.backlog.samples.clear();
        Ok(())
    }

    /// Return the counters and reset them
    pub fn report(&mut self) -> QueueReport {
        core::mem::take(&mut self.backlog.report)
    }

    /// Frames skipped since the last report
    pub const fn discarded_frames(&self) -> u32 {
        self.backlog.report.discarded_frames
    }

    /// Samples evicted since the last report
    pub const fn lost_samples(&self) -> u32 {
        self.backlog.report.lost_samples
    }

    /// Number of queued samples
    pub fn len(&self) -> usize {
        self.backlog.samples.len()
    }

    /// Check if no sample is queued
    pub fn is_empty(&self) -> bool {
        self.backlog.samples.is_empty()
    }

    /// Check if the queue is full
    pub fn is_full(&self) -> bool {
        self.backlog.samples.is_full()
    }

    /// Maximum number of queued samples
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current pull interval in ms
    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Queue configuration
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Access the sensor while the queue holds it
    pub fn sensor(&mut self) -> &mut Bmp3xx<I> {
        &mut *self.sensor
    }

    fn pull_due(&mut self) -> bool {
        let len = self.backlog.samples.len();
        if len > 0 && len >= self.config.low_watermark {
            return false;
        }

        let interval = u64::from(self.interval_ms);
        let wait = if len == 0 {
            if !self.config.throttle_when_empty {
                return true;
            }
            interval
        } else {
            interval.saturating_mul(u64::try_from(self.config.low_watermark).unwrap_or(u64::MAX)) / 2
        };
        self.clock.now_ms().saturating_sub(self.last_pull_ms) >= wait
    }

    fn resolve_interval(&mut self) -> Result<u32, Error<I::Error>> {
        if let Some(interval) = self.config.min_interval_ms {
            return Ok(interval);
        }
        let config = self.sensor.config_read(&["odr_sel", "fifo_subsampling"])?;
        let period = config.get("odr_sel").and_then(Value::as_int).unwrap_or(0);
        let subsampling = config
            .get("fifo_subsampling")
            .and_then(Value::as_int)
            .unwrap_or(1);
        Ok(u32::try_from(period.saturating_mul(subsampling)).unwrap_or(u32::MAX))
    }
}
