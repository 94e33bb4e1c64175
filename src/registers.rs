//! Register, frame and preset tables for the BMP388 / BMP390
//!
//! Register map from the BMP390 datasheet, section 5. Both variants share the same map, only
//! the chip id differs. Unit defaults are raw bit patterns matching the power-on reset state.

use crate::catalog::{Catalog, Preset};
use crate::fifo::FrameType;
use crate::model::{AdcLayout, ByteOrder, Codec, Container, Domain, InfoUnit, Kind, Measure, Value};

const FLAG: Domain = Domain::Set(&[Value::Int(0), Value::Int(1)]);

const OVERSAMPLING: Domain = Domain::Set(&[
    Value::Int(1),
    Value::Int(2),
    Value::Int(4),
    Value::Int(8),
    Value::Int(16),
    Value::Int(32),
]);

const SUBSAMPLING: Domain = Domain::Set(&[
    Value::Int(1),
    Value::Int(2),
    Value::Int(4),
    Value::Int(8),
    Value::Int(16),
    Value::Int(32),
    Value::Int(64),
    Value::Int(128),
]);

/// Sampling periods in ms (`5 * 2^n`, 200 Hz down to 1/655 Hz)
const SAMPLING_PERIOD: Domain = Domain::Set(&[
    Value::Int(5),
    Value::Int(10),
    Value::Int(20),
    Value::Int(40),
    Value::Int(80),
    Value::Int(160),
    Value::Int(320),
    Value::Int(640),
    Value::Int(1_280),
    Value::Int(2_560),
    Value::Int(5_120),
    Value::Int(10_240),
    Value::Int(20_480),
    Value::Int(40_960),
    Value::Int(81_920),
    Value::Int(163_840),
    Value::Int(327_680),
    Value::Int(655_360),
]);

const IIR_COEFFICIENT: Domain = Domain::Set(&[
    Value::Int(0),
    Value::Int(2),
    Value::Int(4),
    Value::Int(8),
    Value::Int(16),
    Value::Int(32),
    Value::Int(64),
    Value::Int(128),
]);

const POWER_MODES: &[(&str, u64)] = &[("sleep", 0), ("forced", 1), ("forced", 2), ("normal", 3)];
const DATA_SOURCES: &[(&str, u64)] = &[
    ("unfiltered", 0),
    ("filtered", 1),
    ("unfiltered", 2),
    ("unfiltered", 3),
];
const OUTPUT_TYPES: &[(&str, u64)] = &[("push-pull", 0), ("open-drain", 1)];
const SPI_MODES: &[(&str, u64)] = &[("spi4", 0), ("spi3", 1)];
const WATCHDOG_PERIODS: &[(&str, u64)] = &[("wdt_short", 0), ("wdt_long", 1)];
const COMMANDS: &[(&str, u64)] = &[("nop", 0x00), ("fifo_flush", 0xB0), ("softreset", 0xB6)];

const fn symbols(table: &'static [Value]) -> Domain {
    Domain::Set(table)
}

const fn compensated(measure: Measure, layout: AdcLayout) -> Codec {
    Codec::Compensated { measure, layout }
}

const REG_CHIP_ID: &[InfoUnit] = &[InfoUnit::data("chip_id", 0, 8, Codec::Raw, "Chip ID stored in NVM")];

const REG_REV_ID: &[InfoUnit] = &[InfoUnit::data("rev_id", 0, 8, Codec::Raw, "ASIC mask revision")];

const REG_ERR_REG: &[InfoUnit] = &[
    InfoUnit::data("fatal_err", 0, 1, Codec::Raw, "Fatal error"),
    InfoUnit::data("cmd_err", 1, 1, Codec::Raw, "Command execution failed, cleared on read"),
    InfoUnit::data("conf_err", 2, 1, Codec::Raw, "Sensor configuration error, cleared on read"),
];

const REG_STATUS: &[InfoUnit] = &[
    InfoUnit::data("cmd_rdy", 4, 1, Codec::Raw, "Command decoder ready to accept a new command"),
    InfoUnit::data("drdy_press", 5, 1, Codec::Raw, "Pressure data ready, cleared on data read"),
    InfoUnit::data("drdy_temp", 6, 1, Codec::Raw, "Temperature data ready, cleared on data read"),
];

const REG_DATA: &[InfoUnit] = &[
    InfoUnit::data(
        "press_and_temp",
        0,
        48,
        compensated(Measure::Both, AdcLayout::PressureFirst),
        "Compensated pressure (Pa) and temperature (°C)",
    ),
    InfoUnit::data(
        "press",
        0,
        48,
        compensated(Measure::Pressure, AdcLayout::PressureFirst),
        "Compensated pressure (Pa)",
    ),
    InfoUnit::data(
        "temp",
        0,
        48,
        compensated(Measure::Temperature, AdcLayout::PressureFirst),
        "Compensated temperature (°C)",
    ),
    InfoUnit::data(
        "press_and_temp_adc",
        0,
        48,
        compensated(Measure::Adc, AdcLayout::PressureFirst),
        "Raw pressure and temperature ADC readings",
    ),
    InfoUnit::data(
        "altitude",
        0,
        48,
        compensated(Measure::Altitude, AdcLayout::PressureFirst),
        "Altitude (m), calibrate the altimeter first",
    ),
];

const REG_SENSORTIME: &[InfoUnit] = &[InfoUnit::data("sensortime", 0, 24, Codec::Raw, "Sensor time")];

const REG_EVENT: &[InfoUnit] = &[
    InfoUnit::data("por_detected", 0, 1, Codec::Raw, "Set after power-up or softreset, cleared on read"),
    InfoUnit::data(
        "itf_act_pt",
        1,
        1,
        Codec::Raw,
        "Serial interface transaction happened during a conversion",
    ),
];

const REG_INT_STATUS: &[InfoUnit] = &[
    InfoUnit::data("fwm_int", 0, 1, Codec::Raw, "FIFO watermark interrupt"),
    InfoUnit::data("ffull_int", 1, 1, Codec::Raw, "FIFO full interrupt"),
    InfoUnit::data("drdy", 3, 1, Codec::Raw, "Data ready interrupt"),
];

const REG_FIFO_LENGTH: &[InfoUnit] = &[InfoUnit::data("fifo_length", 0, 9, Codec::Raw, "FIFO fill level in bytes")];

const REG_FIFO_WTM: &[InfoUnit] = &[InfoUnit::config(
    "fifo_water_mark",
    0,
    9,
    Domain::Range { min: 0, max: 511 },
    Codec::Raw,
    255,
    "FIFO watermark level in bytes (0-511)",
)];

const REG_FIFO_CONFIG_1: &[InfoUnit] = &[
    InfoUnit::config("fifo_mode", 0, 1, FLAG, Codec::Raw, 0, "Enable (1) or disable (0) the FIFO"),
    InfoUnit::config(
        "fifo_stop_on_full",
        1,
        1,
        FLAG,
        Codec::Raw,
        0,
        "When full, 0: overwrite oldest frames, 1: drop new frames",
    ),
    InfoUnit::config("fifo_time_en", 2, 1, FLAG, Codec::Raw, 0, "Append sensor time frames"),
    InfoUnit::config("fifo_press_en", 3, 1, FLAG, Codec::Raw, 1, "Store pressure in FIFO frames"),
    InfoUnit::config("fifo_temp_en", 4, 1, FLAG, Codec::Raw, 1, "Store temperature in FIFO frames"),
];

const REG_FIFO_CONFIG_2: &[InfoUnit] = &[
    InfoUnit::config(
        "fifo_subsampling",
        0,
        3,
        SUBSAMPLING,
        Codec::Log2 { scale: 1 },
        0,
        "FIFO down-sampling factor (1-128, powers of two)",
    ),
    InfoUnit::config(
        "data_select",
        3,
        2,
        symbols(&[Value::Symbol("unfiltered"), Value::Symbol("filtered")]),
        Codec::Symbols(DATA_SOURCES),
        0,
        "FIFO data source: 'unfiltered' or 'filtered'",
    ),
];

const REG_INT_CTRL: &[InfoUnit] = &[
    InfoUnit::config(
        "int_od",
        0,
        1,
        symbols(&[Value::Symbol("push-pull"), Value::Symbol("open-drain")]),
        Codec::Symbols(OUTPUT_TYPES),
        0,
        "INT pin output: 'push-pull' or 'open-drain'",
    ),
    InfoUnit::config("int_level", 1, 1, FLAG, Codec::Raw, 1, "INT active level, 1: high, 0: low"),
    InfoUnit::config("int_latch", 2, 1, FLAG, Codec::Raw, 0, "Latch INT pin and INT_STATUS"),
    InfoUnit::config("fwtm_en", 3, 1, FLAG, Codec::Raw, 0, "FIFO watermark interrupt"),
    InfoUnit::config("ffull_en", 4, 1, FLAG, Codec::Raw, 0, "FIFO full interrupt"),
    InfoUnit::config("int_ds", 5, 1, FLAG, Codec::Raw, 0, "INT pin drive strength, 0: low, 1: high"),
    InfoUnit::config("drdy_en", 6, 1, FLAG, Codec::Raw, 0, "Data ready interrupt"),
];

const REG_IF_CONF: &[InfoUnit] = &[
    InfoUnit::config(
        "spi3",
        0,
        1,
        symbols(&[Value::Symbol("spi4"), Value::Symbol("spi3")]),
        Codec::Symbols(SPI_MODES),
        0,
        "SPI wiring: 'spi4' or 'spi3'",
    ),
    InfoUnit::config("i2c_wdt_en", 1, 1, FLAG, Codec::Raw, 0, "Enable the I2C watchdog"),
    InfoUnit::config(
        "i2c_wdt_sel",
        2,
        1,
        symbols(&[Value::Symbol("wdt_short"), Value::Symbol("wdt_long")]),
        Codec::Symbols(WATCHDOG_PERIODS),
        0,
        "I2C watchdog period: 'wdt_short' (1.25 ms) or 'wdt_long' (40 ms)",
    ),
];

const REG_PWR_CTRL: &[InfoUnit] = &[
    InfoUnit::config("press_en", 0, 1, FLAG, Codec::Raw, 1, "Enable (1) or disable (0) the pressure sensor"),
    InfoUnit::config("temp_en", 1, 1, FLAG, Codec::Raw, 1, "Enable (1) or disable (0) the temperature sensor"),
    InfoUnit::config(
        "mode",
        4,
        2,
        symbols(&[Value::Symbol("sleep"), Value::Symbol("forced"), Value::Symbol("normal")]),
        Codec::Symbols(POWER_MODES),
        0,
        "Power mode: 'sleep', 'forced' or 'normal'",
    ),
];

const REG_OSR: &[InfoUnit] = &[
    InfoUnit::config(
        "osr_p",
        0,
        3,
        OVERSAMPLING,
        Codec::Log2 { scale: 1 },
        1,
        "Pressure oversampling (1-32, powers of two)",
    ),
    InfoUnit::config(
        "osr_t",
        3,
        3,
        OVERSAMPLING,
        Codec::Log2 { scale: 1 },
        0,
        "Temperature oversampling (1-32, powers of two)",
    ),
];

const REG_ODR: &[InfoUnit] = &[InfoUnit::config(
    "odr_sel",
    0,
    5,
    SAMPLING_PERIOD,
    Codec::Log2 { scale: 5 },
    1,
    "Sampling period in ms (5 * 2^n, 5 to 655360), must exceed the conversion time",
)];

const REG_CONFIG: &[InfoUnit] = &[
    InfoUnit::config("short_in", 0, 1, FLAG, Codec::Raw, 0, "Short input"),
    InfoUnit::config(
        "iir_filter",
        1,
        3,
        IIR_COEFFICIENT,
        Codec::Log2OrZero,
        0,
        "IIR filter coefficient (0 for bypass, 2-128 powers of two)",
    ),
];

const REG_CMD: &[InfoUnit] = &[InfoUnit::command(
    "cmd",
    0,
    8,
    symbols(&[Value::Symbol("nop"), Value::Symbol("fifo_flush"), Value::Symbol("softreset")]),
    COMMANDS,
    "Command: 'nop', 'fifo_flush' or 'softreset'",
)];

const FRAME_PRESS_AND_TEMP: &[InfoUnit] = &[InfoUnit::frame(
    "frameiu_press_and_temp",
    0,
    48,
    compensated(Measure::Both, AdcLayout::TemperatureFirst),
    "Compensated pressure (Pa) and temperature (°C)",
)];

const FRAME_TEMP: &[InfoUnit] = &[InfoUnit::frame(
    "frameiu_temp",
    0,
    24,
    compensated(Measure::Temperature, AdcLayout::TemperatureOnly),
    "Compensated temperature (°C)",
)];

const FRAME_PRESS: &[InfoUnit] = &[InfoUnit::frame(
    "frameiu_press",
    0,
    24,
    compensated(Measure::Pressure, AdcLayout::PressureOnly),
    "Compensated pressure (Pa)",
)];

const FRAME_SENSORTIME: &[InfoUnit] =
    &[InfoUnit::frame("frameiu_sensortime", 0, 24, Codec::Raw, "Sensor time")];

const FRAME_CONFIG_CHANGE: &[InfoUnit] =
    &[InfoUnit::frame("frameiu_config_change", 0, 8, Codec::Empty, "Dummy byte")];

const FRAME_ERROR: &[InfoUnit] = &[InfoUnit::frame("frameiu_error", 0, 8, Codec::Empty, "Dummy byte")];

const FRAME_EMPTY: &[InfoUnit] = &[InfoUnit::frame("frameiu_empty", 0, 8, Codec::Empty, "Dummy byte")];

const CONTAINERS: &[Container] = &[
    Container::register("REG_CHIP_ID", Kind::Data, 0x00, 1, REG_CHIP_ID, "Chip identification"),
    Container::register("REG_REV_ID", Kind::Data, 0x01, 1, REG_REV_ID, "ASIC revision"),
    Container::register("REG_ERR_REG", Kind::Data, 0x02, 1, REG_ERR_REG, "Sensor error conditions"),
    Container::register("REG_STATUS", Kind::Data, 0x03, 1, REG_STATUS, "Sensor status flags"),
    Container::register("REG_DATA", Kind::Data, 0x04, 6, REG_DATA, "Pressure and temperature data"),
    Container::register("REG_SENSORTIME", Kind::Data, 0x0C, 3, REG_SENSORTIME, "Sensor time"),
    Container::register("REG_EVENT", Kind::Data, 0x10, 1, REG_EVENT, "Sensor events"),
    Container::register("REG_INT_STATUS", Kind::Data, 0x11, 1, REG_INT_STATUS, "Interrupt status"),
    Container::register("REG_FIFO_LENGTH", Kind::Data, 0x12, 2, REG_FIFO_LENGTH, "FIFO fill level"),
    Container::register("REG_FIFO_WTM", Kind::Config, 0x15, 2, REG_FIFO_WTM, "FIFO watermark"),
    Container::register("REG_FIFO_CONFIG_1", Kind::Config, 0x17, 1, REG_FIFO_CONFIG_1, "FIFO frame selection"),
    Container::register("REG_FIFO_CONFIG_2", Kind::Config, 0x18, 1, REG_FIFO_CONFIG_2, "FIFO sampling"),
    Container::register("REG_INT_CTRL", Kind::Config, 0x19, 1, REG_INT_CTRL, "Interrupt configuration"),
    Container::register("REG_IF_CONF", Kind::Config, 0x1A, 1, REG_IF_CONF, "Serial interface configuration"),
    Container::register("REG_PWR_CTRL", Kind::Config, 0x1B, 1, REG_PWR_CTRL, "Power mode and sensor enables"),
    Container::register("REG_OSR", Kind::Config, 0x1C, 1, REG_OSR, "Oversampling"),
    Container::register("REG_ODR", Kind::Config, 0x1D, 1, REG_ODR, "Output data rate"),
    Container::register("REG_CONFIG", Kind::Config, 0x1F, 1, REG_CONFIG, "IIR filter"),
    Container::register("REG_CMD", Kind::Command, 0x7E, 1, REG_CMD, "Command register"),
    Container::frame(
        "FRAME_PRESS_AND_TEMP",
        0x94,
        FrameType::PressureTemperature,
        7,
        FRAME_PRESS_AND_TEMP,
        "Pressure and temperature frame",
    ),
    Container::frame("FRAME_TEMP", 0x90, FrameType::Temperature, 4, FRAME_TEMP, "Temperature frame"),
    Container::frame("FRAME_PRESS", 0x84, FrameType::Pressure, 4, FRAME_PRESS, "Pressure frame"),
    Container::frame(
        "FRAME_SENSORTIME",
        0xA0,
        FrameType::SensorTime,
        4,
        FRAME_SENSORTIME,
        "Sensor time frame",
    ),
    Container::frame(
        "FRAME_CONFIG_CHANGE",
        0x48,
        FrameType::ConfigChange,
        2,
        FRAME_CONFIG_CHANGE,
        "FIFO configuration changed",
    ),
    Container::frame("FRAME_ERROR", 0x44, FrameType::Error, 2, FRAME_ERROR, "Configuration error"),
    Container::frame("FRAME_EMPTY", 0x80, FrameType::Empty, 2, FRAME_EMPTY, "FIFO drained"),
];

const PRESETS: &[Preset] = &[
    Preset {
        name: "handheld_dev_low_power",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(8)),
            ("osr_t", Value::Int(1)),
            ("iir_filter", Value::Int(2)),
            ("odr_sel", Value::Int(80)),
        ],
    },
    Preset {
        name: "handheld_dev_dynamic",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(4)),
            ("osr_t", Value::Int(1)),
            ("iir_filter", Value::Int(4)),
            ("odr_sel", Value::Int(20)),
        ],
    },
    Preset {
        name: "weather_monitoring",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("forced")),
            ("osr_p", Value::Int(1)),
            ("osr_t", Value::Int(1)),
            ("iir_filter", Value::Int(0)),
        ],
    },
    Preset {
        name: "drop_detection",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(2)),
            ("osr_t", Value::Int(1)),
            ("iir_filter", Value::Int(0)),
            ("odr_sel", Value::Int(10)),
        ],
    },
    Preset {
        name: "indoor_navigation",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(16)),
            ("osr_t", Value::Int(2)),
            ("iir_filter", Value::Int(4)),
            ("odr_sel", Value::Int(40)),
        ],
    },
    Preset {
        name: "drone",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(8)),
            ("osr_t", Value::Int(1)),
            ("iir_filter", Value::Int(2)),
            ("odr_sel", Value::Int(20)),
        ],
    },
    Preset {
        name: "indoor_localization",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(1)),
            ("osr_t", Value::Int(1)),
            ("iir_filter", Value::Int(4)),
            ("odr_sel", Value::Int(1_280)),
        ],
    },
    Preset {
        name: "init",
        assignments: &[
            ("press_en", Value::Int(1)),
            ("temp_en", Value::Int(1)),
            ("mode", Value::Symbol("normal")),
            ("osr_p", Value::Int(1)),
            ("osr_t", Value::Int(1)),
            ("odr_sel", Value::Int(40)),
        ],
    },
];

/// Catalog shared by the BMP388 and BMP390
pub static BMP3XX: Catalog = Catalog {
    name: "bmp3xx",
    byte_order: ByteOrder::Little,
    containers: CONTAINERS,
    presets: PRESETS,
};
