//! Conversions between physical values and HDC2080 register codes.
//!
//! Measurement registers hold 16-bit codes, threshold and peak registers hold the upper
//! 8 bits of the same scale, and the offset registers hold a signed 8-bit step count.
//! Converting a code to a physical value and back always yields the same code.

/// Temperature span covered by the full code range, in degrees Celsius.
const TEMPERATURE_SPAN: f32 = 165.0;
/// Temperature at code zero, in degrees Celsius.
const TEMPERATURE_MIN: f32 = -40.0;
/// Humidity span covered by the full code range, in percent.
const HUMIDITY_SPAN: f32 = 100.0;
/// Temperature offset adjustment per step, in degrees Celsius.
pub const TEMPERATURE_OFFSET_STEP: f32 = 0.16;
/// Humidity offset adjustment per step, in percent.
pub const HUMIDITY_OFFSET_STEP: f32 = 0.2;

/// Rounds to the nearest integer in `[0, max]`. NaN maps to zero.
fn quantize(value: f32, max: u16) -> u16 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= max as f32 {
        max
    } else {
        (value + 0.5) as u16
    }
}

/// Rounds to the nearest signed step, `None` if it does not fit in an `i8`.
fn quantize_signed(value: f32) -> Option<i8> {
    if !value.is_finite() {
        return None;
    }
    let rounded = if value >= 0.0 {
        (value + 0.5) as i32
    } else {
        (value - 0.5) as i32
    };
    i8::try_from(rounded).ok()
}

/// Converts a 16-bit temperature code to degrees Celsius.
pub fn temperature_from_raw(raw: u16) -> f32 {
    raw as f32 * TEMPERATURE_SPAN / 65536.0 + TEMPERATURE_MIN
}

/// Converts degrees Celsius to the nearest 16-bit temperature code, clamped to the code range.
pub fn temperature_to_raw(celsius: f32) -> u16 {
    quantize((celsius - TEMPERATURE_MIN) * 65536.0 / TEMPERATURE_SPAN, u16::MAX)
}

/// Converts a 16-bit humidity code to percent relative humidity.
pub fn humidity_from_raw(raw: u16) -> f32 {
    raw as f32 * HUMIDITY_SPAN / 65536.0
}

/// Converts percent relative humidity to the nearest 16-bit humidity code, clamped to the code range.
pub fn humidity_to_raw(percent: f32) -> u16 {
    quantize(percent * 65536.0 / HUMIDITY_SPAN, u16::MAX)
}

/// Converts an 8-bit temperature threshold (or peak) code to degrees Celsius.
pub fn temperature_threshold_from_raw(raw: u8) -> f32 {
    raw as f32 * TEMPERATURE_SPAN / 256.0 + TEMPERATURE_MIN
}

/// Converts degrees Celsius to the nearest 8-bit temperature threshold code.
pub fn temperature_threshold_to_raw(celsius: f32) -> u8 {
    quantize((celsius - TEMPERATURE_MIN) * 256.0 / TEMPERATURE_SPAN, u8::MAX as u16) as u8
}

/// Converts an 8-bit humidity threshold (or peak) code to percent relative humidity.
pub fn humidity_threshold_from_raw(raw: u8) -> f32 {
    raw as f32 * HUMIDITY_SPAN / 256.0
}

/// Converts percent relative humidity to the nearest 8-bit humidity threshold code.
pub fn humidity_threshold_to_raw(percent: f32) -> u8 {
    quantize(percent * 256.0 / HUMIDITY_SPAN, u8::MAX as u16) as u8
}

/// Converts a temperature offset code to degrees Celsius.
pub fn temperature_offset_from_raw(raw: i8) -> f32 {
    raw as f32 * TEMPERATURE_OFFSET_STEP
}

/// Converts a temperature offset in degrees Celsius to the nearest offset code.
///
/// Returns `None` if the offset lies outside `[-128, 127]` steps of 0.16 °C.
pub fn temperature_offset_to_raw(celsius: f32) -> Option<i8> {
    quantize_signed(celsius / TEMPERATURE_OFFSET_STEP)
}

/// Converts a humidity offset code to percent relative humidity.
pub fn humidity_offset_from_raw(raw: i8) -> f32 {
    raw as f32 * HUMIDITY_OFFSET_STEP
}

/// Converts a humidity offset in percent to the nearest offset code.
///
/// Returns `None` if the offset lies outside `[-128, 127]` steps of 0.2 %RH.
pub fn humidity_offset_to_raw(percent: f32) -> Option<i8> {
    quantize_signed(percent / HUMIDITY_OFFSET_STEP)
}
