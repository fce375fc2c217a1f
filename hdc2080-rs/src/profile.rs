use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};

use crate::{
    AutoMeasurementMode, Error, Hdc2080, InterruptFlags, InterruptMode, InterruptPolarity,
    MeasurementMode, Resolution,
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Interrupt thresholds, in degrees Celsius and percent relative humidity.
pub struct Thresholds {
    /// Temperature high threshold.
    pub temperature_high: f32,
    /// Temperature low threshold.
    pub temperature_low: f32,
    /// Humidity high threshold.
    pub humidity_high: f32,
    /// Humidity low threshold.
    pub humidity_low: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A complete sensor configuration, applied with [`Hdc2080::apply_profile`].
pub struct Profile {
    /// Temperature resolution.
    pub temperature_resolution: Resolution,
    /// Humidity resolution.
    pub humidity_resolution: Resolution,
    /// Measurement mode.
    pub mode: MeasurementMode,
    /// Heater state.
    pub heater: bool,
    /// Interrupt pin polarity.
    pub interrupt_polarity: InterruptPolarity,
    /// Interrupt pin behavior.
    pub interrupt_mode: InterruptMode,
    /// Auto measurement rate.
    pub auto_measurement_mode: AutoMeasurementMode,
    /// Temperature offset adjustment in degrees Celsius.
    pub temperature_offset: f32,
    /// Humidity offset adjustment in percent.
    pub humidity_offset: f32,
    /// Interrupt pin enable.
    pub interrupt_pin: bool,
    /// Enabled interrupt sources.
    pub interrupts: InterruptFlags,
    /// Thresholds to program, if any.
    pub thresholds: Option<Thresholds>,
    /// Set the measurement trigger bit once configured.
    pub start_measurement: bool,
}

impl Profile {
    /// Continuous temperature and humidity sampling at 5 Hz, full resolution.
    pub const fn basic() -> Self {
        Self {
            temperature_resolution: Resolution::FourteenBit,
            humidity_resolution: Resolution::FourteenBit,
            mode: MeasurementMode::TemperatureHumidity,
            heater: false,
            interrupt_polarity: InterruptPolarity::ActiveLow,
            interrupt_mode: InterruptMode::Comparator,
            auto_measurement_mode: AutoMeasurementMode::FiveHz,
            temperature_offset: 0.0,
            humidity_offset: 0.0,
            interrupt_pin: false,
            interrupts: InterruptFlags::new(),
            thresholds: None,
            start_measurement: true,
        }
    }

    /// On demand measurements, full resolution. Use [`Hdc2080::read_poll`] to measure.
    pub const fn shot() -> Self {
        let mut profile = Self::basic();
        profile.auto_measurement_mode = AutoMeasurementMode::Disabled;
        profile.start_measurement = false;
        profile
    }

    /// Like [`Profile::basic`], with the interrupt pin driven by the threshold interrupts.
    pub const fn interrupt(thresholds: Thresholds) -> Self {
        let mut profile = Self::basic();
        profile.interrupt_pin = true;
        profile.interrupts = InterruptFlags::new()
            .with_temperature_high(true)
            .with_temperature_low(true)
            .with_humidity_high(true)
            .with_humidity_low(true);
        profile.thresholds = Some(thresholds);
        profile
    }
}

impl<I: I2c<SevenBitAddress>, D: DelayNs> Hdc2080<I, D> {
    /// Apply a configuration profile.
    ///
    /// Offsets and thresholds are validated before anything is written, so an invalid value
    /// leaves the sensor untouched. A bus error part way through leaves the profile partially
    /// applied.
    pub fn apply_profile(&mut self, profile: &Profile) -> Result<(), Error<I::Error>> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if let Some(t) = profile.thresholds {
            let values = [
                t.temperature_high,
                t.temperature_low,
                t.humidity_high,
                t.humidity_low,
            ];
            if !values.iter().all(|v| v.is_finite()) {
                return Err(Error::InvalidParameter);
            }
        }
        if crate::convert::temperature_offset_to_raw(profile.temperature_offset).is_none()
            || crate::convert::humidity_offset_to_raw(profile.humidity_offset).is_none()
        {
            return Err(Error::OutOfRange);
        }
        // stop sampling while reconfiguring
        self.set_auto_measurement_mode(AutoMeasurementMode::Disabled)?;
        self.set_temperature_resolution(profile.temperature_resolution)?;
        self.set_humidity_resolution(profile.humidity_resolution)?;
        self.set_mode(profile.mode)?;
        self.set_heater(profile.heater)?;
        self.set_interrupt_polarity(profile.interrupt_polarity)?;
        self.set_interrupt_mode(profile.interrupt_mode)?;
        self.set_temperature_offset_adjustment(profile.temperature_offset)?;
        self.set_humidity_offset_adjustment(profile.humidity_offset)?;
        if let Some(thresholds) = profile.thresholds {
            self.set_temperature_high_threshold(thresholds.temperature_high)?;
            self.set_temperature_low_threshold(thresholds.temperature_low)?;
            self.set_humidity_high_threshold(thresholds.humidity_high)?;
            self.set_humidity_low_threshold(thresholds.humidity_low)?;
        }
        self.set_interrupts(profile.interrupts)?;
        self.set_interrupt_pin(profile.interrupt_pin)?;
        self.set_auto_measurement_mode(profile.auto_measurement_mode)?;
        if profile.start_measurement {
            self.set_measurement(true)?;
        }
        log::debug!("hdc2080: profile applied: {profile:?}");
        Ok(())
    }
}
