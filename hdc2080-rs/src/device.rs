use core::time::Duration;

use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};

use crate::{
    Error, Humidity, Sample, Temperature,
    address::SlaveAddress,
    convert,
    register::{
        AutoMeasurementMode, Byte, Configuration, DeviceId, Hdc2080Register, HumidityMax,
        HumidityOffset, HumidityThresholdHigh, HumidityThresholdLow, Interrupt, InterruptEnable,
        InterruptFlags, InterruptMode, InterruptPolarity, InterruptStatus, ManufacturerId,
        MeasurementConfiguration, MeasurementMode, Resolution, TemperatureMax, TemperatureOffset,
        TemperatureThresholdHigh, TemperatureThresholdLow, Writable,
    },
};

const RESET_POLL_ATTEMPTS: u32 = 10;
const RESET_POLL_INTERVAL_MS: u32 = 10;
const DATA_READY_POLL_INTERVAL_US: u32 = 100;
const READ_TIMEOUT_MARGIN_US: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Progress of a measurement through the acquisition cycle.
pub enum AcquisitionState {
    #[default]
    /// No measurement in flight.
    Idle,
    /// A conversion was started (or the sensor is sampling on its own), data is not ready yet.
    MeasurementTriggered,
    /// The sensor reported data ready and the result is being read out.
    DataReady,
}

/// Represents the HDC2080 sensor.
///
/// The handle owns the bus and delay provider. It must be initialized with
/// [`Hdc2080::init`] before any register access.
pub struct Hdc2080<I, D> {
    pub(crate) i2c: I,
    pub(crate) delay: D,
    pub(crate) address: SlaveAddress,
    initialized: bool,
    state: AcquisitionState,
    mode: MeasurementMode,
    tres: Resolution,
    hres: Resolution,
    auto: AutoMeasurementMode,
}

#[derive(Debug, Default)]
/// Builder for a HDC2080 sensor.
pub struct Hdc2080Builder {
    pub(crate) address: SlaveAddress,
}

impl Hdc2080Builder {
    /// Set the address of the HDC2080 sensor.
    pub fn with_address(mut self, address: SlaveAddress) -> Self {
        self.address = address;
        self
    }

    /// Build an uninitialized HDC2080 handle on the given bus.
    pub fn build<I: I2c<SevenBitAddress>, D: DelayNs>(self, i2c: I, delay: D) -> Hdc2080<I, D> {
        Hdc2080 {
            i2c,
            delay,
            address: self.address,
            initialized: false,
            state: AcquisitionState::Idle,
            mode: MeasurementMode::default(),
            tres: Resolution::default(),
            hres: Resolution::default(),
            auto: AutoMeasurementMode::default(),
        }
    }
}

impl<I, D> Hdc2080<I, D> {
    /// Get the address of the device.
    pub fn get_address(&self) -> SlaveAddress {
        self.address
    }

    /// Set the address used for subsequent transactions.
    pub fn set_address(&mut self, address: SlaveAddress) {
        self.address = address;
    }

    /// Check whether [`Hdc2080::init`] completed and [`Hdc2080::deinit`] has not been called since.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current acquisition state.
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Release the bus and delay provider.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c<SevenBitAddress>, D: DelayNs> Hdc2080<I, D> {
    /// Initialize the sensor.
    ///
    /// Checks the manufacturer and device IDs, then performs a soft reset. On success all
    /// registers hold their power-on defaults.
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        self.initialized = false;
        self.state = AcquisitionState::Idle;
        ManufacturerId::verify(self)?;
        DeviceId::verify(self)?;
        self.reset()?;
        self.initialized = true;
        log::debug!(
            "hdc2080: device 0x{:02x} initialized",
            self.address.into_bits()
        );
        Ok(())
    }

    /// Stop auto measurement and mark the handle as uninitialized.
    pub fn deinit(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        self.modify(|conf: &mut Configuration| {
            conf.set_auto_measurement_mode(AutoMeasurementMode::Disabled)
        })?;
        self.auto = AutoMeasurementMode::Disabled;
        self.initialized = false;
        self.state = AcquisitionState::Idle;
        log::debug!(
            "hdc2080: device 0x{:02x} deinitialized",
            self.address.into_bits()
        );
        Ok(())
    }

    /// Perform a soft reset of the HDC2080 sensor.
    pub fn soft_reset(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        self.reset()
    }

    fn reset(&mut self) -> Result<(), Error<I::Error>> {
        let mut conf = self.modify(|conf: &mut Configuration| conf.set_soft_reset(true))?;
        for _ in 0..RESET_POLL_ATTEMPTS {
            self.delay.delay_ms(RESET_POLL_INTERVAL_MS);
            conf = Configuration::read(self)?;
            if !conf.soft_reset() {
                break;
            }
        }
        if conf.soft_reset() {
            log::warn!("hdc2080: soft reset did not complete");
            return Err(Error::Timeout);
        }
        self.mode = MeasurementMode::default();
        self.tres = Resolution::default();
        self.hres = Resolution::default();
        self.auto = AutoMeasurementMode::default();
        self.state = AcquisitionState::Idle;
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), Error<I::Error>> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Read a register, update some of its fields and write it back.
    fn modify<R: Writable>(&mut self, f: impl FnOnce(&mut R)) -> Result<R, Error<I::Error>> {
        let mut reg = R::read(self)?;
        f(&mut reg);
        reg.write(self)?;
        Ok(reg)
    }

    fn read_initialized<R: Hdc2080Register>(&mut self) -> Result<R, Error<I::Error>> {
        self.ensure_initialized()?;
        R::read(self)
    }

    fn write_initialized<R: Writable>(&mut self, reg: R) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        reg.write(self)
    }

    fn modify_initialized<R: Writable>(
        &mut self,
        f: impl FnOnce(&mut R),
    ) -> Result<R, Error<I::Error>> {
        self.ensure_initialized()?;
        self.modify(f)
    }

    /// Set the temperature resolution.
    pub fn set_temperature_resolution(
        &mut self,
        resolution: Resolution,
    ) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|meas: &mut MeasurementConfiguration| {
            meas.set_temperature_resolution(resolution.into_bits())
        })?;
        self.tres = resolution;
        Ok(())
    }

    /// Get the temperature resolution.
    pub fn get_temperature_resolution(&mut self) -> Result<Resolution, Error<I::Error>> {
        let meas: MeasurementConfiguration = self.read_initialized()?;
        self.tres = Resolution::try_from(meas.temperature_resolution())
            .map_err(|_| Error::InvalidParameter)?;
        Ok(self.tres)
    }

    /// Set the humidity resolution.
    pub fn set_humidity_resolution(
        &mut self,
        resolution: Resolution,
    ) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|meas: &mut MeasurementConfiguration| {
            meas.set_humidity_resolution(resolution.into_bits())
        })?;
        self.hres = resolution;
        Ok(())
    }

    /// Get the humidity resolution.
    pub fn get_humidity_resolution(&mut self) -> Result<Resolution, Error<I::Error>> {
        let meas: MeasurementConfiguration = self.read_initialized()?;
        self.hres = Resolution::try_from(meas.humidity_resolution())
            .map_err(|_| Error::InvalidParameter)?;
        Ok(self.hres)
    }

    /// Set the measurement mode.
    pub fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|meas: &mut MeasurementConfiguration| {
            meas.set_mode(mode.into_bits())
        })?;
        self.mode = mode;
        Ok(())
    }

    /// Get the measurement mode.
    pub fn get_mode(&mut self) -> Result<MeasurementMode, Error<I::Error>> {
        let meas: MeasurementConfiguration = self.read_initialized()?;
        self.mode = MeasurementMode::try_from(meas.mode()).map_err(|_| Error::InvalidParameter)?;
        Ok(self.mode)
    }

    /// Set the measurement trigger bit.
    ///
    /// Setting it starts a conversion, or starts auto measurement when an auto
    /// measurement rate is configured. The bit clears itself once the conversion completes.
    pub fn set_measurement(&mut self, start: bool) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|meas: &mut MeasurementConfiguration| meas.set_start(start))?;
        if start {
            self.state = AcquisitionState::MeasurementTriggered;
        }
        Ok(())
    }

    /// Get the measurement trigger bit.
    pub fn get_measurement(&mut self) -> Result<bool, Error<I::Error>> {
        let meas: MeasurementConfiguration = self.read_initialized()?;
        Ok(meas.start())
    }

    /// Set the auto measurement rate.
    pub fn set_auto_measurement_mode(
        &mut self,
        mode: AutoMeasurementMode,
    ) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|conf: &mut Configuration| conf.set_auto_measurement_mode(mode))?;
        self.auto = mode;
        Ok(())
    }

    /// Get the auto measurement rate.
    pub fn get_auto_measurement_mode(&mut self) -> Result<AutoMeasurementMode, Error<I::Error>> {
        let conf: Configuration = self.read_initialized()?;
        self.auto = conf.auto_measurement_mode();
        Ok(self.auto)
    }

    /// Set the heater state of the HDC2080 sensor.
    pub fn set_heater(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|conf: &mut Configuration| conf.set_heater_enable(enable))?;
        Ok(())
    }

    /// Get the heater state of the HDC2080 sensor.
    pub fn get_heater(&mut self) -> Result<bool, Error<I::Error>> {
        let conf: Configuration = self.read_initialized()?;
        Ok(conf.heater_enable())
    }

    /// Enable or disable the interrupt pin.
    pub fn set_interrupt_pin(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|conf: &mut Configuration| conf.set_interrupt_enable(enable))?;
        Ok(())
    }

    /// Check whether the interrupt pin is enabled.
    pub fn get_interrupt_pin(&mut self) -> Result<bool, Error<I::Error>> {
        let conf: Configuration = self.read_initialized()?;
        Ok(conf.interrupt_enable())
    }

    /// Set the polarity of the interrupt pin.
    pub fn set_interrupt_polarity(
        &mut self,
        polarity: InterruptPolarity,
    ) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|conf: &mut Configuration| conf.set_interrupt_polarity(polarity))?;
        Ok(())
    }

    /// Get the polarity of the interrupt pin.
    pub fn get_interrupt_polarity(&mut self) -> Result<InterruptPolarity, Error<I::Error>> {
        let conf: Configuration = self.read_initialized()?;
        Ok(conf.interrupt_polarity())
    }

    /// Set the interrupt mode.
    pub fn set_interrupt_mode(&mut self, mode: InterruptMode) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|conf: &mut Configuration| conf.set_interrupt_mode(mode))?;
        Ok(())
    }

    /// Get the interrupt mode.
    pub fn get_interrupt_mode(&mut self) -> Result<InterruptMode, Error<I::Error>> {
        let conf: Configuration = self.read_initialized()?;
        Ok(conf.interrupt_mode())
    }

    /// Enable or disable a single interrupt source.
    pub fn set_interrupt(&mut self, source: Interrupt, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|reg: &mut InterruptEnable| {
            reg.0 = reg.0.with_flag(source, enable)
        })?;
        Ok(())
    }

    /// Check whether a single interrupt source is enabled.
    pub fn get_interrupt(&mut self, source: Interrupt) -> Result<bool, Error<I::Error>> {
        let reg: InterruptEnable = self.read_initialized()?;
        Ok(reg.0.flag(source))
    }

    /// Set all interrupt sources at once. Reserved bits of the register are preserved.
    pub fn set_interrupts(&mut self, flags: InterruptFlags) -> Result<(), Error<I::Error>> {
        self.modify_initialized(|reg: &mut InterruptEnable| {
            let bits = (reg.into_bits() & !InterruptFlags::MASK)
                | (flags.into_bits() & InterruptFlags::MASK);
            *reg = InterruptEnable::from_bits(bits);
        })?;
        Ok(())
    }

    /// Get the enabled interrupt sources.
    pub fn get_interrupts(&mut self) -> Result<InterruptFlags, Error<I::Error>> {
        let reg: InterruptEnable = self.read_initialized()?;
        Ok(reg.0)
    }

    /// Read the interrupt status. Reading clears the flags on the sensor.
    pub fn get_interrupt_status(&mut self) -> Result<InterruptFlags, Error<I::Error>> {
        let reg: InterruptStatus = self.read_initialized()?;
        Ok(reg.0)
    }

    /// Set the temperature high threshold, quantized to the nearest register code.
    pub fn set_temperature_high_threshold(&mut self, celsius: f32) -> Result<(), Error<I::Error>> {
        let code = self.threshold_code(celsius, convert::temperature_threshold_to_raw)?;
        self.write_initialized(TemperatureThresholdHigh(code))
    }

    /// Get the temperature high threshold in degrees Celsius.
    pub fn get_temperature_high_threshold(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: TemperatureThresholdHigh = self.read_initialized()?;
        Ok(convert::temperature_threshold_from_raw(reg.into_bits()))
    }

    /// Set the temperature low threshold, quantized to the nearest register code.
    pub fn set_temperature_low_threshold(&mut self, celsius: f32) -> Result<(), Error<I::Error>> {
        let code = self.threshold_code(celsius, convert::temperature_threshold_to_raw)?;
        self.write_initialized(TemperatureThresholdLow(code))
    }

    /// Get the temperature low threshold in degrees Celsius.
    pub fn get_temperature_low_threshold(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: TemperatureThresholdLow = self.read_initialized()?;
        Ok(convert::temperature_threshold_from_raw(reg.into_bits()))
    }

    /// Set the humidity high threshold, quantized to the nearest register code.
    pub fn set_humidity_high_threshold(&mut self, percent: f32) -> Result<(), Error<I::Error>> {
        let code = self.threshold_code(percent, convert::humidity_threshold_to_raw)?;
        self.write_initialized(HumidityThresholdHigh(code))
    }

    /// Get the humidity high threshold in percent.
    pub fn get_humidity_high_threshold(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: HumidityThresholdHigh = self.read_initialized()?;
        Ok(convert::humidity_threshold_from_raw(reg.into_bits()))
    }

    /// Set the humidity low threshold, quantized to the nearest register code.
    pub fn set_humidity_low_threshold(&mut self, percent: f32) -> Result<(), Error<I::Error>> {
        let code = self.threshold_code(percent, convert::humidity_threshold_to_raw)?;
        self.write_initialized(HumidityThresholdLow(code))
    }

    /// Get the humidity low threshold in percent.
    pub fn get_humidity_low_threshold(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: HumidityThresholdLow = self.read_initialized()?;
        Ok(convert::humidity_threshold_from_raw(reg.into_bits()))
    }

    /// Set the temperature peak register, quantized to the nearest register code.
    pub fn set_temperature_max(&mut self, celsius: f32) -> Result<(), Error<I::Error>> {
        let code = self.threshold_code(celsius, convert::temperature_threshold_to_raw)?;
        self.write_initialized(TemperatureMax(code))
    }

    /// Get the highest temperature seen since the peak register was last written.
    pub fn get_temperature_max(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: TemperatureMax = self.read_initialized()?;
        Ok(convert::temperature_threshold_from_raw(reg.into_bits()))
    }

    /// Set the humidity peak register, quantized to the nearest register code.
    pub fn set_humidity_max(&mut self, percent: f32) -> Result<(), Error<I::Error>> {
        let code = self.threshold_code(percent, convert::humidity_threshold_to_raw)?;
        self.write_initialized(HumidityMax(code))
    }

    /// Get the highest humidity seen since the peak register was last written.
    pub fn get_humidity_max(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: HumidityMax = self.read_initialized()?;
        Ok(convert::humidity_threshold_from_raw(reg.into_bits()))
    }

    fn threshold_code(&self, value: f32, to_raw: fn(f32) -> u8) -> Result<Byte, Error<I::Error>> {
        self.ensure_initialized()?;
        if !value.is_finite() {
            return Err(Error::InvalidParameter);
        }
        Ok(Byte(to_raw(value)))
    }

    /// Set the temperature offset adjustment.
    ///
    /// Fails with [`Error::OutOfRange`] if the offset cannot be represented
    /// (outside about -20.5 °C to +20.3 °C).
    pub fn set_temperature_offset_adjustment(
        &mut self,
        celsius: f32,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        let code = convert::temperature_offset_to_raw(celsius).ok_or(Error::OutOfRange)?;
        TemperatureOffset(Byte(code as u8)).write(self)
    }

    /// Get the temperature offset adjustment in degrees Celsius.
    pub fn get_temperature_offset_adjustment(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: TemperatureOffset = self.read_initialized()?;
        Ok(convert::temperature_offset_from_raw(reg.into_bits() as i8))
    }

    /// Set the humidity offset adjustment.
    ///
    /// Fails with [`Error::OutOfRange`] if the offset cannot be represented
    /// (outside -25.6 % to +25.4 %).
    pub fn set_humidity_offset_adjustment(&mut self, percent: f32) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        let code = convert::humidity_offset_to_raw(percent).ok_or(Error::OutOfRange)?;
        HumidityOffset(Byte(code as u8)).write(self)
    }

    /// Get the humidity offset adjustment in percent.
    pub fn get_humidity_offset_adjustment(&mut self) -> Result<f32, Error<I::Error>> {
        let reg: HumidityOffset = self.read_initialized()?;
        Ok(convert::humidity_offset_from_raw(reg.into_bits() as i8))
    }

    /// Read a raw register.
    pub fn read_register(&mut self, register: u8) -> Result<u8, Error<I::Error>> {
        self.ensure_initialized()?;
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address.into_bits(), &[register], &mut buffer)?;
        Ok(buffer[0])
    }

    /// Write a raw register. The cached configuration is not updated.
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.ensure_initialized()?;
        self.i2c.write(self.address.into_bits(), &[register, value])?;
        Ok(())
    }

    /// Time a single conversion takes in the given mode, at the current resolution.
    fn conversion_time_us(&self, mode: MeasurementMode) -> u32 {
        match mode {
            MeasurementMode::Temperature => self.tres.temperature_delay_time(),
            MeasurementMode::TemperatureHumidity => {
                self.tres.temperature_delay_time() + self.hres.humidity_delay_time()
            }
        }
    }

    /// Timeout used by the convenience readers: one auto measurement period (if any),
    /// twice the conversion time, and a fixed margin.
    fn read_timeout(&self, mode: MeasurementMode) -> Duration {
        let period = self.auto.period_us().unwrap_or(0) as u64;
        let conversion = 2 * self.conversion_time_us(mode) as u64;
        Duration::from_micros(period + conversion + READ_TIMEOUT_MARGIN_US)
    }

    /// Trigger a measurement (unless auto measurement is running), wait for data ready
    /// and read the result.
    ///
    /// # Parameters:
    /// - `mode`: The channels to measure. The measurement mode is updated on the sensor if it differs.
    /// - `timeout`: Upper bound on the time spent waiting for data ready.
    ///
    /// # Returns:
    /// - [`Sample`]: The temperature, and the humidity if requested.
    ///
    /// Fails with [`Error::Timeout`] if data is not ready in time. No bus transaction is issued
    /// after the timeout expires.
    pub fn read_poll(
        &mut self,
        mode: MeasurementMode,
        timeout: Duration,
    ) -> Result<Sample, Error<I::Error>> {
        let (temperature, humidity) = self.acquire(mode, timeout)?;
        Ok(Sample {
            temperature,
            humidity: (mode == MeasurementMode::TemperatureHumidity).then_some(humidity),
        })
    }

    /// Measure and read temperature and humidity.
    pub fn read_temperature_humidity(&mut self) -> Result<(Temperature, Humidity), Error<I::Error>> {
        let mode = MeasurementMode::TemperatureHumidity;
        self.acquire(mode, self.read_timeout(mode))
    }

    /// Measure and read temperature in the configured measurement mode.
    pub fn read_temperature(&mut self) -> Result<Temperature, Error<I::Error>> {
        let mode = self.mode;
        self.acquire(mode, self.read_timeout(mode))
            .map(|(temperature, _)| temperature)
    }

    /// Measure and read humidity. Switches the sensor to temperature and humidity mode if needed.
    pub fn read_humidity(&mut self) -> Result<Humidity, Error<I::Error>> {
        let mode = MeasurementMode::TemperatureHumidity;
        self.acquire(mode, self.read_timeout(mode))
            .map(|(_, humidity)| humidity)
    }

    fn acquire(
        &mut self,
        mode: MeasurementMode,
        timeout: Duration,
    ) -> Result<(Temperature, Humidity), Error<I::Error>> {
        self.ensure_initialized()?;
        let auto = self.auto != AutoMeasurementMode::Disabled;
        if !auto {
            // drop a data ready flag left over from an earlier conversion
            InterruptStatus::read(self)?;
        }
        if !auto || mode != self.mode {
            self.modify(|meas: &mut MeasurementConfiguration| {
                meas.set_mode(mode.into_bits());
                meas.set_start(!auto);
            })?;
            self.mode = mode;
        }
        self.state = AcquisitionState::MeasurementTriggered;
        self.wait_data_ready(mode, timeout)?;
        self.state = AcquisitionState::DataReady;
        let result = self.read_data(mode)?;
        self.state = AcquisitionState::Idle;
        Ok(result)
    }

    fn wait_data_ready(
        &mut self,
        mode: MeasurementMode,
        timeout: Duration,
    ) -> Result<(), Error<I::Error>> {
        let budget = timeout.as_micros().min(u32::MAX as u128) as u32;
        let mut elapsed = self.conversion_time_us(mode).min(budget);
        self.delay.delay_us(elapsed);
        loop {
            let status = InterruptStatus::read(self)?;
            if status.0.data_ready() {
                return Ok(());
            }
            if elapsed >= budget {
                log::warn!(
                    "hdc2080: device 0x{:02x} read timeout after {elapsed} us",
                    self.address.into_bits()
                );
                return Err(Error::Timeout);
            }
            let step = DATA_READY_POLL_INTERVAL_US.min(budget - elapsed);
            self.delay.delay_us(step);
            elapsed += step;
        }
    }

    fn read_data(&mut self, mode: MeasurementMode) -> Result<(Temperature, Humidity), Error<I::Error>> {
        let mut buffer = [0u8; 4];
        let len = match mode {
            MeasurementMode::Temperature => 2,
            MeasurementMode::TemperatureHumidity => 4,
        };
        self.i2c.write_read(
            self.address.into_bits(),
            &[Temperature::ADDRESS],
            &mut buffer[..len],
        )?;
        let temperature = Temperature {
            value: u16::from_le_bytes([buffer[0], buffer[1]]),
        };
        let humidity = Humidity {
            value: u16::from_le_bytes([buffer[2], buffer[3]]),
        };
        Ok((temperature, humidity))
    }
}
