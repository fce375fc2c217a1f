use bitfield_struct::bitfield;
use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::{Error, convert, device::Hdc2080};

pub(crate) const HDC2080_MANUFACTURER_ID: u16 = 0x5449; // Texas Instruments
pub(crate) const HDC2080_DEVICE_ID: u16 = 0x07D0; // HDC2080 Device ID

/// A single byte register of the HDC2080.
pub(crate) trait Hdc2080Register: Copy {
    const ADDRESS: u8;

    fn from_raw(raw: u8) -> Self;
    fn into_raw(self) -> u8;

    fn read<I: I2c<SevenBitAddress>, D>(hdc: &mut Hdc2080<I, D>) -> Result<Self, Error<I::Error>> {
        let mut buffer = [0u8; 1];
        hdc.i2c
            .write_read(hdc.address.into_bits(), &[Self::ADDRESS], &mut buffer)?;
        Ok(Self::from_raw(buffer[0]))
    }
}

/// Registers that accept writes. Status and identification registers do not implement this.
pub(crate) trait Writable: Hdc2080Register {
    fn write<I: I2c<SevenBitAddress>, D>(self, hdc: &mut Hdc2080<I, D>) -> Result<(), Error<I::Error>> {
        hdc.i2c
            .write(hdc.address.into_bits(), &[Self::ADDRESS, self.into_raw()])?;
        Ok(())
    }
}

macro_rules! register {
    ($name:ident, $addr:expr) => {
        impl Hdc2080Register for $name {
            const ADDRESS: u8 = $addr;

            fn from_raw(raw: u8) -> Self {
                Self::from_bits(raw)
            }

            fn into_raw(self) -> u8 {
                self.into_bits()
            }
        }
    };
    ($name:ident, $addr:expr, writable) => {
        register!($name, $addr);
        impl Writable for $name {}
    };
}

macro_rules! byte_register {
    ($(#[$meta:meta])* $name:ident($inner:ty), $addr:expr $(, $access:ident)?) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub(crate) struct $name(pub(crate) $inner);

        impl $name {
            pub(crate) const fn from_bits(bits: u8) -> Self {
                Self(<$inner>::from_bits(bits))
            }

            pub(crate) const fn into_bits(self) -> u8 {
                self.0.into_bits()
            }
        }

        register!($name, $addr $(, $access)?);
    };
}

/// Raw 8-bit register content. Used for the threshold, offset and peak registers,
/// which hold a full byte each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Byte(pub(crate) u8);

impl Byte {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub(crate) const fn into_bits(self) -> u8 {
        self.0
    }
}

byte_register!(
    /// Interrupt/DRDY status. Reading it clears the flags.
    InterruptStatus(InterruptFlags),
    0x04
);

byte_register!(TemperatureMax(Byte), 0x05, writable);

byte_register!(HumidityMax(Byte), 0x06, writable);

byte_register!(InterruptEnable(InterruptFlags), 0x07, writable);

byte_register!(TemperatureOffset(Byte), 0x08, writable);

byte_register!(HumidityOffset(Byte), 0x09, writable);

byte_register!(TemperatureThresholdLow(Byte), 0x0A, writable);

byte_register!(TemperatureThresholdHigh(Byte), 0x0B, writable);

byte_register!(HumidityThresholdLow(Byte), 0x0C, writable);

byte_register!(HumidityThresholdHigh(Byte), 0x0D, writable);

register!(Configuration, 0x0E, writable);
register!(MeasurementConfiguration, 0x0F, writable);

/// Reads a little-endian identification word and checks it against the expected value.
fn verify_id<I: I2c<SevenBitAddress>, D>(
    hdc: &mut Hdc2080<I, D>,
    register: u8,
    expected: u16,
) -> Result<(), Error<I::Error>> {
    let mut buffer = [0u8; 2];
    hdc.i2c
        .write_read(hdc.address.into_bits(), &[register], &mut buffer)?;
    let id = u16::from_le_bytes(buffer);
    if id != expected {
        log::warn!(
            "hdc2080: id register 0x{register:02x} reads 0x{id:04x}, expected 0x{expected:04x}"
        );
        return Err(Error::InvalidId);
    }
    Ok(())
}

pub(crate) struct ManufacturerId;

impl ManufacturerId {
    const ADDRESS: u8 = 0xFC;

    pub(crate) fn verify<I: I2c<SevenBitAddress>, D>(
        hdc: &mut Hdc2080<I, D>,
    ) -> Result<(), Error<I::Error>> {
        verify_id(hdc, Self::ADDRESS, HDC2080_MANUFACTURER_ID)
    }
}

pub(crate) struct DeviceId;

impl DeviceId {
    const ADDRESS: u8 = 0xFE;

    pub(crate) fn verify<I: I2c<SevenBitAddress>, D>(
        hdc: &mut Hdc2080<I, D>,
    ) -> Result<(), Error<I::Error>> {
        verify_id(hdc, Self::ADDRESS, HDC2080_DEVICE_ID)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Represents a temperature measurement from the HDC2080 sensor.
pub struct Temperature {
    pub(crate) value: u16,
}

impl Temperature {
    pub(crate) const ADDRESS: u8 = 0x00;

    /// Creates a temperature from a raw 16-bit code.
    pub const fn from_raw(value: u16) -> Self {
        Self { value }
    }

    /// The raw 16-bit code as read from the sensor.
    pub fn raw(&self) -> u16 {
        self.value
    }

    /// Converts the raw temperature value to Celsius.
    pub fn celsius(&self) -> f32 {
        convert::temperature_from_raw(self.value)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Represents a humidity measurement from the HDC2080 sensor.
pub struct Humidity {
    pub(crate) value: u16,
}

impl Humidity {
    /// Creates a humidity reading from a raw 16-bit code.
    pub const fn from_raw(value: u16) -> Self {
        Self { value }
    }

    /// The raw 16-bit code as read from the sensor.
    pub fn raw(&self) -> u16 {
        self.value
    }

    /// Converts the raw humidity value to percentage (0-100).
    pub fn percentage(&self) -> f32 {
        convert::humidity_from_raw(self.value)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// The result of a polled measurement.
pub struct Sample {
    /// Temperature, always measured.
    pub temperature: Temperature,
    /// Humidity, present when measured in [`MeasurementMode::TemperatureHumidity`].
    pub humidity: Option<Humidity>,
}

#[bitfield(u8)]
/// Device configuration register (0x0E).
pub(crate) struct Configuration {
    #[bits(1, default = InterruptMode::Level)]
    pub interrupt_mode: InterruptMode,
    #[bits(1, default = InterruptPolarity::ActiveLow)]
    pub interrupt_polarity: InterruptPolarity,
    #[bits(1, default = false)]
    pub interrupt_enable: bool,
    #[bits(1, default = false)]
    pub heater_enable: bool,
    #[bits(3, default = AutoMeasurementMode::Disabled)]
    pub auto_measurement_mode: AutoMeasurementMode,
    #[bits(1, default = false)]
    pub soft_reset: bool,
}

#[bitfield(u8)]
/// Measurement configuration register (0x0F).
///
/// Resolution and mode fields have reserved encodings, so they are kept as raw bits
/// and decoded with `TryFrom` by the accessors.
pub(crate) struct MeasurementConfiguration {
    #[bits(1, default = false)]
    pub start: bool,
    #[bits(2, default = 0)]
    pub mode: u8,
    #[bits(1)]
    __: bool,
    #[bits(2, default = 0)]
    pub humidity_resolution: u8,
    #[bits(2, default = 0)]
    pub temperature_resolution: u8,
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
/// Interrupt sources, as laid out in the interrupt enable (0x07) and status (0x04) registers.
pub struct InterruptFlags {
    #[bits(3)]
    __: u8,
    /// Humidity below the low threshold.
    pub humidity_low: bool,
    /// Humidity above the high threshold.
    pub humidity_high: bool,
    /// Temperature below the low threshold.
    pub temperature_low: bool,
    /// Temperature above the high threshold.
    pub temperature_high: bool,
    /// A conversion has completed.
    pub data_ready: bool,
}

impl InterruptFlags {
    pub(crate) const MASK: u8 = 0b1111_1000;

    /// Returns the flag of a single interrupt source.
    pub fn flag(&self, source: Interrupt) -> bool {
        self.into_bits() & source.mask() != 0
    }

    /// Returns a copy with the flag of a single interrupt source set or cleared.
    pub fn with_flag(self, source: Interrupt, enable: bool) -> Self {
        let bits = self.into_bits() & !source.mask();
        Self::from_bits(bits | if enable { source.mask() } else { 0 })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Interrupt sources of the HDC2080. The discriminant is the bit position in the
/// interrupt enable and status registers.
pub enum Interrupt {
    /// Data ready.
    DataReady = 7,
    /// Temperature high threshold.
    TemperatureHigh = 6,
    /// Temperature low threshold.
    TemperatureLow = 5,
    /// Humidity high threshold.
    HumidityHigh = 4,
    /// Humidity low threshold.
    HumidityLow = 3,
}

impl Interrupt {
    /// All interrupt sources, most significant bit first.
    pub const ALL: [Interrupt; 5] = [
        Interrupt::DataReady,
        Interrupt::TemperatureHigh,
        Interrupt::TemperatureLow,
        Interrupt::HumidityHigh,
        Interrupt::HumidityLow,
    ];

    const fn mask(self) -> u8 {
        1 << self as u8
    }
}

impl TryFrom<u8> for Interrupt {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Interrupt::*;
        match value {
            7 => Ok(DataReady),
            6 => Ok(TemperatureHigh),
            5 => Ok(TemperatureLow),
            4 => Ok(HumidityHigh),
            3 => Ok(HumidityLow),
            _ => Err("Invalid interrupt source"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
/// Measurement resolution, shared by the temperature and humidity channels.
pub enum Resolution {
    #[default]
    /// 14-bit resolution, with a conversion time of 610 µs (temperature) or 660 µs (humidity).
    FourteenBit = 0b00,
    /// 11-bit resolution, with a conversion time of 350 µs (temperature) or 400 µs (humidity).
    ElevenBit = 0b01,
    /// 9-bit resolution, with a conversion time of 225 µs (temperature) or 275 µs (humidity).
    NineBit = 0b10,
}

impl Resolution {
    pub(crate) const fn into_bits(self) -> u8 {
        self as u8
    }

    /// Returns the temperature conversion time in microseconds.
    pub(crate) fn temperature_delay_time(self) -> u32 {
        match self {
            Resolution::FourteenBit => 610,
            Resolution::ElevenBit => 350,
            Resolution::NineBit => 225,
        }
    }

    /// Returns the humidity conversion time in microseconds.
    pub(crate) fn humidity_delay_time(self) -> u32 {
        match self {
            Resolution::FourteenBit => 660,
            Resolution::ElevenBit => 400,
            Resolution::NineBit => 275,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00 => Ok(Resolution::FourteenBit),
            0b01 => Ok(Resolution::ElevenBit),
            0b10 => Ok(Resolution::NineBit),
            _ => Err("Invalid resolution"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Measurement configuration of the HDC2080.
pub enum MeasurementMode {
    #[default]
    /// Temperature and humidity are acquired in sequence.
    TemperatureHumidity = 0b00,
    /// Only temperature is acquired.
    Temperature = 0b01,
}

impl MeasurementMode {
    pub(crate) const fn into_bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MeasurementMode {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00 => Ok(MeasurementMode::TemperatureHumidity),
            0b01 => Ok(MeasurementMode::Temperature),
            _ => Err("Invalid measurement mode"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Auto measurement rate. When enabled, the sensor samples on its own at the given rate.
pub enum AutoMeasurementMode {
    #[default]
    /// Auto measurement disabled, conversions are triggered on demand.
    Disabled = 0b000,
    /// One sample every 120 seconds.
    OneOver120Hz = 0b001,
    /// One sample every 60 seconds.
    OneOver60Hz = 0b010,
    /// One sample every 10 seconds.
    OneOver10Hz = 0b011,
    /// One sample every 5 seconds.
    OneOver5Hz = 0b100,
    /// One sample per second.
    OneHz = 0b101,
    /// Two samples per second.
    TwoHz = 0b110,
    /// Five samples per second.
    FiveHz = 0b111,
}

impl AutoMeasurementMode {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        use AutoMeasurementMode::*;
        match bits & 0b111 {
            0b000 => Disabled,
            0b001 => OneOver120Hz,
            0b010 => OneOver60Hz,
            0b011 => OneOver10Hz,
            0b100 => OneOver5Hz,
            0b101 => OneHz,
            0b110 => TwoHz,
            _ => FiveHz,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        self as u8
    }

    /// Returns the sampling period in microseconds, or `None` when disabled.
    pub fn period_us(self) -> Option<u32> {
        use AutoMeasurementMode::*;
        match self {
            Disabled => None,
            OneOver120Hz => Some(120_000_000),
            OneOver60Hz => Some(60_000_000),
            OneOver10Hz => Some(10_000_000),
            OneOver5Hz => Some(5_000_000),
            OneHz => Some(1_000_000),
            TwoHz => Some(500_000),
            FiveHz => Some(200_000),
        }
    }
}

impl TryFrom<u8> for AutoMeasurementMode {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 0b111 {
            return Err("Invalid auto measurement mode");
        }
        Ok(Self::from_bits(value))
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Polarity of the interrupt pin.
pub enum InterruptPolarity {
    #[default]
    /// Active low.
    ActiveLow = 0b0,
    /// Active high.
    ActiveHigh = 0b1,
}

impl InterruptPolarity {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0b1 {
            0b0 => InterruptPolarity::ActiveLow,
            _ => InterruptPolarity::ActiveHigh,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for InterruptPolarity {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b0 => Ok(InterruptPolarity::ActiveLow),
            0b1 => Ok(InterruptPolarity::ActiveHigh),
            _ => Err("Invalid interrupt polarity"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Behavior of the interrupt pin.
pub enum InterruptMode {
    #[default]
    /// Level sensitive.
    Level = 0b0,
    /// Comparator mode.
    Comparator = 0b1,
}

impl InterruptMode {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0b1 {
            0b0 => InterruptMode::Level,
            _ => InterruptMode::Comparator,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for InterruptMode {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b0 => Ok(InterruptMode::Level),
            0b1 => Ok(InterruptMode::Comparator),
            _ => Err("Invalid interrupt mode"),
        }
    }
}
