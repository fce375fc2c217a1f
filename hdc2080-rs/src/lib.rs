#![no_std]
#![deny(missing_docs)]
//! # HDC2080
//!
//! A no-std driver for the Texas Instruments HDC2080 humidity and temperature sensor.
//!
//! The driver covers the full register map: resolution and measurement mode, auto measurement
//! rate, heater, interrupt pin and sources, thresholds, offset adjustment and the peak registers.
//! Measurements are triggered and polled with [`Hdc2080::read_poll`], or read with the
//! convenience readers which derive a timeout from the current configuration.
//!
//! ```no_run
//! # use embedded_hal::{delay::DelayNs, i2c::I2c};
//! # fn example<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Result<(), hdc2080::Error<I::Error>> {
//! use hdc2080::{Hdc2080Builder, Profile, SlaveAddress};
//!
//! let mut hdc = Hdc2080Builder::default()
//!     .with_address(SlaveAddress::ADDRESS_0)
//!     .build(i2c, delay);
//! hdc.init()?;
//! hdc.apply_profile(&Profile::shot())?;
//! let (temperature, humidity) = hdc.read_temperature_humidity()?;
//! log::info!("{:.2} °C, {:.2} %", temperature.celsius(), humidity.percentage());
//! # Ok(())
//! # }
//! ```
mod address;
pub mod convert;
mod device;
mod error;
mod info;
mod profile;
mod register;

pub use address::SlaveAddress;
pub use device::{AcquisitionState, Hdc2080, Hdc2080Builder};
pub use error::Error;
pub use info::{Info, info};
pub use profile::{Profile, Thresholds};
pub use register::{
    AutoMeasurementMode, Humidity, Interrupt, InterruptFlags, InterruptMode, InterruptPolarity,
    MeasurementMode, Resolution, Sample, Temperature,
};
