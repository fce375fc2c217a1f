#[derive(Debug, Clone, Copy, PartialEq)]
/// Static description of the HDC2080 and this driver.
pub struct Info {
    /// Chip name.
    pub chip_name: &'static str,
    /// Chip manufacturer.
    pub manufacturer_name: &'static str,
    /// Bus interface.
    pub interface: &'static str,
    /// Minimum supply voltage in volts.
    pub supply_voltage_min_v: f32,
    /// Maximum supply voltage in volts.
    pub supply_voltage_max_v: f32,
    /// Maximum current in milliamperes.
    pub max_current_ma: f32,
    /// Minimum operating temperature in degrees Celsius.
    pub temperature_min: f32,
    /// Maximum operating temperature in degrees Celsius.
    pub temperature_max: f32,
    /// Version of this driver crate.
    pub driver_version: &'static str,
}

const INFO: Info = Info {
    chip_name: "Texas Instruments HDC2080",
    manufacturer_name: "Texas Instruments",
    interface: "IIC",
    supply_voltage_min_v: 1.62,
    supply_voltage_max_v: 3.6,
    max_current_ma: 90.0,
    temperature_min: -40.0,
    temperature_max: 125.0,
    driver_version: env!("CARGO_PKG_VERSION"),
};

/// Returns the static chip information. Needs no device.
pub const fn info() -> Info {
    INFO
}
