use bitfield_struct::bitfield;

#[bitfield(u8)]
/// Represents the slave address for the HDC2080 sensor.
/// The address is 7 bits long. The base address is 0x40, and the least significant bit
/// follows the ADDR pin strap: 0x40 with ADDR tied to GND, 0x41 with ADDR tied to VDD.
pub struct SlaveAddress {
    /// State of the ADDR pin.
    #[bits(1, default = false)]
    pub addr_pin: bool,
    #[bits(7, default = 0x40 >> 1, access = RO)]
    base: u8,
}

impl SlaveAddress {
    /// Address with the ADDR pin connected to GND (0x40).
    pub const ADDRESS_0: Self = Self::new();
    /// Address with the ADDR pin connected to VDD (0x41).
    pub const ADDRESS_1: Self = Self::new().with_addr_pin(true);

    /// Checked conversion from a 7-bit bus address. Only 0x40 and 0x41 are accepted.
    pub fn from_address(address: u8) -> Result<Self, &'static str> {
        match address {
            0x40 => Ok(Self::ADDRESS_0),
            0x41 => Ok(Self::ADDRESS_1),
            _ => Err("Invalid HDC2080 address"),
        }
    }
}
