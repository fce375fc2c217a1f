#[derive(Debug)]
/// Represents errors that can occur while interacting with the HDC2080 sensor.
pub enum Error<E> {
    /// An error occurred while communicating with the I2C bus.
    I2c(E),
    /// The operation requires an initialized device, see [`Hdc2080::init`](crate::Hdc2080::init).
    NotInitialized,
    /// The manufacturer or device ID did not match the HDC2080.
    InvalidId,
    /// A value outside the legal set of a register field, either passed in or read back.
    InvalidParameter,
    /// A numeric value that cannot be represented in the target register.
    OutOfRange,
    /// The device did not complete the operation within the allotted time.
    Timeout,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}
