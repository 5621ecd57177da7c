//! Register transport.
//!
//! Every register access is framed as the register address followed by the
//! payload: writes go out as a single write transaction, reads as a
//! write-read with a repeated start.

#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;

use crate::Error;

/// Longest payload accepted by [`Tmf8801Io::write_bytes`].
pub const MAX_WRITE_LEN: usize = 32;

/// Register level access to a TMF8801 on an I2C bus.
///
/// Owns the bus and the device address. There are no retries at this layer;
/// bus errors are returned as [`Error::I2cError`].
pub struct Tmf8801Io<I2C> {
    i2c: I2C,
    address: u8,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E> Tmf8801Io<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Binds the bus and the 7-bit device address. Nothing is sent.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// The 7-bit device address in use.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Addresses the device with an empty write.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - The device did not acknowledge
    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &[]).await?;
        Ok(())
    }

    /// Returns `true` if the device acknowledges its address. Probes the bus on
    /// every call.
    pub async fn is_present(&mut self) -> bool {
        self.probe().await.is_ok()
    }

    /// Reads one register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_byte<R>(&mut self, register: R) -> Result<u8, Error<E>>
    where
        R: Into<u8>,
    {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register.into()], &mut buffer)
            .await?;
        Ok(buffer[0])
    }

    /// Writes one register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_byte<R>(&mut self, register: R, value: u8) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        self.i2c
            .write(self.address, &[register.into(), value])
            .await?;
        Ok(())
    }

    /// Reads `buffer.len()` consecutive registers starting at `register`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_bytes<R>(&mut self, register: R, buffer: &mut [u8]) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        self.i2c
            .write_read(self.address, &[register.into()], buffer)
            .await?;
        Ok(())
    }

    /// Writes `payload` to consecutive registers starting at `register`, in a
    /// single transaction.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - The payload is longer than [`MAX_WRITE_LEN`]
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_bytes<R>(&mut self, register: R, payload: &[u8]) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        if payload.len() > MAX_WRITE_LEN {
            return Err(Error::InvalidArgument);
        }
        let mut buffer = [0u8; MAX_WRITE_LEN + 1];
        buffer[0] = register.into();
        buffer[1..=payload.len()].copy_from_slice(payload);
        self.i2c
            .write(self.address, &buffer[..=payload.len()])
            .await?;
        Ok(())
    }

    /// Sets one bit with a read-modify-write. Not atomic.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - `bit` is greater than 7
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_bit<R>(&mut self, register: R, bit: u8) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let mask = bit_mask(bit)?;
        let register = register.into();
        let value = self.read_byte(register).await?;
        self.write_byte(register, value | mask).await
    }

    /// Clears one bit with a read-modify-write. Not atomic.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - `bit` is greater than 7
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn clear_bit<R>(&mut self, register: R, bit: u8) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let mask = bit_mask(bit)?;
        let register = register.into();
        let value = self.read_byte(register).await?;
        self.write_byte(register, value & !mask).await
    }

    /// Returns whether one bit is set.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - `bit` is greater than 7
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn test_bit<R>(&mut self, register: R, bit: u8) -> Result<bool, Error<E>>
    where
        R: Into<u8>,
    {
        let mask = bit_mask(bit)?;
        let value = self.read_byte(register).await?;
        Ok(value & mask != 0)
    }
}

fn bit_mask<E: core::fmt::Debug>(bit: u8) -> Result<u8, Error<E>> {
    if bit > 7 {
        return Err(Error::InvalidArgument);
    }
    Ok(1 << bit)
}
