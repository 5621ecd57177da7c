//! # TMF8801 Time-of-Flight Distance Sensor Driver
//!
//! This crate provides a `no_std` driver for the ams TMF8801 single-zone
//! time-of-flight distance sensor. It is blocking by default and async with
//! the `async` feature.
//!
//! The chip boots into a bootloader. [`Tmf8801::begin`] resets its CPU, loads
//! the measurement application, uploads calibration and algorithm state and
//! starts ranging.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use tmf8801::Tmf8801;
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! let mut sensor = Tmf8801::new(i2c, delay);
//!
//! sensor.begin().unwrap();
//!
//! // Wait for data ready (the INT pin can be used instead when interrupts are enabled)
//! if sensor.data_available().unwrap() {
//!     let distance = sensor.get_distance().unwrap();
//!     if sensor.is_measurement_valid() {
//!         println!("Distance: {} mm", distance);
//!     }
//! }
//! ```
//!
//! ## Calibration
//!
//! Distances are only accurate with the device's own factory calibration.
//! Run [`Tmf8801::factory_calibration`] once with a clear field of view (no
//! target within 40 cm), store the returned bytes and hand them to
//! [`Tmf8801::set_calibration_data`] on every start.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

pub mod config;
pub mod io;
pub mod register;

#[cfg(all(test, not(feature = "async")))]
mod testing;

#[cfg(not(feature = "async"))]
use embedded_hal::{delay::DelayNs, i2c::I2c};
#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

pub use config::{CommandData, GpioMode, GpioPin};
pub use io::Tmf8801Io;
pub use register::{CalibrationData, Register, DEFAULT_CALIBRATION_DATA, DEFAULT_I2C_ADDRESS};

use register::{
    command, contents, enable, timing, ALGORITHM_STATE, APPLICATION, CHIP_ID, INTERRUPT_BIT,
    RESULT_LEN,
};

/// Latest measurement read from the result block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Sequence number, incremented by the chip for every result
    pub number: u8,
    /// Status in bits 6-7, reliability in bits 0-5
    pub info: u8,
    /// Peak distance in millimeters
    pub distance_mm: u16,
}

impl Measurement {
    /// Decodes the 4-byte result block.
    pub fn from_bytes(bytes: [u8; RESULT_LEN]) -> Self {
        Self {
            number: bytes[0],
            info: bytes[1],
            distance_mm: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }

    /// Measurement status, 0 when the result is usable.
    pub fn status(&self) -> u8 {
        self.info >> 6
    }

    /// Reliability score from 0 to 63.
    pub fn reliability(&self) -> u8 {
        self.info & 0x3F
    }

    /// `true` when the status bits are clear.
    pub fn is_valid(&self) -> bool {
        self.status() == 0
    }
}

/// Identity of the chip and its application, read during [`Tmf8801::begin`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareInfo {
    /// Major revision of the measurement application
    pub app_version_major: u8,
    /// Minor revision of the measurement application
    pub app_version_minor: u8,
    /// Hardware revision id
    pub hardware_revision: u8,
    /// Device serial number
    pub serial_number: u16,
}

/// How far the boot sequence got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootStage {
    /// Nothing sent to the chip yet
    Idle,
    /// CPU reset issued, waiting for the CPU to come up
    CpuReset,
    /// Measurement application requested, waiting for it to run
    ApplicationLoad,
    /// Application running with calibration loaded, not measuring
    CalibrationLoaded,
    /// Measuring
    Measuring,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Condition {
    CpuReady,
    ApplicationReady,
    SerialNumberReady,
    CalibrationReady,
    PoweredUp,
}

impl Condition {
    fn timeout_error<E: core::fmt::Debug>(self) -> Error<E> {
        match self {
            Condition::CpuReady => Error::CpuResetTimeout,
            Condition::ApplicationReady => Error::ApplicationLoadTimeout,
            Condition::SerialNumberReady => Error::SerialNumberTimeout,
            Condition::CalibrationReady => Error::FactoryCalibrationTimeout,
            Condition::PoweredUp => Error::WakeUpTimeout,
        }
    }
}

/// TMF8801 time-of-flight distance sensor driver.
///
/// Owns the bus and a delay provider. Calibration data, command data and the
/// last measurement are kept in memory; nothing is persisted.
pub struct Tmf8801<I2C, D> {
    io: Tmf8801Io<I2C>,
    delay: D,
    stage: BootStage,
    calibration: CalibrationData,
    command_data: CommandData,
    factory_calibration_on_begin: bool,
    measurement: Measurement,
    hardware_info: HardwareInfo,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D> Tmf8801<I2C, D>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    /// Creates a driver for a sensor at the default address (0x41).
    ///
    /// Nothing is sent to the chip until [`begin`](Self::begin).
    ///
    /// # Default Configuration
    ///
    /// - **Calibration**: [`DEFAULT_CALIBRATION_DATA`]
    /// - **GPIO0 / GPIO1**: driven low
    /// - **Sampling period**: 100 ms
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_I2C_ADDRESS)
    }

    /// Creates a driver for a sensor at `address`.
    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            io: Tmf8801Io::new(i2c, address),
            delay,
            stage: BootStage::Idle,
            calibration: DEFAULT_CALIBRATION_DATA,
            command_data: CommandData::default(),
            factory_calibration_on_begin: false,
            measurement: Measurement::default(),
            hardware_info: HardwareInfo::default(),
        }
    }

    /// Gives the bus and the delay back.
    pub fn release(self) -> (I2C, D) {
        (self.io.release(), self.delay)
    }

    /// The 7-bit address of the sensor.
    pub fn address(&self) -> u8 {
        self.io.address()
    }

    /// How far the last boot sequence got.
    pub fn boot_stage(&self) -> BootStage {
        self.stage
    }

    /// Runs a factory calibration during the next [`begin`](Self::begin), before
    /// the calibration data is uploaded. The request is consumed by that
    /// attempt, successful or not.
    pub fn set_factory_calibration_on_begin(&mut self, enabled: bool) {
        self.factory_calibration_on_begin = enabled;
    }

    /// Calibration data uploaded when ranging starts.
    pub fn calibration_data(&self) -> &CalibrationData {
        &self.calibration
    }

    /// Measure command parameters uploaded when ranging starts.
    pub fn command_data(&self) -> &CommandData {
        &self.command_data
    }

    /// Identity read during [`begin`](Self::begin).
    pub fn hardware_info(&self) -> &HardwareInfo {
        &self.hardware_info
    }

    /// Last measurement fetched from the chip.
    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// `true` when the last measurement's status is 0.
    pub fn is_measurement_valid(&self) -> bool {
        self.measurement.is_valid()
    }

    /// Reliability (0-63) of the last measurement.
    pub fn measurement_reliability(&self) -> u8 {
        self.measurement.reliability()
    }

    /// Status bits of the last measurement.
    pub fn measurement_status(&self) -> u8 {
        self.measurement.status()
    }

    /// Sequence number of the last measurement.
    pub fn measurement_number(&self) -> u8 {
        self.measurement.number
    }

    /// Mode configured for a GPIO pin.
    pub fn gpio_mode(&self, pin: GpioPin) -> GpioMode {
        self.command_data.gpio_mode(pin)
    }

    /// Configured repetition period in milliseconds.
    pub fn sampling_period(&self) -> u8 {
        self.command_data.sampling_period()
    }

    /// Boots the sensor and starts ranging.
    ///
    /// Sequence:
    /// 1. Probe the bus
    /// 2. Reset the CPU and wait up to 2 s for it to report ready
    /// 3. Verify the chip id
    /// 4. Load the measurement application and wait up to 2 s for it
    /// 5. Read application revision, hardware revision and serial number
    /// 6. Run the factory calibration, if requested
    /// 7. Upload calibration data, algorithm state and command data
    /// 8. Start measuring
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - The sensor did not acknowledge or a transfer failed
    /// * `Err(Error::CpuResetTimeout)` - The CPU did not come out of reset
    /// * `Err(Error::WrongChipId(id))` - The device is not a TMF8801
    /// * `Err(Error::ApplicationLoadTimeout)` - The measurement application did not start
    /// * `Err(Error::SerialNumberTimeout)` - The serial number was not published
    /// * `Err(Error::FactoryCalibrationTimeout)` - The requested factory calibration did not finish
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tmf8801::{Error, Tmf8801};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Tmf8801::new(i2c, delay);
    ///
    /// match sensor.begin() {
    ///     Ok(()) => println!("Serial number: {:#06x}", sensor.hardware_info().serial_number),
    ///     Err(Error::WrongChipId(id)) => println!("Not a TMF8801: {:#04x}", id),
    ///     Err(e) => println!("Boot failed: {}", e),
    /// }
    /// ```
    pub async fn begin(&mut self) -> Result<(), Error<E>> {
        self.stage = BootStage::Idle;

        info!("Probing sensor at {:#x}", self.io.address());
        self.io.probe().await?;

        self.reset_cpu().await?;

        let id = self.io.read_byte(Register::Id).await?;
        if id != CHIP_ID {
            error!("Unexpected chip id: {:#x}", id);
            return Err(Error::WrongChipId(id));
        }

        self.load_application().await?;
        self.hardware_info = self.read_hardware_info().await?;
        info!(
            "Application {}.{}, hardware revision {}, serial number {:#x}",
            self.hardware_info.app_version_major,
            self.hardware_info.app_version_minor,
            self.hardware_info.hardware_revision,
            self.hardware_info.serial_number
        );

        if self.factory_calibration_on_begin {
            self.factory_calibration_on_begin = false;
            self.run_factory_calibration().await?;
        }

        self.load_configuration().await
    }

    /// Restarts the chip and pushes the cached configuration: CPU reset,
    /// application load, calibration upload and measurement start.
    ///
    /// Only allowed once [`begin`](Self::begin) has succeeded. If the restart
    /// fails the driver has to be booted again with `begin`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::CpuResetTimeout)` - The CPU did not come out of reset
    /// * `Err(Error::ApplicationLoadTimeout)` - The measurement application did not start
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn reset(&mut self) -> Result<(), Error<E>> {
        self.ensure_running()?;
        info!("Restarting sensor");
        self.reset_cpu().await?;
        self.load_application().await?;
        self.load_configuration().await
    }

    /// Uploads calibration data, algorithm state and command data, then starts
    /// measuring. Used to resume after [`stop_measurement`](Self::stop_measurement)
    /// or [`factory_calibration`](Self::factory_calibration).
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn start_measurement(&mut self) -> Result<(), Error<E>> {
        self.ensure_running()?;
        self.halt_measurement().await?;
        self.load_configuration().await
    }

    /// Stops ranging. The application stays loaded.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn stop_measurement(&mut self) -> Result<(), Error<E>> {
        self.ensure_running()?;
        self.io.write_byte(Register::Command, command::STOP).await?;
        self.stage = BootStage::CalibrationLoaded;
        debug!("Measurement stopped");
        Ok(())
    }

    /// Powers the chip up from standby and waits up to 5 s for its CPU.
    ///
    /// The power-on request is repeated with every poll. Part of bring-up, so
    /// it may be called before [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// * `Err(Error::WakeUpTimeout)` - `ENABLE` never read back as powered and ready
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn wake_up(&mut self) -> Result<(), Error<E>> {
        self.poll_until(
            Condition::PoweredUp,
            timing::WAKE_UP_INTERVAL_MS,
            timing::WAKE_UP_ATTEMPTS,
        )
        .await?;
        Ok(())
    }

    /// Returns `true` if a device acknowledges the sensor's address. Probes the
    /// bus on every call.
    pub async fn is_present(&mut self) -> bool {
        self.io.is_present().await
    }

    /// Returns `true` if the device acknowledges and reports the TMF8801 chip id.
    ///
    /// Only probes and reads `ID`, so it may be called before
    /// [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If reading the id failed
    pub async fn is_connected(&mut self) -> Result<bool, Error<E>> {
        if !self.io.is_present().await {
            return Ok(false);
        }
        Ok(self.io.read_byte(Register::Id).await? == CHIP_ID)
    }

    /// Runs the factory calibration and stores the result as the calibration
    /// data. Takes up to 10 s.
    ///
    /// The sensor needs a clear field of view while calibrating. Ranging is
    /// stopped first and is not running afterwards: call [`start_measurement`](Self::start_measurement)
    /// to resume with the new calibration.
    ///
    /// # Returns
    ///
    /// * `Ok(CalibrationData)` - The 14 calibration bytes, to be stored by the caller
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::FactoryCalibrationTimeout)` - No calibration within 10 s; stored data unchanged
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tmf8801::Tmf8801;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Tmf8801::new(i2c, delay);
    ///
    /// sensor.begin().unwrap();
    /// let calibration = sensor.factory_calibration().unwrap();
    /// println!("Store these bytes: {:02x?}", calibration);
    /// sensor.start_measurement().unwrap();
    /// ```
    pub async fn factory_calibration(&mut self) -> Result<CalibrationData, Error<E>> {
        self.ensure_running()?;
        self.halt_measurement().await?;
        self.run_factory_calibration().await
    }

    /// Replaces the calibration data. A running sensor is restarted to apply it.
    ///
    /// # Errors
    ///
    /// Same as [`reset`](Self::reset) when the sensor is running.
    pub async fn set_calibration_data(
        &mut self,
        calibration: CalibrationData,
    ) -> Result<(), Error<E>> {
        self.calibration = calibration;
        self.apply_configuration().await
    }

    /// Sets the mode of a GPIO pin. A running sensor is restarted to apply it.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - `mode` is a reserved encoding
    ///
    /// Otherwise the same as [`reset`](Self::reset) when the sensor is running.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tmf8801::{GpioMode, GpioPin, Tmf8801};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Tmf8801::new(i2c, delay);
    ///
    /// // Configured before begin: no restart needed
    /// sensor.set_gpio_mode(GpioPin::Gpio0, GpioMode::VcselPulse).unwrap();
    /// sensor.begin().unwrap();
    /// ```
    pub async fn set_gpio_mode(&mut self, pin: GpioPin, mode: GpioMode) -> Result<(), Error<E>> {
        if let GpioMode::Reserved(_) = mode {
            return Err(Error::InvalidArgument);
        }
        self.command_data.set_gpio_mode(pin, mode);
        self.apply_configuration().await
    }

    /// Sets the repetition period in milliseconds. A running sensor is restarted
    /// to apply it.
    ///
    /// # Errors
    ///
    /// Same as [`reset`](Self::reset) when the sensor is running.
    pub async fn set_sampling_period(&mut self, period_ms: u8) -> Result<(), Error<E>> {
        self.command_data.set_sampling_period(period_ms);
        self.apply_configuration().await
    }

    /// Checks whether the result block holds a new measurement.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn data_available(&mut self) -> Result<bool, Error<E>> {
        self.ensure_running()?;
        let value = self.io.read_byte(Register::RegisterContents).await?;
        Ok(value == contents::RESULT)
    }

    /// Reads the result block and keeps it as the latest measurement.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn fetch_measurement(&mut self) -> Result<Measurement, Error<E>> {
        self.ensure_running()?;
        let mut buffer = [0u8; RESULT_LEN];
        self.io
            .read_bytes(Register::ResultNumber, &mut buffer)
            .await?;
        self.measurement = Measurement::from_bytes(buffer);
        trace!(
            "Measurement {}: {} mm, info {:#x}",
            self.measurement.number,
            self.measurement.distance_mm,
            self.measurement.info
        );
        Ok(self.measurement)
    }

    /// Clears the interrupt flag, fetches the latest measurement and returns
    /// its distance in millimeters.
    ///
    /// Check [`is_measurement_valid`](Self::is_measurement_valid) before using
    /// the value.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_distance(&mut self) -> Result<u16, Error<E>> {
        self.clear_interrupt_flag().await?;
        let measurement = self.fetch_measurement().await?;
        Ok(measurement.distance_mm)
    }

    /// Reads the application status register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn status(&mut self) -> Result<u8, Error<E>> {
        self.ensure_running()?;
        self.io.read_byte(Register::Status).await
    }

    /// Routes the measurement-ready interrupt to the INT pin.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn enable_interrupt(&mut self) -> Result<(), Error<E>> {
        self.ensure_running()?;
        self.io.set_bit(Register::IntEnab, INTERRUPT_BIT).await
    }

    /// Stops routing the measurement-ready interrupt to the INT pin.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn disable_interrupt(&mut self) -> Result<(), Error<E>> {
        self.ensure_running()?;
        self.io.clear_bit(Register::IntEnab, INTERRUPT_BIT).await
    }

    /// Clears the measurement-ready interrupt flag.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn clear_interrupt_flag(&mut self) -> Result<(), Error<E>> {
        self.ensure_running()?;
        self.io.set_bit(Register::IntStatus, INTERRUPT_BIT).await
    }

    /// Reads the major revision of the running application.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn application_version_major(&mut self) -> Result<u8, Error<E>> {
        self.ensure_running()?;
        self.io.read_byte(Register::AppRevMajor).await
    }

    /// Reads the minor revision of the running application.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn application_version_minor(&mut self) -> Result<u8, Error<E>> {
        self.ensure_running()?;
        self.io.read_byte(Register::AppRevMinor).await
    }

    /// Reads the hardware revision id.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn hardware_revision(&mut self) -> Result<u8, Error<E>> {
        self.ensure_running()?;
        self.io.read_byte(Register::RevId).await
    }

    /// Asks the application for the serial number and waits up to 2 s for it.
    ///
    /// The request replaces the measure command, so ranging is stopped for it
    /// and restarted afterwards.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::SerialNumberTimeout)` - The serial number was not published
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn serial_number(&mut self) -> Result<u16, Error<E>> {
        self.ensure_running()?;
        let measuring = self.stage == BootStage::Measuring;
        self.halt_measurement().await?;
        let serial_number = self.read_serial_number().await?;
        self.hardware_info.serial_number = serial_number;
        if measuring {
            self.load_configuration().await?;
        }
        Ok(serial_number)
    }

    /// Reads a register without any validation.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_register<R>(&mut self, register: R) -> Result<u8, Error<E>>
    where
        R: Into<u8>,
    {
        self.ensure_running()?;
        self.io.read_byte(register).await
    }

    /// Writes a register without any validation.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_register<R>(&mut self, register: R, value: u8) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        self.ensure_running()?;
        self.io.write_byte(register, value).await
    }

    /// Reads consecutive registers without any validation.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_registers<R>(&mut self, register: R, buffer: &mut [u8]) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        self.ensure_running()?;
        self.io.read_bytes(register, buffer).await
    }

    /// Writes consecutive registers without any validation.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotInitialized)` - The sensor is not running
    /// * `Err(Error::InvalidArgument)` - More than [`io::MAX_WRITE_LEN`] bytes
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_registers<R>(&mut self, register: R, payload: &[u8]) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        self.ensure_running()?;
        self.io.write_bytes(register, payload).await
    }

    fn ensure_running(&self) -> Result<(), Error<E>> {
        match self.stage {
            BootStage::CalibrationLoaded | BootStage::Measuring => Ok(()),
            _ => Err(Error::NotInitialized),
        }
    }

    // Any other command replaces a running measure command.
    async fn halt_measurement(&mut self) -> Result<(), Error<E>> {
        if self.stage == BootStage::Measuring {
            self.io.write_byte(Register::Command, command::STOP).await?;
            self.stage = BootStage::CalibrationLoaded;
        }
        Ok(())
    }

    // Cached configuration only reaches the chip when the application starts.
    async fn apply_configuration(&mut self) -> Result<(), Error<E>> {
        if self.ensure_running().is_ok() {
            self.reset().await
        } else {
            Ok(())
        }
    }

    async fn reset_cpu(&mut self) -> Result<(), Error<E>> {
        self.stage = BootStage::CpuReset;
        // cpu_reset clears itself
        self.io.set_bit(Register::Enable, enable::CPU_RESET).await?;
        self.poll_until(
            Condition::CpuReady,
            timing::POLL_INTERVAL_MS,
            timing::CPU_READY_ATTEMPTS,
        )
        .await?;
        Ok(())
    }

    async fn load_application(&mut self) -> Result<(), Error<E>> {
        self.stage = BootStage::ApplicationLoad;
        info!("Loading measurement application");
        self.io.write_byte(Register::AppReqId, APPLICATION).await?;
        self.poll_until(
            Condition::ApplicationReady,
            timing::POLL_INTERVAL_MS,
            timing::APPLICATION_READY_ATTEMPTS,
        )
        .await?;
        Ok(())
    }

    async fn read_hardware_info(&mut self) -> Result<HardwareInfo, Error<E>> {
        Ok(HardwareInfo {
            app_version_major: self.io.read_byte(Register::AppRevMajor).await?,
            app_version_minor: self.io.read_byte(Register::AppRevMinor).await?,
            hardware_revision: self.io.read_byte(Register::RevId).await?,
            serial_number: self.read_serial_number().await?,
        })
    }

    async fn read_serial_number(&mut self) -> Result<u16, Error<E>> {
        self.io.write_byte(Register::Command, command::SERIAL).await?;
        self.poll_until(
            Condition::SerialNumberReady,
            timing::POLL_INTERVAL_MS,
            timing::SERIAL_NUMBER_ATTEMPTS,
        )
        .await?;
        let mut serial = [0u8; 2];
        self.io.read_bytes(Register::StateData0, &mut serial).await?;
        Ok(u16::from_le_bytes(serial))
    }

    async fn run_factory_calibration(&mut self) -> Result<CalibrationData, Error<E>> {
        info!("Running factory calibration");
        self.io
            .write_byte(Register::Command, command::FACTORY_CALIBRATION)
            .await?;
        self.poll_until(
            Condition::CalibrationReady,
            timing::FACTORY_CALIBRATION_INTERVAL_MS,
            timing::FACTORY_CALIBRATION_ATTEMPTS,
        )
        .await?;

        let mut calibration = [0u8; register::CALIBRATION_DATA_LEN];
        self.io
            .read_bytes(Register::FACTORY_CALIB_0, &mut calibration)
            .await?;
        self.calibration = calibration;
        Ok(calibration)
    }

    async fn load_configuration(&mut self) -> Result<(), Error<E>> {
        self.io
            .write_byte(Register::Command, command::CALIBRATION)
            .await?;
        self.io
            .write_bytes(Register::FACTORY_CALIB_0, &self.calibration)
            .await?;
        self.io
            .write_bytes(Register::STATE_DATA_WR_0, &ALGORITHM_STATE)
            .await?;
        self.stage = BootStage::CalibrationLoaded;

        self.io
            .write_bytes(Register::CmdData7, self.command_data.as_bytes())
            .await?;
        self.io.write_byte(Register::Command, command::MEASURE).await?;
        self.delay.delay_ms(timing::MEASUREMENT_SETTLE_MS).await;

        self.stage = BootStage::Measuring;
        info!("Measuring");
        Ok(())
    }

    /// Polls `condition` every `interval_ms` until it holds, at most
    /// `max_attempts` times. Returns the number of failed polls.
    async fn poll_until(
        &mut self,
        condition: Condition,
        interval_ms: u32,
        max_attempts: u16,
    ) -> Result<u16, Error<E>> {
        let mut attempts = 0u16;
        loop {
            if self.check(condition).await? {
                debug!("{:?} after {} polls", condition, attempts);
                break Ok(attempts);
            }

            attempts += 1;
            if attempts >= max_attempts {
                warn!("{:?} not reached after {} polls", condition, attempts);
                break Err(condition.timeout_error());
            }

            self.delay.delay_ms(interval_ms).await;
        }
    }

    async fn check(&mut self, condition: Condition) -> Result<bool, Error<E>> {
        match condition {
            Condition::CpuReady => self.io.test_bit(Register::Enable, enable::CPU_READY).await,
            Condition::ApplicationReady => {
                Ok(self.io.read_byte(Register::AppId).await? == APPLICATION)
            }
            Condition::SerialNumberReady => {
                Ok(self.io.read_byte(Register::RegisterContents).await? == contents::SERIAL)
            }
            Condition::CalibrationReady => {
                Ok(self.io.read_byte(Register::RegisterContents).await? == contents::CALIBRATION)
            }
            Condition::PoweredUp => {
                self.io
                    .write_byte(Register::Enable, 1 << enable::PON)
                    .await?;
                Ok(self.io.read_byte(Register::Enable).await? == enable::POWERED_AND_READY)
            }
        }
    }
}

/// Error type for TMF8801 operations.
///
/// # Examples
///
/// ```rust,no_run
/// use tmf8801::Error;
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
/// let mut sensor = tmf8801::Tmf8801::new(i2c, delay);
///
/// match sensor.begin() {
///     Ok(()) => println!("Sensor running"),
///     Err(Error::I2cError(e)) => println!("I2C communication error: {:?}", e),
///     Err(Error::WrongChipId(id)) => println!("Unexpected chip id {:#04x}", id),
///     Err(e) => println!("Boot failed: {:?}", e),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// I2C communication error from the underlying hardware
    I2cError(E),
    /// The CPU did not report ready after a reset
    CpuResetTimeout,
    /// The chip id register did not hold the TMF8801 id
    WrongChipId(u8),
    /// The measurement application did not start
    ApplicationLoadTimeout,
    /// The application did not publish the serial number
    SerialNumberTimeout,
    /// The factory calibration did not finish within 10 s
    FactoryCalibrationTimeout,
    /// The chip did not power up
    WakeUpTimeout,
    /// The operation needs a successful `begin` first
    NotInitialized,
    /// Invalid parameter value provided
    InvalidArgument,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2cError(error)
    }
}
