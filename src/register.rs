//! Register map and fixed values of the TMF8801.
//!
//! Addresses and command codes follow the ams TMF8801 datasheet and
//! application note AN000597. The result block and the factory calibration
//! block share the same addresses: which one is mapped depends on the last
//! command issued to the application.

/// Default 7-bit I2C address of the TMF8801.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x41;

/// Value of [`Register::Id`] on a TMF8801.
pub const CHIP_ID: u8 = 0x07;

/// Application id of the measurement application.
pub const APPLICATION: u8 = 0xC0;
/// Application id of the bootloader.
pub const BOOTLOADER: u8 = 0x80;

/// Command codes written to [`Register::Command`].
pub mod command {
    /// Load calibration and algorithm state.
    pub const CALIBRATION: u8 = 0x0B;
    /// Run the factory calibration.
    pub const FACTORY_CALIBRATION: u8 = 0x0A;
    /// Start measuring with the parameters in `cmd_data7..0`.
    pub const MEASURE: u8 = 0x02;
    /// Publish the serial number in the state data block.
    pub const SERIAL: u8 = 0x47;
    /// Stop the running measurement.
    pub const STOP: u8 = 0xFF;
}

/// Values reported by [`Register::RegisterContents`].
pub mod contents {
    /// The result block holds a measurement.
    pub const RESULT: u8 = 0x55;
    /// The factory calibration block holds fresh calibration data.
    pub const CALIBRATION: u8 = 0x0A;
    /// The state data block holds the serial number.
    pub const SERIAL: u8 = super::command::SERIAL;
}

/// Bit positions in [`Register::Enable`].
pub mod enable {
    /// Self-clearing CPU reset.
    pub const CPU_RESET: u8 = 7;
    /// Set by the chip when its CPU is ready to accept commands.
    pub const CPU_READY: u8 = 6;
    /// Power on.
    pub const PON: u8 = 0;
    /// Value read back from `ENABLE` once the chip is powered and ready.
    pub const POWERED_AND_READY: u8 = (1 << CPU_READY) | (1 << PON);
}

/// Bit of the measurement-ready interrupt in `INT_ENAB` and `INT_STATUS`.
pub const INTERRUPT_BIT: u8 = 0;

/// Length of the factory calibration block.
pub const CALIBRATION_DATA_LEN: usize = 14;

/// Factory calibration constants of a single device.
pub type CalibrationData = [u8; CALIBRATION_DATA_LEN];

/// Calibration used until the caller provides one of its own.
///
/// Values come from the vendor example board; every device has its own and
/// distances are only accurate with the device's factory calibration.
pub const DEFAULT_CALIBRATION_DATA: CalibrationData = [
    0xC1, 0x22, 0x00, 0x1C, 0x09, 0x40, 0x8C, 0x98, 0x0A, 0x15, 0xCE, 0x9C, 0x01, 0xFC,
];

/// Initial state of the ranging algorithm (AN000597, p. 22).
pub const ALGORITHM_STATE: [u8; 11] = [
    0xB1, 0xA9, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Length of the result block read after each measurement.
pub const RESULT_LEN: usize = 4;

/// Register addresses of the TMF8801.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Currently running application (0x00)
    AppId = 0x00,
    /// Major revision of the running application (0x01)
    AppRevMajor = 0x01,
    /// Application requested by the host (0x02)
    AppReqId = 0x02,
    /// Command parameter 9 (0x06)
    CmdData9 = 0x06,
    /// Command parameter 8 (0x07)
    CmdData8 = 0x07,
    /// Command parameter 7, first byte of the measure command block (0x08)
    CmdData7 = 0x08,
    /// Command parameter 6 (0x09)
    CmdData6 = 0x09,
    /// Command parameter 5, GPIO control (0x0A)
    CmdData5 = 0x0A,
    /// Command parameter 4 (0x0B)
    CmdData4 = 0x0B,
    /// Command parameter 3 (0x0C)
    CmdData3 = 0x0C,
    /// Command parameter 2, repetition period in ms (0x0D)
    CmdData2 = 0x0D,
    /// Command parameter 1 (0x0E)
    CmdData1 = 0x0E,
    /// Command parameter 0 (0x0F)
    CmdData0 = 0x0F,
    /// Command register (0x10)
    Command = 0x10,
    /// Previously executed command (0x11)
    Previous = 0x11,
    /// Minor revision of the running application (0x12)
    AppRevMinor = 0x12,
    /// Patch revision of the running application (0x13)
    AppRevPatch = 0x13,
    /// Application status (0x1D)
    Status = 0x1D,
    /// Describes what the 0x20.. block currently holds (0x1E)
    RegisterContents = 0x1E,
    /// Transaction id (0x1F)
    Tid = 0x1F,
    /// Result sequence number, also first factory calibration byte (0x20)
    ResultNumber = 0x20,
    /// Result status and reliability (0x21)
    ResultInfo = 0x21,
    /// Peak distance, low byte (0x22)
    DistancePeak0 = 0x22,
    /// Peak distance, high byte (0x23)
    DistancePeak1 = 0x23,
    /// System clock, byte 0 (0x24)
    SysClock0 = 0x24,
    /// System clock, byte 1 (0x25)
    SysClock1 = 0x25,
    /// System clock, byte 2 (0x26)
    SysClock2 = 0x26,
    /// System clock, byte 3 (0x27)
    SysClock3 = 0x27,
    /// State data 0, serial number low byte after the serial command (0x28)
    StateData0 = 0x28,
    /// State data 1 (0x29)
    StateData1 = 0x29,
    /// State data 2 (0x2A)
    StateData2 = 0x2A,
    /// State data 3 (0x2B)
    StateData3 = 0x2B,
    /// State data 4 (0x2C)
    StateData4 = 0x2C,
    /// State data 5 (0x2D)
    StateData5 = 0x2D,
    /// State data 6, also start of the algorithm state write block (0x2E)
    StateData6 = 0x2E,
    /// State data 7 (0x2F)
    StateData7 = 0x2F,
    /// Crosstalk MSB (0x30)
    StateData8XtalkMsb = 0x30,
    /// Crosstalk LSB (0x31)
    StateData9XtalkLsb = 0x31,
    /// Junction temperature (0x32)
    StateData10Tj = 0x32,
    /// Reference hits, byte 0 (0x33)
    ReferenceHits0 = 0x33,
    /// Reference hits, byte 1 (0x34)
    ReferenceHits1 = 0x34,
    /// Reference hits, byte 2 (0x35)
    ReferenceHits2 = 0x35,
    /// Reference hits, byte 3 (0x36)
    ReferenceHits3 = 0x36,
    /// Object hits, byte 0 (0x37)
    ObjectHits0 = 0x37,
    /// Object hits, byte 1 (0x38)
    ObjectHits1 = 0x38,
    /// Object hits, byte 2 (0x39)
    ObjectHits2 = 0x39,
    /// Object hits, byte 3 (0x3A)
    ObjectHits3 = 0x3A,
    /// Enable and reset control (0xE0)
    Enable = 0xE0,
    /// Interrupt status, write 1 to clear (0xE1)
    IntStatus = 0xE1,
    /// Interrupt enable (0xE2)
    IntEnab = 0xE2,
    /// Chip id (0xE3)
    Id = 0xE3,
    /// Hardware revision id (0xE4)
    RevId = 0xE4,
}

impl Register {
    /// First byte of the factory calibration block; aliases the result block.
    pub const FACTORY_CALIB_0: Register = Register::ResultNumber;
    /// First byte of the algorithm state write block.
    pub const STATE_DATA_WR_0: Register = Register::StateData6;
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// Timing of the polling loops. Every wait is `interval * attempts` at most.
pub(crate) mod timing {
    pub const POLL_INTERVAL_MS: u32 = 10;
    pub const CPU_READY_ATTEMPTS: u16 = 200;
    pub const APPLICATION_READY_ATTEMPTS: u16 = 200;
    pub const SERIAL_NUMBER_ATTEMPTS: u16 = 200;
    pub const FACTORY_CALIBRATION_INTERVAL_MS: u32 = 100;
    // 100 * 100 ms = 10 s
    pub const FACTORY_CALIBRATION_ATTEMPTS: u16 = 100;
    pub const WAKE_UP_INTERVAL_MS: u32 = 100;
    pub const WAKE_UP_ATTEMPTS: u16 = 50;
    pub const MEASUREMENT_SETTLE_MS: u32 = 50;
}
