//! Measurement configuration pushed to the chip when ranging starts.

/// Mode of one of the two GPIO pins, as encoded in `cmd_data5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioMode {
    /// Input, ignored by the application
    Input,
    /// Input, measurement is halted while the pin is low
    ActiveLowInput,
    /// Input, measurement is halted while the pin is high
    ActiveHighInput,
    /// Output follows the VCSEL pulse
    VcselPulse,
    /// Output driven low
    LowOutput,
    /// Output driven high
    HighOutput,
    /// Reserved encoding read from the chip
    Reserved(u8),
}

impl From<GpioMode> for u8 {
    fn from(mode: GpioMode) -> Self {
        match mode {
            GpioMode::Input => 0,
            GpioMode::ActiveLowInput => 1,
            GpioMode::ActiveHighInput => 2,
            GpioMode::VcselPulse => 3,
            GpioMode::LowOutput => 4,
            GpioMode::HighOutput => 5,
            GpioMode::Reserved(value) => value,
        }
    }
}

impl From<u8> for GpioMode {
    fn from(value: u8) -> Self {
        match value {
            0 => GpioMode::Input,
            1 => GpioMode::ActiveLowInput,
            2 => GpioMode::ActiveHighInput,
            3 => GpioMode::VcselPulse,
            4 => GpioMode::LowOutput,
            5 => GpioMode::HighOutput,
            _ => {
                warn!("Reserved GPIO mode: {}", value);
                GpioMode::Reserved(value)
            }
        }
    }
}

/// One of the two GPIO pins of the TMF8801.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioPin {
    /// GPIO0, low nibble of `cmd_data5`
    Gpio0,
    /// GPIO1, high nibble of `cmd_data5`
    Gpio1,
}

impl GpioPin {
    fn shift(self) -> u8 {
        match self {
            GpioPin::Gpio0 => 0,
            GpioPin::Gpio1 => 4,
        }
    }
}

/// Parameters of the measure command, written to `cmd_data7..=cmd_data0`
/// (registers 0x08 to 0x0F) in that order.
///
/// The chip only reads them when the measurement application starts, so any
/// change has to be followed by a restart of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandData(pub [u8; 8]);

impl CommandData {
    /// `cmd_data7`: calibration and algorithm state are supplied.
    pub const CALIBRATION_STATE: usize = 0;
    /// `cmd_data6`: algorithm selection.
    pub const ALGORITHM: usize = 1;
    /// `cmd_data5`: GPIO0 mode in bits 0-3, GPIO1 mode in bits 4-7.
    pub const GPIO: usize = 2;
    /// `cmd_data4`: upper threshold byte.
    pub const THRESHOLD_HIGH: usize = 3;
    /// `cmd_data3`: lower threshold byte.
    pub const THRESHOLD_LOW: usize = 4;
    /// `cmd_data2`: repetition period in milliseconds.
    pub const PERIOD: usize = 5;
    /// `cmd_data1..=cmd_data0`: iteration count, two bytes.
    pub const ITERATIONS: usize = 6;

    /// Raw bytes in register order.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Mode currently configured for `pin`.
    pub fn gpio_mode(&self, pin: GpioPin) -> GpioMode {
        GpioMode::from((self.0[Self::GPIO] >> pin.shift()) & 0x0F)
    }

    /// Replaces the mode of `pin`, leaving the other pin untouched.
    pub fn set_gpio_mode(&mut self, pin: GpioPin, mode: GpioMode) {
        let shift = pin.shift();
        let keep = self.0[Self::GPIO] & !(0x0F << shift);
        self.0[Self::GPIO] = keep | ((u8::from(mode) & 0x0F) << shift);
    }

    /// Repetition period in milliseconds.
    pub fn sampling_period(&self) -> u8 {
        self.0[Self::PERIOD]
    }

    /// Sets the repetition period in milliseconds.
    pub fn set_sampling_period(&mut self, period_ms: u8) {
        self.0[Self::PERIOD] = period_ms;
    }
}

impl Default for CommandData {
    /// Both GPIOs driven low, 100 ms period (AN000597, p. 22).
    fn default() -> Self {
        Self([0x03, 0x23, 0x44, 0x00, 0x00, 0x64, 0xD8, 0xA4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_command_data() {
        let data = CommandData::default();
        assert_eq!(data.gpio_mode(GpioPin::Gpio0), GpioMode::LowOutput);
        assert_eq!(data.gpio_mode(GpioPin::Gpio1), GpioMode::LowOutput);
        assert_eq!(data.sampling_period(), 100);
    }

    #[test]
    fn gpio_nibbles_are_independent() {
        let mut data = CommandData::default();
        data.set_gpio_mode(GpioPin::Gpio1, GpioMode::VcselPulse);
        assert_eq!(data.as_bytes()[CommandData::GPIO], 0x34);
        data.set_gpio_mode(GpioPin::Gpio0, GpioMode::HighOutput);
        assert_eq!(data.as_bytes()[CommandData::GPIO], 0x35);
        assert_eq!(data.gpio_mode(GpioPin::Gpio1), GpioMode::VcselPulse);
    }

    #[test]
    fn reserved_modes_round_trip() {
        assert_eq!(GpioMode::from(9), GpioMode::Reserved(9));
        assert_eq!(u8::from(GpioMode::Reserved(9)), 9);
        for code in 0..=5 {
            assert_eq!(u8::from(GpioMode::from(code)), code);
        }
    }
}
