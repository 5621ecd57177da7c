//! Simulated TMF8801 for unit tests.
//!
//! Implements the blocking `I2c` trait on top of a 256-byte register file and
//! models the parts of the chip the boot sequence depends on: the self-clearing
//! CPU reset, the application load, the command register and the interrupt
//! status register. Poll counts are configurable so that timeouts can be hit
//! deterministically.

extern crate std;

use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::register::{command, contents, enable, Register, APPLICATION, BOOTLOADER, CHIP_ID};
use crate::register::{CalibrationData, DEFAULT_I2C_ADDRESS, INTERRUPT_BIT};

const ENABLE: u8 = Register::Enable as u8;
const APP_ID: u8 = Register::AppId as u8;
const APP_REQ_ID: u8 = Register::AppReqId as u8;
const COMMAND: u8 = Register::Command as u8;
const CONTENTS: u8 = Register::RegisterContents as u8;
const INT_STATUS: u8 = Register::IntStatus as u8;

/// Number of "not yet" answers before a condition is reported as met.
/// `None` never reports it.
pub type PollsBefore = Option<u32>;

#[derive(Debug)]
pub struct SimulatedTmf8801 {
    pub registers: [u8; 256],
    pub address: u8,
    pub present: bool,
    /// Register file only, no chip behaviour.
    passive: bool,

    pub cpu_ready_after: PollsBefore,
    /// CPU resets after which the CPU never reports ready again.
    pub hang_after_resets: Option<u32>,
    pub app_ready_after: PollsBefore,
    pub serial_ready_after: PollsBefore,
    pub calibration_ready_after: PollsBefore,
    /// Power-on requests dropped before one takes effect.
    pub lost_power_ups: u32,

    pub serial_number: u16,
    pub factory_calibration: CalibrationData,
    pub result: [u8; 4],

    /// Payload writes in order: register followed by the bytes written.
    pub writes: Vec<(u8, Vec<u8>)>,
    pub cpu_resets: u32,
    pub enable_polls: u32,
    pub app_id_polls: u32,
    pub contents_polls: u32,

    cpu_reset_pending: bool,
    app_load_pending: bool,
    pending_contents: Option<u8>,
}

impl SimulatedTmf8801 {
    /// A chip that answers every poll immediately.
    pub fn new() -> Self {
        let mut registers = [0u8; 256];
        registers[Register::Id as usize] = CHIP_ID;
        registers[Register::AppId as usize] = BOOTLOADER;
        registers[Register::AppRevMajor as usize] = 0x01;
        registers[Register::AppRevMinor as usize] = 0x02;
        registers[Register::RevId as usize] = 0x01;
        registers[ENABLE as usize] = enable::POWERED_AND_READY;
        Self {
            registers,
            address: DEFAULT_I2C_ADDRESS,
            present: true,
            passive: false,
            cpu_ready_after: Some(0),
            hang_after_resets: None,
            app_ready_after: Some(0),
            serial_ready_after: Some(0),
            calibration_ready_after: Some(0),
            lost_power_ups: 0,
            serial_number: 0xBEEF,
            factory_calibration: [
                0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D,
            ],
            result: [0; 4],
            writes: Vec::new(),
            cpu_resets: 0,
            enable_polls: 0,
            app_id_polls: 0,
            contents_polls: 0,
            cpu_reset_pending: false,
            app_load_pending: false,
            pending_contents: None,
        }
    }

    /// Plain memory: every register reads back what was last written to it.
    pub fn register_file() -> Self {
        Self {
            registers: [0u8; 256],
            passive: true,
            ..Self::new()
        }
    }

    pub fn writes_to(&self, register: Register) -> impl Iterator<Item = &Vec<u8>> {
        let register = register as u8;
        self.writes
            .iter()
            .filter(move |(r, _)| *r == register)
            .map(|(_, data)| data)
    }

    pub fn wrote(&self, register: Register) -> bool {
        self.writes_to(register).next().is_some()
    }

    fn write_register(&mut self, register: u8, value: u8) {
        if self.passive {
            self.registers[register as usize] = value;
            return;
        }
        match register {
            ENABLE => {
                if value & (1 << enable::CPU_RESET) != 0 {
                    // reset clears itself and drops cpu_ready until polled enough
                    self.cpu_reset_pending = true;
                    self.cpu_resets += 1;
                    self.enable_polls = 0;
                    self.registers[APP_ID as usize] = BOOTLOADER;
                    self.registers[ENABLE as usize] = value & !(1 << enable::CPU_RESET);
                    self.registers[ENABLE as usize] &= !(1 << enable::CPU_READY);
                } else if value & (1 << enable::PON) != 0 && self.lost_power_ups > 0 {
                    self.lost_power_ups -= 1;
                } else {
                    self.registers[ENABLE as usize] = value;
                    if value & (1 << enable::PON) != 0 {
                        self.registers[ENABLE as usize] |= 1 << enable::CPU_READY;
                    }
                }
            }
            APP_REQ_ID => {
                self.registers[APP_REQ_ID as usize] = value;
                if value == APPLICATION {
                    self.app_load_pending = true;
                    self.app_id_polls = 0;
                }
            }
            COMMAND => {
                self.registers[COMMAND as usize] = value;
                self.contents_polls = 0;
                self.registers[CONTENTS as usize] = 0;
                self.pending_contents = match value {
                    command::SERIAL => Some(contents::SERIAL),
                    command::FACTORY_CALIBRATION => Some(contents::CALIBRATION),
                    command::MEASURE => {
                        self.registers[0x20..0x24].copy_from_slice(&self.result);
                        self.registers[CONTENTS as usize] = contents::RESULT;
                        None
                    }
                    _ => None,
                };
            }
            INT_STATUS => {
                // write one to clear
                self.registers[INT_STATUS as usize] &= !value;
            }
            _ => self.registers[register as usize] = value,
        }
    }

    fn read_register(&mut self, register: u8) -> u8 {
        if self.passive {
            return self.registers[register as usize];
        }
        match register {
            ENABLE if self.cpu_reset_pending => {
                let hung = self
                    .hang_after_resets
                    .is_some_and(|resets| self.cpu_resets > resets);
                if !hung && ready(self.cpu_ready_after, self.enable_polls) {
                    self.cpu_reset_pending = false;
                    self.registers[ENABLE as usize] |= 1 << enable::CPU_READY;
                }
                self.enable_polls += 1;
            }
            APP_ID if self.app_load_pending => {
                if ready(self.app_ready_after, self.app_id_polls) {
                    self.app_load_pending = false;
                    self.registers[APP_ID as usize] = APPLICATION;
                }
                self.app_id_polls += 1;
            }
            CONTENTS => {
                if let Some(marker) = self.pending_contents {
                    let after = match marker {
                        contents::SERIAL => self.serial_ready_after,
                        _ => self.calibration_ready_after,
                    };
                    if ready(after, self.contents_polls) {
                        self.pending_contents = None;
                        self.publish(marker);
                    }
                }
                self.contents_polls += 1;
            }
            _ => {}
        }
        self.registers[register as usize]
    }

    fn publish(&mut self, marker: u8) {
        match marker {
            contents::SERIAL => {
                let serial = self.serial_number.to_le_bytes();
                self.registers[0x28..0x2A].copy_from_slice(&serial);
            }
            _ => {
                let calibration = self.factory_calibration;
                self.registers[0x20..0x2E].copy_from_slice(&calibration);
            }
        }
        self.registers[CONTENTS as usize] = marker;
    }

    /// Raises the measurement interrupt flag.
    pub fn raise_interrupt(&mut self) {
        self.registers[INT_STATUS as usize] |= 1 << INTERRUPT_BIT;
    }
}

fn ready(after: PollsBefore, polls: u32) -> bool {
    after.is_some_and(|after| polls >= after)
}

impl ErrorType for SimulatedTmf8801 {
    type Error = ErrorKind;
}

impl I2c for SimulatedTmf8801 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if !self.present || address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let mut pointer: Option<u8> = None;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    // the first byte of a transaction selects the register,
                    // adjacent writes continue where the previous one stopped
                    let (start, payload): (u8, &[u8]) = match (pointer, bytes.split_first()) {
                        (Some(pointer), _) => (pointer, &bytes[..]),
                        (None, Some((&register, payload))) => (register, payload),
                        (None, None) => continue,
                    };
                    if !payload.is_empty() {
                        self.writes.push((start, payload.to_vec()));
                    }
                    for (offset, &value) in payload.iter().enumerate() {
                        #[allow(clippy::cast_possible_truncation)]
                        self.write_register(start.wrapping_add(offset as u8), value);
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let next = start.wrapping_add(payload.len() as u8);
                    pointer = Some(next);
                }
                Operation::Read(buffer) => {
                    let start = pointer.unwrap_or(0);
                    for (offset, byte) in buffer.iter_mut().enumerate() {
                        #[allow(clippy::cast_possible_truncation)]
                        let register = start.wrapping_add(offset as u8);
                        *byte = self.read_register(register);
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let next = start.wrapping_add(buffer.len() as u8);
                    pointer = Some(next);
                }
            }
        }
        Ok(())
    }
}

/// Delay that only adds up the time it was asked to wait.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub total_ns: u64,
    pub calls: u32,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }
}
