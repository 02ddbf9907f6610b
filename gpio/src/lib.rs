pub mod backend;
pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod memory;
pub mod raw;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A bank of GPIO lines sharing a single output register.
///
/// Bit `n` of the register value drives line `n` of the port. Implementations are single-writer:
/// the register is read, modified and written back without any locking, so nothing else may drive
/// the same lines while a port is in use.
pub trait GpioPort: Debug {
    /// Gets the amount of lines in the port.
    fn width(&self) -> usize;

    /// Configures the masked lines as push-pull outputs.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the mask is empty or selects lines past [Self::width].
    fn configure_outputs(&self, mask: u32) -> GpioResult<()>;

    /// Reads the current value of the output register.
    fn read_output(&self) -> GpioResult<u32>;

    /// Writes the whole output register.
    fn write_output(&self, value: u32) -> GpioResult<()>;
}

impl dyn GpioPort + '_ {
    /// Replaces the masked bits of the output register with `bits`, leaving every other bit as it was.
    pub fn modify(&self, mask: u32, bits: u32) -> GpioResult<()> {
        let value = self.read_output()?;
        self.write_output((value & !mask) | (bits & mask))
    }

    /// Drives the masked lines high.
    pub fn set_bits(&self, mask: u32) -> GpioResult<()> {
        self.modify(mask, mask)
    }

    /// Drives the masked lines low.
    pub fn clear_bits(&self, mask: u32) -> GpioResult<()> {
        self.modify(mask, 0)
    }

    /// Flips the masked lines.
    pub fn toggle_bits(&self, mask: u32) -> GpioResult<()> {
        let value = self.read_output()?;
        self.write_output(value ^ mask)
    }

    /// Writes a nibble to the four lines starting at `shift`, LSb on the lowest line.
    pub fn write_nibble(&self, shift: usize, value: u8) -> GpioResult<()> {
        match shift.checked_add(4) {
            Some(end) if value <= 0b1111 && end <= self.width() => {}
            _ => return Err(GpioError::InvalidArgument),
        }

        self.modify(0b1111 << shift, (value as u32) << shift)
    }
}
