//! In-memory GPIO port, used for dry runs and tests.

use crate::{GpioError, GpioPort, GpioResult};
use log::trace;
use std::cell::{Cell, RefCell};

/// A [GpioPort] backed by a plain variable instead of hardware.
///
/// Like a real output data register, every bit latches whatever is written to it, whether or not
/// the line was configured as an output.
#[derive(Debug, Default)]
pub struct MemoryPort {
    output: Cell<u32>,
    outputs: Cell<u32>,
    history: Option<RefCell<Vec<u32>>>,
}

impl MemoryPort {
    const WIDTH: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a port that remembers every value written to the output register.
    pub fn recording() -> Self {
        MemoryPort {
            history: Some(RefCell::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Gets the mask of lines configured as outputs so far.
    pub fn outputs(&self) -> u32 {
        self.outputs.get()
    }

    /// Gets every value written to the output register, oldest first.
    ///
    /// Empty unless the port was created with [Self::recording].
    pub fn history(&self) -> Vec<u32> {
        self.history
            .as_ref()
            .map(|history| history.borrow().clone())
            .unwrap_or_default()
    }
}

impl GpioPort for MemoryPort {
    fn width(&self) -> usize {
        Self::WIDTH
    }

    fn configure_outputs(&self, mask: u32) -> GpioResult<()> {
        if mask == 0 {
            return Err(GpioError::InvalidArgument);
        }
        self.outputs.set(self.outputs.get() | mask);
        trace!("MemoryPort outputs: {:032b}", self.outputs.get());
        Ok(())
    }

    fn read_output(&self) -> GpioResult<u32> {
        Ok(self.output.get())
    }

    fn write_output(&self, value: u32) -> GpioResult<()> {
        trace!("MemoryPort <- {:032b}", value);
        self.output.set(value);
        if let Some(history) = &self.history {
            history.borrow_mut().push(value);
        }
        Ok(())
    }
}
