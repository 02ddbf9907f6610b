//! GPIO port over the Linux GPIO character device, using the gpiod library.
//!
//! Slower than [RawGpioPort](crate::raw::RawGpioPort), as every line change is an ioctl, but it
//! works on any board with a `/dev/gpiochipN` device.
use crate::{GpioError, GpioPort, GpioResult};
use log::debug;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};

/// GpiodPort exposes the first 32 lines of a gpiod chip as a [GpioPort].
///
/// The character device can't read back output levels, so the port keeps a shadow copy of the
/// output register and only pushes the bits that change.
pub struct GpiodPort {
    chip: gpiod::Chip,
    lines: RefCell<Vec<Option<gpiod::Lines<gpiod::Output>>>>,
    shadow: Cell<u32>,
}

impl GpiodPort {
    const MAX_WIDTH: usize = 32;

    pub fn new(chip: gpiod::Chip) -> Self {
        let width = (chip.num_lines() as usize).min(Self::MAX_WIDTH);
        Self {
            chip,
            lines: RefCell::new((0..width).map(|_| None).collect()),
            shadow: Cell::new(0),
        }
    }

    /// Opens the chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: &str) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path)?))
    }
}

impl Debug for GpiodPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodPort({})", self.chip.name())
    }
}

impl GpioPort for GpiodPort {
    fn width(&self) -> usize {
        self.lines.borrow().len()
    }

    fn configure_outputs(&self, mask: u32) -> GpioResult<()> {
        let width = self.width();
        if mask == 0 || (width < Self::MAX_WIDTH && mask >> width != 0) {
            return Err(GpioError::InvalidArgument);
        }

        let mut lines = self.lines.borrow_mut();
        for index in (0..width).filter(|&index| mask & (1 << index) != 0) {
            if lines[index].is_some() {
                continue;
            }

            let line = self.chip.request_lines(
                gpiod::Options::output([index as u32]).consumer(env!("CARGO_PKG_NAME")),
            )?;
            line.set_values([self.shadow.get() & (1 << index) != 0])?;
            lines[index] = Some(line);
        }

        debug!("{:?} outputs: {:032b}", self, mask);
        Ok(())
    }

    fn read_output(&self) -> GpioResult<u32> {
        Ok(self.shadow.get())
    }

    fn write_output(&self, value: u32) -> GpioResult<()> {
        let changed = value ^ self.shadow.get();
        let lines = self.lines.borrow();

        for index in (0..Self::MAX_WIDTH).filter(|&index| changed & (1 << index) != 0) {
            match lines.get(index).and_then(Option::as_ref) {
                Some(line) => line.set_values([value & (1 << index) != 0])?,
                None => debug_assert!(false, "write to line {} not configured as output", index),
            }
        }

        self.shadow.set(value);
        Ok(())
    }
}
