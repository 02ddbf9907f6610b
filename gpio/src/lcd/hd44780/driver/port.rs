use crate::lcd::hd44780::driver::{timing, Command, DisplayMode, HD44780Driver};
use crate::{GpioError, GpioPort, GpioResult};
use embedded_hal::delay::DelayNs;
use log::{debug, trace};
use std::fmt::{Debug, Formatter};

/// Where the display lines sit on the port: six contiguous lines starting at `base`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PinMap {
    base: usize,
}

impl PinMap {
    /// D4..D7, E and RS.
    pub const LINES: usize = 6;

    pub fn new(base: usize) -> GpioResult<Self> {
        match base.checked_add(Self::LINES) {
            Some(end) if end <= u32::BITS as usize => {}
            _ => return Err(GpioError::InvalidArgument),
        }
        Ok(PinMap { base })
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// D4..D7, LSb on D4.
    pub fn data_mask(&self) -> u32 {
        0b1111 << self.base
    }

    pub fn e_mask(&self) -> u32 {
        1 << (self.base + 4)
    }

    pub fn rs_mask(&self) -> u32 {
        1 << (self.base + 5)
    }

    pub fn mask(&self) -> u32 {
        self.data_mask() | self.e_mask() | self.rs_mask()
    }
}

/// HD44780 driver bit-banging the 4-bit write protocol on a [GpioPort].
///
/// Each byte goes out as two nibbles, upper first, each latched by a [timing::STROBE_US] pulse on
/// E. The data lines only change while E is low.
pub struct PortHD44780Driver<'a> {
    port: &'a dyn GpioPort,
    delay: &'a mut dyn DelayNs,
    pins: PinMap,
}

impl<'a> PortHD44780Driver<'a> {
    /// Creates a new driver. Nothing is written to the port until [HD44780Driver::init].
    pub fn new(port: &'a dyn GpioPort, delay: &'a mut dyn DelayNs, pins: PinMap) -> Self {
        PortHD44780Driver { port, delay, pins }
    }

    pub fn pins(&self) -> PinMap {
        self.pins
    }

    fn pulse_e(&mut self) -> GpioResult<()> {
        self.port.set_bits(self.pins.e_mask())?;
        self.delay.delay_us(timing::STROBE_US);
        self.port.clear_bits(self.pins.e_mask())
    }

    fn write_nibble(&mut self, nibble: u8) -> GpioResult<()> {
        self.port.write_nibble(self.pins.base(), nibble)
    }

    /// Sets RS, lowers E and clocks the byte out, upper nibble first.
    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        let rs_bits = if rs { self.pins.rs_mask() } else { 0 };
        self.port.modify(self.pins.e_mask() | self.pins.rs_mask(), rs_bits)?;
        self.delay.delay_us(timing::SETTLE_US);

        let high_nibble = (data >> 4) & 0x0F;
        let low_nibble = data & 0x0F;

        trace!("Writing HN: {:04b}", high_nibble);
        self.write_nibble(high_nibble)?;
        self.pulse_e()?;

        trace!("Writing LN: {:04b}", low_nibble);
        self.write_nibble(low_nibble)?;
        self.pulse_e()
    }
}

impl Debug for PortHD44780Driver<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PortHD44780Driver({:?}, base {})", self.port, self.pins.base())
    }
}

impl HD44780Driver for PortHD44780Driver<'_> {
    fn init(&mut self) -> GpioResult<()> {
        debug!("Initializing {:?}", self);

        self.port.configure_outputs(self.pins.mask())?;
        self.delay.delay_us(timing::POWER_ON_US);

        self.port.clear_bits(self.pins.e_mask() | self.pins.rs_mask())?;
        self.delay.delay_us(timing::SETTLE_US);

        // Still in 8-bit mode: a single function set nibble with DL=0 switches to 4-bit
        self.write_nibble(0x2)?;
        self.pulse_e()?;

        self.command(Command::FunctionSet4Bit2Line5x8)?;
        self.clear_display()?;
        self.return_home()?;
        self.set_display(DisplayMode::OnNoCursor)
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)?;
        self.delay.delay_us(timing::COMMAND_US);
        if Command::try_from(command).is_ok_and(Command::is_slow) {
            self.delay.delay_us(timing::SLOW_COMMAND_US);
        }
        Ok(())
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, true)?;
        self.delay.delay_us(timing::DATA_US);
        Ok(())
    }
}
