mod port;

use crate::{GpioError, GpioResult};
use log::warn;
pub use port::*;
use std::fmt::Debug;

/// Fixed delays of the write protocol, in microseconds.
///
/// These are the values the driver was verified with on real hardware, with a good margin over
/// the datasheet. They are lower bounds: a delay may run longer, never shorter.
pub mod timing {
    /// Wait after power-up before the first instruction.
    pub const POWER_ON_US: u32 = 300_000;
    /// Wait after setting up RS and E, before the first nibble is presented.
    pub const SETTLE_US: u32 = 1;
    /// Width of the E pulse latching a nibble.
    pub const STROBE_US: u32 = 1_000;
    /// Wait after an instruction.
    pub const COMMAND_US: u32 = 50;
    /// Additional wait after [ClearDisplay](super::Command::ClearDisplay) and
    /// [ReturnHome](super::Command::ReturnHome).
    pub const SLOW_COMMAND_US: u32 = 1_500;
    /// Wait after a character.
    pub const DATA_US: u32 = 2;
}

/// Instructions of the HD44780 controller used by the driver.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Clears the display and moves the cursor home. Slow.
    ClearDisplay = 0x01,
    /// Moves the cursor to the first position and undoes any display shift. Slow.
    ReturnHome = 0x02,
    DisplayOff = 0x08,
    DisplayOnNoCursor = 0x0C,
    DisplayOnBlinkingCursor = 0x0D,
    DisplayOnLineCursor = 0x0E,
    DisplayOnLineBlinkingCursor = 0x0F,
    /// 4-bit interface, 2 lines, 5x8 font. The two lowest bits are don't-care.
    FunctionSet4Bit2Line5x8 = 0x2B,
    /// Sets the DDRAM address to the start of the first line.
    CursorToLine1 = 0x80,
    /// Sets the DDRAM address to the start of the second line.
    CursorToLine2 = 0xC0,
}

impl Command {
    /// Whether the controller needs [timing::SLOW_COMMAND_US] extra to execute the instruction.
    pub fn is_slow(self) -> bool {
        matches!(self, Command::ClearDisplay | Command::ReturnHome)
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = GpioError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        use Command::*;

        const COMMANDS: [Command; 10] = [
            ClearDisplay,
            ReturnHome,
            DisplayOff,
            DisplayOnNoCursor,
            DisplayOnBlinkingCursor,
            DisplayOnLineCursor,
            DisplayOnLineBlinkingCursor,
            FunctionSet4Bit2Line5x8,
            CursorToLine1,
            CursorToLine2,
        ];

        COMMANDS
            .into_iter()
            .find(|&command| command as u8 == code)
            .ok_or(GpioError::InvalidArgument)
    }
}

/// Display on/off and cursor style.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DisplayMode {
    Off,
    #[default]
    OnNoCursor,
    /// Blinking block at the cursor position.
    OnBlinkingCursor,
    /// Underline at the cursor position.
    OnLineCursor,
    OnLineBlinkingCursor,
}

impl From<DisplayMode> for Command {
    fn from(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Off => Command::DisplayOff,
            DisplayMode::OnNoCursor => Command::DisplayOnNoCursor,
            DisplayMode::OnBlinkingCursor => Command::DisplayOnBlinkingCursor,
            DisplayMode::OnLineCursor => Command::DisplayOnLineCursor,
            DisplayMode::OnLineBlinkingCursor => Command::DisplayOnLineBlinkingCursor,
        }
    }
}

pub trait HD44780Driver: Debug {
    /// Configures the lines, waits for the display to power up, switches it to 4-bit mode and
    /// sets it up: 2 lines, 5x8 font, cleared, cursor home, display on without cursor.
    ///
    /// There is no guard against calling it twice; every call runs the whole sequence again.
    fn init(&mut self) -> GpioResult<()>;

    /// Sends an instruction to the controller.
    /// Sets the RS pin to 0 (command).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends a character to be written at the cursor position.
    /// Sets the RS pin to 1 (data).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;

    fn command(&mut self, command: Command) -> GpioResult<()> {
        self.send_command(command.into())
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.command(Command::ClearDisplay)
    }

    /// Sets the cursor to the home position.
    fn return_home(&mut self) -> GpioResult<()> {
        self.command(Command::ReturnHome)
    }

    fn set_display(&mut self, mode: DisplayMode) -> GpioResult<()> {
        self.command(mode.into())
    }

    /// Moves the cursor to the start of the given line, counting from 0.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the line is not 0 or 1.
    fn set_line(&mut self, line: usize) -> GpioResult<()> {
        match line {
            0 => self.command(Command::CursorToLine1),
            1 => self.command(Command::CursorToLine2),
            _ => Err(GpioError::InvalidArgument),
        }
    }

    fn put_char(&mut self, c: u8) -> GpioResult<()> {
        self.send_data(c)
    }

    /// Writes the text from the cursor position, up to its end or the first NUL.
    ///
    /// Nothing is wrapped or clipped; past the end of a line the controller decides where the
    /// characters go. Non-ASCII characters are written as `?`.
    fn print(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars().take_while(|&c| c != '\0') {
            if c.is_ascii() {
                self.put_char(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.put_char(b'?')?;
            }
        }
        Ok(())
    }
}
