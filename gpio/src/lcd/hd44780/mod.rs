//! HD44780 character LCD module.
//!
//! Write-only 4-bit driver: the R/W pin of the display is tied to GND, so the busy flag can't be
//! polled and every instruction is followed by a fixed delay long enough for the controller to
//! finish it. See [driver::timing] for the values.
//!
//! The display sits on six contiguous lines of a [GpioPort](crate::GpioPort), in this order:
//!
//! | Line       | Display pin |
//! |------------|-------------|
//! | `base + 0` | D4          |
//! | `base + 1` | D5          |
//! | `base + 2` | D6          |
//! | `base + 3` | D7          |
//! | `base + 4` | E           |
//! | `base + 5` | RS          |
//!
//! D0..D3 of the display are tied to GND.

pub mod driver;
