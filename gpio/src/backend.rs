//! Selecting a [GpioPort] implementation at runtime.

use crate::gpiod::GpiodPort;
use crate::memory::MemoryPort;
use crate::raw::RawGpioPort;
use crate::{GpioError, GpioPort, GpioResult};
use std::fmt::Display;
use std::str::FromStr;

/// The GPIO port backends that can be opened by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum PortBackend {
    /// [RawGpioPort] through `/dev/gpiomem`.
    #[default]
    GpioMem,
    /// [RawGpioPort] through `/dev/mem`.
    Mem,
    /// [GpiodPort] on the chip at the given path.
    Gpiod(String),
    /// [MemoryPort], for running without hardware.
    Memory,
}

impl PortBackend {
    const DEFAULT_CHIP: &'static str = "/dev/gpiochip0";

    /// Opens the backend.
    pub fn open(&self) -> GpioResult<Box<dyn GpioPort>> {
        let port: Box<dyn GpioPort> = match self {
            PortBackend::GpioMem => Box::new(RawGpioPort::new_gpiomem()?),
            PortBackend::Mem => Box::new(RawGpioPort::new_mem()?),
            PortBackend::Gpiod(path) => Box::new(GpiodPort::open(path)?),
            PortBackend::Memory => Box::new(MemoryPort::new()),
        };
        Ok(port)
    }

    /// Whether the backend drives real hardware.
    pub fn is_hardware(&self) -> bool {
        !matches!(self, PortBackend::Memory)
    }
}

impl FromStr for PortBackend {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gpiomem" => Ok(PortBackend::GpioMem),
            "mem" => Ok(PortBackend::Mem),
            "memory" => Ok(PortBackend::Memory),
            "gpiod" => Ok(PortBackend::Gpiod(Self::DEFAULT_CHIP.to_string())),
            s => match s.strip_prefix("gpiod:") {
                Some(path) if !path.is_empty() => Ok(PortBackend::Gpiod(path.to_string())),
                _ => Err(GpioError::Other(format!("unknown port backend `{}`", s))),
            },
        }
    }
}

impl Display for PortBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortBackend::GpioMem => write!(f, "gpiomem"),
            PortBackend::Mem => write!(f, "mem"),
            PortBackend::Gpiod(path) => write!(f, "gpiod:{}", path),
            PortBackend::Memory => write!(f, "memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("gpiomem".parse::<PortBackend>(), Ok(PortBackend::GpioMem));
        assert_eq!(" mem ".parse::<PortBackend>(), Ok(PortBackend::Mem));
        assert_eq!("memory".parse::<PortBackend>(), Ok(PortBackend::Memory));
        assert_eq!(
            "gpiod".parse::<PortBackend>(),
            Ok(PortBackend::Gpiod("/dev/gpiochip0".to_string()))
        );
        assert_eq!(
            "gpiod:/dev/gpiochip4".parse::<PortBackend>(),
            Ok(PortBackend::Gpiod("/dev/gpiochip4".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_backends() {
        assert!("gpiod:".parse::<PortBackend>().is_err());
        assert!("sysfs".parse::<PortBackend>().is_err());
    }

    #[test]
    fn display_parses_back() {
        let backend = PortBackend::Gpiod("/dev/gpiochip1".to_string());
        assert_eq!(backend.to_string().parse::<PortBackend>(), Ok(backend));
    }

    #[test]
    fn memory_backend_opens_anywhere() {
        let port = PortBackend::Memory.open().unwrap();
        assert_eq!(port.width(), 32);
        assert!(!PortBackend::Memory.is_hardware());
    }
}
