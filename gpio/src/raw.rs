//! Raw GPIO port, driving the BCM283x/BCM2711 GPIO block through a memory mapping.

use crate::{GpioError, GpioPort, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// [GpioPort] over the first GPIO register bank (GPIO 0-31) of the Broadcom SoC.
///
/// The BCM GPIO block has no single output data register. Levels are read back from `GPLEV0`
/// and only the bits that actually change get written, high ones to `GPSET0` and low ones to
/// `GPCLR0`. Only lines configured through [GpioPort::configure_outputs] are ever driven; the
/// other bits of a written value are ignored.
pub struct RawGpioPort {
    mmap: MmapRaw,
    outputs: BitVec<AtomicU8>,
}

impl RawGpioPort {
    /// GPIO block address on the BCM2837. The BCM2711 (Pi 4) has it at `0xFE200000`.
    pub const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 32;

    const GPSET0: usize = 0x1c / 4;
    const GPCLR0: usize = 0x28 / 4;
    const GPLEV0: usize = 0x34 / 4;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        debug!("Mapped GPIO block from {} at offset {:#x}", path, offset);

        Ok(RawGpioPort {
            mmap,
            outputs: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps the GPIO block through `/dev/gpiomem`, which exposes only that block and needs no root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    /// Maps the GPIO block through `/dev/mem`, at [Self::GPIO_BASE].
    pub fn new_mem() -> GpioResult<Self> {
        Self::new_mem_at(Self::GPIO_BASE)
    }

    /// Maps the GPIO block through `/dev/mem`, at the given physical address.
    pub fn new_mem_at(gpio_base: u32) -> GpioResult<Self> {
        Self::create("/dev/mem", gpio_base as u64)
    }

    fn register(&self, index: usize) -> *mut u32 {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        unsafe { mmap.add(index) }
    }

    pub fn raw_get_pin_function(&self, pin_index: usize) -> GpioResult<u32> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        // GPFSELn register
        let register_ptr = self.register(pin_index / 10);
        let shift = (pin_index % 10) * 3;

        let register_value = unsafe { register_ptr.read_volatile() };
        Ok((register_value >> shift) & 0b111)
    }

    pub fn raw_set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 || pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        // GPFSELn register
        let register_ptr = self.register(pin_index / 10);
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift); // Clear the bits for this pin
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    fn output_mask(&self) -> u32 {
        self.outputs
            .iter_ones()
            .fold(0, |mask, index| mask | (1 << index))
    }
}

impl Debug for RawGpioPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioPort({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioPort for RawGpioPort {
    fn width(&self) -> usize {
        Self::PIN_COUNT
    }

    fn configure_outputs(&self, mask: u32) -> GpioResult<()> {
        if mask == 0 {
            return Err(GpioError::InvalidArgument);
        }

        // Output function is 0b001; BCM outputs are always push-pull
        for index in (0..Self::PIN_COUNT).filter(|&index| mask & (1 << index) != 0) {
            self.raw_set_pin_function(index, 1)?;
            self.outputs.set_aliased(index, true);
        }

        debug!("{:?} outputs: {:032b}", self, self.output_mask());
        Ok(())
    }

    fn read_output(&self) -> GpioResult<u32> {
        Ok(unsafe { self.register(Self::GPLEV0).read_volatile() })
    }

    fn write_output(&self, value: u32) -> GpioResult<()> {
        // Lines we don't own may change level between reads; never drive them
        let changed = (value ^ self.read_output()?) & self.output_mask();

        let set = value & changed;
        let clear = !value & changed;
        if set != 0 {
            unsafe { self.register(Self::GPSET0).write_volatile(set) };
        }
        if clear != 0 {
            unsafe { self.register(Self::GPCLR0).write_volatile(clear) };
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BANK: u32 = 0b11_1111 << 20;

    /// Plain file mapped in place of the GPIO block.
    struct FakeGpioMem {
        path: PathBuf,
    }

    impl FakeGpioMem {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("charlcd-gpiomem-{}-{}", name, std::process::id()));
            std::fs::write(&path, vec![0u8; 4096]).unwrap();
            FakeGpioMem { path }
        }

        fn open(&self) -> RawGpioPort {
            RawGpioPort::create(self.path.to_str().unwrap(), 0).unwrap()
        }
    }

    impl Drop for FakeGpioMem {
        fn drop(&mut self) {
            _ = std::fs::remove_file(&self.path);
        }
    }

    fn peek(port: &RawGpioPort, index: usize) -> u32 {
        unsafe { port.register(index).read_volatile() }
    }

    fn poke(port: &RawGpioPort, index: usize, value: u32) {
        unsafe { port.register(index).write_volatile(value) }
    }

    #[test]
    fn configure_outputs_selects_output_function() {
        let mem = FakeGpioMem::new("fsel");
        let port = mem.open();

        port.configure_outputs(BANK).unwrap();

        for index in 20..26 {
            assert_eq!(port.raw_get_pin_function(index).unwrap(), 0b001, "GPIO{}", index);
        }
        assert_eq!(port.raw_get_pin_function(19).unwrap(), 0);
        assert_eq!(port.raw_get_pin_function(26).unwrap(), 0);
        // GPFSEL2 holds GPIO20..29, three bits each
        assert_eq!(peek(&port, 2), 0b001_001_001_001_001_001);

        assert_eq!(port.configure_outputs(0), Err(GpioError::InvalidArgument));
        assert_eq!(port.raw_get_pin_function(32), Err(GpioError::InvalidArgument));
    }

    #[test]
    fn write_splits_changes_into_set_and_clear() {
        let mem = FakeGpioMem::new("split");
        let port = mem.open();
        port.configure_outputs(BANK).unwrap();

        poke(&port, RawGpioPort::GPLEV0, (1 << 21) | (1 << 22));
        port.write_output((1 << 20) | (1 << 22)).unwrap();

        assert_eq!(peek(&port, RawGpioPort::GPSET0), 1 << 20);
        assert_eq!(peek(&port, RawGpioPort::GPCLR0), 1 << 21);
    }

    #[test]
    fn unchanged_value_writes_nothing() {
        let mem = FakeGpioMem::new("idle");
        let port = mem.open();
        port.configure_outputs(BANK).unwrap();

        poke(&port, RawGpioPort::GPLEV0, 1 << 23);
        port.write_output(1 << 23).unwrap();

        assert_eq!(peek(&port, RawGpioPort::GPSET0), 0);
        assert_eq!(peek(&port, RawGpioPort::GPCLR0), 0);
    }

    #[test]
    fn lines_not_configured_are_never_driven() {
        let mem = FakeGpioMem::new("foreign");
        let port = mem.open();
        port.configure_outputs(BANK).unwrap();

        // UART TX (GPIO14) goes high after the value was computed
        let value = port.read_output().unwrap() | (1 << 24);
        poke(&port, RawGpioPort::GPLEV0, 1 << 14);
        port.write_output(value).unwrap();

        assert_eq!(peek(&port, RawGpioPort::GPSET0), 1 << 24);
        assert_eq!(peek(&port, RawGpioPort::GPCLR0), 0);

        // Bits set for lines outside the bank are ignored as well
        poke(&port, RawGpioPort::GPSET0, 0);
        poke(&port, RawGpioPort::GPLEV0, 0);
        let port: &dyn GpioPort = &port;
        port.set_bits((1 << 3) | (1 << 25)).unwrap();

        let raw = mem.open();
        assert_eq!(peek(&raw, RawGpioPort::GPSET0), 1 << 25);
    }
}
