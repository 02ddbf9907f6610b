//! Blocking delays for bit-banged protocols.
//!
//! Both delays implement [DelayNs], so drivers take any `embedded-hal` delay and tests can swap in
//! a recording one.

use embedded_hal::delay::DelayNs;
use std::hint::spin_loop;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Busy-waits on the monotonic clock.
///
/// Never returns early and doesn't give up the CPU, so the wait isn't stretched by the scheduler
/// as long as the thread isn't preempted.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpinDelay;

impl SpinDelay {
    fn wait(duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            spin_loop();
        }
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        Self::wait(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        Self::wait(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        Self::wait(Duration::from_millis(ms.into()));
    }
}

/// Sleeps the current thread.
///
/// The kernel only guarantees a lower bound, so short waits can take a lot longer than asked.
#[derive(Copy, Clone, Debug, Default)]
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms.into()));
    }
}
