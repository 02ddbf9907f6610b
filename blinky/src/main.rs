use charlcd_gpio::backend::PortBackend;
use charlcd_gpio::delay::SleepDelay;
use charlcd_gpio::GpioPort;
use dotenv::dotenv;
use embedded_hal::delay::DelayNs;
use log::{debug, info, trace};
use std::env::var;
use std::str::FromStr;
use sysinfo::System;

/// Half of the blink period.
const HALF_PERIOD_MS: u32 = 500;

/// Parses an optional environment value, falling back to `default` when unset.
fn parse_var<T>(value: Option<String>, default: T) -> eyre::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => Ok(value.trim().parse()?),
        None => Ok(default),
    }
}

fn blink(port: &dyn GpioPort, delay: &mut impl DelayNs, mask: u32, toggles: Option<u64>) -> eyre::Result<()> {
    let mut count = 0u64;
    while toggles.is_none_or(|toggles| count < toggles) {
        port.toggle_bits(mask)?;
        trace!("Output: {:032b}", port.read_output()?);
        delay.delay_ms(HALF_PERIOD_MS);
        count += 1;
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!("Architecture {}", System::cpu_arch());

    let backend: PortBackend = parse_var(var("BLINKY_BACKEND").ok(), PortBackend::default())?;
    let pin: usize = parse_var(var("BLINKY_PIN").ok(), 20)?;
    let toggles: Option<u64> = var("BLINKY_TOGGLES")
        .ok()
        .map(|toggles| toggles.trim().parse())
        .transpose()?;

    debug!("Opening GPIO port...");
    let port = backend.open()?;
    if pin >= port.width() {
        eyre::bail!("Pin {} is out of range for {:?}", pin, port);
    }
    debug!("{:?} opened.", port);

    let mask = 1 << pin;
    port.configure_outputs(mask)?;

    info!("Blinking pin {} on {}", pin, backend);
    blink(&*port, &mut SleepDelay, mask, toggles)?;

    Ok(())
}
