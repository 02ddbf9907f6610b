mod config;

use crate::config::Config;
use charlcd_gpio::delay::SpinDelay;
use charlcd_gpio::lcd::hd44780::driver::{HD44780Driver, PortHD44780Driver};
use dotenv::dotenv;
use log::{debug, info};
use std::thread;
use std::time::Duration;
use sysinfo::System;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("charlcd starting...");
    info!(
        "Host {} ({}), architecture {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    debug!("Trying to load config...");
    let config = match Config::try_load()? {
        Some(config) => {
            info!("Config loaded.");
            config
        }
        None => {
            info!("Config not found. Using default");
            let config = Config::default();
            config.save()?;
            info!("Default config saved.");
            config
        }
    };
    let config = config.with_env_overrides()?;

    let backend = config.backend()?;
    let pins = config.pins()?;

    info!(
        "LCD @ {} D4-D7: {}-{}, E: {}, RS: {}",
        backend,
        pins.base(),
        pins.base() + 3,
        pins.base() + 4,
        pins.base() + 5,
    );

    debug!("Opening GPIO port...");
    let port = backend.open()?;
    debug!("{:?} opened.", port);

    let mut delay = SpinDelay;
    let mut lcd = PortHD44780Driver::new(&*port, &mut delay, pins);

    lcd.init()?;
    debug!("{:?} initialized, lines {:032b}.", lcd, lcd.pins().mask());

    lcd.set_line(0)?;
    lcd.print(&config.line1)?;
    lcd.set_line(1)?;
    lcd.print(&config.line2)?;

    info!("Wrote {:?} / {:?}.", config.line1, config.line2);

    if !backend.is_hardware() {
        info!("No hardware attached, exiting.");
        return Ok(());
    }

    // Keep the lines driven
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}
