use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use embedded_hal::i2c::ErrorType;
use hdc2080::{
    Hdc2080, Hdc2080Builder, Interrupt, MeasurementMode, Profile, SlaveAddress, Thresholds,
};
use linux_embedded_hal::{Delay, I2cdev};

/// Exercise a HDC2080 humidity and temperature sensor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to I2C bus (e.g., /dev/i2c-1)
    #[arg(short, long, default_value = "/dev/i2c-1")]
    path: String,
    /// State of the ADDR pin (0: 0x40, 1: 0x41)
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    addr: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print chip information
    Info,
    /// Dump the register map
    Reg,
    /// Read continuously in auto measurement mode
    Read {
        /// Number of readings, 0 to run until Ctrl+C
        #[arg(short, long, default_value_t = 3)]
        times: u32,
    },
    /// Read on demand
    Shot {
        /// Number of readings, 0 to run until Ctrl+C
        #[arg(short, long, default_value_t = 3)]
        times: u32,
    },
    /// Watch the threshold interrupts
    Interrupt {
        /// Number of readings, 0 to run until Ctrl+C
        #[arg(short, long, default_value_t = 3)]
        times: u32,
        /// Temperature high threshold in °C
        #[arg(long, default_value_t = 30.0)]
        temperature_high: f32,
        /// Temperature low threshold in °C
        #[arg(long, default_value_t = 10.0)]
        temperature_low: f32,
        /// Humidity high threshold in %
        #[arg(long, default_value_t = 80.0)]
        humidity_high: f32,
        /// Humidity low threshold in %
        #[arg(long, default_value_t = 20.0)]
        humidity_low: f32,
    },
}

type Device = Hdc2080<I2cdev, Delay>;
type DeviceError = hdc2080::Error<<I2cdev as ErrorType>::Error>;

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    if let Command::Info = args.command {
        print_info();
        return;
    }
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            log::info!("[HDC] Received Ctrl+C, stopping...");
            running.store(false, Ordering::Relaxed);
        })
        .expect("Error setting Ctrl-C handler");
    }
    let address = if args.addr == 0 {
        SlaveAddress::ADDRESS_0
    } else {
        SlaveAddress::ADDRESS_1
    };
    log::info!("[HDC] Opening bus: {}", args.path);
    let i2c = I2cdev::new(&args.path).expect("Failed to open I2C device");
    let mut hdc = Hdc2080Builder::default()
        .with_address(address)
        .build(i2c, Delay);
    if let Err(e) = hdc.init() {
        log::error!(
            "[HDC] Sensor 0x{:02x}: Could not initialize: {e:?}",
            address.into_bits()
        );
        std::process::exit(1);
    }
    log::info!("[HDC] Device found at address 0x{:02x}", address.into_bits());

    let result = match args.command {
        Command::Info => Ok(()),
        Command::Reg => dump_registers(&mut hdc),
        Command::Read { times } => read(&mut hdc, times, &running),
        Command::Shot { times } => shot(&mut hdc, times, &running),
        Command::Interrupt {
            times,
            temperature_high,
            temperature_low,
            humidity_high,
            humidity_low,
        } => interrupt(
            &mut hdc,
            times,
            Thresholds {
                temperature_high,
                temperature_low,
                humidity_high,
                humidity_low,
            },
            &running,
        ),
    };
    if let Err(e) = result {
        log::error!("[HDC] {e:?}");
    }
    if let Err(e) = hdc.deinit() {
        log::warn!("[HDC] Could not deinitialize: {e:?}");
    }
}

fn print_info() {
    let info = hdc2080::info();
    println!("chip name: {}", info.chip_name);
    println!("manufacturer: {}", info.manufacturer_name);
    println!("interface: {}", info.interface);
    println!(
        "supply voltage: {:.2} V to {:.2} V",
        info.supply_voltage_min_v, info.supply_voltage_max_v
    );
    println!("max current: {:.1} mA", info.max_current_ma);
    println!(
        "temperature: {:.1} °C to {:.1} °C",
        info.temperature_min, info.temperature_max
    );
    println!("driver version: {}", info.driver_version);
}

fn dump_registers(hdc: &mut Device) -> Result<(), DeviceError> {
    for register in (0x00..=0x0F).chain(0xFC..=0xFF) {
        let value = hdc.read_register(register)?;
        println!("0x{register:02x}: 0x{value:02x} (0b{value:08b})");
    }
    Ok(())
}

/// Runs `f` once a second until `times` iterations are done, or until stopped when `times` is 0.
fn repeat<E>(
    times: u32,
    running: &AtomicBool,
    mut f: impl FnMut(u32) -> Result<(), E>,
) -> Result<(), E> {
    let mut count = 0;
    while running.load(Ordering::Relaxed) && (times == 0 || count < times) {
        let start = Instant::now();
        f(count)?;
        count += 1;
        if start.elapsed() < Duration::from_secs(1) {
            thread::sleep(Duration::from_secs(1) - start.elapsed());
        }
    }
    Ok(())
}

fn read(
    hdc: &mut Device,
    times: u32,
    running: &AtomicBool,
) -> Result<(), DeviceError> {
    hdc.apply_profile(&Profile::basic())?;
    repeat(times, running, |count| {
        let (temperature, humidity) = hdc.read_temperature_humidity()?;
        log::info!(
            "[HDC] {}/{times}: {:.2} °C, {:.2} %",
            count + 1,
            temperature.celsius(),
            humidity.percentage()
        );
        Ok(())
    })
}

fn shot(
    hdc: &mut Device,
    times: u32,
    running: &AtomicBool,
) -> Result<(), DeviceError> {
    hdc.apply_profile(&Profile::shot())?;
    repeat(times, running, |count| {
        let start = Instant::now();
        let sample = hdc.read_poll(
            MeasurementMode::TemperatureHumidity,
            Duration::from_millis(20),
        )?;
        log::info!(
            "[HDC] {}/{times}: {:.2} °C, {:.2} % in {:.2} ms",
            count + 1,
            sample.temperature.celsius(),
            sample.humidity.map(|h| h.percentage()).unwrap_or(f32::NAN),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    })
}

fn interrupt(
    hdc: &mut Device,
    times: u32,
    thresholds: Thresholds,
    running: &AtomicBool,
) -> Result<(), DeviceError> {
    hdc.apply_profile(&Profile::interrupt(thresholds))?;
    log::info!(
        "[HDC] Thresholds: {:.2}..{:.2} °C, {:.2}..{:.2} %",
        hdc.get_temperature_low_threshold()?,
        hdc.get_temperature_high_threshold()?,
        hdc.get_humidity_low_threshold()?,
        hdc.get_humidity_high_threshold()?
    );
    repeat(times, running, |count| {
        // polling for data ready clears the status, so take it first
        let status = hdc.get_interrupt_status()?;
        let (temperature, humidity) = hdc.read_temperature_humidity()?;
        log::info!(
            "[HDC] {}/{times}: {:.2} °C, {:.2} %",
            count + 1,
            temperature.celsius(),
            humidity.percentage()
        );
        for source in Interrupt::ALL
            .into_iter()
            .filter(|&source| source != Interrupt::DataReady && status.flag(source))
        {
            log::warn!("[HDC] Interrupt: {source:?}");
        }
        Ok(())
    })
}
