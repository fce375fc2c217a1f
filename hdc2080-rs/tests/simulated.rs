//! Drives the driver against a simulated HDC2080 with a virtual clock.
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use embedded_hal::{
    delay::DelayNs,
    i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation},
};
use hdc2080::{
    AcquisitionState, AutoMeasurementMode, Error, Hdc2080, Hdc2080Builder, MeasurementMode,
    Profile, Resolution, SlaveAddress, Thresholds,
};

const DEFAULTS: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xFF, 0x00, 0xFF, 0x00,
    0x00,
];
const RESET_TIME_NS: u64 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Access {
    at: u64,
    write: bool,
    register: u8,
    len: usize,
}

struct Chip {
    address: u8,
    regs: [u8; 256],
    pointer: u8,
    temperature: u16,
    humidity: u16,
    conversion_done_at: Option<u64>,
    next_auto_sample: Option<u64>,
    reset_done_at: Option<u64>,
    stuck_reset: bool,
    log: Vec<Access>,
}

impl Chip {
    fn new(address: u8) -> Self {
        let mut regs = [0u8; 256];
        regs[..16].copy_from_slice(&DEFAULTS);
        regs[0xFC..].copy_from_slice(&[0x49, 0x54, 0xD0, 0x07]);
        Self {
            address,
            regs,
            pointer: 0,
            temperature: 0x8000,
            humidity: 0x4000,
            conversion_done_at: None,
            next_auto_sample: None,
            reset_done_at: None,
            stuck_reset: false,
            log: Vec::new(),
        }
    }

    fn auto_period_ns(&self) -> Option<u64> {
        let period_ms = match (self.regs[0x0E] >> 4) & 0b111 {
            0 => return None,
            1 => 120_000,
            2 => 60_000,
            3 => 10_000,
            4 => 5_000,
            5 => 1_000,
            6 => 500,
            _ => 200,
        };
        Some(period_ms * 1_000_000)
    }

    fn temperature_only(&self) -> bool {
        (self.regs[0x0F] >> 1) & 0b11 == 1
    }

    fn conversion_ns(&self) -> u64 {
        let tres = [610, 350, 225, 610][(self.regs[0x0F] >> 6) as usize];
        let hres = [660, 400, 275, 660][((self.regs[0x0F] >> 4) & 0b11) as usize];
        if self.temperature_only() {
            tres * 1000
        } else {
            (tres + hres) * 1000
        }
    }

    fn sample(&mut self) {
        self.regs[0..2].copy_from_slice(&self.temperature.to_le_bytes());
        if !self.temperature_only() {
            self.regs[2..4].copy_from_slice(&self.humidity.to_le_bytes());
        }
        self.regs[0x04] |= 0x80;
    }

    fn update(&mut self, now: u64) {
        if self.reset_done_at.is_some_and(|t| t <= now) {
            self.regs[0x0E] &= !0x80;
            self.reset_done_at = None;
        }
        if self.conversion_done_at.is_some_and(|t| t <= now) {
            self.sample();
            self.regs[0x0F] &= !0x01;
            self.conversion_done_at = None;
        }
        while let Some(t) = self.next_auto_sample {
            if t > now {
                break;
            }
            self.sample();
            self.next_auto_sample = self.auto_period_ns().map(|p| t + p);
        }
    }

    fn reset(&mut self, now: u64) {
        self.regs[..16].copy_from_slice(&DEFAULTS);
        self.regs[0x0E] = 0x80;
        self.conversion_done_at = None;
        self.next_auto_sample = None;
        self.reset_done_at = (!self.stuck_reset).then_some(now + RESET_TIME_NS);
    }

    fn store(&mut self, now: u64, register: u8, value: u8) {
        match register {
            0x0E => {
                if value & 0x80 != 0 {
                    self.reset(now);
                    return;
                }
                let old = self.regs[0x0E] & 0x70;
                self.regs[0x0E] = value;
                if value & 0x70 != old {
                    self.next_auto_sample = self.auto_period_ns().map(|p| now + p);
                }
            }
            0x0F => {
                self.regs[0x0F] = value;
                if value & 0x01 != 0 && self.auto_period_ns().is_none() {
                    self.conversion_done_at = Some(now + self.conversion_ns());
                }
            }
            0x00..=0x04 | 0xFC..=0xFF => {}
            _ => self.regs[register as usize] = value,
        }
    }

    fn load(&mut self, register: u8) -> u8 {
        let value = self.regs[register as usize];
        if register == 0x04 {
            self.regs[0x04] = 0;
        }
        value
    }

    fn write(&mut self, now: u64, bytes: &[u8]) {
        let Some((&register, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = register;
        if !data.is_empty() {
            self.log.push(Access {
                at: now,
                write: true,
                register,
                len: data.len(),
            });
        }
        for &value in data {
            self.store(now, self.pointer, value);
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    fn read(&mut self, now: u64, buffer: &mut [u8]) {
        self.log.push(Access {
            at: now,
            write: false,
            register: self.pointer,
            len: buffer.len(),
        });
        for byte in buffer.iter_mut() {
            *byte = self.load(self.pointer);
            self.pointer = self.pointer.wrapping_add(1);
        }
    }
}

#[derive(Clone)]
struct SimBus {
    chips: Vec<Rc<RefCell<Chip>>>,
    clock: Rc<Cell<u64>>,
}

impl ErrorType for SimBus {
    type Error = ErrorKind;
}

impl I2c for SimBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let chip = self
            .chips
            .iter()
            .find(|chip| chip.borrow().address == address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
        let now = self.clock.get();
        let mut chip = chip.borrow_mut();
        chip.update(now);
        for operation in operations {
            match operation {
                Operation::Write(bytes) => chip.write(now, bytes),
                Operation::Read(buffer) => chip.read(now, buffer),
            }
        }
        Ok(())
    }
}

struct SimDelay {
    clock: Rc<Cell<u64>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.set(self.clock.get() + ns as u64);
    }
}

struct Bench {
    chip: Rc<RefCell<Chip>>,
    clock: Rc<Cell<u64>>,
}

impl Bench {
    fn new() -> Self {
        Self {
            chip: Rc::new(RefCell::new(Chip::new(0x40))),
            clock: Rc::new(Cell::new(0)),
        }
    }

    fn device(&self) -> Hdc2080<SimBus, SimDelay> {
        let bus = SimBus {
            chips: vec![self.chip.clone()],
            clock: self.clock.clone(),
        };
        let delay = SimDelay {
            clock: self.clock.clone(),
        };
        Hdc2080Builder::default().build(bus, delay)
    }

    fn initialized(&self) -> Hdc2080<SimBus, SimDelay> {
        let mut hdc = self.device();
        hdc.init().unwrap();
        hdc
    }

    fn accesses(&self) -> usize {
        self.chip.borrow().log.len()
    }

    fn reg(&self, register: u8) -> u8 {
        self.chip.borrow().regs[register as usize]
    }
}

#[test]
fn end_to_end_read() {
    let bench = Bench::new();
    let mut hdc = bench.device();
    hdc.init().unwrap();
    hdc.set_temperature_resolution(Resolution::FourteenBit)
        .unwrap();
    hdc.set_humidity_resolution(Resolution::FourteenBit).unwrap();
    hdc.set_mode(MeasurementMode::TemperatureHumidity).unwrap();
    let (temperature, humidity) = hdc.read_temperature_humidity().unwrap();
    assert!((temperature.celsius() - 42.5).abs() < 1e-3);
    assert!((humidity.percentage() - 25.0).abs() < 1e-3);
    assert_eq!(hdc.state(), AcquisitionState::Idle);
}

#[test]
fn read_poll_times_out_without_late_access() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    let start = bench.clock.get();
    let timeout = Duration::from_micros(100);
    let result = hdc.read_poll(MeasurementMode::TemperatureHumidity, timeout);
    assert!(matches!(result, Err(Error::Timeout)));
    let deadline = start + timeout.as_nanos() as u64;
    assert!(bench.chip.borrow().log.iter().all(|a| a.at <= deadline));
    assert_eq!(hdc.state(), AcquisitionState::MeasurementTriggered);
}

#[test]
fn auto_mode_read_does_not_trigger() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.set_auto_measurement_mode(AutoMeasurementMode::FiveHz)
        .unwrap();
    let mark = bench.accesses();
    let sample = hdc
        .read_poll(
            MeasurementMode::TemperatureHumidity,
            Duration::from_millis(500),
        )
        .unwrap();
    assert_eq!(sample.temperature.raw(), 0x8000);
    assert_eq!(sample.humidity.map(|h| h.raw()), Some(0x4000));
    let chip = bench.chip.borrow();
    assert!(chip.log[mark..].iter().all(|a| !a.write));
    assert_eq!(chip.regs[0x0F] & 0x01, 0);
}

#[test]
fn temperature_only_mode_reads_two_bytes() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    bench.chip.borrow_mut().temperature = 0x0000;
    hdc.set_mode(MeasurementMode::Temperature).unwrap();
    let temperature = hdc.read_temperature().unwrap();
    assert_eq!(temperature.celsius(), -40.0);
    let chip = bench.chip.borrow();
    let last = chip.log.last().copied().unwrap();
    assert_eq!((last.write, last.register, last.len), (false, 0x00, 2));
}

#[test]
fn lifecycle_gates_access() {
    let bench = Bench::new();
    let mut hdc = bench.device();
    assert!(matches!(hdc.get_heater(), Err(Error::NotInitialized)));
    assert!(matches!(
        hdc.read_temperature_humidity(),
        Err(Error::NotInitialized)
    ));
    assert_eq!(bench.accesses(), 0);

    hdc.init().unwrap();
    hdc.set_auto_measurement_mode(AutoMeasurementMode::OneHz)
        .unwrap();
    hdc.deinit().unwrap();
    assert_eq!(bench.reg(0x0E) & 0x70, 0);
    let mark = bench.accesses();
    assert!(matches!(hdc.read_humidity(), Err(Error::NotInitialized)));
    assert!(matches!(hdc.set_heater(true), Err(Error::NotInitialized)));
    assert!(matches!(hdc.read_register(0x0E), Err(Error::NotInitialized)));
    assert_eq!(bench.accesses(), mark);

    hdc.init().unwrap();
    assert!(!hdc.get_heater().unwrap());
}

#[test]
fn reserved_field_values_are_rejected() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.write_register(0x0F, 0xC0).unwrap();
    assert!(matches!(
        hdc.get_temperature_resolution(),
        Err(Error::InvalidParameter)
    ));
    assert_eq!(bench.reg(0x0F), 0xC0);
    assert_eq!(hdc.get_humidity_resolution().unwrap(), Resolution::FourteenBit);
    hdc.write_register(0x0F, 0x04).unwrap();
    assert!(matches!(hdc.get_mode(), Err(Error::InvalidParameter)));
}

#[test]
fn offsets_out_of_range_do_not_touch_bus() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    let mark = bench.accesses();
    assert!(matches!(
        hdc.set_temperature_offset_adjustment(-21.0),
        Err(Error::OutOfRange)
    ));
    assert!(matches!(
        hdc.set_humidity_offset_adjustment(30.0),
        Err(Error::OutOfRange)
    ));
    assert_eq!(bench.accesses(), mark);
    hdc.set_humidity_offset_adjustment(-1.0).unwrap();
    assert_eq!(bench.reg(0x09), (-5i8) as u8);
}

#[test]
fn thresholds_read_back_quantized() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.set_temperature_high_threshold(30.0).unwrap();
    assert_eq!(bench.reg(0x0B), 109);
    let value = hdc.get_temperature_high_threshold().unwrap();
    assert!((value - 30.0).abs() <= 165.0 / 512.0);
    hdc.set_humidity_low_threshold(150.0).unwrap();
    assert_eq!(bench.reg(0x0C), 0xFF);
    hdc.set_humidity_max(0.0).unwrap();
    assert_eq!(hdc.get_humidity_max().unwrap(), 0.0);
}

#[test]
fn two_sensors_on_one_bus() {
    let clock = Rc::new(Cell::new(0));
    let low = Rc::new(RefCell::new(Chip::new(0x40)));
    let high = Rc::new(RefCell::new(Chip::new(0x41)));
    high.borrow_mut().temperature = 0x4000;
    let bus = SimBus {
        chips: vec![low.clone(), high.clone()],
        clock: clock.clone(),
    };
    let mut first = Hdc2080Builder::default()
        .with_address(SlaveAddress::ADDRESS_0)
        .build(bus.clone(), SimDelay { clock: clock.clone() });
    let mut second = Hdc2080Builder::default()
        .with_address(SlaveAddress::ADDRESS_1)
        .build(bus, SimDelay { clock: clock.clone() });
    first.init().unwrap();
    second.init().unwrap();
    let a = first.read_temperature().unwrap();
    let b = second.read_temperature().unwrap();
    assert_eq!(a.raw(), 0x8000);
    assert_eq!(b.raw(), 0x4000);
}

#[test]
fn missing_sensor_reports_bus_error() {
    let clock = Rc::new(Cell::new(0));
    let bus = SimBus {
        chips: vec![Rc::new(RefCell::new(Chip::new(0x41)))],
        clock: clock.clone(),
    };
    let mut hdc = Hdc2080Builder::default().build(bus, SimDelay { clock });
    assert!(matches!(
        hdc.init(),
        Err(Error::I2c(ErrorKind::NoAcknowledge(_)))
    ));
    assert!(!hdc.is_initialized());
}

#[test]
fn stuck_reset_times_out() {
    let bench = Bench::new();
    bench.chip.borrow_mut().stuck_reset = true;
    let mut hdc = bench.device();
    assert!(matches!(hdc.init(), Err(Error::Timeout)));
    assert!(!hdc.is_initialized());
}

#[test]
fn soft_reset_restores_defaults() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.set_heater(true).unwrap();
    hdc.set_mode(MeasurementMode::Temperature).unwrap();
    assert_eq!(bench.reg(0x0E), 0x08);
    hdc.soft_reset().unwrap();
    assert_eq!(bench.reg(0x0E), 0x00);
    assert!(!hdc.get_heater().unwrap());
    assert_eq!(
        hdc.get_mode().unwrap(),
        MeasurementMode::TemperatureHumidity
    );
}

#[test]
fn state_follows_measurement() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    assert_eq!(hdc.state(), AcquisitionState::Idle);
    hdc.set_measurement(true).unwrap();
    assert_eq!(hdc.state(), AcquisitionState::MeasurementTriggered);
    bench.clock.set(bench.clock.get() + 2_000_000);
    assert!(hdc.get_interrupt_status().unwrap().data_ready());
    // status clears on read
    assert!(!hdc.get_interrupt_status().unwrap().data_ready());
    assert!(!hdc.get_measurement().unwrap());
    hdc.read_humidity().unwrap();
    assert_eq!(hdc.state(), AcquisitionState::Idle);
}

#[test]
fn interrupt_profile_programs_registers() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    let thresholds = Thresholds {
        temperature_high: 30.0,
        temperature_low: 10.0,
        humidity_high: 80.0,
        humidity_low: 20.0,
    };
    hdc.apply_profile(&Profile::interrupt(thresholds)).unwrap();
    assert_eq!(bench.reg(0x0E), 0x75);
    assert_eq!(bench.reg(0x07), 0x78);
    assert_eq!(bench.reg(0x0B), 109);
    assert_eq!(bench.reg(0x0A), 78);
    assert_eq!(bench.reg(0x0D), 205);
    assert_eq!(bench.reg(0x0C), 51);
    assert_eq!(bench.reg(0x0F) & 0x01, 0x01);
    assert_eq!(hdc.state(), AcquisitionState::MeasurementTriggered);
    assert_eq!(
        hdc.get_auto_measurement_mode().unwrap(),
        AutoMeasurementMode::FiveHz
    );
}

#[test]
fn shot_profile_reads_on_demand() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.apply_profile(&Profile::shot()).unwrap();
    assert_eq!(bench.reg(0x0E) & 0x70, 0);
    let sample = hdc
        .read_poll(
            MeasurementMode::TemperatureHumidity,
            Duration::from_millis(5),
        )
        .unwrap();
    assert!(sample.humidity.is_some());
}

#[test]
fn stale_data_ready_is_not_taken_as_new_result() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.set_measurement(true).unwrap();
    // the conversion completes and latches data ready without anyone reading it
    bench.clock.set(bench.clock.get() + 2_000_000);
    let result = hdc.read_poll(
        MeasurementMode::TemperatureHumidity,
        Duration::from_micros(100),
    );
    assert!(matches!(result, Err(Error::Timeout)));
    let sample = hdc
        .read_poll(
            MeasurementMode::TemperatureHumidity,
            Duration::from_millis(5),
        )
        .unwrap();
    assert_eq!(sample.temperature.raw(), 0x8000);
}

#[test]
fn invalid_profile_threshold_does_not_touch_bus() {
    let bench = Bench::new();
    let mut hdc = bench.initialized();
    hdc.set_auto_measurement_mode(AutoMeasurementMode::OneHz)
        .unwrap();
    let mark = bench.accesses();
    let thresholds = Thresholds {
        temperature_high: f32::NAN,
        temperature_low: 10.0,
        humidity_high: 80.0,
        humidity_low: 20.0,
    };
    assert!(matches!(
        hdc.apply_profile(&Profile::interrupt(thresholds)),
        Err(Error::InvalidParameter)
    ));
    assert_eq!(bench.accesses(), mark);
    assert_eq!(bench.reg(0x0E) & 0x70, 0x50);
}
