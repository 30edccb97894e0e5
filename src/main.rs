use esp_idf_hal::{
    delay::{Delay, FreeRtos},
    gpio::*,
    peripherals::Peripherals,
};
use log::info;

use weigh_alarm::config::{self, LoopConfig};
use weigh_alarm::{Alarm, Gain, Hx711, SamplingLoop, SevenSegment};

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // Create the load cell driver. A sensor that is missing at boot is
    // waited out rather than failing start-up.
    let mut hx711 = {
        let hx711_dt = PinDriver::input(pins.gpio16)?;
        let hx711_sck = PinDriver::output(pins.gpio4)?;
        Hx711::detached(
            hx711_sck,
            hx711_dt,
            Delay::default(),
            Gain::try_from(config::SENSOR_GAIN)?,
            config::SENSOR_READY_WAIT,
        )
    };
    hx711.start(config::FAULT_BACKOFF_MS);

    hx711.set_reference_unit(config::REFERENCE_UNIT);
    match config::CALIBRATION_OFFSET {
        Some(offset) => hx711.set_offset(offset),
        None => hx711.tare_or_keep(config::TARE_SAMPLES),
    }

    // Create the display. Segment lines run g..a, digit slots tens, ones, tenths.
    let display = {
        let segments = [
            PinDriver::output(pins.gpio13.downgrade_output())?,
            PinDriver::output(pins.gpio14.downgrade_output())?,
            PinDriver::output(pins.gpio27.downgrade_output())?,
            PinDriver::output(pins.gpio26.downgrade_output())?,
            PinDriver::output(pins.gpio25.downgrade_output())?,
            PinDriver::output(pins.gpio33.downgrade_output())?,
            PinDriver::output(pins.gpio32.downgrade_output())?,
        ];
        let digits = [
            PinDriver::output(pins.gpio19.downgrade_output())?,
            PinDriver::output(pins.gpio18.downgrade_output())?,
            PinDriver::output(pins.gpio5.downgrade_output())?,
        ];
        let point = PinDriver::output(pins.gpio21.downgrade_output())?;
        SevenSegment::new(segments, digits, point, FreeRtos, config::DIGIT_DWELL_MS)?
    };

    let alarm = {
        let buzzer = PinDriver::output(pins.gpio23.downgrade_output())?;
        let alarm_led = PinDriver::output(pins.gpio22.downgrade_output())?;
        Alarm::new(buzzer, alarm_led)?
    };

    info!("Entering sampling loop");
    SamplingLoop::new(hx711, display, alarm, FreeRtos, LoopConfig::default()).run()
}
