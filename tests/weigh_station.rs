//! The real drivers wired to simulated lines, run through the sampling loop.

use weigh_alarm::config::LoopConfig;
use weigh_alarm::mock::{FakeDelay, LinePin, Lines, SimClock, SimData, SimHx711};
use weigh_alarm::seven_segment::SEGMENT_PATTERNS;
use weigh_alarm::{
    Alarm, AlarmState, DisplayError, Gain, Hx711, LoopError, ReadyWait, SamplingLoop,
    SensorError, SevenSegment,
};

const COUNTS_PER_KG: i32 = 420;

const DIGIT_BASE: usize = 10;
const POINT: usize = 20;
const BUZZER: usize = 30;
const LED: usize = 31;

type Sensor = Hx711<SimClock, SimData, FakeDelay>;
type Station = SamplingLoop<Sensor, SevenSegment<LinePin, FakeDelay>, LinePin, FakeDelay>;

/// Raw word for a weight given in counts.
fn counts(counts: i32) -> u32 {
    counts as u32 & 0x00FF_FFFF
}

fn kg(kg: i32) -> u32 {
    counts(kg * COUNTS_PER_KG)
}

struct Rig {
    sensor: SimHx711,
    board: Lines,
    display_clock: FakeDelay,
    loop_clock: FakeDelay,
}

impl Rig {
    fn new() -> Self {
        let sensor = SimHx711::new();
        // Conversion discarded by the driver at start-up.
        sensor.push(0);
        Self {
            sensor,
            board: Lines::default(),
            display_clock: FakeDelay::default(),
            loop_clock: FakeDelay::default(),
        }
    }

    fn hx711(&self) -> Sensor {
        let wait = ReadyWait::Bounded {
            polls: 10,
            interval_us: 100,
        };
        let mut hx711 = Hx711::new(
            self.sensor.clock(),
            self.sensor.data(),
            FakeDelay::default(),
            Gain::G128,
            wait,
        )
        .unwrap();
        hx711.set_reference_unit(COUNTS_PER_KG as f32);
        hx711
    }

    fn station(&self, hx711: Sensor) -> Station {
        let segments = std::array::from_fn(|i| self.board.pin(i));
        let digits = std::array::from_fn(|i| self.board.pin(DIGIT_BASE + i));
        let display = SevenSegment::new(
            segments,
            digits,
            self.board.pin(POINT),
            self.display_clock.clone(),
            5,
        )
        .unwrap();
        let alarm = Alarm::new(self.board.pin(BUZZER), self.board.pin(LED)).unwrap();
        SamplingLoop::new(
            hx711,
            display,
            alarm,
            self.loop_clock.clone(),
            LoopConfig::default(),
        )
    }

    fn lit_slot(&self) -> Vec<usize> {
        (0..3)
            .filter(|slot| self.board.level(DIGIT_BASE + slot) == Some(false))
            .collect()
    }

    fn segment_bits(&self) -> u8 {
        (0..7).fold(0u8, |bits, i| {
            bits | (u8::from(self.board.level(i).unwrap_or(false)) << i)
        })
    }

    fn alarm_outputs(&self) -> (Option<bool>, Option<bool>) {
        (self.board.level(BUZZER), self.board.level(LED))
    }
}

#[test]
fn light_load_is_displayed_without_alarm() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());
    rig.sensor.push(kg(12));

    let sample = station.iterate().unwrap();
    assert_eq!(sample.weight, 12.0);
    assert_eq!(sample.alarm, AlarmState::Clear);

    // The refresh ends on the tenths slot.
    assert_eq!(rig.lit_slot(), vec![2]);
    assert_eq!(rig.segment_bits(), SEGMENT_PATTERNS[0]);
    assert_eq!(rig.alarm_outputs(), (Some(false), Some(false)));
    assert_eq!(rig.display_clock.sleeps_ms(), vec![5, 5, 5]);
    assert_eq!(rig.loop_clock.sleeps_ms(), vec![100]);
}

#[test]
fn negative_overload_trips_alarm() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());
    rig.sensor.push(kg(-30));

    let sample = station.iterate().unwrap();
    assert_eq!(sample.weight, 30.0);
    assert_eq!(sample.alarm, AlarmState::Tripped);
    assert_eq!(rig.alarm_outputs(), (Some(true), Some(true)));
}

#[test]
fn overload_is_clamped_on_the_display() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());
    rig.sensor.push(kg(150));

    let sample = station.tick().unwrap();
    assert_eq!(sample.weight, 150.0);
    assert_eq!(sample.shown, 99.0);
    assert_eq!(sample.alarm, AlarmState::Tripped);
}

#[test]
fn alarm_clears_when_load_is_removed() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());
    rig.sensor.push(kg(25));
    rig.sensor.push(kg(20));

    assert!(station.iterate().unwrap().alarm.is_tripped());
    assert_eq!(station.iterate().unwrap().alarm, AlarmState::Clear);
    assert_eq!(rig.alarm_outputs(), (Some(false), Some(false)));
}

#[test]
fn silent_sensor_backs_off_and_recovers() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());

    assert_eq!(
        station.iterate(),
        Err(LoopError::Sensor(SensorError::NotReady { polls: 10 }))
    );
    assert_eq!(rig.loop_clock.sleeps_ms(), vec![500]);

    rig.sensor.push(kg(3));
    assert_eq!(station.iterate().unwrap().weight, 3.0);
    assert_eq!(rig.loop_clock.sleeps_ms(), vec![500, 100]);
}

#[test]
fn fraction_that_rounds_up_is_a_render_fault() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());
    // 7.75 kg: the tenths digit comes out as -3.
    rig.sensor.push(counts(7 * COUNTS_PER_KG + 315));
    rig.sensor.push(kg(2));

    assert_eq!(
        station.iterate(),
        Err(LoopError::Display(DisplayError::DigitOutOfRange(-3)))
    );
    assert_eq!(rig.loop_clock.sleeps_ms(), vec![500]);
    assert!(station.iterate().is_ok());
}

#[test]
fn overload_with_unrenderable_fraction_still_alarms() {
    let rig = Rig::new();
    let mut station = rig.station(rig.hx711());
    // 25.75 kg, read five times in a row.
    for _ in 0..5 {
        rig.sensor.push(counts(25 * COUNTS_PER_KG + 315));
    }

    for _ in 0..5 {
        assert_eq!(
            station.iterate(),
            Err(LoopError::Display(DisplayError::DigitOutOfRange(-3)))
        );
        assert_eq!(rig.alarm_outputs(), (Some(true), Some(true)));
    }

    // 3.75 kg clears it again even though it cannot be drawn either.
    rig.sensor.push(counts(3 * COUNTS_PER_KG + 315));
    assert!(station.iterate().is_err());
    assert_eq!(rig.alarm_outputs(), (Some(false), Some(false)));
}

#[test]
fn tare_zeroes_the_platform() {
    let rig = Rig::new();
    let mut hx711 = rig.hx711();
    for _ in 0..4 {
        rig.sensor.push(1_000);
    }
    hx711.tare(4).unwrap();
    assert_eq!(hx711.calibration().offset, 1_000);

    let mut station = rig.station(hx711);
    rig.sensor.push(counts(1_000 + 5 * COUNTS_PER_KG));
    assert_eq!(station.tick().unwrap().weight, 5.0);
}

#[test]
fn late_sensor_is_waited_out_at_start_up() {
    let sensor = SimHx711::new();
    sensor.push(0);
    sensor.stall_for(25);
    let delay = FakeDelay::default();
    let mut hx711 = Hx711::detached(
        sensor.clock(),
        sensor.data(),
        delay.clone(),
        Gain::G128,
        ReadyWait::Bounded {
            polls: 10,
            interval_us: 100,
        },
    );

    hx711.start(500);
    assert_eq!(delay.sleeps_ms(), vec![500, 500, 1]);

    sensor.push(kg(4));
    hx711.set_reference_unit(COUNTS_PER_KG as f32);
    assert_eq!(hx711.read_weight(), Ok(4.0));
}
