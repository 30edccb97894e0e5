//! Host-side stand-ins for GPIO lines, the HX711 and delays.
//!
//! Shared by the unit tests and the end-to-end tests under `tests/`.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

/// A bank of output lines that journals every write.
#[derive(Clone, Default)]
pub struct Lines {
    inner: Rc<RefCell<LineBank>>,
}

#[derive(Default)]
struct LineBank {
    levels: BTreeMap<usize, bool>,
    journal: Vec<(usize, bool)>,
    failing: BTreeSet<usize>,
}

impl Lines {
    pub fn pin(&self, id: usize) -> LinePin {
        LinePin {
            id,
            lines: self.clone(),
        }
    }

    pub fn level(&self, id: usize) -> Option<bool> {
        self.inner.borrow().levels.get(&id).copied()
    }

    pub fn levels(&self) -> BTreeMap<usize, bool> {
        self.inner.borrow().levels.clone()
    }

    pub fn journal(&self) -> Vec<(usize, bool)> {
        self.inner.borrow().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.inner.borrow_mut().journal.clear();
    }

    /// Every later write to `id` fails.
    pub fn fail(&self, id: usize) {
        self.inner.borrow_mut().failing.insert(id);
    }

    pub fn heal(&self, id: usize) {
        self.inner.borrow_mut().failing.remove(&id);
    }

    fn write(&self, id: usize, level: bool) -> Result<(), ErrorKind> {
        let mut bank = self.inner.borrow_mut();
        if bank.failing.contains(&id) {
            return Err(ErrorKind::Other);
        }
        bank.levels.insert(id, level);
        bank.journal.push((id, level));
        Ok(())
    }
}

pub struct LinePin {
    id: usize,
    lines: Lines,
}

impl ErrorType for LinePin {
    type Error = ErrorKind;
}

impl OutputPin for LinePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.lines.write(self.id, false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.lines.write(self.id, true)
    }
}

/// Simulated HX711: the data line answers the clock edges it sees.
#[derive(Clone, Default)]
pub struct SimHx711 {
    inner: Rc<RefCell<SimState>>,
}

#[derive(Default)]
struct SimState {
    queued: VecDeque<u32>,
    current: Option<u32>,
    clock_high: bool,
    frame_pulses: usize,
    total_pulses: usize,
    stalled_polls: usize,
}

impl SimState {
    fn data_level(&mut self) -> bool {
        // Anything past the 24th pulse ends the frame.
        if self.frame_pulses > 24 {
            self.frame_pulses = 0;
            self.current = None;
        }
        if self.frame_pulses == 0 {
            if self.stalled_polls > 0 {
                self.stalled_polls -= 1;
                return true;
            }
            if self.current.is_none() {
                self.current = self.queued.pop_front();
            }
            return self.current.is_none();
        }
        let word = self.current.unwrap_or(0);
        (word >> (24 - self.frame_pulses)) & 1 == 1
    }
}

impl SimHx711 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one finished conversion.
    pub fn push(&self, word: u32) {
        self.inner.borrow_mut().queued.push_back(word);
    }

    /// Keep the data line high for the next `polls` ready checks.
    pub fn stall_for(&self, polls: usize) {
        self.inner.borrow_mut().stalled_polls = polls;
    }

    pub fn total_pulses(&self) -> usize {
        self.inner.borrow().total_pulses
    }

    pub fn clock(&self) -> SimClock {
        SimClock { sim: self.clone() }
    }

    pub fn data(&self) -> SimData {
        SimData { sim: self.clone() }
    }
}

pub struct SimClock {
    sim: SimHx711,
}

impl ErrorType for SimClock {
    type Error = Infallible;
}

impl OutputPin for SimClock {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.sim.inner.borrow_mut().clock_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.sim.inner.borrow_mut();
        if !state.clock_high {
            state.frame_pulses += 1;
            state.total_pulses += 1;
        }
        state.clock_high = true;
        Ok(())
    }
}

pub struct SimData {
    sim: SimHx711,
}

impl ErrorType for SimData {
    type Error = Infallible;
}

impl InputPin for SimData {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sim.inner.borrow_mut().data_level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sim.inner.borrow_mut().data_level())
    }
}

/// Records millisecond sleeps and skips shorter delays.
#[derive(Clone, Default)]
pub struct FakeDelay {
    inner: Rc<RefCell<DelayLog>>,
}

#[derive(Default)]
struct DelayLog {
    sleeps_ms: Vec<u32>,
}

impl FakeDelay {
    pub fn sleeps_ms(&self) -> Vec<u32> {
        self.inner.borrow().sleeps_ms.clone()
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.inner.borrow_mut().sleeps_ms.push(ms);
    }
}
