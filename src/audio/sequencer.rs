// The 32-step sequencer plus the trigger/clock output line.
//
// Runs entirely inside the tick handler. Tempo is an interval in ticks; the
// quantize window is the back half of that interval, during which recordings
// are assigned to the next step (the lookahead position).

use crate::shared::NUM_STEPS;

// Width of the pulse asserted on the external trigger/clock line.
pub const PULSE_WIDTH_TICKS: u32 = 160;

pub const DEFAULT_CLOCK_DIVISION: u32 = 6;

#[derive(Clone, Debug)]
pub struct Sequencer {
    pub position: u8,
    pub elapsed: u32, // ticks since last step advance
    pub tempo_interval: u32,
    pub lookahead: u8,
    pub running: bool,

    pulse_ticks_left: u32,

    // external clock divider, only active while stopped
    clock_division: u32,
    clock_count: u32,
}

impl Sequencer {
    pub fn new(tempo_interval: u32) -> Self {
        Self {
            position: (NUM_STEPS - 1) as u8,
            elapsed: 0,
            tempo_interval: tempo_interval.max(2),
            lookahead: (NUM_STEPS - 1) as u8,
            running: false,
            pulse_ticks_left: 0,
            clock_division: DEFAULT_CLOCK_DIVISION,
            clock_count: 0,
        }
    }

    pub fn set_tempo_interval(&mut self, interval: u32) {
        self.tempo_interval = interval.max(2);
    }

    /// Start/stop the transport. Stopping parks the position on the last step
    /// with the counter cleared so the next start lands cleanly on step 0.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
        if !running {
            self.position = (NUM_STEPS - 1) as u8;
            self.elapsed = 0;
            self.lookahead = self.position;
        }
    }

    /// One tick. Returns true on the single tick a step advance happens.
    pub fn tick(&mut self) -> bool {
        let mut edge = false;
        if self.running {
            self.elapsed += 1;
            if self.elapsed > self.tempo_interval {
                self.position = (self.position + 1) % NUM_STEPS as u8;
                self.elapsed = 0;
                edge = true;
            }
        } else {
            self.position = (NUM_STEPS - 1) as u8;
            self.elapsed = 0;
        }

        // quantize-ahead: past the half window, recordings belong to the next step
        self.lookahead = if self.elapsed > self.tempo_interval / 2 {
            (self.position + 1) % NUM_STEPS as u8
        } else {
            self.position
        };

        if edge {
            self.pulse_ticks_left = PULSE_WIDTH_TICKS;
        } else if self.pulse_ticks_left > 0 {
            self.pulse_ticks_left -= 1;
        }

        edge
    }

    /// State of the external trigger/clock output line.
    pub fn trigger_out_high(&self) -> bool {
        self.pulse_ticks_left > 0
    }

    pub fn set_clock_division(&mut self, division: u32) {
        self.clock_division = division.max(1);
    }

    pub fn reset_clock(&mut self) {
        self.clock_count = 0;
    }

    /// Drop the output line immediately (external Stop).
    pub fn clear_pulse(&mut self) {
        self.pulse_ticks_left = 0;
    }

    /// One pulse of the external clock stream. While stopped, the line is
    /// pulsed on every Nth input pulse; returns true on the pulses it emits.
    pub fn clock_pulse(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.clock_count += 1;
        if self.clock_count >= self.clock_division {
            self.clock_count = 0;
            self.pulse_ticks_left = PULSE_WIDTH_TICKS;
            true
        } else {
            false
        }
    }
}
