// One sample-playback voice: a 32-bit phase accumulator stepping through a
// fixed table. The plain voices keep a rate set from the control loop; the
// pitch voices get their rate handed in fresh on every trigger.

use crate::shared::PHASE_SHIFT;

#[derive(Clone, Copy, Debug)]
pub struct Voice {
    pub len: u32, // table length in index units
    pub acc: u32,
    pub index: u32,
    pub active: bool,
    pub rate: i16,
}

impl Voice {
    pub fn new(len: u32, rate: i16) -> Self {
        Self {
            len,
            acc: 0,
            index: 0,
            active: false,
            rate,
        }
    }

    /// Latch into playback from the start of the table.
    pub fn trigger(&mut self) {
        self.acc = 0;
        self.index = 0;
        self.active = true;
    }

    /// Latch with a fresh rate (pitch voices, per-step sequencing).
    pub fn trigger_at(&mut self, rate: i16) {
        self.rate = rate;
        self.trigger();
    }

    pub fn set_rate(&mut self, rate: i16) {
        self.rate = rate.max(0);
    }

    /// One tick of phase accumulation. Reaching the table length is the
    /// "finished" state, not an error: unlatch and reset.
    pub fn tick(&mut self) {
        if !self.active {
            return;
        }
        self.acc = self.acc.wrapping_add(self.rate.max(0) as u32);
        self.index = self.acc >> PHASE_SHIFT;
        if self.index >= self.len {
            self.active = false;
            self.acc = 0;
            self.index = 0;
        }
    }

    /// Table read position for this tick. Reverse play reads the same table
    /// back to front while the forward accumulator keeps the timing; the
    /// reverse index is recomputed from the forward one every tick.
    pub fn read_index(&self, reverse: bool) -> usize {
        let idx = self.index.min(self.len.saturating_sub(1));
        if reverse {
            (self.len - 1 - idx) as usize
        } else {
            idx as usize
        }
    }

    /// Signed centered contribution to the mix; silent unless latched.
    pub fn sample(&self, table: &[u8], reverse: bool) -> i32 {
        if !self.active || table.is_empty() {
            return 0;
        }
        table[self.read_index(reverse)] as i32 - 128
    }
}
