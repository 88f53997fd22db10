// Live pattern storage: four 128-step trigger tracks and two 128-entry pitch
// sequences, addressed as 4 banks of 32 steps through BANK_OFFSETS.

use crate::audio_api::BankWindow;
use crate::shared::{
    BANK_OFFSETS, NUM_BANKS, NUM_PITCH_LANES, NUM_STEPS, NUM_TRACKS, SEQ_LEN,
};

/// Absolute index into the 128-entry arrays for a step of a bank.
/// Bank offsets are 0/31/63/95, so bank 0 step 31 aliases bank 1 step 0;
/// the persisted format depends on this addressing.
pub fn step_index(bank: u8, step: u8) -> usize {
    let bank = (bank as usize).min(NUM_BANKS - 1);
    BANK_OFFSETS[bank] + (step as usize) % NUM_STEPS
}

#[derive(Clone, Debug)]
pub struct PatternStore {
    pub tracks: [[bool; SEQ_LEN]; NUM_TRACKS],
    pub pitches: [[i16; SEQ_LEN]; NUM_PITCH_LANES],
}

impl Default for PatternStore {
    fn default() -> Self {
        Self {
            tracks: [[false; SEQ_LEN]; NUM_TRACKS],
            pitches: [[0; SEQ_LEN]; NUM_PITCH_LANES],
        }
    }
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, track: usize, index: usize) -> bool {
        self.tracks[track % NUM_TRACKS][index % SEQ_LEN]
    }

    pub fn set_flag(&mut self, track: usize, index: usize, on: bool) {
        self.tracks[track % NUM_TRACKS][index % SEQ_LEN] = on;
    }

    pub fn pitch(&self, lane: usize, index: usize) -> i16 {
        self.pitches[lane % NUM_PITCH_LANES][index % SEQ_LEN]
    }

    pub fn set_pitch(&mut self, lane: usize, index: usize, rate: i16) {
        self.pitches[lane % NUM_PITCH_LANES][index % SEQ_LEN] = rate;
    }

    /// Clear one bank's 32-step window everywhere, leaving the other banks alone.
    pub fn clear_bank(&mut self, bank: u8) {
        let off = step_index(bank, 0);
        for track in self.tracks.iter_mut() {
            track[off..off + NUM_STEPS].fill(false);
        }
        for lane in self.pitches.iter_mut() {
            lane[off..off + NUM_STEPS].fill(0);
        }
    }

    /// Copy one bank's window out (for Save and for the engine's Load path).
    pub fn window(&self, bank: u8) -> BankWindow {
        let off = step_index(bank, 0);
        let mut w = BankWindow::default();
        for (t, track) in self.tracks.iter().enumerate() {
            for s in 0..NUM_STEPS {
                w.flags[t][s] = track[off + s];
            }
        }
        for (l, lane) in self.pitches.iter().enumerate() {
            for s in 0..NUM_STEPS {
                w.pitches[l][s] = lane[off + s];
            }
        }
        w
    }

    /// Overwrite one bank's window wholesale (Load). Zeroes first so a sparse
    /// window leaves nothing stale behind.
    pub fn apply_window(&mut self, bank: u8, w: &BankWindow) {
        self.clear_bank(bank);
        let off = step_index(bank, 0);
        for (t, track) in self.tracks.iter_mut().enumerate() {
            for s in 0..NUM_STEPS {
                track[off + s] = w.flags[t][s];
            }
        }
        for (l, lane) in self.pitches.iter_mut().enumerate() {
            for s in 0..NUM_STEPS {
                lane[off + s] = w.pitches[l][s];
            }
        }
    }
}
