// Mixing and the metronome click.
//
// Everything here is integer arithmetic on 8-bit-centered samples; the final
// value handed to the transport is a u8. The noise-accent path is deliberately
// lo-fi: an AND blend of click and noise scaled by the click envelope, XORed
// into the voice sum instead of added.

use crate::shared::PHASE_SHIFT;

pub const SAMPLE_MAX: i32 = 255;
pub const SAMPLE_MID: i32 = 128;

// Click amplitude decays linearly to zero this many ticks after a retrigger.
pub const CLICK_DECAY_TICKS: u32 = 1400;

// The three fixed click tones, as phase-accumulator rates.
const CLICK_RATE_BAR: u16 = 1024; // step 0
const CLICK_RATE_HALF: u16 = 640; // every 8th step
const CLICK_RATE_BEAT: u16 = 448; // every 4th step

// The secondary noise read creeps through the click table at this rate.
const NOISE_RATE: u32 = 37;
const NOISE_SHIFT: u32 = PHASE_SHIFT + 3;

#[derive(Clone, Debug)]
pub struct ClickOsc {
    acc: u32,
    rate: u16,
    level: u32, // remaining decay ticks; amplitude = 255 * level / CLICK_DECAY_TICKS
    noise_acc: u32,
    pub enabled: bool,
}

impl Default for ClickOsc {
    fn default() -> Self {
        Self {
            acc: 0,
            rate: CLICK_RATE_BEAT,
            level: 0,
            noise_acc: 0,
            enabled: false,
        }
    }
}

impl ClickOsc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on step edges. Retriggers on every 4th step; the tone jumps to
    /// one of three fixed pitches, step 0 taking priority over the others.
    pub fn on_step(&mut self, step: u8) {
        if !self.enabled || step % 4 != 0 {
            return;
        }
        self.rate = if step == 0 {
            CLICK_RATE_BAR
        } else if step % 8 == 0 {
            CLICK_RATE_HALF
        } else {
            CLICK_RATE_BEAT
        };
        self.acc = 0;
        self.level = CLICK_DECAY_TICKS;
    }

    pub fn amplitude(&self) -> u32 {
        255 * self.level / CLICK_DECAY_TICKS
    }

    /// Advance one tick and return (centered click sample, raw table byte,
    /// raw noise byte). The noise accumulator runs whether or not the click
    /// is sounding; the noise-accent blend depends on that.
    pub fn tick(&mut self, table: &[u8]) -> (i32, u8, u8) {
        self.noise_acc = self.noise_acc.wrapping_add(NOISE_RATE);
        if table.is_empty() {
            return (0, 0, 0);
        }
        let noise = table[(self.noise_acc >> NOISE_SHIFT) as usize % table.len()];
        if self.level == 0 {
            return (0, 0, noise);
        }
        self.level -= 1;
        self.acc = self.acc.wrapping_add(self.rate as u32);
        let raw = table[(self.acc >> PHASE_SHIFT) as usize % table.len()];
        let amp = self.amplitude() as i32;
        let centered = (raw as i32 - SAMPLE_MID) * amp / 255;
        (centered, raw, noise)
    }
}

/// Reflection soft clip: overflow folds back down by twice the overshoot,
/// underflow folds back up. Applied repeatedly so any finite input lands in
/// 0..=255 without flat clamping.
pub fn fold_back(mut v: i32) -> u8 {
    loop {
        if v > SAMPLE_MAX {
            v = 2 * SAMPLE_MAX - v;
        } else if v < 0 {
            v = -v;
        } else {
            return v as u8;
        }
    }
}

/// Plain mode: averaged voice sum plus click, folded.
pub fn mix_plain(voice_sum: i32, click_centered: i32) -> u8 {
    fold_back(SAMPLE_MID + (voice_sum + click_centered) / 2)
}

/// Noise-accent mode. With no voice latched the base is forced to the flat
/// mid level before the XOR so a silent pattern carries no DC click.
pub fn mix_noise_accent(
    voice_sum: i32,
    any_latched: bool,
    click_raw: u8,
    noise_raw: u8,
    click_amp: u32,
) -> u8 {
    let blend = ((click_raw & noise_raw) as u32 * click_amp / 255) as u8;
    let base = if any_latched {
        fold_back(SAMPLE_MID + voice_sum)
    } else {
        SAMPLE_MID as u8
    };
    base ^ blend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sample_bank::SampleBank;

    #[test]
    fn fold_back_reflects_at_both_rails() {
        // boundary values
        assert_eq!(fold_back(255), 255);
        assert_eq!(fold_back(256), 254); // 2*255 - 256
        assert_eq!(fold_back(0), 0);
        assert_eq!(fold_back(-1), 1);
        // interior values
        assert_eq!(fold_back(300), 210);
        assert_eq!(fold_back(-50), 50);
        assert_eq!(fold_back(123), 123);
        // double reflection still lands in range
        assert_eq!(fold_back(600), 90); // 510 - 600 = -90 -> 90
    }

    #[test]
    fn silent_noise_mix_is_flat_mid_level() {
        let out = mix_noise_accent(0, false, 0, 0, 0);
        assert_eq!(out, SAMPLE_MID as u8);
    }

    #[test]
    fn noise_mix_forces_mid_even_with_residual_sum() {
        // no voice latched: whatever the stale sum says, the base is mid
        let out = mix_noise_accent(57, false, 0, 0, 0);
        assert_eq!(out, SAMPLE_MID as u8);
    }

    // Pins the exact blend arithmetic: blend = (click & noise) * amp / 255,
    // XORed (not added) into the folded voice sum.
    #[test]
    fn noise_accent_blend_is_bit_exact() {
        // 0xF0 & 0xCC = 192 at full amp; fold(128 + 40) = 168; 168 ^ 192 = 104
        assert_eq!(mix_noise_accent(40, true, 0xF0, 0xCC, 255), 104);
        // half amp scales the blend before the XOR: 192 * 128 / 255 = 96
        assert_eq!(mix_noise_accent(40, true, 0xF0, 0xCC, 128), 200);
        // decayed click leaves the base untouched
        assert_eq!(mix_noise_accent(40, true, 0xF0, 0xCC, 0), 168);
        // base above the rail folds first: fold(128 + 200) = 182; 182 ^ 85 = 227
        assert_eq!(mix_noise_accent(200, true, 0xFF, 0x55, 255), 227);
        // XOR can push below mid where addition never would
        assert_eq!(mix_noise_accent(0, true, 0xF0, 0xCC, 255), 64);
    }

    #[test]
    fn click_decays_linearly_to_zero() {
        let bank = SampleBank::builtin();
        let mut c = ClickOsc::new();
        c.enabled = true;
        c.on_step(0);
        assert_eq!(c.amplitude(), 255);
        let mut last = c.amplitude();
        for _ in 0..CLICK_DECAY_TICKS {
            c.tick(&bank.click);
            assert!(c.amplitude() <= last);
            last = c.amplitude();
        }
        assert_eq!(c.amplitude(), 0);
        let (centered, _, _) = c.tick(&bank.click);
        assert_eq!(centered, 0);
    }

    #[test]
    fn click_only_retriggers_on_fourth_steps() {
        let mut c = ClickOsc::new();
        c.enabled = true;
        c.on_step(3);
        assert_eq!(c.amplitude(), 0);
        c.on_step(4);
        assert_eq!(c.amplitude(), 255);
    }

    #[test]
    fn click_tone_priority_is_bar_then_half_then_beat() {
        let mut c = ClickOsc::new();
        c.enabled = true;
        c.on_step(0);
        assert_eq!(c.rate, CLICK_RATE_BAR);
        c.on_step(8);
        assert_eq!(c.rate, CLICK_RATE_HALF);
        c.on_step(4);
        assert_eq!(c.rate, CLICK_RATE_BEAT);
        c.on_step(16);
        assert_eq!(c.rate, CLICK_RATE_HALF);
    }

    #[test]
    fn disabled_click_never_sounds() {
        let bank = SampleBank::builtin();
        let mut c = ClickOsc::new();
        c.on_step(0);
        let (centered, _, _) = c.tick(&bank.click);
        assert_eq!(centered, 0);
    }
}
