// Pack/unpack for the persisted region. Everything here is pure byte-buffer
// work; the file I/O wrapper lives in persistence.rs.
//
// Region layout (400 bytes total):
//   header (16 bytes)
//     0..2   magic 0xB5 0xD1
//     2      last-saved slot
//     3      settings bits: 0 running, 1 reverse, 2 noise-mix, 3 click
//     4      current bank
//     5      control channel
//     6..16  reserved, zero
//   4 slot records of 96 bytes at 16 + 96*slot
//     0..16  packed step flags: byte k = steps 2k (low nibble) and 2k+1
//            (high nibble), bit n of a nibble = track n
//     16..48 pitch lane A, one byte per step (rate >> 6, clamped)
//     48..80 pitch lane B, same
//     80..96 reserved, zero

use crate::audio_api::BankWindow;
use crate::shared::{NUM_SLOTS, NUM_STEPS, NUM_TRACKS};

pub const MAGIC: [u8; 2] = [0xB5, 0xD1];
pub const HEADER_LEN: usize = 16;
pub const SLOT_LEN: usize = 96;
pub const REGION_LEN: usize = HEADER_LEN + NUM_SLOTS * SLOT_LEN;

pub const OFF_LAST_SLOT: usize = 2;
pub const OFF_SETTINGS: usize = 3;
pub const OFF_BANK: usize = 4;
pub const OFF_CHANNEL: usize = 5;

const FLAGS_LEN: usize = 16;
const PITCH_LEN: usize = 32;

// Stored pitch bytes are the live rate arithmetic-shifted by this much.
pub const PITCH_SHIFT: u32 = 6;

pub const SETTING_RUNNING: u8 = 1 << 0;
pub const SETTING_REVERSE: u8 = 1 << 1;
pub const SETTING_NOISE_MIX: u8 = 1 << 2;
pub const SETTING_CLICK: u8 = 1 << 3;

/// Decoded header settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Settings {
    pub running: bool,
    pub reverse: bool,
    pub noise_mix: bool,
    pub click: bool,
    pub last_slot: u8,
    pub bank: u8,
    pub channel: u8,
}

impl Settings {
    pub fn bits(&self) -> u8 {
        let mut b = 0;
        if self.running {
            b |= SETTING_RUNNING;
        }
        if self.reverse {
            b |= SETTING_REVERSE;
        }
        if self.noise_mix {
            b |= SETTING_NOISE_MIX;
        }
        if self.click {
            b |= SETTING_CLICK;
        }
        b
    }

    /// Undersized regions read as defaults, like the other accessors here.
    pub fn read(region: &[u8]) -> Self {
        if region.len() != REGION_LEN {
            return Self::default();
        }
        let bits = region[OFF_SETTINGS];
        Self {
            running: bits & SETTING_RUNNING != 0,
            reverse: bits & SETTING_REVERSE != 0,
            noise_mix: bits & SETTING_NOISE_MIX != 0,
            click: bits & SETTING_CLICK != 0,
            last_slot: region[OFF_LAST_SLOT] % NUM_SLOTS as u8,
            bank: region[OFF_BANK] % crate::shared::NUM_BANKS as u8,
            channel: region[OFF_CHANNEL],
        }
    }
}

pub fn region_valid(region: &[u8]) -> bool {
    region.len() == REGION_LEN && region[0..2] == MAGIC
}

/// Reinitialize the whole region: zero slots, restamped magic, slot 0 last
/// saved, channel 0. This is the silent recovery path for missing or
/// corrupted storage; nothing is reported beyond the reset itself.
pub fn factory_reset(region: &mut Vec<u8>) {
    region.clear();
    region.resize(REGION_LEN, 0);
    region[0..2].copy_from_slice(&MAGIC);
}

fn slot_offset(slot: u8) -> usize {
    HEADER_LEN + SLOT_LEN * slot as usize
}

fn compress_pitch(rate: i16) -> u8 {
    (rate >> PITCH_SHIFT).clamp(0, u8::MAX as i16) as u8
}

fn expand_pitch(byte: u8) -> i16 {
    (byte as i16) << PITCH_SHIFT
}

/// Save one bank window into a slot, then refresh the header. No-op for slot
/// indices outside the valid set. The stored transport-running bit is kept as
/// previously stored and the click bit is always written off; everything else
/// comes from `settings`.
pub fn write_slot(region: &mut [u8], slot: u8, window: &BankWindow, settings: &Settings) {
    if slot as usize >= NUM_SLOTS || region.len() != REGION_LEN {
        return;
    }
    let off = slot_offset(slot);
    let rec = &mut region[off..off + SLOT_LEN];
    rec.fill(0);
    for step in 0..NUM_STEPS {
        let mut nibble = 0u8;
        for track in 0..NUM_TRACKS {
            if window.flags[track][step] {
                nibble |= 1 << track;
            }
        }
        let shift = if step % 2 == 0 { 0 } else { 4 };
        rec[step / 2] |= nibble << shift;
    }
    for step in 0..NUM_STEPS {
        rec[FLAGS_LEN + step] = compress_pitch(window.pitches[0][step]);
        rec[FLAGS_LEN + PITCH_LEN + step] = compress_pitch(window.pitches[1][step]);
    }

    let stored_running = region[OFF_SETTINGS] & SETTING_RUNNING;
    let mut bits = settings.bits();
    bits = (bits & !SETTING_RUNNING) | stored_running;
    bits &= !SETTING_CLICK;
    region[OFF_SETTINGS] = bits;
    region[OFF_LAST_SLOT] = slot;
    region[OFF_BANK] = settings.bank;
    region[OFF_CHANNEL] = settings.channel;
}

/// Unpack one slot back into a bank window. Out-of-range slots read as empty.
/// Settings are untouched by Load; pattern and settings recover independently.
pub fn read_slot(region: &[u8], slot: u8) -> BankWindow {
    let mut w = BankWindow::default();
    if slot as usize >= NUM_SLOTS || region.len() != REGION_LEN {
        return w;
    }
    let off = slot_offset(slot);
    let rec = &region[off..off + SLOT_LEN];
    for step in 0..NUM_STEPS {
        let shift = if step % 2 == 0 { 0 } else { 4 };
        let nibble = (rec[step / 2] >> shift) & 0x0f;
        for track in 0..NUM_TRACKS {
            w.flags[track][step] = nibble & (1 << track) != 0;
        }
    }
    for step in 0..NUM_STEPS {
        w.pitches[0][step] = expand_pitch(rec[FLAGS_LEN + step]);
        w.pitches[1][step] = expand_pitch(rec[FLAGS_LEN + PITCH_LEN + step]);
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_region() -> Vec<u8> {
        let mut r = Vec::new();
        factory_reset(&mut r);
        r
    }

    fn sample_window() -> BankWindow {
        let mut w = BankWindow::default();
        w.flags[0][0] = true;
        w.flags[1][1] = true;
        w.flags[2][30] = true;
        w.flags[3][31] = true;
        w.pitches[0][1] = 1024;
        w.pitches[1][31] = 777; // not a multiple of the compression step
        w
    }

    #[test]
    fn factory_reset_stamps_magic_and_zeros_slots() {
        let r = fresh_region();
        assert!(region_valid(&r));
        assert_eq!(r.len(), REGION_LEN);
        assert_eq!(r[OFF_LAST_SLOT], 0);
        assert!(r[HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn round_trip_is_exact_for_flags_and_close_for_pitches() {
        let mut r = fresh_region();
        let w = sample_window();
        write_slot(&mut r, 2, &w, &Settings::default());
        let back = read_slot(&r, 2);
        assert_eq!(back.flags, w.flags);
        for lane in 0..2 {
            for step in 0..NUM_STEPS {
                let orig = w.pitches[lane][step];
                let got = back.pitches[lane][step];
                assert!(
                    (orig - got).unsigned_abs() < (1 << PITCH_SHIFT),
                    "lane {lane} step {step}: {orig} vs {got}"
                );
            }
        }
    }

    #[test]
    fn save_is_idempotent_at_the_byte_level() {
        let mut a = fresh_region();
        let w = sample_window();
        let settings = Settings {
            bank: 1,
            channel: 9,
            reverse: true,
            ..Default::default()
        };
        write_slot(&mut a, 1, &w, &settings);
        let first = a.clone();
        write_slot(&mut a, 1, &w, &settings);
        assert_eq!(a, first);
    }

    #[test]
    fn save_keeps_stored_running_bit_and_forces_click_off() {
        let mut r = fresh_region();
        r[OFF_SETTINGS] = SETTING_RUNNING; // previously stored as running
        let settings = Settings {
            running: false, // live transport stopped
            click: true,    // live click on
            noise_mix: true,
            ..Default::default()
        };
        write_slot(&mut r, 0, &BankWindow::default(), &settings);
        let bits = r[OFF_SETTINGS];
        assert_ne!(bits & SETTING_RUNNING, 0);
        assert_eq!(bits & SETTING_CLICK, 0);
        assert_ne!(bits & SETTING_NOISE_MIX, 0);
    }

    #[test]
    fn out_of_range_slot_is_a_no_op() {
        let mut r = fresh_region();
        let before = r.clone();
        write_slot(&mut r, 4, &sample_window(), &Settings::default());
        assert_eq!(r, before);
        let w = read_slot(&r, 7);
        assert_eq!(w, BankWindow::default());
    }

    #[test]
    fn uninitialized_slot_reads_as_all_zero() {
        let r = fresh_region();
        let w = read_slot(&r, 3);
        assert!(w.flags.iter().all(|t| t.iter().all(|&f| !f)));
        assert!(w.pitches.iter().all(|l| l.iter().all(|&p| p == 0)));
    }

    #[test]
    fn settings_read_is_total_over_short_regions() {
        assert_eq!(Settings::read(&[]), Settings::default());
        assert_eq!(Settings::read(&[0xB5, 0xD1, 3]), Settings::default());
        let mut r = fresh_region();
        r[OFF_SETTINGS] = SETTING_REVERSE;
        r[OFF_BANK] = 3;
        let s = Settings::read(&r);
        assert!(s.reverse);
        assert_eq!(s.bank, 3);
    }

    #[test]
    fn load_never_touches_settings() {
        let mut r = fresh_region();
        r[OFF_SETTINGS] = SETTING_REVERSE | SETTING_RUNNING;
        r[OFF_CHANNEL] = 5;
        let header_before = r[..HEADER_LEN].to_vec();
        let _ = read_slot(&r, 0);
        assert_eq!(&r[..HEADER_LEN], header_before.as_slice());
    }
}
