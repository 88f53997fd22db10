// Fixed waveform tables for the six voices plus the click oscillator.
//
// The tables are read-only for the whole process: generated once at startup,
// 8-bit unsigned centered on 128, then only ever indexed by the tick handler.
// Generation is allowed to use floats; the tick path never does.

pub const NUM_VOICES: usize = 6;

pub const VOICE_KICK: usize = 0;
pub const VOICE_SNARE: usize = 1;
pub const VOICE_TOM: usize = 2;
pub const VOICE_CLAVE: usize = 3;
pub const VOICE_BLEEP: usize = 4;
pub const VOICE_ZAP: usize = 5;

pub struct SampleBank {
    pub tables: [Vec<u8>; NUM_VOICES],
    pub click: Vec<u8>,
}

impl SampleBank {
    pub fn builtin() -> Self {
        Self {
            tables: [
                kick_table(),
                snare_table(),
                tom_table(),
                clave_table(),
                bleep_table(),
                zap_table(),
            ],
            click: click_table(),
        }
    }

    /// Table length in index units (what the phase accumulator compares against).
    pub fn len(&self, voice: usize) -> u32 {
        self.tables[voice % NUM_VOICES].len() as u32
    }
}

fn quantize(x: f32) -> u8 {
    (128.0 + x.clamp(-1.0, 1.0) * 127.0) as u8
}

// xorshift noise source, deterministic so the tables are identical every boot
struct Lfsr(u16);

impl Lfsr {
    fn next(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 7;
        x ^= x >> 9;
        x ^= x << 8;
        self.0 = x;
        (x as f32 / u16::MAX as f32) * 2.0 - 1.0
    }
}

fn decaying_sine(len: usize, start_hz: f32, end_hz: f32, decay: f32) -> Vec<u8> {
    let rate = 28_000.0; // nominal tick rate the tables were tuned at
    let mut phase = 0.0f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / len as f32;
            let hz = start_hz + (end_hz - start_hz) * t;
            phase += std::f32::consts::TAU * hz / rate;
            let env = (-t * decay).exp();
            quantize(phase.sin() * env)
        })
        .collect()
}

fn noise_burst(len: usize, seed: u16, decay: f32, body_hz: f32, body_mix: f32) -> Vec<u8> {
    let rate = 28_000.0;
    let mut lfsr = Lfsr(seed);
    let mut phase = 0.0f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / len as f32;
            phase += std::f32::consts::TAU * body_hz / rate;
            let env = (-t * decay).exp();
            let s = lfsr.next() * (1.0 - body_mix) + phase.sin() * body_mix;
            quantize(s * env)
        })
        .collect()
}

fn kick_table() -> Vec<u8> {
    decaying_sine(3000, 120.0, 42.0, 5.0)
}

fn snare_table() -> Vec<u8> {
    noise_burst(2200, 0xACE1, 6.0, 180.0, 0.35)
}

fn tom_table() -> Vec<u8> {
    decaying_sine(2600, 160.0, 90.0, 4.5)
}

fn clave_table() -> Vec<u8> {
    decaying_sine(900, 620.0, 600.0, 9.0)
}

// The pitch voices sweep this with a per-step rate, so it carries more cycles
// and a gentler envelope than the drums.
fn bleep_table() -> Vec<u8> {
    decaying_sine(1200, 440.0, 440.0, 2.5)
}

fn zap_table() -> Vec<u8> {
    noise_burst(1600, 0xBEEF, 3.5, 900.0, 0.5)
}

// Short looped table; the click's own accumulator and envelope shape it.
fn click_table() -> Vec<u8> {
    let mut t = decaying_sine(128, 1000.0, 1000.0, 0.0);
    // square it up a little so the AND/XOR blend has bits to chew on
    for s in t.iter_mut() {
        *s = if *s >= 128 { 220 } else { 36 };
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_fixed_and_nonempty() {
        let a = SampleBank::builtin();
        let b = SampleBank::builtin();
        for v in 0..NUM_VOICES {
            assert!(!a.tables[v].is_empty());
            assert_eq!(a.tables[v], b.tables[v]);
        }
        assert_eq!(a.click, b.click);
    }

    #[test]
    fn tables_settle_near_center() {
        let bank = SampleBank::builtin();
        for v in [VOICE_KICK, VOICE_TOM, VOICE_CLAVE, VOICE_BLEEP] {
            let tail = *bank.tables[v].last().unwrap() as i32;
            assert!((tail - 128).abs() < 24, "voice {v} ends at {tail}");
        }
    }
}
