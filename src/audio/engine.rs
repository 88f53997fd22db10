// The tick handler. Lives inside the output callback; everything it owns
// (accumulators, latches, sequencer counters, its copy of the pattern) is
// touched from nowhere else. Commands from the control loop are drained at
// block boundaries; the tick path itself never blocks and never allocates.

use std::sync::Arc;

use crate::audio_api::{BankWindow, EngineCommand};
use crate::pipeline::pattern::{step_index, PatternStore};
use crate::shared::{
    NUM_TRACKS, RATE_UNITY, SharedView, TRACK_KICK, TRACK_SECONDARY, TRACK_SNARE, TRACK_TOM,
};

use super::mixer::{self, ClickOsc};
use super::sample_bank::{
    NUM_VOICES, SampleBank, VOICE_BLEEP, VOICE_CLAVE, VOICE_KICK, VOICE_SNARE, VOICE_TOM,
    VOICE_ZAP,
};
use super::sequencer::Sequencer;

pub struct Engine {
    bank_tables: SampleBank,
    voices: [crate::audio::voice::Voice; NUM_VOICES],
    seq: Sequencer,
    click: ClickOsc,
    pattern: PatternStore,

    current_bank: u8,
    reverse: bool,
    noise_mix: bool,

    // trigger requests set by commands, consumed (and cleared) on the next tick
    pending: [bool; NUM_TRACKS],

    // live pot values for the two pitch lanes
    live_rates: [i16; 2],

    shared: Arc<SharedView>,
}

impl Engine {
    pub fn new(shared: Arc<SharedView>) -> Self {
        let bank_tables = SampleBank::builtin();
        let voices = std::array::from_fn(|v| {
            crate::audio::voice::Voice::new(bank_tables.len(v), RATE_UNITY)
        });
        Self {
            bank_tables,
            voices,
            seq: Sequencer::new(2048),
            click: ClickOsc::new(),
            pattern: PatternStore::new(),
            current_bank: 0,
            reverse: false,
            noise_mix: false,
            pending: [false; NUM_TRACKS],
            live_rates: [RATE_UNITY, RATE_UNITY],
            shared,
        }
    }

    pub fn handle_cmd(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Trigger { track } => {
                self.pending[track as usize % NUM_TRACKS] = true;
            }
            EngineCommand::SetTransport(running) => self.seq.set_running(running),
            EngineCommand::SetBank(bank) => self.current_bank = bank,
            EngineCommand::SetTempoInterval(interval) => self.seq.set_tempo_interval(interval),
            EngineCommand::WriteStep { track, index, rates } => {
                self.pattern.set_flag(track as usize, index as usize, true);
                if let Some((a, b)) = rates {
                    self.pattern.set_pitch(0, index as usize, a);
                    self.pattern.set_pitch(1, index as usize, b);
                }
            }
            EngineCommand::ClearBank(bank) => self.pattern.clear_bank(bank),
            EngineCommand::LoadBank { bank, window } => {
                self.load_bank(bank, &window);
            }
            EngineCommand::SetLiveRate { lane, rate } => {
                self.live_rates[lane as usize % 2] = rate.max(0);
            }
            EngineCommand::SetVoiceRate { voice, rate } => {
                if (voice as usize) < VOICE_BLEEP {
                    self.voices[voice as usize].set_rate(rate);
                }
            }
            EngineCommand::SetReverse(on) => self.reverse = on,
            EngineCommand::SetNoiseMix(on) => self.noise_mix = on,
            EngineCommand::SetClick(on) => self.click.enabled = on,
            EngineCommand::ClockStart => {
                self.seq.reset_clock();
                self.seq.set_running(true);
            }
            EngineCommand::ClockStop => {
                self.seq.reset_clock();
                self.seq.clear_pulse();
                self.seq.set_running(false);
            }
            EngineCommand::ClockContinue => self.seq.running = true,
            EngineCommand::ClockTick => {
                let _ = self.seq.clock_pulse();
            }
            EngineCommand::SetClockDivision(n) => self.seq.set_clock_division(n),
        }
    }

    fn load_bank(&mut self, bank: u8, window: &BankWindow) {
        self.pattern.apply_window(bank, window);
    }

    /// One tick: advance the sequencer, latch voices, mix, publish the shared
    /// view, and hand back the 8-bit sample for the transport.
    pub fn next_sample(&mut self) -> u8 {
        let edge = self.seq.tick();

        if edge {
            self.click.on_step(self.seq.position);
            self.latch_step_triggers();
        }
        self.consume_manual_triggers();

        for v in self.voices.iter_mut() {
            v.tick();
        }

        let mut sum = 0i32;
        let mut any_latched = false;
        for (i, v) in self.voices.iter().enumerate() {
            any_latched |= v.active;
            sum += v.sample(&self.bank_tables.tables[i], self.reverse);
        }

        let (click_centered, click_raw, noise_raw) = self.click.tick(&self.bank_tables.click);

        let out = if self.noise_mix {
            mixer::mix_noise_accent(
                sum,
                any_latched,
                click_raw,
                noise_raw,
                self.click.amplitude(),
            )
        } else {
            mixer::mix_plain(sum, click_centered)
        };

        self.shared
            .publish(self.seq.position, self.seq.lookahead, self.seq.running);

        out
    }

    /// Per-track flags latch voices only on the step-changed edge, so a set
    /// flag fires once per step rather than every tick.
    fn latch_step_triggers(&mut self) {
        let idx = step_index(self.current_bank, self.seq.position);
        if self.pattern.flag(TRACK_KICK, idx) {
            self.voices[VOICE_KICK].trigger();
        }
        if self.pattern.flag(TRACK_SNARE, idx) {
            self.voices[VOICE_SNARE].trigger();
        }
        if self.pattern.flag(TRACK_TOM, idx) {
            self.voices[VOICE_TOM].trigger();
        }
        if self.pattern.flag(TRACK_SECONDARY, idx) {
            self.voices[VOICE_CLAVE].trigger();
            // pitch voices load their rate from the sequence at the edge;
            // a zero rate would park forever, so it reads as "no hit"
            let a = self.pattern.pitch(0, idx);
            if a > 0 {
                self.voices[VOICE_BLEEP].trigger_at(a);
            }
            let b = self.pattern.pitch(1, idx);
            if b > 0 {
                self.voices[VOICE_ZAP].trigger_at(b);
            }
        }
    }

    /// Manual trigger requests always start the voice from phase zero; the
    /// pitch voices take the live pot rates instead of sequence entries.
    fn consume_manual_triggers(&mut self) {
        if std::mem::take(&mut self.pending[TRACK_KICK]) {
            self.voices[VOICE_KICK].trigger();
        }
        if std::mem::take(&mut self.pending[TRACK_SNARE]) {
            self.voices[VOICE_SNARE].trigger();
        }
        if std::mem::take(&mut self.pending[TRACK_TOM]) {
            self.voices[VOICE_TOM].trigger();
        }
        if std::mem::take(&mut self.pending[TRACK_SECONDARY]) {
            self.voices[VOICE_CLAVE].trigger();
            self.voices[VOICE_BLEEP].trigger_at(self.live_rates[0].max(1));
            self.voices[VOICE_ZAP].trigger_at(self.live_rates[1].max(1));
        }
    }

    pub fn trigger_out_high(&self) -> bool {
        self.seq.trigger_out_high()
    }

    #[cfg(test)]
    pub fn pattern(&self) -> &PatternStore {
        &self.pattern
    }

    #[cfg(test)]
    pub fn voice(&self, v: usize) -> &crate::audio::voice::Voice {
        &self.voices[v]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::Middle;
    use crate::shared::InputEvent;

    fn engine() -> (Engine, Arc<SharedView>) {
        let shared = Arc::new(SharedView::new());
        (Engine::new(shared.clone()), shared)
    }

    fn run(engine: &mut Engine, ticks: u32) {
        for _ in 0..ticks {
            engine.next_sample();
        }
    }

    #[test]
    fn manual_trigger_is_consumed_once() {
        let (mut e, _) = engine();
        e.handle_cmd(EngineCommand::Trigger { track: 0 });
        e.next_sample();
        assert!(e.voice(VOICE_KICK).active);
        let idx_after_one = e.voice(VOICE_KICK).index;
        e.next_sample();
        // still the same playback, not a retrigger
        assert!(e.voice(VOICE_KICK).index > idx_after_one || e.voice(VOICE_KICK).active);
        assert!(!e.pending[0]);
    }

    #[test]
    fn step_flag_latches_only_on_the_edge() {
        let (mut e, _) = engine();
        let interval = 500u32;
        e.handle_cmd(EngineCommand::SetTempoInterval(interval));
        e.handle_cmd(EngineCommand::WriteStep {
            track: 0,
            index: step_index(0, 0) as u8,
            rates: None,
        });
        e.handle_cmd(EngineCommand::SetTransport(true));

        // run until the kick finishes its table
        let len = e.bank_tables.len(VOICE_KICK);
        run(&mut e, interval + 2 + len);
        assert!(
            !e.voice(VOICE_KICK).active,
            "flag must not retrigger between edges"
        );
    }

    #[test]
    fn recording_at_point_six_of_the_window_lands_on_the_next_step() {
        let (mut e, shared) = engine();
        let mut m = Middle::for_tests(shared.clone());
        let interval = 1000u32;

        e.handle_cmd(EngineCommand::SetTempoInterval(interval));
        e.handle_cmd(EngineCommand::SetTransport(true));

        // land on step 0 (the first edge after a clean start)
        run(&mut e, interval + 1);
        assert_eq!(shared.position(), 0);

        // tick 0: manual kick, plays immediately
        for cmd in m.handle_input(InputEvent::PadDown(0)) {
            e.handle_cmd(cmd);
        }
        e.next_sample();
        assert!(e.voice(VOICE_KICK).active);

        // 0.6*T later: arm recording, hit the snare pad
        run(&mut e, (interval as f64 * 0.6) as u32);
        for cmd in m.handle_input(InputEvent::RecordDown) {
            e.handle_cmd(cmd);
        }
        for cmd in m.handle_input(InputEvent::PadDown(1)) {
            e.handle_cmd(cmd);
        }

        // after the next step advance the flag sits on step 1, not step 0
        run(&mut e, interval);
        assert!(e.pattern().flag(1, step_index(0, 1)));
        assert!(!e.pattern().flag(1, step_index(0, 0)));
    }

    #[test]
    fn loaded_empty_slot_plays_silence_flags() {
        let (mut e, _) = engine();
        e.handle_cmd(EngineCommand::LoadBank {
            bank: 0,
            window: BankWindow::default(),
        });
        e.handle_cmd(EngineCommand::SetTempoInterval(64));
        e.handle_cmd(EngineCommand::SetTransport(true));
        run(&mut e, 64 * 40);
        assert!(e.voices.iter().all(|v| !v.active));
    }

    #[test]
    fn external_clock_divider_end_to_end() {
        let (mut e, _) = engine();
        e.handle_cmd(EngineCommand::ClockStop);
        e.handle_cmd(EngineCommand::SetClockDivision(6));
        let mut pulses = 0;
        for _ in 0..24 {
            let was_high = e.trigger_out_high();
            e.handle_cmd(EngineCommand::ClockTick);
            if !was_high && e.trigger_out_high() {
                pulses += 1;
            }
            // let the pulse fall before the next input tick
            run(&mut e, crate::audio::sequencer::PULSE_WIDTH_TICKS + 1);
        }
        assert_eq!(pulses, 4);
    }

    #[test]
    fn pitch_voice_reads_its_sequence_at_the_edge() {
        let (mut e, _) = engine();
        let interval = 400u32;
        let idx = step_index(0, 0) as u8;
        e.handle_cmd(EngineCommand::SetTempoInterval(interval));
        e.handle_cmd(EngineCommand::WriteStep {
            track: TRACK_SECONDARY as u8,
            index: idx,
            rates: Some((512, 0)),
        });
        e.handle_cmd(EngineCommand::SetTransport(true));
        run(&mut e, interval + 2);
        assert!(e.voice(VOICE_BLEEP).active);
        assert_eq!(e.voice(VOICE_BLEEP).rate, 512);
        // zero-rate lane reads as no hit
        assert!(!e.voice(VOICE_ZAP).active);
        // clave rides the same shared track
        assert!(e.voice(VOICE_CLAVE).active);
    }

    #[test]
    fn stopped_engine_emits_flat_mid_level_in_noise_mode() {
        let (mut e, _) = engine();
        e.handle_cmd(EngineCommand::SetNoiseMix(true));
        let s = e.next_sample();
        assert_eq!(s, 128);
    }
}
