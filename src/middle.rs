// The control loop's logic layer: gestures, recording, persistence, and the
// mapping of surface/remote events onto engine commands. The TUI renders what
// this hands it and nothing else.
//
// The pattern mirror kept here is authoritative; every mutation (recorded
// step, erase, load) is applied locally and sent to the engine as a command,
// so the engine's copy can never diverge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio_api::EngineCommand;
use crate::pipeline::codec::{self, Settings};
use crate::pipeline::pattern::{step_index, PatternStore};
use crate::pipeline::persistence;
use crate::remote::{self, RemoteAction, RemoteMessage};
use crate::shared::{
    DisplayState, InputEvent, NUM_BANKS, NUM_SLOTS, NUM_STEPS, NUM_TRACKS, RATE_UNITY, SharedView,
    TRACK_SECONDARY,
};

// Hold play+record this long to erase the current bank.
const ERASE_HOLD_SECS: f64 = 0.6;

const MAX_LIVE_RATE: i16 = 4095;

pub struct Middle {
    pub settings: Settings,
    pub slot: u8,
    pub selected_track: u8,
    pub recording: bool,
    pub bpm: u32,

    live_rates: [i16; 2],
    pattern: PatternStore,
    region: Vec<u8>,
    project_dir: PathBuf,
    shared: Arc<SharedView>,
    sample_rate: u32,

    play_held: bool,
    record_held: bool,
    hold_secs: f64,
    erase_fired: bool,

    message: String,
}

impl Middle {
    pub fn new(project_dir: &Path, shared: Arc<SharedView>, sample_rate: u32) -> Self {
        let region = persistence::load_region(project_dir);
        Self::with_region(project_dir, region, shared, sample_rate)
    }

    fn with_region(
        project_dir: &Path,
        region: Vec<u8>,
        shared: Arc<SharedView>,
        sample_rate: u32,
    ) -> Self {
        let settings = Settings::read(&region);
        Self {
            slot: settings.last_slot,
            settings,
            selected_track: 0,
            recording: false,
            bpm: 120,
            live_rates: [RATE_UNITY, RATE_UNITY],
            pattern: PatternStore::new(),
            region,
            project_dir: project_dir.to_path_buf(),
            shared,
            sample_rate,
            play_held: false,
            record_held: false,
            hold_secs: 0.0,
            erase_fired: false,
            message: String::new(),
        }
    }

    #[cfg(test)]
    pub fn for_tests(shared: Arc<SharedView>) -> Self {
        // factory-fresh region so tests never see each other's saves
        let dir = std::env::temp_dir().join(format!("stepdrum-tests-{}", std::process::id()));
        let mut region = Vec::new();
        codec::factory_reset(&mut region);
        Self::with_region(&dir, region, shared, 28_000)
    }

    /// Commands that bring a fresh engine in line with the persisted settings.
    pub fn boot_commands(&self) -> Vec<EngineCommand> {
        vec![
            EngineCommand::SetTempoInterval(self.tempo_interval()),
            EngineCommand::SetBank(self.settings.bank),
            EngineCommand::SetReverse(self.settings.reverse),
            EngineCommand::SetNoiseMix(self.settings.noise_mix),
            EngineCommand::SetClick(self.settings.click),
            EngineCommand::SetLiveRate { lane: 0, rate: self.live_rates[0] },
            EngineCommand::SetLiveRate { lane: 1, rate: self.live_rates[1] },
            EngineCommand::SetTransport(self.settings.running),
        ]
    }

    /// Ticks per step: 16th notes at the engine's tick rate.
    pub fn tempo_interval(&self) -> u32 {
        (self.sample_rate as u64 * 60 / (self.bpm as u64 * 4)) as u32
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<EngineCommand> {
        let mut cmds = Vec::new();
        match event {
            InputEvent::PadDown(track) => {
                let track = track % NUM_TRACKS as u8;
                cmds.push(EngineCommand::Trigger { track });
                if self.recording {
                    cmds.extend(self.record_hit(track));
                }
            }
            InputEvent::PadUp(_) => {}

            InputEvent::PlayDown => {
                self.play_held = true;
                // while recording is armed the transport stays forced running
                if !self.recording {
                    self.settings.running = !self.settings.running;
                    cmds.push(EngineCommand::SetTransport(self.settings.running));
                }
            }
            InputEvent::PlayUp => {
                self.play_held = false;
                self.reset_hold();
            }
            InputEvent::RecordDown => {
                self.record_held = true;
                self.recording = !self.recording;
                if self.recording {
                    self.settings.running = true;
                    cmds.push(EngineCommand::SetTransport(true));
                }
            }
            InputEvent::RecordUp => {
                self.record_held = false;
                self.reset_hold();
            }

            InputEvent::SelectBank(bank) => {
                self.settings.bank = bank % NUM_BANKS as u8;
                cmds.push(EngineCommand::SetBank(self.settings.bank));
            }
            InputEvent::SelectSlot(slot) => {
                self.slot = slot % NUM_SLOTS as u8;
            }
            InputEvent::SelectTrack(track) => {
                self.selected_track = track % NUM_TRACKS as u8;
            }

            InputEvent::Save => {
                self.save_slot();
            }
            InputEvent::Load => {
                cmds.extend(self.load_slot());
            }

            InputEvent::NudgeTempo(delta) => {
                self.bpm = (self.bpm as i32 + delta).clamp(40, 300) as u32;
                cmds.push(EngineCommand::SetTempoInterval(self.tempo_interval()));
            }
            InputEvent::KnobA(delta) => {
                cmds.push(self.nudge_live_rate(0, delta));
            }
            InputEvent::KnobB(delta) => {
                cmds.push(self.nudge_live_rate(1, delta));
            }

            InputEvent::ToggleReverse => {
                self.settings.reverse = !self.settings.reverse;
                cmds.push(EngineCommand::SetReverse(self.settings.reverse));
            }
            InputEvent::ToggleMix => {
                self.settings.noise_mix = !self.settings.noise_mix;
                cmds.push(EngineCommand::SetNoiseMix(self.settings.noise_mix));
            }
            InputEvent::ToggleClick => {
                self.settings.click = !self.settings.click;
                cmds.push(EngineCommand::SetClick(self.settings.click));
            }

            InputEvent::Quit => {}
        }
        cmds
    }

    pub fn handle_remote(&mut self, msg: RemoteMessage) -> Vec<EngineCommand> {
        let Some(action) = remote::resolve(msg, self.settings.channel) else {
            return Vec::new();
        };
        match action {
            RemoteAction::TriggerTrack(track) => self.handle_input(InputEvent::PadDown(track)),
            RemoteAction::SelectBank(bank) => self.handle_input(InputEvent::SelectBank(bank)),
            RemoteAction::ToggleReverse => self.handle_input(InputEvent::ToggleReverse),
            RemoteAction::ToggleMix => self.handle_input(InputEvent::ToggleMix),
            RemoteAction::SetLiveRate { lane, rate } => {
                self.live_rates[lane as usize % 2] = rate.clamp(0, MAX_LIVE_RATE);
                vec![EngineCommand::SetLiveRate {
                    lane,
                    rate: self.live_rates[lane as usize % 2],
                }]
            }
            RemoteAction::SetVoiceRate { voice, rate } => {
                vec![EngineCommand::SetVoiceRate { voice, rate }]
            }
            RemoteAction::SetClockDivision(div) => {
                vec![EngineCommand::SetClockDivision(div)]
            }
            RemoteAction::ClockStart => {
                self.settings.running = true;
                vec![EngineCommand::ClockStart]
            }
            RemoteAction::ClockStop => {
                self.settings.running = false;
                vec![EngineCommand::ClockStop]
            }
            RemoteAction::ClockContinue => {
                self.settings.running = true;
                vec![EngineCommand::ClockContinue]
            }
            RemoteAction::ClockTick => vec![EngineCommand::ClockTick],
        }
    }

    /// Control-loop housekeeping, once per UI frame. Drives the long-press
    /// erase gesture: play+record held past the threshold clears the current
    /// bank only, re-arms the transport, and disarms recording.
    pub fn tick(&mut self, elapsed_secs: f64) -> Vec<EngineCommand> {
        if !(self.play_held && self.record_held) {
            self.reset_hold();
            return Vec::new();
        }
        self.hold_secs += elapsed_secs;
        if self.hold_secs < ERASE_HOLD_SECS || self.erase_fired {
            return Vec::new();
        }
        self.erase_fired = true;
        self.recording = false;
        self.settings.running = true;
        self.pattern.clear_bank(self.settings.bank);
        self.message = format!("ERASE B{}", self.settings.bank + 1);
        vec![
            EngineCommand::ClearBank(self.settings.bank),
            EngineCommand::SetTransport(true),
        ]
    }

    /// A recorded hit lands on the lookahead step: the current step in the
    /// front half of its window, the next step in the back half. The single
    /// atomic load here is the whole cross-boundary critical section.
    fn record_hit(&mut self, track: u8) -> Vec<EngineCommand> {
        let step = self.shared.lookahead();
        let index = step_index(self.settings.bank, step);
        self.pattern.set_flag(track as usize, index, true);
        let rates = if track as usize == TRACK_SECONDARY {
            self.pattern.set_pitch(0, index, self.live_rates[0]);
            self.pattern.set_pitch(1, index, self.live_rates[1]);
            Some((self.live_rates[0], self.live_rates[1]))
        } else {
            None
        };
        vec![EngineCommand::WriteStep {
            track,
            index: index as u8,
            rates,
        }]
    }

    fn nudge_live_rate(&mut self, lane: usize, delta: i16) -> EngineCommand {
        let rate = (self.live_rates[lane] + delta).clamp(0, MAX_LIVE_RATE);
        self.live_rates[lane] = rate;
        EngineCommand::SetLiveRate {
            lane: lane as u8,
            rate,
        }
    }

    fn save_slot(&mut self) {
        let window = self.pattern.window(self.settings.bank);
        codec::write_slot(&mut self.region, self.slot, &window, &self.settings);
        self.settings.last_slot = self.slot;
        match persistence::save_region(&self.project_dir, &self.region) {
            Ok(()) => self.message = format!("SAVE S{}", self.slot + 1),
            Err(e) => {
                eprintln!("stepdrum: save failed: {e}");
                self.message = "SAVE ERR".into();
            }
        }
    }

    fn load_slot(&mut self) -> Vec<EngineCommand> {
        if self.slot as usize >= NUM_SLOTS {
            return Vec::new();
        }
        let window = codec::read_slot(&self.region, self.slot);
        self.pattern.apply_window(self.settings.bank, &window);
        self.message = format!("LOAD S{}", self.slot + 1);
        vec![EngineCommand::LoadBank {
            bank: self.settings.bank,
            window,
        }]
    }

    /// Persist the region with the full live header; called on quit. Unlike
    /// Save this writes the settings bits as they stand, so toggles and the
    /// transport state come back on the next boot.
    pub fn persist(&mut self) {
        self.region[codec::OFF_SETTINGS] = self.settings.bits();
        self.region[codec::OFF_LAST_SLOT] = self.settings.last_slot;
        self.region[codec::OFF_BANK] = self.settings.bank;
        self.region[codec::OFF_CHANNEL] = self.settings.channel;
        if let Err(e) = persistence::save_region(&self.project_dir, &self.region) {
            eprintln!("stepdrum: save on quit failed: {e}");
        }
    }

    fn reset_hold(&mut self) {
        self.hold_secs = 0.0;
        self.erase_fired = false;
    }

    pub fn display_state(&self) -> DisplayState {
        let mut steps = [false; NUM_STEPS];
        for (s, flag) in steps.iter_mut().enumerate() {
            let idx = step_index(self.settings.bank, s as u8);
            *flag = self.pattern.flag(self.selected_track as usize, idx);
        }
        let playing = self.shared.playing();
        DisplayState {
            steps,
            playing_step: playing.then(|| self.shared.position()),
            playing,
            recording: self.recording,
            reverse: self.settings.reverse,
            noise_mix: self.settings.noise_mix,
            click_on: self.settings.click,
            bank: self.settings.bank,
            slot: self.slot,
            selected_track: self.selected_track,
            bpm: self.bpm,
            rate_a: self.live_rates[0],
            rate_b: self.live_rates[1],
            message: self.message.clone(),
        }
    }
}
