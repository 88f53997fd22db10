// Constants and types shared between the control loop, the engine, and the TUI.
//
// The hardware this models has 4 pads, 4 pattern banks, 4 save slots, and a
// 32-step sequencer. The three plain pads (kick/snare/tom) each own a trigger
// track; the fourth pad is the "secondary" track shared by the clave voice
// and the two pitched voices.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

pub const NUM_STEPS: usize = 32;
pub const NUM_BANKS: usize = 4;
pub const NUM_TRACKS: usize = 4;
pub const NUM_SLOTS: usize = 4;
pub const SEQ_LEN: usize = 128;

// First span is only 31 wide, so bank 0 step 31 and bank 1 step 0 share a
// slot. The persisted format bakes these offsets in, so they stay.
pub const BANK_OFFSETS: [usize; NUM_BANKS] = [0, 31, 63, 95];

pub const TRACK_KICK: usize = 0;
pub const TRACK_SNARE: usize = 1;
pub const TRACK_TOM: usize = 2;
pub const TRACK_SECONDARY: usize = 3;

// Two pitch lanes ride on the secondary track.
pub const NUM_PITCH_LANES: usize = 2;

// 32-bit phase accumulators; index = accumulator >> PHASE_SHIFT,
// so a rate of 256 advances one table sample per tick.
pub const PHASE_SHIFT: u32 = 8;
pub const RATE_UNITY: i16 = 1 << PHASE_SHIFT;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // pads (0..3), down/up so holds can be tracked
    PadDown(u8),
    PadUp(u8),

    // transport and record buttons; held state drives the erase gesture
    PlayDown,
    PlayUp,
    RecordDown,
    RecordUp,

    SelectBank(u8),
    SelectSlot(u8),
    SelectTrack(u8),
    Save,
    Load,

    NudgeTempo(i32),

    // the two "pots": live rate deltas for the pitch lanes
    KnobA(i16),
    KnobB(i16),

    ToggleReverse,
    ToggleMix,
    ToggleClick,

    Quit,
}

/// Everything the TUI needs per frame; it renders this and nothing else.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub steps: [bool; NUM_STEPS], // selected track's flags in the current bank
    pub playing_step: Option<u8>,
    pub playing: bool,
    pub recording: bool,
    pub reverse: bool,
    pub noise_mix: bool,
    pub click_on: bool,
    pub bank: u8,
    pub slot: u8,
    pub selected_track: u8,
    pub bpm: u32,
    pub rate_a: i16,
    pub rate_b: i16,
    pub message: String,
}

/// Engine-side state the control loop is allowed to observe.
///
/// The tick handler stores into these every tick; the control loop reads them
/// between blocks. Lookahead is the one value recording races the tick handler
/// for; a single atomic load is the whole critical section.
#[derive(Debug, Default)]
pub struct SharedView {
    position: AtomicU8,
    lookahead: AtomicU8,
    playing: AtomicBool,
}

impl SharedView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, position: u8, lookahead: u8, playing: bool) {
        self.position.store(position, Ordering::Relaxed);
        self.lookahead.store(lookahead, Ordering::Relaxed);
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub fn position(&self) -> u8 {
        self.position.load(Ordering::Relaxed)
    }

    /// The step a recording made right now should land on.
    pub fn lookahead(&self) -> u8 {
        self.lookahead.load(Ordering::Relaxed)
    }

    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }
}
