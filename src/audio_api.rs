// Commands crossing the control-loop → engine boundary.
//
// The engine drains these at the top of every callback block; nothing inside
// the tick path ever blocks on them. A trigger request that arrives while an
// older one is still pending simply replaces it.

use crate::shared::{NUM_PITCH_LANES, NUM_STEPS, NUM_TRACKS};

/// One bank's 32-step window across all tracks and both pitch lanes.
/// This is what Load pushes into the engine and what the codec packs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BankWindow {
    pub flags: [[bool; NUM_STEPS]; NUM_TRACKS],
    pub pitches: [[i16; NUM_STEPS]; NUM_PITCH_LANES],
}

#[derive(Clone, Debug)]
pub enum EngineCommand {
    /// Manual trigger request for a track; consumed on the next tick.
    Trigger { track: u8 },

    SetTransport(bool),
    SetBank(u8),
    SetTempoInterval(u32),

    /// Recorded step write, already quantized by the control loop.
    /// `index` is absolute into the 128-entry arrays; `rates` carries the two
    /// live pitch-lane rates when the secondary track was hit.
    WriteStep {
        track: u8,
        index: u8,
        rates: Option<(i16, i16)>,
    },
    ClearBank(u8),
    LoadBank { bank: u8, window: BankWindow },

    /// Live pot value for one pitch lane.
    SetLiveRate { lane: u8, rate: i16 },
    /// Playback rate for one of the plain trigger voices (kick/snare/tom/clave).
    SetVoiceRate { voice: u8, rate: i16 },

    SetReverse(bool),
    SetNoiseMix(bool),
    SetClick(bool),

    // External clock/transport stream (already parsed upstream).
    ClockStart,
    ClockStop,
    ClockContinue,
    ClockTick,
    SetClockDivision(u32),
}
