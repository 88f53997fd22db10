// External note/control input. The byte-level wire parser is someone else's
// job; this module takes already-parsed messages and resolves them into
// semantic actions for the control loop, the same shape the TUI input layer
// uses. Channel-bound messages are filtered to the module's channel;
// system/transport messages bypass the filter.

/// Note identifiers for the four track triggers.
pub const NOTE_TRIGGERS: [u8; 4] = [36, 38, 43, 39];
/// Note identifiers for direct bank selection.
pub const NOTE_BANKS: [u8; 4] = [48, 49, 50, 51];
pub const NOTE_REVERSE: u8 = 52;
pub const NOTE_MIX_MODE: u8 = 53;

/// Control identifiers: the two live pitch-lane rates, then the kick and
/// snare fixed rates.
pub const CTRL_RATE_A: u8 = 70;
pub const CTRL_RATE_B: u8 = 71;
pub const CTRL_KICK_RATE: u8 = 72;
pub const CTRL_SNARE_RATE: u8 = 73;
/// Ticks-per-step divider for the external clock stream (unscaled; 6 = 16ths
/// from a 24-per-quarter clock). Zero is clamped to 1.
pub const CTRL_CLOCK_DIV: u8 = 74;

// 7-bit control values scale up to phase-accumulator rates.
const CTRL_RATE_SCALE: i16 = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RemoteMessage {
    NoteOn { channel: u8, note: u8 },
    Control { channel: u8, control: u8, value: u8 },
    // channel-independent transport/clock stream
    Start,
    Stop,
    Continue,
    Tick,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RemoteAction {
    TriggerTrack(u8),
    SelectBank(u8),
    ToggleReverse,
    ToggleMix,
    SetLiveRate { lane: u8, rate: i16 },
    SetVoiceRate { voice: u8, rate: i16 },
    SetClockDivision(u32),
    ClockStart,
    ClockStop,
    ClockContinue,
    ClockTick,
}

/// Resolve a message against the module's control channel. Messages on other
/// channels fall through to None; the transport stream always resolves.
pub fn resolve(msg: RemoteMessage, own_channel: u8) -> Option<RemoteAction> {
    match msg {
        RemoteMessage::Start => Some(RemoteAction::ClockStart),
        RemoteMessage::Stop => Some(RemoteAction::ClockStop),
        RemoteMessage::Continue => Some(RemoteAction::ClockContinue),
        RemoteMessage::Tick => Some(RemoteAction::ClockTick),

        RemoteMessage::NoteOn { channel, note } => {
            if channel != own_channel {
                return None;
            }
            if let Some(track) = NOTE_TRIGGERS.iter().position(|&n| n == note) {
                return Some(RemoteAction::TriggerTrack(track as u8));
            }
            if let Some(bank) = NOTE_BANKS.iter().position(|&n| n == note) {
                return Some(RemoteAction::SelectBank(bank as u8));
            }
            match note {
                NOTE_REVERSE => Some(RemoteAction::ToggleReverse),
                NOTE_MIX_MODE => Some(RemoteAction::ToggleMix),
                _ => None,
            }
        }

        RemoteMessage::Control {
            channel,
            control,
            value,
        } => {
            if channel != own_channel {
                return None;
            }
            let rate = (value.min(127) as i16) * CTRL_RATE_SCALE;
            match control {
                CTRL_RATE_A => Some(RemoteAction::SetLiveRate { lane: 0, rate }),
                CTRL_RATE_B => Some(RemoteAction::SetLiveRate { lane: 1, rate }),
                CTRL_KICK_RATE => Some(RemoteAction::SetVoiceRate { voice: 0, rate }),
                CTRL_SNARE_RATE => Some(RemoteAction::SetVoiceRate { voice: 1, rate }),
                CTRL_CLOCK_DIV => Some(RemoteAction::SetClockDivision(value.max(1) as u32)),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_on_the_wrong_channel_are_dropped() {
        let msg = RemoteMessage::NoteOn {
            channel: 3,
            note: NOTE_TRIGGERS[0],
        };
        assert_eq!(resolve(msg, 2), None);
        assert_eq!(resolve(msg, 3), Some(RemoteAction::TriggerTrack(0)));
    }

    #[test]
    fn transport_messages_bypass_the_channel_filter() {
        assert_eq!(resolve(RemoteMessage::Start, 9), Some(RemoteAction::ClockStart));
        assert_eq!(resolve(RemoteMessage::Tick, 9), Some(RemoteAction::ClockTick));
        assert_eq!(resolve(RemoteMessage::Stop, 9), Some(RemoteAction::ClockStop));
        assert_eq!(
            resolve(RemoteMessage::Continue, 9),
            Some(RemoteAction::ClockContinue)
        );
    }

    #[test]
    fn all_four_triggers_and_banks_resolve() {
        for (i, &note) in NOTE_TRIGGERS.iter().enumerate() {
            let act = resolve(RemoteMessage::NoteOn { channel: 0, note }, 0);
            assert_eq!(act, Some(RemoteAction::TriggerTrack(i as u8)));
        }
        for (i, &note) in NOTE_BANKS.iter().enumerate() {
            let act = resolve(RemoteMessage::NoteOn { channel: 0, note }, 0);
            assert_eq!(act, Some(RemoteAction::SelectBank(i as u8)));
        }
    }

    #[test]
    fn control_values_scale_to_rates() {
        let act = resolve(
            RemoteMessage::Control {
                channel: 1,
                control: CTRL_RATE_B,
                value: 64,
            },
            1,
        );
        assert_eq!(act, Some(RemoteAction::SetLiveRate { lane: 1, rate: 1024 }));
        let act = resolve(
            RemoteMessage::Control {
                channel: 1,
                control: CTRL_SNARE_RATE,
                value: 127,
            },
            1,
        );
        assert_eq!(
            act,
            Some(RemoteAction::SetVoiceRate {
                voice: 1,
                rate: 2032
            })
        );
    }

    #[test]
    fn clock_division_is_unscaled_and_never_zero() {
        let msg = |value| RemoteMessage::Control {
            channel: 0,
            control: CTRL_CLOCK_DIV,
            value,
        };
        assert_eq!(resolve(msg(24), 0), Some(RemoteAction::SetClockDivision(24)));
        assert_eq!(resolve(msg(0), 0), Some(RemoteAction::SetClockDivision(1)));
    }

    #[test]
    fn unknown_identifiers_are_ignored() {
        assert_eq!(
            resolve(RemoteMessage::NoteOn { channel: 0, note: 99 }, 0),
            None
        );
        assert_eq!(
            resolve(
                RemoteMessage::Control {
                    channel: 0,
                    control: 9,
                    value: 1
                },
                0
            ),
            None
        );
    }
}
