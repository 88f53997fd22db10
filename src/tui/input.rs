use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::InputEvent;

// Key plan:
//   1 2 3 4      pads (kick / snare / tom / secondary), press and release
//   Space        play (hold with r for the erase gesture)
//   r            record arm (hold with Space for the erase gesture)
//   5 6 7 8      bank select
//   a s d f      slot select
//   z x c v      track shown in the step row
//   o / p        save / load
//   , / .        tempo down / up
//   [ / ]        pot A (bleep rate)
//   - / =        pot B (zap rate)
//   g / m / k    reverse / mix mode / metronome click
//   Esc          quit

pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        return Ok(match key.kind {
            KeyEventKind::Press => handle_press(key.code),
            KeyEventKind::Release => handle_release(key.code),
            _ => vec![],
        });
    }
    Ok(vec![])
}

fn handle_press(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayDown],
        KeyCode::Char('r') => vec![InputEvent::RecordDown],

        KeyCode::Char(c @ '1'..='4') => vec![InputEvent::PadDown(c as u8 - b'1')],
        KeyCode::Char(c @ '5'..='8') => vec![InputEvent::SelectBank(c as u8 - b'5')],

        KeyCode::Char('a') => vec![InputEvent::SelectSlot(0)],
        KeyCode::Char('s') => vec![InputEvent::SelectSlot(1)],
        KeyCode::Char('d') => vec![InputEvent::SelectSlot(2)],
        KeyCode::Char('f') => vec![InputEvent::SelectSlot(3)],

        KeyCode::Char('z') => vec![InputEvent::SelectTrack(0)],
        KeyCode::Char('x') => vec![InputEvent::SelectTrack(1)],
        KeyCode::Char('c') => vec![InputEvent::SelectTrack(2)],
        KeyCode::Char('v') => vec![InputEvent::SelectTrack(3)],

        KeyCode::Char('o') => vec![InputEvent::Save],
        KeyCode::Char('p') => vec![InputEvent::Load],

        KeyCode::Char(',') => vec![InputEvent::NudgeTempo(-2)],
        KeyCode::Char('.') => vec![InputEvent::NudgeTempo(2)],

        KeyCode::Char('[') => vec![InputEvent::KnobA(-32)],
        KeyCode::Char(']') => vec![InputEvent::KnobA(32)],
        KeyCode::Char('-') => vec![InputEvent::KnobB(-32)],
        KeyCode::Char('=') => vec![InputEvent::KnobB(32)],

        KeyCode::Char('g') => vec![InputEvent::ToggleReverse],
        KeyCode::Char('m') => vec![InputEvent::ToggleMix],
        KeyCode::Char('k') => vec![InputEvent::ToggleClick],

        _ => vec![],
    }
}

fn handle_release(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Char(' ') => vec![InputEvent::PlayUp],
        KeyCode::Char('r') => vec![InputEvent::RecordUp],
        KeyCode::Char(c @ '1'..='4') => vec![InputEvent::PadUp(c as u8 - b'1')],
        _ => vec![],
    }
}
