use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::shared::DisplayState;

const TRACK_NAMES: [&str; 4] = ["KICK", "SNARE", "TOM", "SEC"];

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status screen
            Constraint::Length(4), // step rows
            Constraint::Min(1),
        ])
        .split(area);

    draw_screen(frame, sections[0], state, blink_on);
    draw_steps(frame, sections[1], state);
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let transport = if state.playing { "PLAY" } else { "STOP" };
    let record = if state.recording {
        if blink_on { "REC" } else { "   " }
    } else {
        "   "
    };
    let mode = format!(
        "{}{}{}",
        if state.reverse { " REV" } else { "" },
        if state.noise_mix { " NOIZ" } else { "" },
        if state.click_on { " CLK" } else { "" },
    );

    let lines = vec![
        Line::from(vec![
            Span::styled(transport, Style::default().fg(Color::Green)),
            Span::raw(" "),
            Span::styled(record, Style::default().fg(Color::Red)),
            Span::raw(format!("  BPM {:3}{}", state.bpm, mode)),
        ]),
        Line::from(format!(
            "BANK {}  SLOT {}  TRACK {}  A {:4}  B {:4}  {}",
            state.bank + 1,
            state.slot + 1,
            TRACK_NAMES[state.selected_track as usize % 4],
            state.rate_a,
            state.rate_b,
            state.message,
        )),
    ];

    let block = Block::default().borders(Borders::ALL).title("stepdrum");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// Two rows of 16 cells: the selected track's flags in the current bank, with
// the playing step highlighted.
fn draw_steps(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines = Vec::with_capacity(2);
    for row in 0..2 {
        let mut spans = Vec::with_capacity(16);
        for col in 0..16usize {
            let step = row * 16 + col;
            let on = state.steps[step];
            let here = state.playing_step == Some(step as u8);
            let style = match (here, on) {
                (true, _) => Style::default().fg(Color::Black).bg(Color::LightMagenta),
                (false, true) => Style::default().fg(Color::Magenta),
                (false, false) => Style::default().fg(Color::DarkGray),
            };
            spans.push(Span::styled(if on { "[#]" } else { "[ ]" }, style));
        }
        lines.push(Line::from(spans));
    }
    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
