use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use endless_ambient::shared::{InputEvent, TEMPO_STEP, VOLUME_STEP};

use super::mode::TuiState;

// poll for input from tui and resolve key presses into semantic input events for the middle layer
pub fn poll_input(timeout: Duration, ts: &TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPause],

        // the 4x2 mood grid
        KeyCode::Char(c @ '1'..='8') => match c.to_digit(10) {
            Some(d) => vec![InputEvent::MoodCard(d as u8 - 1)],
            None => vec![],
        },

        // instrument panel
        KeyCode::Up => vec![InputEvent::SelectInstrument(-1)],
        KeyCode::Down => vec![InputEvent::SelectInstrument(1)],
        KeyCode::Enter => vec![InputEvent::ToggleInstrument(ts.selected)],
        KeyCode::Left => vec![InputEvent::AdjustInstrumentVolume(ts.selected, -VOLUME_STEP)],
        KeyCode::Right => vec![InputEvent::AdjustInstrumentVolume(ts.selected, VOLUME_STEP)],

        // session
        KeyCode::Char('[') => vec![InputEvent::AdjustTempo(-TEMPO_STEP)],
        KeyCode::Char(']') => vec![InputEvent::AdjustTempo(TEMPO_STEP)],
        KeyCode::Char('-') => vec![InputEvent::AdjustMasterVolume(-VOLUME_STEP)],
        KeyCode::Char('=') => vec![InputEvent::AdjustMasterVolume(VOLUME_STEP)],
        KeyCode::Char('n') => vec![InputEvent::NextTrack],
        KeyCode::Char('p') => vec![InputEvent::PrevTrack],

        _ => vec![],
    }
}
