use endless_ambient::shared::{DisplayState, InstrumentRow};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use super::grid;

const BAR_WIDTH: usize = 20;

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title + transport
            Constraint::Length(8), // mood grid
            Constraint::Min(8),    // instrument panel
            Constraint::Length(2), // key help + status
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    grid::draw_mood_grid(frame, sections[1], state.mood_index, state.playing);
    draw_instruments(frame, sections[2], state);
    draw_footer(frame, sections[3], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let play = if !state.audio_ready {
        Span::styled("audio unavailable", Style::default().fg(Color::Red))
    } else if state.playing {
        Span::styled("▶ playing", Style::default().fg(Color::Green))
    } else {
        Span::styled("❚❚ stopped", Style::default().fg(Color::Yellow))
    };
    let line = Line::from(vec![
        play,
        Span::raw(format!("   {}   {:.0} bpm   master {}", state.mood, state.tempo, percent(state.master_volume))),
    ]);
    let block = Block::bordered().title(" endless ambient ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_instruments(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lines: Vec<Line> = state
        .instruments
        .iter()
        .map(|row| instrument_line(row, row.role == state.selected, state.field_track.as_deref()))
        .collect();
    let block = Block::bordered().title(" instruments ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn instrument_line<'a>(row: &InstrumentRow, selected: bool, field_track: Option<&'a str>) -> Line<'a> {
    let cursor = if selected { "›" } else { " " };
    let toggle = if row.active { "[on] " } else { "[off]" };
    let filled = (row.volume.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "·".repeat(BAR_WIDTH - filled));

    let mut style = if row.active { Style::default() } else { Style::default().fg(Color::DarkGray) };
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    let mut spans = vec![
        Span::styled(format!("{cursor} {:<17} {toggle} {bar} {:>4}", row.name, percent(row.volume)), style),
    ];
    if !row.role.is_synthesized() {
        let track = field_track.unwrap_or("no recordings");
        spans.push(Span::styled(format!("  ♪ {track}"), Style::default().fg(Color::Gray)));
    }
    Line::from(spans)
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lines = vec![
        Line::from("1-8 mood  space play/pause  ↑↓ select  enter toggle  ←→ volume  [ ] tempo  - = master  n p track  esc quit")
            .style(Style::default().fg(Color::DarkGray)),
        Line::from(state.status.as_str()),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn percent(v: f32) -> String {
    format!("{:.0}%", v * 100.0)
}
