use endless_ambient::music::MOODS;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Paragraph};

const COLS: usize = 4;
const ROWS: usize = 2;

// the eight mood cards, the current one lit in its accent colour
pub fn draw_mood_grid(frame: &mut Frame, area: Rect, current: Option<usize>, playing: bool) {
    let row_constraints = [Constraint::Percentage(50); ROWS];
    let col_constraints = [Constraint::Percentage(25); COLS];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (row_idx, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let idx = row_idx * COLS + col_idx;
            let Some(mood) = MOODS.get(idx) else { continue };
            let (r, g, b) = mood.accent;
            let accent = Color::Rgb(r, g, b);
            let lit = current == Some(idx);

            let border = if lit {
                Style::default().fg(accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let marker = match (lit, playing) {
                (true, true) => "▶ ",
                (true, false) => "❚❚ ",
                _ => "",
            };
            let block = Block::bordered()
                .border_type(if lit { BorderType::Thick } else { BorderType::Rounded })
                .border_style(border)
                .title(format!(" {} ", idx + 1));
            let text = vec![
                Line::from(format!("{marker}{} {}", mood.symbol, mood.name)).style(Style::default().fg(accent)),
                Line::from(mood.description).style(Style::default().fg(Color::Gray)),
            ];
            let card = Paragraph::new(text).alignment(Alignment::Center).block(block);
            frame.render_widget(card, *cell_area);
        }
    }
}
