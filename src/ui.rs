use image::Rgba;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

use crate::app::App;
use crate::map::renderer::Label;
use crate::raster::Canvas;

const UPPER_HALF: char = '▀';

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" {} ", app.model.theme().head.name);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cursor_pos = app.mouse_pos.and_then(|(col, row)| {
        let (cx, cy) = (col.checked_sub(1)?, row.checked_sub(1)?);
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(
        MapWidget {
            canvas: &app.canvas,
            labels: &app.labels,
            cursor_pos,
        },
        inner,
    );
}

/// Canvas drawn with half-block cells, two pixels per cell
pub struct MapWidget<'a> {
    pub canvas: &'a Canvas,
    pub labels: &'a [Label],
    pub cursor_pos: Option<(u16, u16)>,
}

fn to_color(px: Rgba<u8>) -> Color {
    Color::Rgb(px[0], px[1], px[2])
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cols = (area.width as usize).min(self.canvas.width());
        let rows = (area.height as usize).min(self.canvas.height() / 2);

        for row in 0..rows {
            let top = self.canvas.scanline(row * 2);
            let bottom = self.canvas.scanline(row * 2 + 1);
            let y = area.y + row as u16;
            for col in 0..cols {
                let x = area.x + col as u16;
                buf[(x, y)]
                    .set_char(UPPER_HALF)
                    .set_fg(to_color(top[col]))
                    .set_bg(to_color(bottom[col]));
            }
        }

        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for label in self.labels {
            let (lx, ly) = (label.x, label.y / 2);
            if lx < 0 || ly < 0 || ly >= area.height as i32 || lx >= area.width as i32 {
                continue;
            }
            let max_len = (area.width as i32 - lx) as usize;
            let y = area.y + ly as u16;
            for (i, ch) in label.text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + lx as u16 + i as u16, y)].set_char(ch).set_style(label_style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            let (x, y) = (area.x + cx, area.y + cy);
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn toggle_span(label: &'static str, on: bool) -> Span<'static> {
    Span::styled(label, Style::default().fg(if on { Color::Green } else { Color::DarkGray }))
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let interlaced = app.model.texture_mapper().is_some_and(|m| m.interlaced());
    let settings = &app.overlay.settings;

    let mut spans = vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.status_summary(), Style::default().fg(Color::Yellow)),
        Span::styled(" ", Style::default()),
        toggle_span("[s]mooth ", app.view.smooth),
        toggle_span("[i]nterlace ", interlaced),
        toggle_span("[v]ector ", settings.show_lines),
        toggle_span("[L]abels ", settings.show_labels),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(cursor) = app.cursor_coords() {
        spans.push(Span::styled(format!(" @ {cursor}"), Style::default().fg(Color::Red)));
    }
    spans.push(Span::styled(
        " | hjkl:pan +/-:zoom p:proj r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
