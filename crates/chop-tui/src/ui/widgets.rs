//! Shared view helpers: truncation, key/value panels, table projection.
//!
//! Everything here is a pure function of its inputs; no widget holds state.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

/// Truncates an identifier for table columns: identifiers longer than 10
/// characters keep a prefix and gain `...`.
#[must_use]
pub fn truncate_id(value: &str) -> String {
    if value.len() > 10 {
        format!("{}...", &value[..10])
    } else {
        value.to_string()
    }
}

/// Truncates keeping both ends, for wide-but-bounded columns.
#[must_use]
pub fn truncate_middle(value: &str, max: usize) -> String {
    if value.len() <= max || max < 5 {
        return value.to_string();
    }
    let keep = max - 3;
    let head = keep / 2 + keep % 2;
    let tail = keep / 2;
    format!("{}...{}", &value[..head], &value[value.len() - tail..])
}

/// The standard bordered block with a title.
#[must_use]
pub fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
}

/// Renders a key/value panel.
pub fn render_kv(frame: &mut Frame, area: Rect, title: &str, pairs: &[(&str, String)]) {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let lines: Vec<Line> = pairs
        .iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(
                    format!(" {key:width$}  "),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(value.clone()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(titled_block(title)), area);
}

/// Renders a cursor-driven table with deterministic column order.
pub fn render_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    header: &[&str],
    rows: &[Vec<String>],
    widths: &[Constraint],
    cursor: usize,
) {
    let header_row = Row::new(
        header
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
    );

    let visible = visible_window(rows.len(), cursor, area.height.saturating_sub(4) as usize);
    let body = rows
        .iter()
        .enumerate()
        .skip(visible.0)
        .take(visible.1 - visible.0)
        .map(|(i, row)| {
            let style = if i == cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(row.iter().map(|cell| Cell::from(cell.clone()))).style(style)
        });

    let table = Table::new(body, widths.to_vec())
        .header(header_row)
        .block(titled_block(title));
    frame.render_widget(table, area);
}

/// The scroll window [start, end) keeping the cursor visible in `height`
/// rows.
#[must_use]
pub fn visible_window(len: usize, cursor: usize, height: usize) -> (usize, usize) {
    if height == 0 || len == 0 {
        return (0, len);
    }
    let start = if cursor >= height { cursor + 1 - height } else { 0 };
    (start, (start + height).min(len))
}

/// Renders the help line plus any live feedback.
pub fn render_footer(frame: &mut Frame, area: Rect, help: &str, feedback: Option<&str>) {
    let line = match feedback {
        Some(feedback) => Line::from(vec![
            Span::styled(
                format!(" {feedback} "),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ),
            Span::raw("  "),
            Span::styled(help.to_string(), Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::from(Span::styled(
            format!(" {help}"),
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::TOP)),
        area,
    );
}

// =============================================================================
// TESTS
// =============================================================================
