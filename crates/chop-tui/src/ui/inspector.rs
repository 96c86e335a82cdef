//! State inspector: free-form address queries.

use crate::app::App;
use crate::ui::widgets::{titled_block, truncate_middle};
use chop_core::format_balance;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Renders the inspector: the address input on top, the inspection below.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    let input = Paragraph::new(format!(" {}█", app.inspect_input))
        .block(titled_block("Inspect address"));
    frame.render_widget(input, chunks[0]);

    let Some(state) = &app.inspected else {
        frame.render_widget(
            Paragraph::new(" enter a 0x address and press enter")
                .style(Style::default().fg(Color::DarkGray))
                .block(titled_block("State")),
            chunks[1],
        );
        return;
    };

    let mut lines = vec![
        kv_line("address", state.address.to_hex()),
        kv_line("balance", format_balance(state.balance)),
        kv_line("nonce", state.nonce.to_string()),
        kv_line(
            "kind",
            if state.is_contract {
                "contract".to_string()
            } else {
                "externally owned".to_string()
            },
        ),
        kv_line("code size", format!("{} bytes", state.code_size)),
    ];
    if state.is_contract {
        lines.push(kv_line("code", truncate_middle(&state.code.to_hex(), 64)));
    }
    if state.storage_slots.is_empty() {
        lines.push(kv_line("storage", "no non-zero slots".to_string()));
    } else {
        lines.push(kv_line("storage", format!("{} slots", state.storage_slots.len())));
        for (key, value) in state.storage_slots.iter().take(16) {
            lines.push(Line::from(Span::styled(
                format!("    [{key}] = {value}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(titled_block("State")), chunks[1]);
}

fn kv_line(key: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {key:<10} "),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(value),
    ])
}
