//! Settings menu and the reset confirmation screen.

use crate::app::{App, SettingsAction};
use crate::ui::widgets::titled_block;
use chop_core::Session;
use chop_types::format_u64_grouped;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

/// Renders the settings menu with the current values beside the options.
pub fn render(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(7), Constraint::Length(4)])
        .split(area);

    let items: Vec<ListItem> = SettingsAction::ALL
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let value = match action {
                SettingsAction::ToggleAutoRefresh => {
                    if app.auto_refresh {
                        " [on]"
                    } else {
                        " [off]"
                    }
                    .to_string()
                }
                SettingsAction::AdjustGasLimit => {
                    format!(" [{}]", format_u64_grouped(session.chain.get_gas_limit()))
                }
                _ => String::new(),
            };
            let armed = app.awaiting_confirm == Some(*action);
            let label = if armed {
                format!("  {} — press y to confirm", action.label())
            } else {
                format!("  {}{value}", action.label())
            };
            let style = if i == app.settings_cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(if armed { Color::Red } else { Color::Cyan })
                    .add_modifier(Modifier::BOLD)
            } else if armed {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();
    frame.render_widget(List::new(items).block(titled_block("Settings")), chunks[0]);

    let info = vec![
        Line::from(Span::styled(
            format!(" seed: {}", session.accounts.seed_hex()),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            format!(
                " accounts: {}  initial balance: {} ETH",
                session.config.accounts.count, session.config.accounts.initial_balance_eth
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(info).block(titled_block("Session")), chunks[1]);
}

/// Renders the blocking reset confirmation.
pub fn render_confirm_reset(frame: &mut Frame, area: Rect) {
    let text = Paragraph::new(
        "\n  Reset the blockchain?\n\n  This truncates the persisted call log, discards all\n  blocks, history and contracts, and reseeds the VM.\n\n  y to confirm, n or esc to cancel",
    )
    .style(Style::default().fg(Color::Red))
    .block(titled_block("Confirm reset"));
    frame.render_widget(text, area);
}
