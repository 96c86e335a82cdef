//! Dashboard and main menu.

use crate::app::{App, MAIN_MENU};
use crate::ui::widgets::{titled_block, truncate_middle};
use chop_core::{format_balance_short, Session};
use chop_types::format_u64_grouped;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

/// Renders the dashboard: chain summary, accounts summary, recent blocks.
pub fn render(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(5),
        ])
        .split(area);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(rows[0]);

    render_chain_panel(frame, app, session, panels[0]);
    render_accounts_panel(frame, session, panels[1]);
    render_session_panel(frame, app, session, panels[2]);
    render_recent_blocks(frame, session, rows[1]);
}

fn render_chain_panel(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let stats = session.chain.get_stats();
    let refresh = if app.auto_refresh { "on" } else { "off" };
    let text = vec![
        line(" Height:     ", format!("#{}", stats.height)),
        line(" Txs:        ", stats.total_transactions.to_string()),
        line(" Gas used:   ", format_u64_grouped(stats.total_gas_used as u64)),
        line(" Gas limit:  ", format_u64_grouped(session.chain.get_gas_limit())),
        line(" Refresh:    ", format!("{refresh} ({})", app.last_update.format("%H:%M:%S"))),
    ];
    frame.render_widget(Paragraph::new(text).block(titled_block("Chain")), area);
}

fn render_accounts_panel(frame: &mut Frame, session: &Session, area: Rect) {
    let accounts = session.accounts.all();
    let eoa_count = accounts.iter().filter(|a| !a.is_contract()).count();
    let contract_count = accounts.len() - eoa_count;
    let first = accounts
        .first()
        .map(|a| format!("{} ({})", a.address, format_balance_short(a.balance)))
        .unwrap_or_else(|| "-".to_string());
    let text = vec![
        line(" EOAs:       ", eoa_count.to_string()),
        line(" Contracts:  ", contract_count.to_string()),
        line(" History:    ", session.history.len().to_string()),
        line(" account[0]: ", first),
    ];
    frame.render_widget(Paragraph::new(text).block(titled_block("Accounts")), area);
}

fn render_session_panel(frame: &mut Frame, _app: &App, session: &Session, area: Rect) {
    let persist = session
        .state_path()
        .map(|path| truncate_middle(&path.display().to_string(), 28))
        .unwrap_or_else(|| "memory only".to_string());
    let text = vec![
        line(" Seed:       ", truncate_middle(&session.accounts.seed_hex(), 20)),
        line(" State file: ", persist),
        line(" Registry:   ", format!("{} contracts", session.registry.count())),
        line(" Hardfork:   ", session.config.hardfork.clone()),
    ];
    frame.render_widget(Paragraph::new(text).block(titled_block("Session")), area);
}

fn render_recent_blocks(frame: &mut Frame, session: &Session, area: Rect) {
    let items: Vec<ListItem> = session
        .chain
        .get_recent_blocks(area.height.saturating_sub(2) as usize)
        .iter()
        .map(|block| {
            let tx_note = match block.transactions.first() {
                Some(tx) => format!(
                    "{} {} gas {}",
                    tx.call_type,
                    if tx.status { "ok" } else { "failed" },
                    format_u64_grouped(tx.gas_used)
                ),
                None => "genesis".to_string(),
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" #{:<6}", block.number),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {}  ", block.hash)),
                Span::styled(tx_note, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(titled_block("Recent blocks")), area);
}

/// Renders the main menu over the dashboard area.
pub fn render_menu(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = MAIN_MENU
        .iter()
        .enumerate()
        .map(|(i, (label, _))| {
            let style = if i == app.menu_cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("  {label}")).style(style)
        })
        .collect();
    frame.render_widget(List::new(items).block(titled_block("Menu")), area);
}

fn line(key: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(key.to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}
