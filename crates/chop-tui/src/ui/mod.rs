//! # View Layer
//!
//! Pure projection of the application model into ratatui frames. The
//! renderer is invalidated once per applied message; nothing in here
//! mutates the model.

mod accounts;
mod blocks;
mod call;
mod contracts;
mod dashboard;
mod inspector;
mod settings;
mod transactions;
pub mod widgets;

use crate::app::{App, Screen, Tab};
use chop_core::Session;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders one full frame from the model.
pub fn render(frame: &mut Frame, app: &App, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tab bar
            Constraint::Min(5),    // body
            Constraint::Length(2), // footer
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);
    render_body(frame, app, session, chunks[1]);
    widgets::render_footer(frame, chunks[2], help_line(app.screen), app.visible_feedback());
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.screen.tab();
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        let label = format!(" {} {} ", i + 1, tab.title());
        if *tab == active {
            spans.push(Span::styled(
                label,
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(label, Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::raw(" "));
    }
    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" chop ─ local EVM workbench "),
    );
    frame.render_widget(bar, area);
}

fn render_body(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    match app.screen {
        Screen::Dashboard => dashboard::render(frame, app, session, area),
        Screen::MainMenu => dashboard::render_menu(frame, app, area),
        Screen::CallParameterList | Screen::CallParameterEdit => {
            call::render_parameter_list(frame, app, area);
        }
        Screen::CallTypeEdit => call::render_call_type_picker(frame, app, area),
        Screen::CallExecuting => call::render_executing(frame, area),
        Screen::CallResult => call::render_result(frame, app, area),
        Screen::CallHistory => call::render_history(frame, app, session, area),
        Screen::CallHistoryDetail => call::render_history_detail(frame, app, session, area),
        Screen::LogDetail => call::render_log_detail(frame, app, area),
        Screen::Contracts => contracts::render_list(frame, app, session, area),
        Screen::ContractDetail | Screen::GotoPC => {
            contracts::render_detail(frame, app, session, area);
        }
        Screen::ConfirmReset => settings::render_confirm_reset(frame, area),
        Screen::FixturesList => call::render_fixtures(frame, app, area),
        Screen::AccountsList => accounts::render_list(frame, app, session, area),
        Screen::AccountDetail => accounts::render_detail(frame, app, session, area),
        Screen::BlocksList => blocks::render_list(frame, app, session, area),
        Screen::BlockDetail => blocks::render_detail(frame, app, session, area),
        Screen::TransactionsList => transactions::render_list(frame, app, session, area),
        Screen::TransactionDetail => transactions::render_detail(frame, app, session, area),
        Screen::StateInspector => inspector::render(frame, app, area),
        Screen::Settings => settings::render(frame, app, session, area),
    }
}

/// The contextual help line.
#[must_use]
fn help_line(screen: Screen) -> &'static str {
    match screen {
        Screen::Dashboard => "enter/m menu  n new call  t auto-refresh  r reset  1-7 tabs  q quit",
        Screen::MainMenu => "up/down select  enter open  esc back",
        Screen::CallParameterList => {
            "up/down field  enter edit  e execute  r reset field  R reset all  esc back"
        }
        Screen::CallParameterEdit => "type to edit  enter apply  esc cancel",
        Screen::CallTypeEdit => "up/down select  enter apply  esc cancel",
        Screen::CallExecuting => "executing...  1-7 tabs",
        Screen::CallResult => "up/down logs  enter log detail  f save fixture  c copy  esc back",
        Screen::CallHistory => "up/down select  enter detail  esc back",
        Screen::CallHistoryDetail => "up/down logs  enter log detail  esc back",
        Screen::LogDetail => "esc back",
        Screen::Contracts => "up/down select  enter disassemble  c copy  esc back",
        Screen::ContractDetail => {
            "left/right block  up/down instruction  g follow jump  G goto pc  c copy  esc back"
        }
        Screen::GotoPC => "type a pc (hex or decimal)  enter go  esc cancel",
        Screen::ConfirmReset => "y confirm reset  n/esc cancel",
        Screen::FixturesList => "up/down select  enter load & run  esc back",
        Screen::AccountsList => "up/down select  enter detail  c copy  esc back",
        Screen::AccountDetail => "p reveal key (y confirms)  c copy  esc back",
        Screen::BlocksList => "up/down select  enter detail  esc back",
        Screen::BlockDetail => "up/down tx  enter tx detail  c copy  esc back",
        Screen::TransactionsList => "up/down select  enter detail  esc back",
        Screen::TransactionDetail => "up/down logs  enter log  b block  c copy  esc back",
        Screen::StateInspector => "type an address  enter inspect  esc clear  q quit",
        Screen::Settings => "up/down select  enter apply  [ ] gas limit  s save  esc back",
    }
}
