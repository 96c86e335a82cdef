//! Call editing, execution, results, history, logs and fixtures.

use crate::app::{App, Screen};
use crate::ui::widgets::{render_kv, render_table, titled_block, truncate_middle};
use chop_core::{CallResult, CallType, HistoryEntry, Session};
use chop_evm::LogEntry;
use chop_types::format_u64_grouped;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

/// Renders the parameter list; the line editor overlays the edited field.
pub fn render_parameter_list(frame: &mut Frame, app: &App, area: Rect) {
    let fields = app.visible_fields();
    let mut lines = Vec::with_capacity(fields.len() * 2);

    for (i, field) in fields.iter().enumerate() {
        let editing = app.screen == Screen::CallParameterEdit && app.edit_field == Some(*field);
        let value = if editing {
            format!("{}█", app.edit_buffer)
        } else {
            app.params.field_value(*field)
        };

        let marker = if i == app.field_cursor { ">" } else { " " };
        let label_style = if i == app.field_cursor {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {marker} {:<11}", field.label()), label_style),
            Span::raw(truncate_middle(&value, area.width.saturating_sub(20) as usize)),
        ]));

        // Validation error shown beside (under) the offending field.
        if let Some(error) = app.field_errors.get(field) {
            lines.push(Line::from(Span::styled(
                format!("              ! {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).block(titled_block("Call parameters")),
        area,
    );
}

/// Renders the call type picker.
pub fn render_call_type_picker(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = CallType::ALL
        .iter()
        .enumerate()
        .map(|(i, call_type)| {
            let style = if i == app.call_type_cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("  {call_type}")).style(style)
        })
        .collect();
    frame.render_widget(List::new(items).block(titled_block("Call type")), area);
}

/// Renders the latched executing screen.
pub fn render_executing(frame: &mut Frame, area: Rect) {
    let text = Paragraph::new("\n  executing against the EVM ...")
        .style(Style::default().fg(Color::Yellow))
        .block(titled_block("Executing"));
    frame.render_widget(text, area);
}

/// Renders the result of the last execution.
pub fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let Some(record) = &app.last_record else {
        frame.render_widget(
            Paragraph::new("no result").block(titled_block("Result")),
            area,
        );
        return;
    };
    render_call_result(
        frame,
        area,
        "Result",
        &record.result,
        record.transaction.gas_limit,
        Some(record.block_number),
        app.log_cursor,
    );
}

/// Renders one historical execution.
pub fn render_history_detail(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let entry = app
        .selected_history_id
        .and_then(|id| session.history.get_call(id));
    let Some(entry) = entry else {
        frame.render_widget(
            Paragraph::new("entry evicted from history").block(titled_block("History")),
            area,
        );
        return;
    };
    let gas_limit = entry.parameters.gas_limit.parse().unwrap_or(0);
    render_call_result(
        frame,
        area,
        &format!("History #{}", entry.id),
        &entry.result,
        gas_limit,
        None,
        app.log_cursor,
    );
}

fn render_call_result(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    result: &CallResult,
    gas_limit: u64,
    block_number: Option<u64>,
    log_cursor: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(3)])
        .split(area);

    let mut pairs = vec![
        (
            "status",
            if result.success {
                "success".to_string()
            } else {
                "failed".to_string()
            },
        ),
        ("gas used", format_u64_grouped(result.gas_used(gas_limit))),
        ("gas left", format_u64_grouped(result.gas_left)),
        (
            "return data",
            truncate_middle(&result.return_data.to_hex(), 60),
        ),
    ];
    if !result.error_info.is_empty() {
        pairs.push(("error", result.error_info.clone()));
    }
    if let Some(deployed) = result.deployed_address {
        pairs.push(("deployed", deployed.to_hex()));
    }
    if let Some(number) = block_number {
        pairs.push(("block", format!("#{number}")));
    }
    render_kv(frame, chunks[0], title, &pairs);

    render_log_table(frame, chunks[1], &result.logs, log_cursor);
}

/// The scrollable log table shared by result, history and tx details.
pub fn render_log_table(frame: &mut Frame, area: Rect, logs: &[LogEntry], cursor: usize) {
    if logs.is_empty() {
        frame.render_widget(
            Paragraph::new(" no logs emitted").block(titled_block("Logs")),
            area,
        );
        return;
    }
    let rows = project_log_rows(logs);
    render_table(
        frame,
        area,
        &format!("Logs ({})", logs.len()),
        &["#", "address", "topics", "data"],
        &rows,
        &[
            Constraint::Length(3),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
        cursor,
    );
}

/// One row per log: index, truncated address, topic count, data preview.
#[must_use]
pub fn project_log_rows(logs: &[LogEntry]) -> Vec<Vec<String>> {
    logs.iter()
        .enumerate()
        .map(|(i, log)| {
            vec![
                i.to_string(),
                log.address.to_string(),
                log.topics.len().to_string(),
                truncate_middle(&log.data.to_hex(), 32),
            ]
        })
        .collect()
}

/// Renders one log in full.
pub fn render_log_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(log) = &app.selected_log else {
        frame.render_widget(Paragraph::new("no log").block(titled_block("Log")), area);
        return;
    };
    let mut pairs = vec![("address", log.address.to_hex())];
    for (i, topic) in log.topics.iter().enumerate() {
        pairs.push(("topic", format!("[{i}] {}", topic.to_hex())));
    }
    pairs.push(("data", log.data.to_hex()));
    pairs.push(("bytes", log.data.len().to_string()));
    let pairs: Vec<(&str, String)> = pairs;
    render_kv(frame, area, "Log", &pairs);
}

/// Renders the history list, newest first.
pub fn render_history(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let entries: Vec<&HistoryEntry> = session.history.all().rev().collect();
    let rows = project_history_rows(&entries);
    render_table(
        frame,
        area,
        &format!("Call history ({})", entries.len()),
        &["id", "type", "caller", "status", "gas used", "when"],
        &rows,
        &[
            Constraint::Length(5),
            Constraint::Length(13),
            Constraint::Length(16),
            Constraint::Length(7),
            Constraint::Length(12),
            Constraint::Min(8),
        ],
        app.history_cursor,
    );
}

/// One row per history entry.
#[must_use]
pub fn project_history_rows(entries: &[&HistoryEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            let gas_limit: u64 = entry.parameters.gas_limit.parse().unwrap_or(0);
            vec![
                entry.id.to_string(),
                entry.parameters.call_type.to_string(),
                truncate_middle(&entry.parameters.caller, 14),
                if entry.result.success { "ok" } else { "failed" }.to_string(),
                format_u64_grouped(entry.result.gas_used(gas_limit)),
                entry.timestamp.format("%H:%M:%S").to_string(),
            ]
        })
        .collect()
}

/// Renders the fixtures list.
pub fn render_fixtures(frame: &mut Frame, app: &App, area: Rect) {
    if app.fixtures.is_empty() {
        frame.render_widget(
            Paragraph::new(" no fixtures in ~/.chop/fixtures").block(titled_block("Fixtures")),
            area,
        );
        return;
    }
    let rows: Vec<Vec<String>> = app
        .fixtures
        .iter()
        .map(|fixture| {
            vec![
                fixture.name.clone(),
                format!("{} bytes", fixture.bytecode.len().saturating_sub(2) / 2),
                fixture.gas_limit.to_string(),
                fixture
                    .expected_result
                    .as_ref()
                    .map(|e| format!("expect {}", if e.success { "ok" } else { "fail" }))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    render_table(
        frame,
        area,
        "Fixtures",
        &["name", "bytecode", "gas limit", "expectation"],
        &rows,
        &[
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
        app.fixtures_cursor,
    );
}
