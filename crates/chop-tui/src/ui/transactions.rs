//! Transactions list and detail.

use crate::app::App;
use crate::ui::call::render_log_table;
use crate::ui::widgets::{render_kv, render_table, titled_block, truncate_middle};
use chop_core::{Session, Transaction};
use chop_types::format_u64_grouped;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Paragraph,
    Frame,
};

/// Renders the transactions table, newest first.
pub fn render_list(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let txs: Vec<&Transaction> = session.chain.all_transactions().rev().collect();
    let rows = project_tx_rows(&txs);
    render_table(
        frame,
        area,
        &format!("Transactions ({})", txs.len()),
        &["id", "hash", "type", "from", "to", "status", "gas used"],
        &rows,
        &[
            Constraint::Length(5),
            Constraint::Length(16),
            Constraint::Length(13),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(7),
            Constraint::Min(9),
        ],
        app.txs_cursor,
    );
}

/// One row per transaction.
#[must_use]
pub fn project_tx_rows(txs: &[&Transaction]) -> Vec<Vec<String>> {
    txs.iter()
        .map(|tx| {
            vec![
                tx.id.to_string(),
                tx.hash.to_string(),
                tx.call_type.to_string(),
                tx.from.to_string(),
                tx.to.map(|to| to.to_string()).unwrap_or_else(|| "-".to_string()),
                if tx.status { "ok" } else { "failed" }.to_string(),
                format_u64_grouped(tx.gas_used),
            ]
        })
        .collect()
}

/// Renders one transaction with its log table.
pub fn render_detail(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let tx = app
        .selected_tx
        .and_then(|hash| session.chain.get_transaction_by_hash(hash));
    let Some(tx) = tx else {
        frame.render_widget(
            Paragraph::new(" transaction no longer exists (chain was reset)")
                .block(titled_block("Transaction")),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(14), Constraint::Min(3)])
        .split(area);

    let mut pairs = vec![
        ("hash", tx.hash.to_hex()),
        ("block", format!("#{} ({})", tx.block_number, tx.block_hash)),
        ("type", tx.call_type.to_string()),
        ("from", tx.from.to_hex()),
        (
            "to",
            tx.to.map(|to| to.to_hex()).unwrap_or_else(|| "(create)".to_string()),
        ),
        ("value", tx.value.to_string()),
        ("nonce", tx.nonce.to_string()),
        (
            "gas",
            format!(
                "{} used / {} limit",
                format_u64_grouped(tx.gas_used),
                format_u64_grouped(tx.gas_limit)
            ),
        ),
        ("input", truncate_middle(&tx.input_data.to_hex(), 60)),
        ("output", truncate_middle(&tx.return_data.to_hex(), 60)),
        (
            "status",
            if tx.status {
                "ok".to_string()
            } else {
                format!("failed: {}", tx.error)
            },
        ),
    ];
    if let Some(deployed) = tx.deployed_address {
        pairs.push(("deployed", deployed.to_hex()));
    }
    render_kv(frame, chunks[0], "Transaction", &pairs);

    render_log_table(frame, chunks[1], &tx.logs, app.log_cursor);
}
