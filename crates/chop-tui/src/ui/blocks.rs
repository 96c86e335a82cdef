//! Blocks list and detail.

use crate::app::App;
use crate::ui::widgets::{render_kv, render_table};
use chop_core::{Block, Session};
use chop_types::format_u64_grouped;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Paragraph,
    Frame,
};

use crate::ui::widgets::titled_block;

/// Renders the blocks table, newest first.
pub fn render_list(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let blocks: Vec<&Block> = session.chain.get_all_blocks().iter().rev().collect();
    let rows = project_block_rows(&blocks);
    render_table(
        frame,
        area,
        &format!("Blocks (height {})", session.chain.height()),
        &["number", "hash", "txs", "gas used", "timestamp"],
        &rows,
        &[
            Constraint::Length(8),
            Constraint::Length(18),
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
        app.blocks_cursor,
    );
}

/// One row per block.
#[must_use]
pub fn project_block_rows(blocks: &[&Block]) -> Vec<Vec<String>> {
    blocks
        .iter()
        .map(|block| {
            vec![
                format!("#{}", block.number),
                block.hash.to_string(),
                block.transactions.len().to_string(),
                format_u64_grouped(block.gas_used),
                block.timestamp.to_string(),
            ]
        })
        .collect()
}

/// Renders one block with its transaction table.
pub fn render_detail(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let block = app
        .selected_block
        .and_then(|number| session.chain.get_block_by_number(number));
    let Some(block) = block else {
        frame.render_widget(
            Paragraph::new(" block no longer exists (chain was reset)")
                .block(titled_block("Block")),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(3)])
        .split(area);

    let pairs = vec![
        ("number", format!("#{}", block.number)),
        ("hash", block.hash.to_hex()),
        ("parent", block.parent_hash.to_hex()),
        ("timestamp", block.timestamp.to_string()),
        ("miner", block.miner.to_hex()),
        ("gas", format!(
            "{} / {}",
            format_u64_grouped(block.gas_used),
            format_u64_grouped(block.gas_limit)
        )),
        ("state root", block.state_root.to_hex()),
        ("size", format!("{} bytes", block.size)),
    ];
    render_kv(frame, chunks[0], "Block", &pairs);

    let rows: Vec<Vec<String>> = block
        .transactions
        .iter()
        .map(|tx| {
            vec![
                tx.id.to_string(),
                tx.hash.to_string(),
                tx.call_type.to_string(),
                if tx.status { "ok" } else { "failed" }.to_string(),
                format_u64_grouped(tx.gas_used),
            ]
        })
        .collect();
    render_table(
        frame,
        chunks[1],
        "Transactions",
        &["id", "hash", "type", "status", "gas used"],
        &rows,
        &[
            Constraint::Length(5),
            Constraint::Length(18),
            Constraint::Length(13),
            Constraint::Length(7),
            Constraint::Min(10),
        ],
        app.block_tx_cursor,
    );
}
