//! Contract list and the disassembly detail view.

use crate::app::{App, Screen};
use crate::ui::widgets::{render_kv, render_table, titled_block, truncate_middle};
use chop_core::{analyzer, Contract, Session};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Renders the deployed contracts table.
pub fn render_list(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let contracts = session.registry.list();
    if contracts.is_empty() {
        frame.render_widget(
            Paragraph::new(" nothing deployed yet; CREATE something first")
                .block(titled_block("Contracts")),
            area,
        );
        return;
    }
    let rows = project_contract_rows(&contracts);
    render_table(
        frame,
        area,
        &format!("Contracts ({})", contracts.len()),
        &["address", "code size", "deployed at"],
        &rows,
        &[
            Constraint::Length(44),
            Constraint::Length(11),
            Constraint::Min(12),
        ],
        app.contracts_cursor,
    );
}

/// One row per contract, newest first (registry order).
#[must_use]
pub fn project_contract_rows(contracts: &[&Contract]) -> Vec<Vec<String>> {
    contracts
        .iter()
        .map(|contract| {
            vec![
                contract.address.to_hex(),
                format!("{} bytes", contract.bytecode.len()),
                contract.creation_timestamp.format("%H:%M:%S").to_string(),
            ]
        })
        .collect()
}

/// Renders the contract detail: header, block navigation, instruction
/// table. The Goto-PC prompt overlays the header while active.
pub fn render_detail(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Min(3),
        ])
        .split(area);

    render_header(frame, app, session, chunks[0]);

    if let Some(error) = &app.disasm_error {
        // The error panel replaces the disassembly entirely.
        frame.render_widget(
            Paragraph::new(format!(" {error}"))
                .style(Style::default().fg(Color::Red))
                .block(titled_block("Disassembly failed")),
            chunks[1].union(chunks[2]),
        );
        return;
    }
    let Some(disasm) = &app.disassembly else {
        frame.render_widget(
            Paragraph::new(" disassembling ...").block(titled_block("Disassembly")),
            chunks[1].union(chunks[2]),
        );
        return;
    };

    render_block_strip(frame, app, chunks[1]);
    render_instructions(frame, app, disasm, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let mut pairs = Vec::new();
    if let Some(address) = app.selected_contract {
        pairs.push(("address", address.to_hex()));
        if let Some(contract) = session.registry.get(address) {
            pairs.push(("code size", format!("{} bytes", contract.bytecode.len())));
        }
    }
    if app.screen == Screen::GotoPC {
        pairs.push(("goto pc", format!("{}█", app.goto_input)));
    }
    render_kv(frame, area, "Contract", &pairs);
}

fn render_block_strip(frame: &mut Frame, app: &App, area: Rect) {
    let Some(disasm) = &app.disassembly else {
        return;
    };
    let blocks = &disasm.analysis.basic_blocks;
    let current = blocks.get(app.block_cursor);

    let summary = match current {
        Some(block) => format!(
            " block {}/{}   pc {:#06x}..{:#06x}   gas {}   stack req {}   max growth {}",
            app.block_cursor + 1,
            blocks.len(),
            block.begin_pc,
            block.end_pc,
            block.gas_cost,
            block.stack_req,
            block.stack_max_growth,
        ),
        None => " no basic blocks (empty code)".to_string(),
    };
    let jump_dests = disasm
        .analysis
        .jump_dests
        .iter()
        .take(12)
        .map(|pc| format!("{pc:#04x}"))
        .collect::<Vec<_>>()
        .join(" ");
    let lines = vec![
        Line::from(Span::raw(summary)),
        Line::from(Span::styled(
            format!(" jumpdests: {jump_dests}"),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(titled_block("Basic block")), area);
}

fn render_instructions(
    frame: &mut Frame,
    app: &App,
    disasm: &chop_core::DisassemblyResult,
    area: Rect,
) {
    let instructions = analyzer::instructions_for_block(disasm, app.block_cursor);
    let rows: Vec<Vec<String>> = instructions
        .iter()
        .map(|inst| {
            let immediate = if inst.immediate_bytes.is_empty() {
                String::new()
            } else {
                truncate_middle(&inst.immediate_bytes.to_hex(), 24)
            };
            vec![
                format!("{:#06x}", inst.pc),
                format!("0x{:02x}", inst.opcode),
                inst.mnemonic.clone(),
                immediate,
                if inst.is_jumpdest { "◆" } else { "" }.to_string(),
            ]
        })
        .collect();

    render_table(
        frame,
        area,
        "Instructions",
        &["pc", "op", "mnemonic", "immediate", ""],
        &rows,
        &[
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(26),
            Constraint::Length(2),
        ],
        app.inst_cursor,
    );
}
