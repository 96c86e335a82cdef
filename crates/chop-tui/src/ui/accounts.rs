//! Accounts list and detail.

use crate::app::App;
use crate::ui::widgets::{render_kv, render_table, truncate_middle};
use chop_core::{format_balance, Account, Session};
use ratatui::{
    layout::{Constraint, Rect},
    Frame,
};

/// Renders the accounts table.
pub fn render_list(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let rows = project_account_rows(session.accounts.all());
    render_table(
        frame,
        area,
        &format!("Accounts ({})", session.accounts.count()),
        &["#", "address", "balance", "nonce", "kind"],
        &rows,
        &[
            Constraint::Length(4),
            Constraint::Length(44),
            Constraint::Length(14),
            Constraint::Length(7),
            Constraint::Length(9),
        ],
        app.accounts_cursor,
    );
}

/// One row per account, full address (the canonical 42 chars fits).
#[must_use]
pub fn project_account_rows(accounts: &[Account]) -> Vec<Vec<String>> {
    accounts
        .iter()
        .map(|account| {
            vec![
                account.index.to_string(),
                account.address.to_hex(),
                format_balance(account.balance),
                account.nonce.to_string(),
                if account.is_contract() { "contract" } else { "eoa" }.to_string(),
            ]
        })
        .collect()
}

/// Renders one account in detail, private key only after a reveal.
pub fn render_detail(frame: &mut Frame, app: &App, session: &Session, area: Rect) {
    let Some(address) = app.selected_account else {
        return;
    };
    let state = session.inspector().inspect_address(address);

    let mut pairs = vec![
        ("address", state.address.to_hex()),
        ("balance", format_balance(state.balance)),
        ("nonce", state.nonce.to_string()),
        (
            "kind",
            if state.is_contract {
                format!("contract ({} bytes of code)", state.code_size)
            } else {
                "externally owned".to_string()
            },
        ),
    ];
    match &app.revealed_key {
        Some(key) => pairs.push(("private key", key.clone())),
        None if app.awaiting_reveal => {
            pairs.push(("private key", "press y to reveal".to_string()));
        }
        None => pairs.push(("private key", "hidden (p to reveal)".to_string())),
    }
    if state.is_contract {
        pairs.push(("code", truncate_middle(&state.code.to_hex(), 60)));
    }
    render_kv(frame, area, "Account", &pairs);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chop_core::ChopConfig;

    #[test]
    fn test_project_account_rows() {
        let session = Session::new(Some([0x01; 32]), ChopConfig::default(), None);
        let rows = project_account_rows(session.accounts.all());
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0][0], "0");
        assert!(rows[0][1].starts_with("0x"));
        assert_eq!(rows[0][1].len(), 42);
        assert_eq!(rows[0][2], "100 ETH");
        assert_eq!(rows[0][4], "eoa");

        // Deterministic column order across calls.
        let again = project_account_rows(session.accounts.all());
        assert_eq!(rows, again);
    }
}
