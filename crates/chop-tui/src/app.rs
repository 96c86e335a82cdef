//! # Application Model
//!
//! The single mutable model behind the TUI: a finite screen tag, the
//! navigation stack, per-screen cursors and the transient UI flags. All
//! mutation happens in [`App::update`]; commands returned from it run on
//! workers and come back as messages.

use crate::msg::{Cmd, Msg};
use crate::nav::{NavStack, Payload};
use chop_core::{
    analyzer, fixtures, validate_call_parameters, validate_field, AccountState, CallParameters,
    CallType, DisassemblyResult, EngineError, ExecutionRecord, Fixture, ParamField, Session,
};
use chop_evm::LogEntry;
use chop_types::{Address, Hash};
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long transient feedback stays visible.
const FEEDBACK_TTL: Duration = Duration::from_millis(2500);

/// Gas limit nudge applied by `[` / `]`.
const GAS_LIMIT_STEP: u64 = 1_000_000;

/// The finite set of screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    MainMenu,
    CallParameterList,
    CallParameterEdit,
    CallTypeEdit,
    CallExecuting,
    CallResult,
    CallHistory,
    CallHistoryDetail,
    LogDetail,
    Contracts,
    ContractDetail,
    GotoPC,
    ConfirmReset,
    FixturesList,
    AccountsList,
    AccountDetail,
    BlocksList,
    BlockDetail,
    TransactionsList,
    TransactionDetail,
    StateInspector,
    Settings,
}

impl Screen {
    /// The top-level tab a screen belongs to, for the tab bar highlight.
    #[must_use]
    pub fn tab(&self) -> Tab {
        use Screen::*;
        match self {
            Dashboard | MainMenu | CallParameterList | CallParameterEdit | CallTypeEdit
            | CallExecuting | CallResult | CallHistory | CallHistoryDetail | LogDetail
            | FixturesList | ConfirmReset => Tab::Dashboard,
            AccountsList | AccountDetail => Tab::Accounts,
            BlocksList | BlockDetail => Tab::Blocks,
            TransactionsList | TransactionDetail => Tab::Transactions,
            Contracts | ContractDetail | GotoPC => Tab::Contracts,
            StateInspector => Tab::Inspector,
            Settings => Tab::Settings,
        }
    }

    /// True while a text input owns the keyboard.
    #[must_use]
    pub fn is_text_input(&self) -> bool {
        matches!(
            self,
            Screen::CallParameterEdit | Screen::GotoPC | Screen::StateInspector
        )
    }
}

/// Top-level tabs, switched with `1`..`7`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Accounts,
    Blocks,
    Transactions,
    Contracts,
    Inspector,
    Settings,
}

impl Tab {
    /// All tabs in key order.
    pub const ALL: [Tab; 7] = [
        Tab::Dashboard,
        Tab::Accounts,
        Tab::Blocks,
        Tab::Transactions,
        Tab::Contracts,
        Tab::Inspector,
        Tab::Settings,
    ];

    /// Tab bar label.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Accounts => "Accounts",
            Tab::Blocks => "Blocks",
            Tab::Transactions => "Transactions",
            Tab::Contracts => "Contracts",
            Tab::Inspector => "State",
            Tab::Settings => "Settings",
        }
    }

    /// The screen a tab lands on.
    #[must_use]
    pub fn screen(&self) -> Screen {
        match self {
            Tab::Dashboard => Screen::Dashboard,
            Tab::Accounts => Screen::AccountsList,
            Tab::Blocks => Screen::BlocksList,
            Tab::Transactions => Screen::TransactionsList,
            Tab::Contracts => Screen::Contracts,
            Tab::Inspector => Screen::StateInspector,
            Tab::Settings => Screen::Settings,
        }
    }

    fn from_digit(digit: char) -> Option<Self> {
        let index = digit.to_digit(10)? as usize;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }
}

/// The fixed settings menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsAction {
    ResetBlockchain,
    RegenerateAccounts,
    ToggleAutoRefresh,
    AdjustGasLimit,
    SaveConfig,
}

impl SettingsAction {
    /// All options in display order.
    pub const ALL: [SettingsAction; 5] = [
        SettingsAction::ResetBlockchain,
        SettingsAction::RegenerateAccounts,
        SettingsAction::ToggleAutoRefresh,
        SettingsAction::AdjustGasLimit,
        SettingsAction::SaveConfig,
    ];

    /// Menu label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SettingsAction::ResetBlockchain => "Reset blockchain",
            SettingsAction::RegenerateAccounts => "Regenerate accounts",
            SettingsAction::ToggleAutoRefresh => "Toggle auto-refresh",
            SettingsAction::AdjustGasLimit => "Gas limit ([ and ] adjust)",
            SettingsAction::SaveConfig => "Save config",
        }
    }
}

/// The main menu entries.
pub const MAIN_MENU: [(&str, Screen); 5] = [
    ("New Call", Screen::CallParameterList),
    ("Call History", Screen::CallHistory),
    ("Fixtures", Screen::FixturesList),
    ("Contracts", Screen::Contracts),
    ("Settings", Screen::Settings),
];

/// Transient feedback line with its expiry.
#[derive(Clone, Debug)]
pub struct Feedback {
    /// The message.
    pub text: String,
    /// Wall-clock expiry, compared at render time.
    pub expires: Instant,
}

/// The application model.
pub struct App {
    /// Shared session; workers lock it for execution, the loop for reads.
    pub session: Arc<Mutex<Session>>,
    /// Current screen tag.
    pub screen: Screen,
    /// Back navigation.
    pub nav: NavStack,
    /// Set when the operator quits.
    pub should_quit: bool,

    // === Call editor ===
    /// The parameters under edit.
    pub params: CallParameters,
    /// Cursor over the visible fields.
    pub field_cursor: usize,
    /// Field-level validation errors, keyed by field.
    pub field_errors: HashMap<ParamField, String>,
    /// Field currently in the line editor.
    pub edit_field: Option<ParamField>,
    /// Line editor buffer.
    pub edit_buffer: String,
    /// Cursor in the call type picker.
    pub call_type_cursor: usize,

    // === Execution & results ===
    /// The last completed execution.
    pub last_record: Option<ExecutionRecord>,
    /// Cursor in the result/detail log table.
    pub log_cursor: usize,
    /// The log opened in LogDetail.
    pub selected_log: Option<LogEntry>,

    // === History ===
    /// Cursor in the history list.
    pub history_cursor: usize,
    /// History entry opened in detail.
    pub selected_history_id: Option<u64>,

    // === Contracts & disassembly ===
    /// Cursor in the contract list.
    pub contracts_cursor: usize,
    /// Contract opened in detail.
    pub selected_contract: Option<Address>,
    /// Loaded disassembly for the selected contract.
    pub disassembly: Option<DisassemblyResult>,
    /// Disassembly error panel text.
    pub disasm_error: Option<String>,
    /// Current basic block index.
    pub block_cursor: usize,
    /// Cursor inside the current block's instruction table.
    pub inst_cursor: usize,
    /// Goto-PC input buffer.
    pub goto_input: String,

    // === Accounts ===
    /// Cursor in the accounts list.
    pub accounts_cursor: usize,
    /// Account opened in detail.
    pub selected_account: Option<Address>,
    /// Private key shown after an explicit reveal.
    pub revealed_key: Option<String>,
    /// Reveal armed, waiting for `y`.
    pub awaiting_reveal: bool,

    // === Blocks & transactions ===
    /// Cursor in the blocks list.
    pub blocks_cursor: usize,
    /// Block opened in detail.
    pub selected_block: Option<u64>,
    /// Cursor over a block's transactions.
    pub block_tx_cursor: usize,
    /// Cursor in the transactions list.
    pub txs_cursor: usize,
    /// Transaction opened in detail.
    pub selected_tx: Option<Hash>,

    // === State inspector ===
    /// Address input buffer.
    pub inspect_input: String,
    /// Last inspection result.
    pub inspected: Option<AccountState>,

    // === Settings ===
    /// Cursor over the settings menu.
    pub settings_cursor: usize,
    /// Destructive action armed, waiting for `y`.
    pub awaiting_confirm: Option<SettingsAction>,
    /// Dashboard auto-refresh.
    pub auto_refresh: bool,

    // === Fixtures ===
    /// Fixtures loaded from disk when the list opens.
    pub fixtures: Vec<Fixture>,
    /// Cursor in the fixtures list.
    pub fixtures_cursor: usize,

    // === Misc ===
    /// Cursor in the main menu.
    pub menu_cursor: usize,
    /// Transient feedback.
    pub feedback: Option<Feedback>,
    /// Advanced by the dashboard tick.
    pub last_update: DateTime<Utc>,
    /// True while a tick message is outstanding.
    pub tick_scheduled: bool,
}

impl App {
    /// Builds the model around a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let caller = session
            .accounts
            .all()
            .first()
            .map(|account| account.address)
            .unwrap_or(Address::ZERO);
        let auto_refresh = true;
        Self {
            session: Arc::new(Mutex::new(session)),
            screen: Screen::Dashboard,
            nav: NavStack::new(),
            should_quit: false,
            params: CallParameters::defaults(caller),
            field_cursor: 0,
            field_errors: HashMap::new(),
            edit_field: None,
            edit_buffer: String::new(),
            call_type_cursor: 0,
            last_record: None,
            log_cursor: 0,
            selected_log: None,
            history_cursor: 0,
            selected_history_id: None,
            contracts_cursor: 0,
            selected_contract: None,
            disassembly: None,
            disasm_error: None,
            block_cursor: 0,
            inst_cursor: 0,
            goto_input: String::new(),
            accounts_cursor: 0,
            selected_account: None,
            revealed_key: None,
            awaiting_reveal: false,
            blocks_cursor: 0,
            selected_block: None,
            block_tx_cursor: 0,
            txs_cursor: 0,
            selected_tx: None,
            inspect_input: String::new(),
            inspected: None,
            settings_cursor: 0,
            awaiting_confirm: None,
            auto_refresh,
            fixtures: Vec::new(),
            fixtures_cursor: 0,
            menu_cursor: 0,
            feedback: None,
            last_update: Utc::now(),
            tick_scheduled: false,
        }
    }

    /// Locks the shared session, recovering from poisoning.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Feedback text if it has not expired. Wall-clock check at render
    /// time; no timer involved.
    #[must_use]
    pub fn visible_feedback(&self) -> Option<&str> {
        self.feedback
            .as_ref()
            .filter(|f| f.expires > Instant::now())
            .map(|f| f.text.as_str())
    }

    fn set_feedback(&mut self, text: impl Into<String>) {
        self.feedback = Some(Feedback {
            text: text.into(),
            expires: Instant::now() + FEEDBACK_TTL,
        });
    }

    // =========================================================================
    // MESSAGE APPLICATION
    // =========================================================================

    /// Applies one message and returns the follow-up commands.
    pub fn update(&mut self, msg: Msg) -> Vec<Cmd> {
        match msg {
            Msg::Key(key) => self.on_key(key),
            Msg::CallCompleted(outcome) => self.on_call_completed(*outcome),
            Msg::DisassemblyReady { address, result } => {
                self.on_disassembly(address, result);
                Vec::new()
            }
            Msg::ResetDone { warning } => {
                match warning {
                    Some(warning) => self.set_feedback(warning),
                    None => self.set_feedback("blockchain reset"),
                }
                Vec::new()
            }
            Msg::Tick => self.on_tick(),
            Msg::Feedback(text) => {
                self.set_feedback(text);
                Vec::new()
            }
        }
    }

    fn on_call_completed(&mut self, outcome: Result<ExecutionRecord, EngineError>) -> Vec<Cmd> {
        if self.screen != Screen::CallExecuting {
            // A tab switch replaced the state before delivery; the stale
            // result is discarded on arrival.
            debug!("discarding stale call result");
            return Vec::new();
        }
        match outcome {
            Ok(record) => {
                if let Some(warning) = &record.persist_warning {
                    self.set_feedback(warning.clone());
                }
                self.last_record = Some(record);
                self.log_cursor = 0;
                self.screen = Screen::CallResult;
            }
            Err(err) => {
                self.screen = Screen::CallParameterList;
                self.set_feedback(err.to_string());
            }
        }
        Vec::new()
    }

    fn on_disassembly(
        &mut self,
        address: Address,
        result: Result<Box<DisassemblyResult>, String>,
    ) {
        if self.selected_contract != Some(address) {
            return;
        }
        match result {
            Ok(result) => {
                self.disassembly = Some(*result);
                self.disasm_error = None;
            }
            Err(err) => {
                self.disassembly = None;
                self.disasm_error = Some(err);
            }
        }
        self.block_cursor = 0;
        self.inst_cursor = 0;
    }

    fn on_tick(&mut self) -> Vec<Cmd> {
        self.tick_scheduled = false;
        if self.auto_refresh && self.screen == Screen::Dashboard {
            self.last_update = Utc::now();
            self.tick_scheduled = true;
            return vec![Cmd::ScheduleTick];
        }
        Vec::new()
    }

    /// Ensures a tick is outstanding when the dashboard needs one.
    fn ensure_tick(&mut self, cmds: &mut Vec<Cmd>) {
        if self.auto_refresh && self.screen == Screen::Dashboard && !self.tick_scheduled {
            self.tick_scheduled = true;
            cmds.push(Cmd::ScheduleTick);
        }
    }

    // =========================================================================
    // KEY DISPATCH
    // =========================================================================

    fn on_key(&mut self, key: KeyEvent) -> Vec<Cmd> {
        let mut cmds = Vec::new();

        // Ctrl-C always quits.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return cmds;
        }

        // The executing screen is latched: only tab switches get through.
        if self.screen == Screen::CallExecuting {
            if let KeyCode::Char(c) = key.code {
                if let Some(tab) = Tab::from_digit(c) {
                    self.switch_tab(tab, &mut cmds);
                }
            }
            return cmds;
        }

        // Text inputs own the keyboard until Enter or Esc.
        if self.screen.is_text_input() {
            self.on_text_input_key(key, &mut cmds);
            return cmds;
        }

        // Global keys.
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return cmds;
            }
            KeyCode::Char(c) if Tab::from_digit(c).is_some() => {
                if let Some(tab) = Tab::from_digit(c) {
                    self.switch_tab(tab, &mut cmds);
                }
                return cmds;
            }
            KeyCode::Char('c') => {
                if let Some(text) = self.copy_target() {
                    cmds.push(Cmd::Copy(text));
                } else {
                    self.set_feedback("nothing to copy here");
                }
                return cmds;
            }
            _ => {}
        }

        match self.screen {
            Screen::Dashboard => self.on_dashboard_key(key, &mut cmds),
            Screen::MainMenu => self.on_main_menu_key(key),
            Screen::CallParameterList => self.on_param_list_key(key, &mut cmds),
            Screen::CallTypeEdit => self.on_call_type_key(key),
            Screen::CallResult | Screen::CallHistoryDetail => {
                self.on_result_detail_key(key, &mut cmds);
            }
            Screen::CallHistory => self.on_history_key(key),
            Screen::LogDetail => self.on_log_detail_key(key),
            Screen::Contracts => self.on_contracts_key(key, &mut cmds),
            Screen::ContractDetail => self.on_contract_detail_key(key),
            Screen::ConfirmReset => self.on_confirm_reset_key(key, &mut cmds),
            Screen::FixturesList => self.on_fixtures_key(key, &mut cmds),
            Screen::AccountsList => self.on_accounts_key(key),
            Screen::AccountDetail => self.on_account_detail_key(key),
            Screen::BlocksList => self.on_blocks_key(key),
            Screen::BlockDetail => self.on_block_detail_key(key),
            Screen::TransactionsList => self.on_transactions_key(key),
            Screen::TransactionDetail => self.on_tx_detail_key(key),
            Screen::Settings => self.on_settings_key(key, &mut cmds),
            Screen::CallExecuting | Screen::CallParameterEdit | Screen::GotoPC
            | Screen::StateInspector => {}
        }

        cmds
    }

    /// Tab switch: clear the nav stack and all selection context.
    fn switch_tab(&mut self, tab: Tab, cmds: &mut Vec<Cmd>) {
        self.nav.clear();
        self.selected_contract = None;
        self.selected_account = None;
        self.selected_block = None;
        self.selected_tx = None;
        self.selected_log = None;
        self.selected_history_id = None;
        self.disassembly = None;
        self.disasm_error = None;
        self.revealed_key = None;
        self.awaiting_reveal = false;
        self.awaiting_confirm = None;
        self.screen = tab.screen();
        self.ensure_tick(cmds);
    }

    /// Back navigation: pop the stack, or land on the given fallback list
    /// when the detail was reached without a push.
    fn back(&mut self, fallback: Screen) {
        if self.nav.is_empty() {
            self.screen = fallback;
            return;
        }
        let frame = self.nav.pop();
        self.screen = frame.screen;
        match frame.payload {
            Payload::Index(index) => self.restore_cursor(frame.screen, index),
            Payload::Hash(hash) => self.selected_tx = Some(hash),
            Payload::None => {}
        }
    }

    fn restore_cursor(&mut self, screen: Screen, index: usize) {
        match screen {
            Screen::CallParameterList => self.field_cursor = index,
            Screen::CallHistory => self.history_cursor = index,
            Screen::Contracts => self.contracts_cursor = index,
            Screen::AccountsList => self.accounts_cursor = index,
            Screen::BlocksList => self.blocks_cursor = index,
            Screen::TransactionsList => self.txs_cursor = index,
            Screen::FixturesList => self.fixtures_cursor = index,
            Screen::CallResult | Screen::CallHistoryDetail | Screen::TransactionDetail => {
                self.log_cursor = index;
            }
            Screen::MainMenu => self.menu_cursor = index,
            _ => {}
        }
    }

    /// What `c` copies on the current screen.
    fn copy_target(&self) -> Option<String> {
        match self.screen {
            Screen::ContractDetail => self.selected_contract.map(|a| a.to_hex()),
            Screen::Contracts => {
                let session = self.session();
                let list = session.registry.list();
                list.get(self.contracts_cursor).map(|c| c.address.to_hex())
            }
            Screen::AccountDetail => self.selected_account.map(|a| a.to_hex()),
            Screen::AccountsList => {
                let session = self.session();
                session
                    .accounts
                    .all()
                    .get(self.accounts_cursor)
                    .map(|a| a.address.to_hex())
            }
            Screen::TransactionDetail => self.selected_tx.map(|h| h.to_hex()),
            Screen::BlockDetail => {
                let session = self.session();
                self.selected_block
                    .and_then(|n| session.chain.get_block_by_number(n).map(|b| b.hash.to_hex()))
            }
            Screen::CallResult | Screen::CallHistoryDetail => self
                .last_record
                .as_ref()
                .map(|record| record.result.return_data.to_hex()),
            _ => None,
        }
    }

    // =========================================================================
    // TEXT INPUT SCREENS
    // =========================================================================

    fn on_text_input_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        match self.screen {
            Screen::CallParameterEdit => self.on_param_edit_key(key),
            Screen::GotoPC => self.on_goto_pc_key(key),
            Screen::StateInspector => self.on_inspector_key(key, cmds),
            _ => {}
        }
    }

    fn on_param_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.edit_field = None;
                self.edit_buffer.clear();
                self.screen = Screen::CallParameterList;
            }
            KeyCode::Enter => {
                if let Some(field) = self.edit_field.take() {
                    let value = std::mem::take(&mut self.edit_buffer);
                    match validate_field(field, &value) {
                        Ok(()) => {
                            self.field_errors.remove(&field);
                        }
                        Err(err) => {
                            // Eager per-field feedback; the value is kept
                            // so the operator can see what was wrong.
                            self.field_errors.insert(field, err.message.clone());
                        }
                    }
                    self.params.set_field(field, value);
                }
                self.screen = Screen::CallParameterList;
            }
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char('v') => {
                self.set_feedback("clipboard paste unavailable over this terminal");
            }
            KeyCode::Char(c) if !c.is_control() => {
                self.edit_buffer.push(c);
            }
            _ => {}
        }
    }

    fn on_goto_pc_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.goto_input.clear();
                self.screen = Screen::ContractDetail;
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.goto_input);
                self.screen = Screen::ContractDetail;
                match parse_pc(&input) {
                    Some(pc) => {
                        if !self.jump_to_pc(pc) {
                            self.set_feedback(format!("no block contains pc {pc:#06x}"));
                        }
                    }
                    None => self.set_feedback(format!("not a pc: {input}")),
                }
            }
            KeyCode::Backspace => {
                self.goto_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_hexdigit() || c == 'x' || c == 'X' => {
                self.goto_input.push(c);
            }
            _ => {}
        }
    }

    fn on_inspector_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        match key.code {
            KeyCode::Esc => {
                self.inspect_input.clear();
                self.inspected = None;
            }
            KeyCode::Enter => match Address::parse(self.inspect_input.trim()) {
                Ok(address) => {
                    let state = self.session().inspector().inspect_address(address);
                    self.inspected = Some(state);
                }
                Err(err) => self.set_feedback(format!("bad address: {err}")),
            },
            KeyCode::Backspace => {
                self.inspect_input.pop();
            }
            KeyCode::Char('v') => {
                self.set_feedback("clipboard paste unavailable over this terminal");
            }
            KeyCode::Char(c) if Tab::from_digit(c).is_some() && self.inspect_input.is_empty() => {
                // Digits still switch tabs while the input is empty.
                if let Some(tab) = Tab::from_digit(c) {
                    self.switch_tab(tab, cmds);
                }
            }
            KeyCode::Char('q') if self.inspect_input.is_empty() => {
                self.should_quit = true;
            }
            KeyCode::Char(c) if c.is_ascii_hexdigit() || c == 'x' || c == 'X' => {
                self.inspect_input.push(c);
            }
            _ => {}
        }
    }

    // =========================================================================
    // PER-SCREEN KEYS
    // =========================================================================

    fn on_dashboard_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('m') => {
                self.nav.push(Screen::Dashboard, Payload::None);
                self.menu_cursor = 0;
                self.screen = Screen::MainMenu;
            }
            KeyCode::Char('n') => {
                self.nav.push(Screen::Dashboard, Payload::None);
                self.screen = Screen::CallParameterList;
            }
            KeyCode::Char('t') => {
                self.auto_refresh = !self.auto_refresh;
                self.set_feedback(if self.auto_refresh {
                    "auto-refresh on"
                } else {
                    "auto-refresh off"
                });
                self.ensure_tick(cmds);
            }
            KeyCode::Char('r') => {
                self.nav.push(Screen::Dashboard, Payload::None);
                self.screen = Screen::ConfirmReset;
            }
            _ => {}
        }
    }

    fn on_main_menu_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.menu_cursor = self.menu_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.menu_cursor = (self.menu_cursor + 1).min(MAIN_MENU.len() - 1);
            }
            KeyCode::Enter => {
                let (_, target) = MAIN_MENU[self.menu_cursor.min(MAIN_MENU.len() - 1)];
                self.nav.push(Screen::MainMenu, Payload::Index(self.menu_cursor));
                if target == Screen::FixturesList {
                    self.reload_fixtures();
                }
                self.screen = target;
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    /// Fields visible for the current call type.
    #[must_use]
    pub fn visible_fields(&self) -> Vec<ParamField> {
        ParamField::ALL
            .iter()
            .copied()
            .filter(|field| match field {
                ParamField::Target => !self.params.call_type.is_create(),
                ParamField::Value => self.params.call_type != CallType::StaticCall,
                ParamField::Salt => self.params.call_type == CallType::Create2,
                _ => true,
            })
            .collect()
    }

    fn on_param_list_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        let fields = self.visible_fields();
        match key.code {
            KeyCode::Up => self.field_cursor = self.field_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.field_cursor = (self.field_cursor + 1).min(fields.len().saturating_sub(1));
            }
            KeyCode::Enter => {
                let Some(&field) = fields.get(self.field_cursor) else {
                    return;
                };
                if field == ParamField::CallType {
                    self.call_type_cursor = CallType::ALL
                        .iter()
                        .position(|t| *t == self.params.call_type)
                        .unwrap_or(0);
                    self.screen = Screen::CallTypeEdit;
                } else {
                    self.edit_field = Some(field);
                    self.edit_buffer = self.params.field_value(field);
                    self.screen = Screen::CallParameterEdit;
                }
            }
            KeyCode::Char('e') => {
                // Defence in depth: the engine validates again at dispatch.
                match validate_call_parameters(&self.params) {
                    Ok(()) => {
                        self.field_errors.clear();
                        self.nav
                            .push(Screen::CallParameterList, Payload::Index(self.field_cursor));
                        self.screen = Screen::CallExecuting;
                        cmds.push(Cmd::Execute(self.params.clone()));
                    }
                    Err(err) => {
                        if let Some(field) = err.field {
                            self.field_errors.insert(field, err.message.clone());
                        }
                        self.set_feedback(err.to_string());
                    }
                }
            }
            KeyCode::Char('r') => {
                if let Some(&field) = fields.get(self.field_cursor) {
                    let caller = self.default_caller();
                    self.params
                        .set_field(field, CallParameters::default_field(field, caller));
                    self.field_errors.remove(&field);
                    self.set_feedback(format!("{field} reset"));
                }
            }
            KeyCode::Char('R') => {
                let caller = self.default_caller();
                self.params = CallParameters::defaults(caller);
                self.field_errors.clear();
                self.field_cursor = 0;
                self.set_feedback("all fields reset");
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn default_caller(&self) -> Address {
        let session = self.session();
        session
            .accounts
            .all()
            .first()
            .map(|account| account.address)
            .unwrap_or(Address::ZERO)
    }

    fn on_call_type_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.call_type_cursor = self.call_type_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.call_type_cursor = (self.call_type_cursor + 1).min(CallType::ALL.len() - 1);
            }
            KeyCode::Enter => {
                self.params.call_type = CallType::ALL[self.call_type_cursor];
                // Hidden fields cannot stay in error.
                let visible = self.visible_fields();
                self.field_errors.retain(|field, _| visible.contains(field));
                self.field_cursor = self.field_cursor.min(visible.len().saturating_sub(1));
                self.screen = Screen::CallParameterList;
            }
            KeyCode::Esc => self.screen = Screen::CallParameterList,
            _ => {}
        }
    }

    /// Logs shown on the current result/detail screen: the last run's for
    /// CallResult, the selected history entry's for CallHistoryDetail.
    fn detail_logs(&self) -> Vec<LogEntry> {
        if self.screen == Screen::CallHistoryDetail {
            let session = self.session();
            return self
                .selected_history_id
                .and_then(|id| session.history.get_call(id))
                .map(|entry| entry.result.logs.clone())
                .unwrap_or_default();
        }
        self.last_record
            .as_ref()
            .map(|record| record.result.logs.clone())
            .unwrap_or_default()
    }

    fn on_result_detail_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        let logs = self.detail_logs();
        let log_count = logs.len();
        match key.code {
            KeyCode::Up => self.log_cursor = self.log_cursor.saturating_sub(1),
            KeyCode::Down if log_count > 0 => {
                self.log_cursor = (self.log_cursor + 1).min(log_count - 1);
            }
            KeyCode::Enter if log_count > 0 => {
                if let Some(log) = logs.get(self.log_cursor) {
                    self.selected_log = Some(log.clone());
                    self.nav.push(self.screen, Payload::Index(self.log_cursor));
                    self.screen = Screen::LogDetail;
                }
            }
            KeyCode::Char('f') => {
                if let Some(fixture) = self.fixture_from_last_run() {
                    cmds.push(Cmd::SaveFixture(Box::new(fixture)));
                } else {
                    self.set_feedback("no completed run to save");
                }
            }
            KeyCode::Esc => {
                let fallback = if self.screen == Screen::CallHistoryDetail {
                    Screen::CallHistory
                } else {
                    Screen::CallParameterList
                };
                self.back(fallback);
            }
            _ => {}
        }
    }

    /// Builds a fixture from the last completed run, keyed by history id.
    fn fixture_from_last_run(&self) -> Option<Fixture> {
        let record = self.last_record.as_ref()?;
        let session = self.session();
        let target = Address::parse(&self.params.target).ok();
        let bytecode = target
            .map(|address| session.inspector().get_code(address).to_hex())
            .unwrap_or_else(|| "0x".to_string());
        Some(Fixture {
            name: format!("run-{}", record.history_id),
            bytecode,
            calldata: self.params.input_data.clone(),
            caller: self.params.caller.clone(),
            value: self.params.value.clone(),
            gas_limit: record.transaction.gas_limit,
            expected_result: Some(chop_core::fixtures::ExpectedResult {
                success: record.result.success,
                gas_used: record.result.gas_used(record.transaction.gas_limit),
            }),
        })
    }

    fn on_history_key(&mut self, key: KeyEvent) {
        let len = self.session().history.len();
        match key.code {
            KeyCode::Up => self.history_cursor = self.history_cursor.saturating_sub(1),
            KeyCode::Down if len > 0 => {
                self.history_cursor = (self.history_cursor + 1).min(len - 1);
            }
            KeyCode::Enter if len > 0 => {
                let session = self.session();
                // The list renders newest first; map the cursor back.
                let entry = session.history.all().rev().nth(self.history_cursor).cloned();
                drop(session);
                if let Some(entry) = entry {
                    self.selected_history_id = Some(entry.id);
                    self.last_record = None;
                    self.log_cursor = 0;
                    self.nav
                        .push(Screen::CallHistory, Payload::Index(self.history_cursor));
                    self.screen = Screen::CallHistoryDetail;
                }
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn on_log_detail_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.selected_log = None;
            self.back(Screen::CallResult);
        }
    }

    fn on_contracts_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        let len = self.session().registry.count();
        match key.code {
            KeyCode::Up => self.contracts_cursor = self.contracts_cursor.saturating_sub(1),
            KeyCode::Down if len > 0 => {
                self.contracts_cursor = (self.contracts_cursor + 1).min(len - 1);
            }
            KeyCode::Enter if len > 0 => {
                let session = self.session();
                let address = session
                    .registry
                    .list()
                    .get(self.contracts_cursor)
                    .map(|c| c.address);
                drop(session);
                if let Some(address) = address {
                    self.selected_contract = Some(address);
                    self.disassembly = None;
                    self.disasm_error = None;
                    self.nav
                        .push(Screen::Contracts, Payload::Index(self.contracts_cursor));
                    self.screen = Screen::ContractDetail;
                    cmds.push(Cmd::Disassemble(address));
                }
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn on_contract_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => {
                self.block_cursor = self.block_cursor.saturating_sub(1);
                self.inst_cursor = 0;
            }
            KeyCode::Right => {
                if let Some(disasm) = &self.disassembly {
                    let max = disasm.analysis.basic_blocks.len().saturating_sub(1);
                    self.block_cursor = (self.block_cursor + 1).min(max);
                    self.inst_cursor = 0;
                }
            }
            KeyCode::Up => self.inst_cursor = self.inst_cursor.saturating_sub(1),
            KeyCode::Down => {
                if let Some(disasm) = &self.disassembly {
                    let count = analyzer::instructions_for_block(disasm, self.block_cursor).len();
                    self.inst_cursor = (self.inst_cursor + 1).min(count.saturating_sub(1));
                }
            }
            KeyCode::Char('g') => {
                let target = self.disassembly.as_ref().and_then(|disasm| {
                    let insts = analyzer::instructions_for_block(disasm, self.block_cursor);
                    analyzer::jump_destination(insts, self.inst_cursor)
                });
                match target {
                    Some(pc) => {
                        if !self.jump_to_pc(pc) {
                            self.set_feedback(format!("jump target {pc:#06x} is outside the code"));
                        }
                    }
                    None => self.set_feedback("cursor is not on a resolvable jump"),
                }
            }
            KeyCode::Char('G') => {
                self.goto_input.clear();
                self.screen = Screen::GotoPC;
            }
            KeyCode::Esc => {
                self.disassembly = None;
                self.disasm_error = None;
                self.selected_contract = None;
                self.back(Screen::Contracts);
            }
            _ => {}
        }
    }

    /// Move the disassembly cursor to the block containing `pc`, placing
    /// the instruction cursor on the exact pc when present.
    fn jump_to_pc(&mut self, pc: u16) -> bool {
        let Some(disasm) = &self.disassembly else {
            return false;
        };
        let Some(block_index) = analyzer::block_containing_pc(&disasm.analysis, pc) else {
            return false;
        };
        let insts = analyzer::instructions_for_block(disasm, block_index);
        let inst_index = analyzer::instruction_index_by_pc(insts, pc).unwrap_or(0);
        self.block_cursor = block_index;
        self.inst_cursor = inst_index;
        true
    }

    fn on_confirm_reset_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.screen = Screen::Settings;
                self.last_record = None;
                self.selected_history_id = None;
                cmds.push(Cmd::Reset);
            }
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.back(Screen::Settings);
            }
            _ => {}
        }
    }

    fn reload_fixtures(&mut self) {
        self.fixtures = fixtures::fixtures_dir()
            .and_then(|dir| fixtures::list(&dir))
            .unwrap_or_default();
        self.fixtures_cursor = 0;
    }

    fn on_fixtures_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        match key.code {
            KeyCode::Up => self.fixtures_cursor = self.fixtures_cursor.saturating_sub(1),
            KeyCode::Down if !self.fixtures.is_empty() => {
                self.fixtures_cursor = (self.fixtures_cursor + 1).min(self.fixtures.len() - 1);
            }
            KeyCode::Enter => {
                let Some(fixture) = self.fixtures.get(self.fixtures_cursor).cloned() else {
                    return;
                };
                // Loading a fixture installs its bytecode and immediately
                // starts execution.
                let params = self.session().load_fixture(&fixture);
                self.params = params;
                match validate_call_parameters(&self.params) {
                    Ok(()) => {
                        self.nav
                            .push(Screen::FixturesList, Payload::Index(self.fixtures_cursor));
                        self.screen = Screen::CallExecuting;
                        cmds.push(Cmd::Execute(self.params.clone()));
                    }
                    Err(err) => self.set_feedback(format!("fixture invalid: {err}")),
                }
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn on_accounts_key(&mut self, key: KeyEvent) {
        let len = self.session().accounts.count();
        match key.code {
            KeyCode::Up => self.accounts_cursor = self.accounts_cursor.saturating_sub(1),
            KeyCode::Down if len > 0 => {
                self.accounts_cursor = (self.accounts_cursor + 1).min(len - 1);
            }
            KeyCode::Enter if len > 0 => {
                let session = self.session();
                let address = session
                    .accounts
                    .all()
                    .get(self.accounts_cursor)
                    .map(|a| a.address);
                drop(session);
                if let Some(address) = address {
                    self.selected_account = Some(address);
                    self.revealed_key = None;
                    self.awaiting_reveal = false;
                    self.nav
                        .push(Screen::AccountsList, Payload::Index(self.accounts_cursor));
                    self.screen = Screen::AccountDetail;
                }
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn on_account_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('p') => {
                self.awaiting_reveal = true;
                self.set_feedback("press y to reveal the private key");
            }
            KeyCode::Char('y') | KeyCode::Char('Y') if self.awaiting_reveal => {
                self.awaiting_reveal = false;
                let key_hex = self
                    .selected_account
                    .and_then(|address| self.session().accounts.reveal_private_key(address));
                match key_hex {
                    Some(key_hex) => self.revealed_key = Some(key_hex),
                    None => self.set_feedback("no private key for this account"),
                }
            }
            KeyCode::Esc => {
                self.revealed_key = None;
                self.awaiting_reveal = false;
                self.selected_account = None;
                self.back(Screen::AccountsList);
            }
            _ => {
                self.awaiting_reveal = false;
            }
        }
    }

    fn on_blocks_key(&mut self, key: KeyEvent) {
        let len = self.session().chain.get_all_blocks().len();
        match key.code {
            KeyCode::Up => self.blocks_cursor = self.blocks_cursor.saturating_sub(1),
            KeyCode::Down if len > 0 => {
                self.blocks_cursor = (self.blocks_cursor + 1).min(len - 1);
            }
            KeyCode::Enter if len > 0 => {
                let session = self.session();
                // Newest first in the list.
                let number = session.chain.height().checked_sub(self.blocks_cursor as u64);
                drop(session);
                if let Some(number) = number {
                    self.selected_block = Some(number);
                    self.block_tx_cursor = 0;
                    self.nav
                        .push(Screen::BlocksList, Payload::Index(self.blocks_cursor));
                    self.screen = Screen::BlockDetail;
                }
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn on_block_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.block_tx_cursor = self.block_tx_cursor.saturating_sub(1),
            KeyCode::Down => {
                let session = self.session();
                let count = self
                    .selected_block
                    .map(|n| session.chain.get_transactions_by_block(n).len())
                    .unwrap_or(0);
                drop(session);
                if count > 0 {
                    self.block_tx_cursor = (self.block_tx_cursor + 1).min(count - 1);
                }
            }
            KeyCode::Enter => {
                let session = self.session();
                let hash = self.selected_block.and_then(|n| {
                    session
                        .chain
                        .get_transactions_by_block(n)
                        .get(self.block_tx_cursor)
                        .map(|tx| tx.hash)
                });
                drop(session);
                if let Some(hash) = hash {
                    self.selected_tx = Some(hash);
                    self.log_cursor = 0;
                    self.nav
                        .push(Screen::BlockDetail, Payload::Index(self.block_tx_cursor));
                    self.screen = Screen::TransactionDetail;
                }
            }
            KeyCode::Esc => {
                self.selected_block = None;
                self.back(Screen::BlocksList);
            }
            _ => {}
        }
    }

    fn on_transactions_key(&mut self, key: KeyEvent) {
        let len = self.session().chain.get_stats().total_transactions as usize;
        match key.code {
            KeyCode::Up => self.txs_cursor = self.txs_cursor.saturating_sub(1),
            KeyCode::Down if len > 0 => {
                self.txs_cursor = (self.txs_cursor + 1).min(len - 1);
            }
            KeyCode::Enter if len > 0 => {
                let session = self.session();
                // Newest first in the list.
                let hash = session
                    .chain
                    .all_transactions()
                    .rev()
                    .nth(self.txs_cursor)
                    .map(|tx| tx.hash);
                drop(session);
                if let Some(hash) = hash {
                    self.selected_tx = Some(hash);
                    self.log_cursor = 0;
                    self.nav
                        .push(Screen::TransactionsList, Payload::Index(self.txs_cursor));
                    self.screen = Screen::TransactionDetail;
                }
            }
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }

    fn on_tx_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.log_cursor = self.log_cursor.saturating_sub(1),
            KeyCode::Down => {
                let session = self.session();
                let count = self
                    .selected_tx
                    .and_then(|h| session.chain.get_transaction_by_hash(h))
                    .map(|tx| tx.logs.len())
                    .unwrap_or(0);
                drop(session);
                if count > 0 {
                    self.log_cursor = (self.log_cursor + 1).min(count - 1);
                }
            }
            KeyCode::Enter => {
                let session = self.session();
                let log = self
                    .selected_tx
                    .and_then(|h| session.chain.get_transaction_by_hash(h))
                    .and_then(|tx| tx.logs.get(self.log_cursor).cloned());
                drop(session);
                if let Some(log) = log {
                    self.selected_log = Some(log);
                    self.nav
                        .push(Screen::TransactionDetail, Payload::Index(self.log_cursor));
                    self.screen = Screen::LogDetail;
                }
            }
            KeyCode::Char('b') => {
                let session = self.session();
                let located = self
                    .selected_tx
                    .and_then(|h| session.chain.get_transaction_by_hash(h))
                    .map(|tx| (tx.hash, tx.block_number));
                drop(session);
                if let Some((hash, number)) = located {
                    self.selected_block = Some(number);
                    self.block_tx_cursor = 0;
                    self.nav.push(Screen::TransactionDetail, Payload::Hash(hash));
                    self.screen = Screen::BlockDetail;
                }
            }
            KeyCode::Esc => {
                self.selected_tx = None;
                self.back(Screen::TransactionsList);
            }
            _ => {}
        }
    }

    fn on_settings_key(&mut self, key: KeyEvent, cmds: &mut Vec<Cmd>) {
        // An armed destructive action is resolved by the next keystroke.
        if let Some(action) = self.awaiting_confirm.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                match action {
                    SettingsAction::ResetBlockchain => cmds.push(Cmd::Reset),
                    SettingsAction::RegenerateAccounts => {
                        let warning = self.session().regenerate_accounts();
                        match warning {
                            Some(warning) => self.set_feedback(warning),
                            None => self.set_feedback("accounts regenerated from a fresh seed"),
                        }
                    }
                    _ => {}
                }
            } else {
                self.set_feedback("cancelled");
            }
            return;
        }

        match key.code {
            KeyCode::Up => self.settings_cursor = self.settings_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.settings_cursor =
                    (self.settings_cursor + 1).min(SettingsAction::ALL.len() - 1);
            }
            KeyCode::Enter => {
                match SettingsAction::ALL[self.settings_cursor] {
                    action @ (SettingsAction::ResetBlockchain
                    | SettingsAction::RegenerateAccounts) => {
                        self.awaiting_confirm = Some(action);
                        self.set_feedback(format!("press y to confirm: {}", action.label()));
                    }
                    SettingsAction::ToggleAutoRefresh => {
                        self.auto_refresh = !self.auto_refresh;
                        self.set_feedback(if self.auto_refresh {
                            "auto-refresh on"
                        } else {
                            "auto-refresh off"
                        });
                    }
                    SettingsAction::AdjustGasLimit => {
                        self.set_feedback("use [ and ] to adjust the gas limit");
                    }
                    SettingsAction::SaveConfig => cmds.push(Cmd::SaveConfig),
                }
            }
            KeyCode::Char('t') => {
                self.auto_refresh = !self.auto_refresh;
                self.set_feedback(if self.auto_refresh {
                    "auto-refresh on"
                } else {
                    "auto-refresh off"
                });
            }
            KeyCode::Char('[') => {
                let mut session = self.session();
                let current = session.chain.get_gas_limit();
                session.set_gas_limit(current.saturating_sub(GAS_LIMIT_STEP));
                let now = session.chain.get_gas_limit();
                drop(session);
                self.set_feedback(format!("gas limit {now}"));
            }
            KeyCode::Char(']') => {
                let mut session = self.session();
                let current = session.chain.get_gas_limit();
                session.set_gas_limit(current.saturating_add(GAS_LIMIT_STEP));
                let now = session.chain.get_gas_limit();
                drop(session);
                self.set_feedback(format!("gas limit {now}"));
            }
            KeyCode::Char('s') => cmds.push(Cmd::SaveConfig),
            KeyCode::Esc => self.back(Screen::Dashboard),
            _ => {}
        }
    }
}

/// Goto-PC input: 0x-hex or decimal.
fn parse_pc(input: &str) -> Option<u16> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u16::from_str_radix(rest, 16).ok()
    } else {
        trimmed.parse().ok()
    }
}

// =============================================================================
// TESTS
// =============================================================================
