// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use billed_app::markup::owner_names;
use billed_app::{
    ACCEPT_TARGET, ATTACHMENT_TARGET, Alert, AttachmentPreview, BillRecord, BillRow, BillStatus,
    BillStore, BillsPage, Dashboard, DashboardSettings, DashboardView, EXPENSE_TYPES, FetchTicket,
    GroupVisibility, Modal, Navigator, NewBillForm, NewBillPage, PageView, PanelView,
    REFUSE_TARGET, Route, SelectedFile, SessionUser, StatusGroup, StoreResult, UploadedReceipt,
    card_target, display_date, format_amount, is_allowed_receipt,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_MODAL_WIDTH: u32 = 80;
const TYPE_FIELD: usize = 0;
const RECEIPT_FIELD: usize = 7;
const NEW_BILL_FIELDS: [&str; 8] = [
    "Type de dépense",
    "Nom de la dépense",
    "Date",
    "Montant TTC",
    "TVA",
    "%",
    "Commentaire",
    "Justificatif",
];

/// Everything the terminal front end needs from the outside world.
pub trait AppRuntime {
    type Store: BillStore + Send + 'static;

    /// A fresh handle on the bills store, or `None` when running without one.
    fn store(&self) -> Option<Self::Store>;
    fn session(&self) -> &SessionUser;
    fn dashboard_settings(&self) -> DashboardSettings;

    fn read_receipt(&mut self, path: &str) -> Result<SelectedFile> {
        let path = Path::new(path);
        let data = fs::read(path).with_context(|| format!("read receipt {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SelectedFile {
            mime_type: SelectedFile::guess_mime_type(&name).to_owned(),
            name,
            data,
        })
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Navigate(Route),
    Alert(String),
    ShowAttachment(AttachmentPreview),
    DashboardLoaded {
        generation: u64,
        ticket: FetchTicket,
        result: StoreResult<Vec<BillRecord>>,
    },
    BillsLoaded {
        generation: u64,
        result: std::result::Result<Vec<BillRow>, String>,
    },
}

/// Routes navigation requests back into the event loop.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: Sender<InternalEvent>,
}

impl ChannelNavigator {
    pub fn new(tx: &Sender<InternalEvent>) -> Self {
        Self { tx: tx.clone() }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&mut self, route: Route) {
        let _ = self.tx.send(InternalEvent::Navigate(route));
    }
}

#[derive(Debug, Clone)]
pub struct ChannelAlert {
    tx: Sender<InternalEvent>,
}

impl ChannelAlert {
    pub fn new(tx: &Sender<InternalEvent>) -> Self {
        Self { tx: tx.clone() }
    }
}

impl Alert for ChannelAlert {
    fn alert(&mut self, message: &str) {
        let _ = self.tx.send(InternalEvent::Alert(message.to_owned()));
    }
}

#[derive(Debug, Clone)]
pub struct ChannelModal {
    width: u32,
    tx: Sender<InternalEvent>,
}

impl ChannelModal {
    pub fn new(width: u32, tx: &Sender<InternalEvent>) -> Self {
        Self {
            width,
            tx: tx.clone(),
        }
    }
}

impl Modal for ChannelModal {
    fn width(&self) -> u32 {
        self.width
    }

    fn show(&mut self, preview: AttachmentPreview) {
        let _ = self.tx.send(InternalEvent::ShowAttachment(preview));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BillsData {
    #[default]
    Loading,
    Loaded(Vec<BillRow>),
    Failed(String),
}

pub struct DashboardScreen<S> {
    controller: Dashboard<S, ChannelNavigator>,
    focus: Option<String>,
    editing_comment: bool,
}

impl<S: BillStore> DashboardScreen<S> {
    pub fn controller(&self) -> &Dashboard<S, ChannelNavigator> {
        &self.controller
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    fn focused_target(&self) -> Option<String> {
        let targets = focus_targets(&self.controller.view());
        self.focus
            .as_ref()
            .filter(|focus| targets.contains(focus))
            .cloned()
    }

    fn move_focus(&mut self, delta: isize) {
        let targets = focus_targets(&self.controller.view());
        if targets.is_empty() {
            self.focus = None;
            return;
        }
        let current = self
            .focus
            .as_ref()
            .and_then(|focus| targets.iter().position(|target| target == focus));
        let next = match current {
            Some(index) => index
                .saturating_add_signed(delta)
                .min(targets.len().saturating_sub(1)),
            None => 0,
        };
        self.focus = targets.get(next).cloned();
    }

    fn edit_comment(&mut self, edit: impl FnOnce(&mut String)) {
        let mut comment = self.controller.comment().to_owned();
        edit(&mut comment);
        self.controller.set_comment(&comment);
    }
}

pub struct BillsScreen<S> {
    page: BillsPage<S, ChannelNavigator>,
    data: BillsData,
    selected: usize,
}

impl<S> BillsScreen<S> {
    pub fn data(&self) -> &BillsData {
        &self.data
    }
}

pub struct NewBillScreen<S> {
    page: NewBillPage<S, ChannelNavigator, ChannelAlert>,
    form: NewBillForm,
    field: usize,
    receipt_path: String,
}

impl<S> NewBillScreen<S> {
    pub fn form(&self) -> &NewBillForm {
        &self.form
    }

    fn field_mut(&mut self) -> Option<&mut String> {
        match self.field {
            1 => Some(&mut self.form.name),
            2 => Some(&mut self.form.date),
            3 => Some(&mut self.form.amount),
            4 => Some(&mut self.form.vat),
            5 => Some(&mut self.form.pct),
            6 => Some(&mut self.form.commentary),
            RECEIPT_FIELD => Some(&mut self.receipt_path),
            _ => None,
        }
    }

    fn cycle_expense_type(&mut self, forward: bool) {
        let count = EXPENSE_TYPES.len();
        let current = EXPENSE_TYPES
            .iter()
            .position(|kind| *kind == self.form.expense_type)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };
        self.form.expense_type = EXPENSE_TYPES[next].to_owned();
    }
}

pub enum Screen<S> {
    Dashboard(DashboardScreen<S>),
    Bills(BillsScreen<S>),
    NewBill(NewBillScreen<S>),
}

impl<S> Screen<S> {
    pub const fn route(&self) -> Route {
        match self {
            Self::Dashboard(_) => Route::Dashboard,
            Self::Bills(_) => Route::Bills,
            Self::NewBill(_) => Route::NewBill,
        }
    }

    const fn title(&self) -> &'static str {
        match self {
            Self::Dashboard(_) => "Validations",
            Self::Bills(_) => "Mes notes de frais",
            Self::NewBill(_) => "Envoyer une note de frais",
        }
    }
}

pub struct TuiState<S> {
    screen: Screen<S>,
    status: Option<String>,
    status_token: u64,
    alert: Option<String>,
    attachment: Option<AttachmentPreview>,
    generation: u64,
    modal_width: u32,
}

impl<S: BillStore + Send + 'static> TuiState<S> {
    pub fn new<R: AppRuntime<Store = S>>(
        runtime: &R,
        tx: &Sender<InternalEvent>,
        route: Route,
        modal_width: u32,
    ) -> Self {
        let generation = 1;
        Self {
            screen: build_screen(runtime, tx, route, generation, modal_width),
            status: None,
            status_token: 0,
            alert: None,
            attachment: None,
            generation,
            modal_width,
        }
    }

    pub fn screen(&self) -> &Screen<S> {
        &self.screen
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn attachment(&self) -> Option<&AttachmentPreview> {
        self.attachment.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Replaces the current screen. Loads still in flight for the previous screen
    /// are ignored when they arrive.
    pub fn open<R: AppRuntime<Store = S>>(
        &mut self,
        runtime: &R,
        tx: &Sender<InternalEvent>,
        route: Route,
    ) {
        self.generation = self.generation.saturating_add(1);
        debug!(route = route.path(), generation = self.generation, "opening screen");
        self.screen = build_screen(runtime, tx, route, self.generation, self.modal_width);
    }

    fn refresh<R: AppRuntime<Store = S>>(&mut self, runtime: &R, tx: &Sender<InternalEvent>) {
        match &mut self.screen {
            Screen::Dashboard(screen) => {
                let ticket = screen.controller.begin_fetch();
                spawn_dashboard_fetch(runtime.store(), self.generation, ticket, tx);
            }
            Screen::Bills(screen) => {
                screen.data = BillsData::Loading;
                spawn_bills_fetch(runtime.store(), self.generation, tx);
            }
            Screen::NewBill(_) => {}
        }
    }
}

fn build_screen<R: AppRuntime>(
    runtime: &R,
    tx: &Sender<InternalEvent>,
    route: Route,
    generation: u64,
    modal_width: u32,
) -> Screen<R::Store> {
    let route = match route {
        Route::Login => Route::home_for(runtime.session().user_type),
        other => other,
    };
    match route {
        Route::Dashboard => {
            let mut controller = Dashboard::new(
                runtime.store(),
                ChannelNavigator::new(tx),
                runtime.dashboard_settings(),
            )
            .with_modal(Box::new(ChannelModal::new(modal_width, tx)));
            let ticket = controller.begin_fetch();
            spawn_dashboard_fetch(runtime.store(), generation, ticket, tx);
            Screen::Dashboard(DashboardScreen {
                controller,
                focus: None,
                editing_comment: false,
            })
        }
        Route::NewBill => Screen::NewBill(NewBillScreen {
            page: NewBillPage::new(
                runtime.store(),
                ChannelNavigator::new(tx),
                ChannelAlert::new(tx),
                &runtime.session().email,
            ),
            form: NewBillForm {
                expense_type: EXPENSE_TYPES[0].to_owned(),
                ..NewBillForm::default()
            },
            field: TYPE_FIELD,
            receipt_path: String::new(),
        }),
        Route::Login | Route::Bills => {
            spawn_bills_fetch(runtime.store(), generation, tx);
            Screen::Bills(BillsScreen {
                page: BillsPage::new(runtime.store(), ChannelNavigator::new(tx))
                    .with_modal(Box::new(ChannelModal::new(modal_width, tx))),
                data: BillsData::Loading,
                selected: 0,
            })
        }
    }
}

fn spawn_dashboard_fetch<S: BillStore + Send + 'static>(
    store: Option<S>,
    generation: u64,
    ticket: FetchTicket,
    tx: &Sender<InternalEvent>,
) {
    let sender = tx.clone();
    thread::spawn(move || {
        let result = match store {
            Some(mut store) => store.list(),
            None => Ok(Vec::new()),
        };
        let _ = sender.send(InternalEvent::DashboardLoaded {
            generation,
            ticket,
            result,
        });
    });
}

fn spawn_bills_fetch<S: BillStore + Send + 'static>(
    store: Option<S>,
    generation: u64,
    tx: &Sender<InternalEvent>,
) {
    let sender = tx.clone();
    thread::spawn(move || {
        let mut page = BillsPage::new(store, |_: Route| {});
        let result = page
            .get_bills()
            .map(Option::unwrap_or_default)
            .map_err(|error| error.to_string());
        let _ = sender.send(InternalEvent::BillsLoaded { generation, result });
    });
}

pub fn run_app<R: AppRuntime>(runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    let modal_width = terminal::size()
        .map(|(columns, _)| u32::from(columns))
        .unwrap_or(DEFAULT_MODAL_WIDTH);
    let home = Route::home_for(runtime.session().user_type);
    info!(route = home.path(), "starting terminal session");
    let mut state = TuiState::new(runtime, &internal_tx, home, modal_width);

    let mut result = Ok(());
    loop {
        if process_internal_events(&mut state, runtime, &internal_tx, &internal_rx) {
            break;
        }

        if let Err(error) = terminal.draw(|frame| render(frame, &state)) {
            result = Err(error).context("draw frame");
            break;
        }

        match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(false) => {}
            Ok(true) => match event::read().context("read event") {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut state, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            },
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Drains pending internal events. Returns `true` when the session should end.
pub fn process_internal_events<R: AppRuntime>(
    state: &mut TuiState<R::Store>,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) -> bool {
    while let Ok(event) = rx.try_recv() {
        if apply_internal_event(state, runtime, tx, event) {
            return true;
        }
    }
    false
}

pub fn apply_internal_event<R: AppRuntime>(
    state: &mut TuiState<R::Store>,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) -> bool {
    match event {
        InternalEvent::ClearStatus { token } if token == state.status_token => {
            state.status = None;
        }
        InternalEvent::ClearStatus { .. } => {}
        InternalEvent::Navigate(Route::Login) => return true,
        InternalEvent::Navigate(route) => state.open(runtime, tx, route),
        InternalEvent::Alert(message) => state.alert = Some(message),
        InternalEvent::ShowAttachment(preview) => state.attachment = Some(preview),
        InternalEvent::DashboardLoaded { generation, .. }
        | InternalEvent::BillsLoaded { generation, .. }
            if generation != state.generation =>
        {
            warn!(
                generation,
                current = state.generation,
                "dropping load for a closed screen"
            );
        }
        InternalEvent::DashboardLoaded { ticket, result, .. } => {
            if let Screen::Dashboard(screen) = &mut state.screen
                && screen.controller.apply_fetch(ticket, result)
                && screen.focused_target().is_none()
            {
                screen.focus = None;
            }
        }
        InternalEvent::BillsLoaded { result, .. } => {
            if let Screen::Bills(screen) = &mut state.screen {
                screen.data = match result {
                    Ok(rows) => BillsData::Loaded(rows),
                    Err(message) => BillsData::Failed(message),
                };
                screen.selected = 0;
            }
        }
    }
    false
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status<S>(
    state: &mut TuiState<S>,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.status = Some(message.into());
    state.status_token = state.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, state.status_token);
}

enum KeyOutcome {
    Handled,
    Quit,
    Refresh,
    Open(Route),
    Status(String),
}

/// Handles one key press. Returns `true` when the session should end.
pub fn handle_key_event<R: AppRuntime>(
    state: &mut TuiState<R::Store>,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    if state.alert.take().is_some() || state.attachment.take().is_some() {
        return false;
    }

    let outcome = match &mut state.screen {
        Screen::Dashboard(screen) => handle_dashboard_key(screen, key),
        Screen::Bills(screen) => handle_bills_key(screen, key),
        Screen::NewBill(screen) => handle_new_bill_key(screen, runtime, key),
    };
    match outcome {
        KeyOutcome::Handled => false,
        KeyOutcome::Quit => true,
        KeyOutcome::Refresh => {
            state.refresh(runtime, internal_tx);
            false
        }
        KeyOutcome::Open(route) => {
            state.open(runtime, internal_tx, route);
            false
        }
        KeyOutcome::Status(message) => {
            emit_status(state, internal_tx, message);
            false
        }
    }
}

fn handle_dashboard_key<S: BillStore>(screen: &mut DashboardScreen<S>, key: KeyEvent) -> KeyOutcome {
    if screen.editing_comment {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => screen.editing_comment = false,
            KeyCode::Backspace => screen.edit_comment(|comment| {
                comment.pop();
            }),
            KeyCode::Char(ch) => screen.edit_comment(|comment| comment.push(ch)),
            _ => {}
        }
        return KeyOutcome::Handled;
    }

    let target = match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('g') => return KeyOutcome::Refresh,
        KeyCode::Char('j') | KeyCode::Down => {
            screen.move_focus(1);
            return KeyOutcome::Handled;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            screen.move_focus(-1);
            return KeyOutcome::Handled;
        }
        KeyCode::Char('c') => {
            let view = screen.controller.view();
            if view.subscriptions_for(ACCEPT_TARGET).next().is_none() {
                return KeyOutcome::Status("open a pending bill to comment on it".to_owned());
            }
            screen.editing_comment = true;
            return KeyOutcome::Handled;
        }
        KeyCode::Char(digit @ '1'..='3') => digit
            .to_digit(10)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(StatusGroup::from_index)
            .map(StatusGroup::arrow_target),
        KeyCode::Enter => screen.focused_target(),
        KeyCode::Char('a') => Some(ACCEPT_TARGET.to_owned()),
        KeyCode::Char('r') => Some(REFUSE_TARGET.to_owned()),
        KeyCode::Char('v') => Some(ATTACHMENT_TARGET.to_owned()),
        _ => None,
    };
    let Some(target) = target else {
        return KeyOutcome::Handled;
    };

    match screen.controller.fire(&target) {
        Ok(0) => KeyOutcome::Status(format!("nothing to do for {target} here")),
        Ok(_) => {
            if screen.focused_target().is_none() {
                screen.focus = None;
            }
            KeyOutcome::Handled
        }
        Err(error) => KeyOutcome::Status(format!("{error:#}")),
    }
}

fn handle_bills_key<S: BillStore>(screen: &mut BillsScreen<S>, key: KeyEvent) -> KeyOutcome {
    match key.code {
        KeyCode::Char('q') => KeyOutcome::Quit,
        KeyCode::Char('g') => KeyOutcome::Refresh,
        KeyCode::Char('n') => {
            screen.page.handle_click_new_bill();
            KeyOutcome::Handled
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if let BillsData::Loaded(rows) = &screen.data {
                screen.selected = (screen.selected + 1).min(rows.len().saturating_sub(1));
            }
            KeyOutcome::Handled
        }
        KeyCode::Char('k') | KeyCode::Up => {
            screen.selected = screen.selected.saturating_sub(1);
            KeyOutcome::Handled
        }
        KeyCode::Char('v') | KeyCode::Enter => {
            if let BillsData::Loaded(rows) = &screen.data
                && let Some(row) = rows.get(screen.selected)
                && !screen.page.handle_click_icon_eye(&row.bill)
            {
                return KeyOutcome::Status("no receipt viewer available".to_owned());
            }
            KeyOutcome::Handled
        }
        _ => KeyOutcome::Handled,
    }
}

fn handle_new_bill_key<R: AppRuntime>(
    screen: &mut NewBillScreen<R::Store>,
    runtime: &mut R,
    key: KeyEvent,
) -> KeyOutcome {
    let field_count = NEW_BILL_FIELDS.len();
    match key.code {
        KeyCode::Esc => return KeyOutcome::Open(Route::Bills),
        KeyCode::Tab | KeyCode::Down => screen.field = (screen.field + 1) % field_count,
        KeyCode::BackTab | KeyCode::Up => {
            screen.field = (screen.field + field_count - 1) % field_count;
        }
        KeyCode::Left if screen.field == TYPE_FIELD => screen.cycle_expense_type(false),
        KeyCode::Right if screen.field == TYPE_FIELD => screen.cycle_expense_type(true),
        KeyCode::Enter if screen.field == RECEIPT_FIELD => {
            return upload_receipt(screen, runtime);
        }
        KeyCode::Enter => {
            return match screen.page.handle_submit(&screen.form) {
                Ok(_) => KeyOutcome::Handled,
                Err(error) => KeyOutcome::Status(format!("{error:#}")),
            };
        }
        KeyCode::Backspace => {
            if let Some(value) = screen.field_mut() {
                value.pop();
            }
        }
        KeyCode::Char(ch) => {
            if let Some(value) = screen.field_mut() {
                value.push(ch);
            }
        }
        _ => {}
    }
    KeyOutcome::Handled
}

fn upload_receipt<R: AppRuntime>(
    screen: &mut NewBillScreen<R::Store>,
    runtime: &mut R,
) -> KeyOutcome {
    let path = screen.receipt_path.trim().to_owned();
    if path.is_empty() {
        return KeyOutcome::Status("type the path of a .jpg, .jpeg or .png receipt".to_owned());
    }
    let file = match runtime.read_receipt(&path) {
        Ok(file) => file,
        Err(error) => return KeyOutcome::Status(format!("{error:#}")),
    };
    let allowed = is_allowed_receipt(&file.name);
    if screen.page.handle_change_file(file) {
        KeyOutcome::Status("receipt uploaded".to_owned())
    } else if allowed {
        KeyOutcome::Status("receipt upload failed; check the log and retry".to_owned())
    } else {
        screen.receipt_path.clear();
        KeyOutcome::Handled
    }
}

fn focus_targets(view: &DashboardView) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for subscription in &view.subscriptions {
        if !targets.contains(&subscription.target) {
            targets.push(subscription.target.clone());
        }
    }
    targets
}

pub fn render_dashboard_text(
    view: &DashboardView,
    focused: Option<&str>,
    comment: &str,
    editing: bool,
) -> String {
    let board = match &view.page {
        PageView::Loading => return "Loading...".to_owned(),
        PageView::Error(message) => return format!("Erreur\n\n{message}"),
        PageView::Board(board) => board,
    };
    let marker = |target: &str| if focused == Some(target) { "> " } else { "  " };

    let mut lines = Vec::new();
    for group in &board.groups {
        let arrow = match group.visibility {
            GroupVisibility::Expanded => "▾",
            GroupVisibility::Collapsed => "▸",
        };
        lines.push(format!(
            "{}{arrow} {} ({}) [{}]",
            marker(group.group.arrow_target().as_str()),
            group.group.title(),
            group.count,
            group.group.index(),
        ));
        for card in &group.cards {
            let (first_name, last_name) = owner_names(&card.bill.email);
            let selected = if card.highlighted { "*" } else { " " };
            lines.push(format!(
                "{}  {selected} {} | {} | {} € | {} | {}",
                marker(card_target(&card.bill.id).as_str()),
                format!("{first_name} {last_name}").trim(),
                card.bill.name,
                format_amount(card.bill.amount),
                display_date(&card.bill.date),
                card.bill.bill_type,
            ));
        }
    }
    lines.push(String::new());

    match &board.panel {
        PanelView::Placeholder => lines.push("Billed".to_owned()),
        PanelView::Detail(bill) => {
            let file_name = bill
                .file
                .as_ref()
                .map(|file| file.name.as_str())
                .unwrap_or_default();
            lines.push(format!("Email: {}", bill.email));
            lines.push(format!("Type de dépense: {}", bill.bill_type));
            lines.push(format!("Nom de la dépense: {}", bill.name));
            lines.push(format!("Date: {}", display_date(&bill.date)));
            lines.push(format!("Montant TTC: {} €", format_amount(bill.amount)));
            lines.push(format!(
                "TVA: {} € ({} %)",
                bill.vat.as_deref().unwrap_or_default(),
                bill.pct.unwrap_or(20)
            ));
            lines.push(format!(
                "Commentaire: {}",
                bill.commentary.as_deref().unwrap_or_default()
            ));
            lines.push(format!(
                "{}Justificatif: {file_name} [v]",
                marker(ATTACHMENT_TARGET)
            ));
            if bill.status == BillStatus::Pending {
                let cursor = if editing { "_" } else { "" };
                lines.push(format!("Ajouter un commentaire [c]: {comment}{cursor}"));
                lines.push(format!(
                    "{}[r] Refuser   {}[a] Accepter",
                    marker(REFUSE_TARGET),
                    marker(ACCEPT_TARGET)
                ));
            } else {
                lines.push(format!(
                    "Commentaire admin: {}",
                    bill.comment_admin.as_deref().unwrap_or_default()
                ));
            }
        }
    }
    lines.join("\n")
}

pub fn render_bills_text(data: &BillsData, selected: usize) -> String {
    let rows = match data {
        BillsData::Loading => return "Loading...".to_owned(),
        BillsData::Failed(message) => return format!("Erreur\n\n{message}"),
        BillsData::Loaded(rows) => rows,
    };
    if rows.is_empty() {
        return "Aucune note de frais".to_owned();
    }
    let mut lines = vec!["  Type | Nom | Date | Montant | Statut".to_owned()];
    for (index, row) in rows.iter().enumerate() {
        let marker = if index == selected { "> " } else { "  " };
        lines.push(format!(
            "{marker}{} | {} | {} | {} € | {}",
            row.bill.bill_type,
            row.bill.name,
            row.date_label,
            format_amount(row.bill.amount),
            row.status_label,
        ));
    }
    lines.join("\n")
}

pub fn render_new_bill_text(
    form: &NewBillForm,
    field: usize,
    receipt_path: &str,
    receipt: Option<&UploadedReceipt>,
) -> String {
    let values = [
        form.expense_type.as_str(),
        form.name.as_str(),
        form.date.as_str(),
        form.amount.as_str(),
        form.vat.as_str(),
        form.pct.as_str(),
        form.commentary.as_str(),
        receipt_path,
    ];
    let mut lines: Vec<String> = NEW_BILL_FIELDS
        .iter()
        .zip(values)
        .enumerate()
        .map(|(index, (label, value))| {
            let marker = if index == field { "> " } else { "  " };
            format!("{marker}{label}: {value}")
        })
        .collect();
    lines.push(String::new());
    lines.push(match receipt {
        Some(receipt) => format!("justificatif envoyé: {}", receipt.file_name),
        None => "aucun justificatif".to_owned(),
    });
    lines.join("\n")
}

pub fn status_text<S: BillStore>(state: &TuiState<S>) -> String {
    let hints = match &state.screen {
        Screen::Dashboard(screen) if screen.editing_comment => {
            "EDIT | type the admin comment | enter/esc done"
        }
        Screen::Dashboard(_) => {
            "1/2/3 groups | j/k focus | enter open | c comment | a accept | r refuse | v receipt | g refresh | q quit"
        }
        Screen::Bills(_) => "j/k select | v receipt | n new bill | g refresh | q quit",
        Screen::NewBill(_) => {
            "tab/shift+tab field | ←/→ type | enter upload receipt or send | esc back | ctrl+q quit"
        }
    };
    match &state.status {
        Some(status) => format!("{status} | {hints}"),
        None => hints.to_owned(),
    }
}

fn body_text<S: BillStore>(state: &TuiState<S>) -> String {
    match &state.screen {
        Screen::Dashboard(screen) => render_dashboard_text(
            &screen.controller.view(),
            screen.focus.as_deref(),
            screen.controller.comment(),
            screen.editing_comment,
        ),
        Screen::Bills(screen) => render_bills_text(&screen.data, screen.selected),
        Screen::NewBill(screen) => render_new_bill_text(
            &screen.form,
            screen.field,
            &screen.receipt_path,
            screen.page.receipt(),
        ),
    }
}

fn render<S: BillStore>(frame: &mut ratatui::Frame<'_>, state: &TuiState<S>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(state.screen.title())
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().title("billed").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = Paragraph::new(body_text(state))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(body, layout[1]);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(message) = &state.alert {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let alert = Paragraph::new(format!("{message}\n\npress any key"))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("alert").borders(Borders::ALL));
        frame.render_widget(alert, area);
    } else if let Some(preview) = &state.attachment {
        let area = centered_rect(80, 40, frame.area());
        frame.render_widget(Clear, area);
        let modal = Paragraph::new(format!(
            "{}\n\nlargeur: {}\n\npress any key",
            preview.file_url, preview.image_width
        ))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Justificatif").borders(Borders::ALL));
        frame.render_widget(modal, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, Screen, TuiState, apply_internal_event, handle_key_event,
        render_bills_text, render_dashboard_text, render_new_bill_text, status_text,
    };
    use anyhow::Result;
    use billed_app::{
        DashboardSettings, DashboardState, FetchTicket, FilterOptions, INVALID_FILE_MESSAGE,
        NavigationPolicy, NewBillForm, PageData, Route, SelectedFile, SessionUser, StoreError,
        UserType, render_dashboard,
    };
    use billed_testkit::{MockStore, fixture_records};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Duration;

    struct TestRuntime {
        store: MockStore,
        session: SessionUser,
    }

    impl TestRuntime {
        fn admin() -> Result<Self> {
            Ok(Self {
                store: MockStore::with_fixtures()?,
                session: SessionUser::connected(UserType::Admin, "admin@test.tld"),
            })
        }

        fn employee() -> Result<Self> {
            Ok(Self {
                store: MockStore::with_fixtures()?,
                session: SessionUser::connected(UserType::Employee, "a@a"),
            })
        }
    }

    impl AppRuntime for TestRuntime {
        type Store = MockStore;

        fn store(&self) -> Option<MockStore> {
            Some(self.store.clone())
        }

        fn session(&self) -> &SessionUser {
            &self.session
        }

        fn dashboard_settings(&self) -> DashboardSettings {
            DashboardSettings {
                filter: FilterOptions::test_mode(),
                navigation: NavigationPolicy::Always,
            }
        }

        fn read_receipt(&mut self, path: &str) -> Result<SelectedFile> {
            Ok(SelectedFile {
                name: path.to_owned(),
                mime_type: SelectedFile::guess_mime_type(path).to_owned(),
                data: vec![1, 2, 3],
            })
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(
        state: &mut TuiState<MockStore>,
        runtime: &mut TestRuntime,
        tx: &Sender<InternalEvent>,
        code: KeyCode,
    ) -> bool {
        handle_key_event(state, runtime, tx, key(code))
    }

    fn type_text(
        state: &mut TuiState<MockStore>,
        runtime: &mut TestRuntime,
        tx: &Sender<InternalEvent>,
        text: &str,
    ) {
        for ch in text.chars() {
            press(state, runtime, tx, KeyCode::Char(ch));
        }
    }

    /// Applies events until a bills load lands.
    fn settle(
        state: &mut TuiState<MockStore>,
        runtime: &mut TestRuntime,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
    ) {
        loop {
            let event = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("load event expected");
            let loaded = matches!(
                event,
                InternalEvent::DashboardLoaded { .. } | InternalEvent::BillsLoaded { .. }
            );
            apply_internal_event(state, runtime, tx, event);
            if loaded {
                break;
            }
        }
    }

    fn drain(
        state: &mut TuiState<MockStore>,
        runtime: &mut TestRuntime,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
    ) {
        while let Ok(event) = rx.try_recv() {
            apply_internal_event(state, runtime, tx, event);
        }
    }

    fn dashboard_text(state: &TuiState<MockStore>) -> String {
        match state.screen() {
            Screen::Dashboard(screen) => render_dashboard_text(
                &screen.controller().view(),
                screen.focus(),
                screen.controller().comment(),
                false,
            ),
            _ => panic!("dashboard expected"),
        }
    }

    #[test]
    fn admin_reviews_pending_bill_from_keyboard() -> Result<()> {
        let mut runtime = TestRuntime::admin()?;
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::Dashboard, 500);
        settle(&mut state, &mut runtime, &tx, &rx);
        assert!(dashboard_text(&state).contains("En attente (1)"));

        press(&mut state, &mut runtime, &tx, KeyCode::Char('1'));
        assert!(dashboard_text(&state).contains("encore"));

        press(&mut state, &mut runtime, &tx, KeyCode::Char('j'));
        press(&mut state, &mut runtime, &tx, KeyCode::Char('j'));
        press(&mut state, &mut runtime, &tx, KeyCode::Enter);
        assert!(dashboard_text(&state).contains("Email: a@a"));

        press(&mut state, &mut runtime, &tx, KeyCode::Char('c'));
        type_text(&mut state, &mut runtime, &tx, "ok");
        press(&mut state, &mut runtime, &tx, KeyCode::Esc);
        press(&mut state, &mut runtime, &tx, KeyCode::Char('a'));

        let updates = runtime.store.updates();
        assert_eq!(updates.len(), 1);
        let sent = updates[0].decode()?;
        assert_eq!(sent.status.as_deref(), Some("accepted"));
        assert_eq!(sent.comment_admin.as_deref(), Some("ok"));

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert!(matches!(event, InternalEvent::Navigate(Route::Dashboard)));
        apply_internal_event(&mut state, &mut runtime, &tx, event);
        settle(&mut state, &mut runtime, &tx, &rx);
        let text = dashboard_text(&state);
        assert!(text.contains("En attente (0)"));
        assert!(text.contains("Validé (2)"));
        Ok(())
    }

    #[test]
    fn comment_requires_open_pending_bill() -> Result<()> {
        let mut runtime = TestRuntime::admin()?;
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::Dashboard, 500);
        settle(&mut state, &mut runtime, &tx, &rx);

        press(&mut state, &mut runtime, &tx, KeyCode::Char('c'));
        assert_eq!(
            state.status(),
            Some("open a pending bill to comment on it")
        );
        assert!(status_text(&state).starts_with("open a pending bill"));
        Ok(())
    }

    #[test]
    fn load_for_closed_screen_is_ignored() -> Result<()> {
        let mut runtime = TestRuntime::admin()?;
        let (tx, _rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::Dashboard, 500);
        state.open(&runtime, &tx, Route::Dashboard);

        let stale = InternalEvent::DashboardLoaded {
            generation: 1,
            ticket: FetchTicket { request_id: 1 },
            result: Err(StoreError::status(404)),
        };
        assert!(!apply_internal_event(&mut state, &mut runtime, &tx, stale));
        assert_eq!(dashboard_text(&state), "Loading...");

        let current = InternalEvent::DashboardLoaded {
            generation: 2,
            ticket: FetchTicket { request_id: 1 },
            result: Ok(fixture_records()?),
        };
        apply_internal_event(&mut state, &mut runtime, &tx, current);
        assert!(dashboard_text(&state).contains("Refusé (2)"));
        Ok(())
    }

    #[test]
    fn list_error_is_rendered_verbatim() {
        let view = render_dashboard(
            &DashboardState::default(),
            &PageData::Failed("Erreur 404".to_owned()),
            &FilterOptions::default(),
        );
        assert_eq!(
            render_dashboard_text(&view, None, "", false),
            "Erreur\n\nErreur 404"
        );
    }

    #[test]
    fn employee_opens_form_and_pdf_is_rejected() -> Result<()> {
        let mut runtime = TestRuntime::employee()?;
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::Bills, 500);
        settle(&mut state, &mut runtime, &tx, &rx);

        press(&mut state, &mut runtime, &tx, KeyCode::Char('n'));
        drain(&mut state, &mut runtime, &tx, &rx);
        assert_eq!(state.screen().route(), Route::NewBill);

        press(&mut state, &mut runtime, &tx, KeyCode::BackTab);
        type_text(&mut state, &mut runtime, &tx, "x.pdf");
        press(&mut state, &mut runtime, &tx, KeyCode::Enter);
        drain(&mut state, &mut runtime, &tx, &rx);

        assert_eq!(state.alert(), Some(INVALID_FILE_MESSAGE));
        assert!(runtime.store.creates().is_empty());

        press(&mut state, &mut runtime, &tx, KeyCode::Char('x'));
        assert_eq!(state.alert(), None);
        Ok(())
    }

    #[test]
    fn employee_submits_new_bill() -> Result<()> {
        let mut runtime = TestRuntime::employee()?;
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::NewBill, 500);

        press(&mut state, &mut runtime, &tx, KeyCode::Right);
        for (field, value) in [
            "Dîner client",
            "2023-04-12",
            "120",
            "20",
            "",
            "repas",
            "ticket.jpg",
        ]
        .into_iter()
        .enumerate()
        {
            press(&mut state, &mut runtime, &tx, KeyCode::Tab);
            type_text(&mut state, &mut runtime, &tx, value);
            assert_eq!(state.status(), None, "field {field}");
        }
        press(&mut state, &mut runtime, &tx, KeyCode::Enter);
        assert_eq!(state.status(), Some("receipt uploaded"));

        press(&mut state, &mut runtime, &tx, KeyCode::Tab);
        press(&mut state, &mut runtime, &tx, KeyCode::Enter);

        let updates = runtime.store.updates();
        assert_eq!(updates.len(), 1);
        let sent = updates[0].decode()?;
        assert_eq!(sent.bill_type.as_deref(), Some("Restaurants et bars"));
        assert_eq!(sent.status.as_deref(), Some("pending"));
        assert_eq!(sent.email.as_deref(), Some("a@a"));

        drain(&mut state, &mut runtime, &tx, &rx);
        assert_eq!(state.screen().route(), Route::Bills);
        Ok(())
    }

    #[test]
    fn bills_screen_lists_newest_first() -> Result<()> {
        let mut runtime = TestRuntime::employee()?;
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::Bills, 500);
        settle(&mut state, &mut runtime, &tx, &rx);

        let Screen::Bills(screen) = state.screen() else {
            panic!("bills screen expected");
        };
        let text = render_bills_text(screen.data(), 0);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("> Hôtel et logement | encore | 4 Avr. 04"));
        assert!(lines[4].contains("1 Jan. 01"));
        Ok(())
    }

    #[test]
    fn new_bill_text_marks_active_field() {
        let form = NewBillForm {
            expense_type: "Transports".to_owned(),
            ..NewBillForm::default()
        };
        let text = render_new_bill_text(&form, 0, "", None);
        assert!(text.starts_with("> Type de dépense: Transports"));
        assert!(text.ends_with("aucun justificatif"));
    }

    #[test]
    fn ctrl_q_quits_from_any_screen() -> Result<()> {
        let mut runtime = TestRuntime::employee()?;
        let (tx, _rx) = mpsc::channel();
        let mut state = TuiState::new(&runtime, &tx, Route::NewBill, 500);
        assert!(handle_key_event(
            &mut state,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        ));
        assert!(!handle_key_event(
            &mut state,
            &mut runtime,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE),
        ));
        Ok(())
    }
}
