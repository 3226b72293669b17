// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use tracing::{debug, error, warn};

use crate::{
    AttachmentPreview, Bill, BillId, BillRecord, BillStatus, BillStore, DashboardAction,
    DashboardCommand, DashboardEvent, DashboardState, DashboardView, FilterOptions, Modal,
    Navigator, PageData, Route, StatusGroup, StoreResult, UpdateRequest, fetch_bills,
    normalize_records, render_dashboard,
};

/// Share of the modal width used by the receipt preview.
const ADMIN_PREVIEW_PERCENT: u32 = 80;

/// When reviewing a bill returns to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPolicy {
    #[default]
    Always,
    OnSuccess,
}

impl NavigationPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::OnSuccess => "on_success",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "always" => Some(Self::Always),
            "on_success" => Some(Self::OnSuccess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardSettings {
    pub filter: FilterOptions,
    pub navigation: NavigationPolicy,
}

/// Identifies one bill fetch. Only the latest ticket may replace the page data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub request_id: u64,
}

pub struct Dashboard<S, N> {
    store: Option<S>,
    navigator: N,
    modal: Option<Box<dyn Modal>>,
    settings: DashboardSettings,
    state: DashboardState,
    data: PageData,
    comment: String,
    last_request_id: u64,
}

impl<S: BillStore, N: Navigator> Dashboard<S, N> {
    pub fn new(store: Option<S>, navigator: N, settings: DashboardSettings) -> Self {
        Self {
            store,
            navigator,
            modal: None,
            settings,
            state: DashboardState::default(),
            data: PageData::Loading,
            comment: String::new(),
            last_request_id: 0,
        }
    }

    pub fn with_modal(mut self, modal: Box<dyn Modal>) -> Self {
        self.modal = Some(modal);
        self
    }

    pub fn with_bills(mut self, bills: Vec<Bill>) -> Self {
        self.data = PageData::Loaded(bills);
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Mirrors the admin comment field of the open detail form.
    pub fn set_comment(&mut self, comment: &str) {
        self.comment = comment.to_owned();
    }

    pub fn view(&self) -> DashboardView {
        render_dashboard(&self.state, &self.data, &self.settings.filter)
    }

    /// Lists every bill from the store. Failures are returned untouched so their
    /// message can be shown as is.
    pub fn get_bills_all_users(&mut self) -> Result<Option<Vec<Bill>>> {
        let Some(store) = self.store.as_mut() else {
            return Ok(None);
        };
        let bills = fetch_bills(store)?;
        debug!(count = bills.len(), "fetched bills for every user");
        Ok(Some(bills))
    }

    /// Fetches synchronously and stores the outcome as page data.
    pub fn load(&mut self) {
        let ticket = self.begin_fetch();
        self.data = match self.get_bills_all_users() {
            Ok(Some(bills)) => PageData::Loaded(bills),
            Ok(None) => PageData::Loaded(Vec::new()),
            Err(error) => PageData::Failed(error.to_string()),
        };
        debug!(request_id = ticket.request_id, "dashboard loaded");
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.last_request_id = self.last_request_id.saturating_add(1);
        if self.data.bills().is_none() {
            self.data = PageData::Loading;
        }
        FetchTicket {
            request_id: self.last_request_id,
        }
    }

    /// Applies a fetch that ran elsewhere. Returns `false` when a newer fetch has
    /// started since `ticket` was issued, in which case the result is dropped.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: StoreResult<Vec<BillRecord>>,
    ) -> bool {
        if ticket.request_id != self.last_request_id {
            warn!(
                request_id = ticket.request_id,
                latest = self.last_request_id,
                "dropping stale bill list response"
            );
            return false;
        }
        self.data = match result {
            Ok(records) => PageData::Loaded(normalize_records(records)),
            Err(error) => PageData::Failed(error.to_string()),
        };
        true
    }

    /// Sends `bill` to the store. Failures are logged and swallowed. An accepted
    /// update whose response does not normalize yields the bill that was sent.
    pub fn update_bill(&mut self, bill: &Bill) -> Option<Bill> {
        let store = self.store.as_mut()?;
        let outcome = UpdateRequest::for_bill(bill)
            .and_then(|request| store.update(&request).map_err(anyhow::Error::from));
        let record = match outcome {
            Ok(record) => record,
            Err(error) => {
                error!(bill = %bill.id, "update bill failed: {error:#}");
                return None;
            }
        };
        let updated = Bill::from_record(record).unwrap_or_else(|error| {
            debug!(bill = %bill.id, "keeping sent bill, response is partial: {error:#}");
            bill.clone()
        });
        debug!(bill = %updated.id, status = updated.status.as_str(), "bill updated");
        Some(updated)
    }

    pub fn handle_show_tickets(&mut self, group: StatusGroup) -> Vec<DashboardEvent> {
        self.state.dispatch(DashboardCommand::ToggleGroup(group))
    }

    pub fn handle_edit_ticket(&mut self, bill_id: &BillId) -> Vec<DashboardEvent> {
        if self.find_bill(bill_id).is_none() {
            warn!(bill = %bill_id, "ignoring edit of unknown bill");
            return Vec::new();
        }
        let events = self.state.dispatch(DashboardCommand::ToggleBill(bill_id.clone()));
        if events
            .iter()
            .any(|event| matches!(event, DashboardEvent::DetailOpened(_)))
        {
            self.comment.clear();
        }
        events
    }

    /// Shows the receipt in the modal. Without a modal this does nothing.
    pub fn handle_click_icon_eye(&mut self, bill_id: &BillId) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };
        let Some(bill) = self
            .data
            .bills()
            .and_then(|bills| bills.iter().find(|bill| &bill.id == bill_id))
        else {
            return false;
        };
        let file_url = bill
            .file
            .as_ref()
            .map(|file| file.url.as_str())
            .unwrap_or_default();
        let preview = AttachmentPreview::scaled(file_url, modal.width(), ADMIN_PREVIEW_PERCENT);
        modal.show(preview);
        true
    }

    pub fn handle_accept_submit(&mut self, bill_id: &BillId) -> Result<Bill> {
        self.review(bill_id, BillStatus::Accepted)
    }

    pub fn handle_refuse_submit(&mut self, bill_id: &BillId) -> Result<Bill> {
        self.review(bill_id, BillStatus::Refused)
    }

    fn review(&mut self, bill_id: &BillId, status: BillStatus) -> Result<Bill> {
        let Some(bill) = self.find_bill(bill_id) else {
            bail!("bill {bill_id} is not on the dashboard; refresh and try again");
        };
        let reviewed = bill.reviewed(status, &self.comment);
        let updated = self.update_bill(&reviewed);
        match (self.settings.navigation, updated) {
            (NavigationPolicy::OnSuccess, None) => {
                warn!(bill = %bill_id, "staying on the dashboard after a failed update");
            }
            _ => self.navigator.navigate(Route::Dashboard),
        }
        Ok(reviewed)
    }

    pub fn dispatch(&mut self, action: &DashboardAction) -> Result<()> {
        match action {
            DashboardAction::ToggleGroup(group) => {
                self.handle_show_tickets(*group);
            }
            DashboardAction::OpenBill(bill_id) => {
                self.handle_edit_ticket(bill_id);
            }
            DashboardAction::ViewAttachment(bill_id) => {
                self.handle_click_icon_eye(bill_id);
            }
            DashboardAction::Accept(bill_id) => {
                self.handle_accept_submit(bill_id)?;
            }
            DashboardAction::Refuse(bill_id) => {
                self.handle_refuse_submit(bill_id)?;
            }
        }
        Ok(())
    }

    /// Activates `target` on the current render, running every action bound to it.
    /// Returns how many actions ran.
    pub fn fire(&mut self, target: &str) -> Result<usize> {
        let actions: Vec<DashboardAction> = self
            .view()
            .subscriptions_for(target)
            .map(|subscription| subscription.action.clone())
            .collect();
        for action in &actions {
            self.dispatch(action)?;
        }
        Ok(actions.len())
    }

    fn find_bill(&self, bill_id: &BillId) -> Option<&Bill> {
        self.data
            .bills()
            .and_then(|bills| bills.iter().find(|bill| &bill.id == bill_id))
    }
}
