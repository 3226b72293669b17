// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use tracing::{debug, warn};

use crate::{AttachmentPreview, Bill, BillStore, Modal, Navigator, Route, fetch_bills, format_date};

/// Share of the modal width used by the receipt preview on the employee page.
const EMPLOYEE_PREVIEW_PERCENT: u32 = 50;

/// One line of the employee's bills table.
#[derive(Debug, Clone, PartialEq)]
pub struct BillRow {
    pub bill: Bill,
    pub date_label: String,
    pub status_label: String,
}

impl BillRow {
    fn from_bill(bill: Bill) -> Self {
        let date_label = match format_date(&bill.date) {
            Ok(label) => label,
            Err(error) => {
                warn!(bill = %bill.id, "keeping unformatted date: {error:#}");
                bill.date.clone()
            }
        };
        Self {
            status_label: bill.status.label().to_owned(),
            date_label,
            bill,
        }
    }
}

/// Newest first. Dates compare as ISO strings.
pub fn sort_anti_chronological(bills: &mut [Bill]) {
    bills.sort_by(|left, right| right.date.cmp(&left.date));
}

pub struct BillsPage<S, N> {
    store: Option<S>,
    navigator: N,
    modal: Option<Box<dyn Modal>>,
}

impl<S: BillStore, N: Navigator> BillsPage<S, N> {
    pub fn new(store: Option<S>, navigator: N) -> Self {
        Self {
            store,
            navigator,
            modal: None,
        }
    }

    pub fn with_modal(mut self, modal: Box<dyn Modal>) -> Self {
        self.modal = Some(modal);
        self
    }

    pub fn handle_click_new_bill(&mut self) {
        self.navigator.navigate(Route::NewBill);
    }

    pub fn handle_click_icon_eye(&mut self, bill: &Bill) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };
        let file_url = bill
            .file
            .as_ref()
            .map(|file| file.url.as_str())
            .unwrap_or_default();
        let preview =
            AttachmentPreview::scaled(file_url, modal.width(), EMPLOYEE_PREVIEW_PERCENT);
        modal.show(preview);
        true
    }

    /// Lists the bills sorted newest first with display labels.
    pub fn get_bills(&mut self) -> Result<Option<Vec<BillRow>>> {
        let Some(store) = self.store.as_mut() else {
            return Ok(None);
        };
        let mut bills = fetch_bills(store)?;
        sort_anti_chronological(&mut bills);
        debug!(count = bills.len(), "fetched employee bills");
        Ok(Some(bills.into_iter().map(BillRow::from_bill).collect()))
    }
}
