// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use tracing::{debug, error};

use crate::{
    Alert, Bill, BillId, BillStatus, BillStore, CreateRequest, FileRef, Navigator, Route,
    UpdateRequest, parse_bill_date,
};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const INVALID_FILE_MESSAGE: &str = "Seuls les fichiers .jpg, .jpeg et .png sont autorisés.";
const DEFAULT_PCT: u32 = 20;

/// Choices offered by the expense type selector, in display order.
pub const EXPENSE_TYPES: [&str; 7] = [
    "Transports",
    "Restaurants et bars",
    "Hôtel et logement",
    "Services en ligne",
    "IT et électronique",
    "Equipement et matériel",
    "Fournitures de bureau",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl SelectedFile {
    /// Mime type guessed from the file extension.
    pub fn guess_mime_type(name: &str) -> &'static str {
        match file_extension(name).as_deref() {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("pdf") => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

fn file_extension(name: &str) -> Option<String> {
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

pub fn is_allowed_receipt(name: &str) -> bool {
    file_extension(name).is_some_and(|extension| ALLOWED_EXTENSIONS.contains(&extension.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewBillForm {
    pub expense_type: String,
    pub name: String,
    pub date: String,
    pub amount: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

/// Receipt stored by the last successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedReceipt {
    pub key: BillId,
    pub file_url: String,
    pub file_name: String,
}

pub struct NewBillPage<S, N, A> {
    store: Option<S>,
    navigator: N,
    alert: A,
    email: String,
    receipt: Option<UploadedReceipt>,
}

impl<S: BillStore, N: Navigator, A: Alert> NewBillPage<S, N, A> {
    pub fn new(store: Option<S>, navigator: N, alert: A, email: &str) -> Self {
        Self {
            store,
            navigator,
            alert,
            email: email.to_owned(),
            receipt: None,
        }
    }

    pub fn receipt(&self) -> Option<&UploadedReceipt> {
        self.receipt.as_ref()
    }

    /// Uploads the picked receipt. Files other than jpg/jpeg/png raise the alert,
    /// clear the selection and never reach the store.
    pub fn handle_change_file(&mut self, file: SelectedFile) -> bool {
        if !is_allowed_receipt(&file.name) {
            self.alert.alert(INVALID_FILE_MESSAGE);
            self.receipt = None;
            return false;
        }
        let Some(store) = self.store.as_mut() else {
            return false;
        };

        let request = CreateRequest {
            file_name: file.name.clone(),
            mime_type: file.mime_type,
            data: file.data,
            email: self.email.clone(),
        };
        match store.create(&request) {
            Ok(created) => {
                debug!(key = %created.key, "receipt uploaded");
                self.receipt = Some(UploadedReceipt {
                    key: created.key,
                    file_url: created.file_url,
                    file_name: file.name,
                });
                true
            }
            Err(error) => {
                error!(file = %file.name, "upload receipt failed: {error}");
                false
            }
        }
    }

    /// Builds the pending bill from `form` and the uploaded receipt.
    pub fn build_bill(&self, form: &NewBillForm) -> Result<Bill> {
        let Some(receipt) = &self.receipt else {
            bail!("attach a .jpg, .jpeg or .png receipt before submitting");
        };
        parse_bill_date(&form.date)?;
        let amount: u32 = form
            .amount
            .trim()
            .parse()
            .with_context(|| format!("amount {:?} must be a whole number", form.amount))?;
        let pct = match form.pct.trim() {
            "" => DEFAULT_PCT,
            raw => raw
                .parse()
                .with_context(|| format!("VAT percentage {raw:?} must be a whole number"))?,
        };

        Ok(Bill {
            id: receipt.key.clone(),
            email: self.email.clone(),
            name: form.name.trim().to_owned(),
            bill_type: form.expense_type.trim().to_owned(),
            amount: Some(f64::from(amount)),
            date: form.date.trim().to_owned(),
            status: BillStatus::Pending,
            comment_admin: None,
            file: Some(FileRef {
                url: receipt.file_url.clone(),
                name: receipt.file_name.clone(),
            }),
            vat: Some(form.vat.trim().to_owned()),
            pct: Some(pct),
            commentary: Some(form.commentary.trim().to_owned()),
        })
    }

    /// Sends the bill and returns to the employee's bills page.
    pub fn handle_submit(&mut self, form: &NewBillForm) -> Result<Bill> {
        let bill = self.build_bill(form)?;
        if let Some(store) = self.store.as_mut() {
            let outcome = UpdateRequest::for_bill(&bill)
                .and_then(|request| store.update(&request).map_err(anyhow::Error::from));
            if let Err(error) = outcome {
                error!(bill = %bill.id, "submit bill failed: {error:#}");
            }
        }
        self.navigator.navigate(Route::Bills);
        Ok(bill)
    }
}
