// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::warn;

use crate::{Bill, BillId, BillRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Unreachable(String),
    #[error("{0}")]
    Decode(String),
}

impl StoreError {
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            message: format!("Erreur {status}"),
        }
    }

    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unreachable(_) | Self::Decode(_) => None,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// JSON-serialized bill.
    pub data: String,
    pub selector: BillId,
}

impl UpdateRequest {
    pub fn for_bill(bill: &Bill) -> Result<Self> {
        Ok(Self {
            data: bill.to_json()?,
            selector: bill.id.clone(),
        })
    }

    pub fn decode(&self) -> Result<BillRecord> {
        serde_json::from_str(&self.data)
            .with_context(|| format!("decode update payload for bill {}", self.selector))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedFile {
    pub file_url: String,
    pub key: BillId,
}

/// Remote document store holding every bill.
pub trait BillStore {
    fn list(&mut self) -> StoreResult<Vec<BillRecord>>;
    fn update(&mut self, request: &UpdateRequest) -> StoreResult<BillRecord>;
    fn create(&mut self, request: &CreateRequest) -> StoreResult<CreatedFile>;
}

/// Lists and normalizes every bill. Store failures keep their message intact.
pub fn fetch_bills<S: BillStore + ?Sized>(store: &mut S) -> Result<Vec<Bill>> {
    let records = store.list()?;
    Ok(normalize_records(records))
}

/// Keeps the records that normalize. The others are logged and skipped, so one bad
/// record never hides the rest of the list.
pub fn normalize_records(records: Vec<BillRecord>) -> Vec<Bill> {
    records
        .into_iter()
        .filter_map(|record| match Bill::from_record(record) {
            Ok(bill) => Some(bill),
            Err(error) => {
                warn!("skipping bill record: {error:#}");
                None
            }
        })
        .collect()
}
