// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use billed_app::{
    Alert, AttachmentPreview, Bill, BillId, BillRecord, BillStatus, BillStore, CreateRequest,
    CreatedFile, Modal, Navigator, Route, StoreError, StoreResult, UpdateRequest,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// The four bills served by the mock back end, as raw JSON.
pub const FIXTURE_BILLS_JSON: &str = r#"[
  {
    "id": "47qAXb6fIm2zOKkLzMro",
    "vat": "80",
    "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.a…f-1.jpg?alt=media&token=c1640e12-a24b-4b11-ae52-529112e9602a",
    "status": "pending",
    "type": "Hôtel et logement",
    "commentary": "séminaire billed",
    "name": "encore",
    "fileName": "preview-facture-free-201801-pdf-1.jpg",
    "date": "2004-04-04",
    "amount": 400,
    "commentAdmin": "ok",
    "email": "a@a",
    "pct": 20
  },
  {
    "id": "BeKy5Mo4jkmdfPGYpTxZ",
    "vat": "",
    "amount": 100,
    "name": "test1",
    "fileName": "1592770761.jpeg",
    "commentary": "plop",
    "pct": 20,
    "type": "Transports",
    "email": "a@a",
    "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.a…61.jpeg?alt=media&token=7685cd61-c112-42bc-9929-8a799bb82d8b",
    "date": "2001-01-01",
    "status": "refused",
    "commentAdmin": "en fait non"
  },
  {
    "id": "UIUZtnPQvnbFnB0ozvJh",
    "name": "test3",
    "email": "a@a",
    "type": "Services en ligne",
    "vat": "60",
    "pct": 20,
    "commentAdmin": "bon bah d'accord",
    "amount": 300,
    "status": "accepted",
    "date": "2003-03-03",
    "commentary": "",
    "fileName": "facture-client-php-exportee-dans-document-pdf-enregistre-sur-disque-dur.png",
    "fileUrl": "https://test.storage.tld/v0/b/billable-677b6.a…dur.png?alt=media&token=571d34cb-9c8f-430a-af52-66221cae1da3"
  },
  {
    "id": "qcCK3SzECmaZAGRrHjaC",
    "status": "refused",
    "pct": 20,
    "amount": 200,
    "email": "a@a",
    "name": "test2",
    "vat": "40",
    "fileName": "preview-facture-free-201801-pdf-1.jpg",
    "date": "2002-02-02",
    "commentAdmin": "pas la bonne facture",
    "commentary": "test2",
    "type": "Restaurants et bars",
    "fileUrl": "https://firebasestorage.googleapis.com/v0/b/billable-677b6.a…f-1.jpg?alt=media&token=4df6ed2c-12c8-42a2-b013-346c1346f732"
  }
]"#;

pub fn fixture_records() -> Result<Vec<BillRecord>> {
    serde_json::from_str(FIXTURE_BILLS_JSON).context("decode fixture bills")
}

pub fn fixture_bills() -> Result<Vec<Bill>> {
    fixture_records()?
        .into_iter()
        .map(Bill::from_record)
        .collect()
}

/// Minimal bill for scenario tests.
pub fn sample_bill(id: &str, status: BillStatus, email: &str, date: &str) -> Bill {
    Bill {
        id: BillId::new(id),
        email: email.to_owned(),
        name: format!("bill {id}"),
        bill_type: "Transports".to_owned(),
        amount: Some(100.0),
        date: date.to_owned(),
        status,
        comment_admin: None,
        file: Some(billed_app::FileRef {
            url: format!("https://test.storage.tld/{id}.jpg"),
            name: format!("{id}.jpg"),
        }),
        vat: Some("20".to_owned()),
        pct: Some(20),
        commentary: None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Default)]
pub struct MockStoreLog {
    pub list_calls: usize,
    pub updates: Vec<UpdateRequest>,
    pub creates: Vec<CreateRequest>,
}

#[derive(Debug, Default)]
struct MockStoreState {
    records: Vec<BillRecord>,
    list_error: Option<StoreError>,
    update_error: Option<StoreError>,
    create_error: Option<StoreError>,
    log: MockStoreLog,
}

/// In-memory bill store. Clones share state, so a test can keep a handle while the
/// controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockStoreState>>,
}

impl MockStore {
    pub fn with_records(records: Vec<BillRecord>) -> Self {
        let store = Self::default();
        lock(&store.state).records = records;
        store
    }

    pub fn with_fixtures() -> Result<Self> {
        Ok(Self::with_records(fixture_records()?))
    }

    pub fn with_bills(bills: &[Bill]) -> Self {
        Self::with_records(bills.iter().map(Bill::to_record).collect())
    }

    pub fn fail_list(&self, error: StoreError) {
        lock(&self.state).list_error = Some(error);
    }

    pub fn fail_update(&self, error: StoreError) {
        lock(&self.state).update_error = Some(error);
    }

    pub fn fail_create(&self, error: StoreError) {
        lock(&self.state).create_error = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        lock(&self.state).log.list_calls
    }

    pub fn updates(&self) -> Vec<UpdateRequest> {
        lock(&self.state).log.updates.clone()
    }

    pub fn creates(&self) -> Vec<CreateRequest> {
        lock(&self.state).log.creates.clone()
    }

    pub fn records(&self) -> Vec<BillRecord> {
        lock(&self.state).records.clone()
    }
}

impl BillStore for MockStore {
    fn list(&mut self) -> StoreResult<Vec<BillRecord>> {
        let mut state = lock(&self.state);
        state.log.list_calls += 1;
        if let Some(error) = state.list_error.take() {
            return Err(error);
        }
        Ok(state.records.clone())
    }

    fn update(&mut self, request: &UpdateRequest) -> StoreResult<BillRecord> {
        let mut state = lock(&self.state);
        state.log.updates.push(request.clone());
        if let Some(error) = state.update_error.clone() {
            return Err(error);
        }
        let record = request
            .decode()
            .map_err(|error| StoreError::Decode(error.to_string()))?;
        match state
            .records
            .iter_mut()
            .find(|existing| existing.id.as_ref() == Some(&request.selector))
        {
            Some(existing) => *existing = record.clone(),
            None => state.records.push(record.clone()),
        }
        Ok(record)
    }

    fn create(&mut self, request: &CreateRequest) -> StoreResult<CreatedFile> {
        let mut state = lock(&self.state);
        state.log.creates.push(request.clone());
        if let Some(error) = state.create_error.clone() {
            return Err(error);
        }
        Ok(CreatedFile {
            file_url: format!("https://localhost:3456/images/{}", request.file_name),
            key: BillId::new("1234"),
        })
    }
}

/// Navigator remembering every requested route.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, route: Route) {
        lock(&self.routes).push(route);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingAlert {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingAlert {
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl Alert for RecordingAlert {
    fn alert(&mut self, message: &str) {
        lock(&self.messages).push(message.to_owned());
    }
}

#[derive(Debug, Clone)]
pub struct RecordingModal {
    width: u32,
    shown: Arc<Mutex<Vec<AttachmentPreview>>>,
}

impl RecordingModal {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            shown: Arc::default(),
        }
    }

    pub fn shown(&self) -> Vec<AttachmentPreview> {
        lock(&self.shown).clone()
    }
}

impl Modal for RecordingModal {
    fn width(&self) -> u32 {
        self.width
    }

    fn show(&mut self, preview: AttachmentPreview) {
        lock(&self.shown).push(preview);
    }
}
