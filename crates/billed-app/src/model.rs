// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::ids::BillId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Accepted,
    Refused,
}

impl BillStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Accepted, Self::Refused];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Refused => "refused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "refused" => Some(Self::Refused),
            _ => None,
        }
    }

    /// Label shown to employees on their bills page.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::Accepted => "Accepté",
            Self::Refused => "Refused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Employee,
    Admin,
}

impl UserType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Admin => "Admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Employee" => Some(Self::Employee),
            "Admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The persisted `user` record of the signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub email: String,
    pub status: String,
}

impl SessionUser {
    pub fn connected(user_type: UserType, email: &str) -> Self {
        Self {
            user_type,
            email: email.to_owned(),
            status: "connected".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bill {
    pub id: BillId,
    pub email: String,
    pub name: String,
    pub bill_type: String,
    pub amount: Option<f64>,
    pub date: String,
    pub status: BillStatus,
    pub comment_admin: Option<String>,
    pub file: Option<FileRef>,
    pub vat: Option<String>,
    pub pct: Option<u32>,
    pub commentary: Option<String>,
}

impl Bill {
    /// Normalizes a store record, making sure `id`, `date` and `status` are set.
    pub fn from_record(record: BillRecord) -> Result<Self> {
        let id = record
            .id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| anyhow!("bill record has no id"))?;

        let raw_status = record
            .status
            .ok_or_else(|| anyhow!("bill {id} has no status"))?;
        let status = BillStatus::parse(&raw_status).ok_or_else(|| {
            anyhow!("bill {id} has status {raw_status:?}; expected pending, accepted or refused")
        })?;

        let amount = record
            .amount
            .map(|amount| amount.to_f64())
            .transpose()
            .with_context(|| format!("decode amount of bill {id}"))?;
        if let Some(value) = amount
            && (!value.is_finite() || value < 0.0)
        {
            bail!("bill {id} has invalid amount {value}; expected a non-negative number");
        }

        let file = match (record.file_url, record.file_name) {
            (Some(url), name) if !url.is_empty() => Some(FileRef {
                url,
                name: name.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            id,
            email: record.email.unwrap_or_default(),
            name: record.name.unwrap_or_default(),
            bill_type: record.bill_type.unwrap_or_default(),
            amount,
            date: record.date.unwrap_or_default(),
            status,
            comment_admin: record.comment_admin,
            file,
            vat: record.vat,
            pct: record.pct,
            commentary: record.commentary,
        })
    }

    pub fn to_record(&self) -> BillRecord {
        BillRecord {
            id: Some(self.id.clone()),
            email: Some(self.email.clone()),
            name: Some(self.name.clone()),
            bill_type: Some(self.bill_type.clone()),
            amount: self.amount.map(Amount::Number),
            date: Some(self.date.clone()),
            status: Some(self.status.as_str().to_owned()),
            comment_admin: self.comment_admin.clone(),
            file_url: self.file.as_ref().map(|file| file.url.clone()),
            file_name: self.file.as_ref().map(|file| file.name.clone()),
            vat: self.vat.clone(),
            pct: self.pct,
            commentary: self.commentary.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_record())
            .with_context(|| format!("serialize bill {}", self.id))
    }

    /// Copy of this bill moved to `status` with the reviewer's comment.
    pub fn reviewed(&self, status: BillStatus, comment_admin: &str) -> Self {
        Self {
            status,
            comment_admin: Some(comment_admin.to_owned()),
            ..self.clone()
        }
    }
}

/// Wire shape of a bill as exchanged with the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BillId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bill_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_admin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

/// Amounts arrive either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("amount {raw:?} is not a number")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Amount, Bill, BillRecord, BillStatus, SessionUser, UserType};
    use crate::BillId;
    use anyhow::Result;

    fn record() -> BillRecord {
        BillRecord {
            id: Some(BillId::new("47qAXb6fIm2zOKkLzMro")),
            email: Some("a@a".to_owned()),
            name: Some("encore".to_owned()),
            bill_type: Some("Hôtel et logement".to_owned()),
            amount: Some(Amount::Number(400.0)),
            date: Some("2004-04-04".to_owned()),
            status: Some("pending".to_owned()),
            file_url: Some("https://test.storage.tld/receipt.jpg".to_owned()),
            file_name: Some("receipt.jpg".to_owned()),
            pct: Some(20),
            ..BillRecord::default()
        }
    }

    #[test]
    fn record_decodes_wire_field_names() -> Result<()> {
        let raw = r#"{"id":"x1","type":"Transports","amount":"100","commentAdmin":"ok","fileUrl":"u","fileName":"f.png","status":"refused","date":"2001-01-01","email":"a@a","name":"n"}"#;
        let record: BillRecord = serde_json::from_str(raw)?;
        let bill = Bill::from_record(record)?;
        assert_eq!(bill.bill_type, "Transports");
        assert_eq!(bill.amount, Some(100.0));
        assert_eq!(bill.comment_admin.as_deref(), Some("ok"));
        assert_eq!(bill.status, BillStatus::Refused);
        assert_eq!(bill.file.map(|file| file.name), Some("f.png".to_owned()));
        Ok(())
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut raw = record();
        raw.status = Some("archived".to_owned());
        let error = Bill::from_record(raw).expect_err("unknown status should fail");
        assert!(error.to_string().contains("archived"));
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut raw = record();
        raw.id = None;
        let error = Bill::from_record(raw).expect_err("missing id should fail");
        assert!(error.to_string().contains("no id"));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut raw = record();
        raw.amount = Some(Amount::Number(-1.0));
        assert!(Bill::from_record(raw).is_err());
    }

    #[test]
    fn non_finite_amount_is_rejected() {
        for text in ["NaN", "inf", "-inf"] {
            let mut raw = record();
            raw.amount = Some(Amount::Text(text.to_owned()));
            let error = Bill::from_record(raw).expect_err("non-finite amount should fail");
            assert!(error.to_string().contains("invalid amount"), "{text}: {error}");
        }
    }

    #[test]
    fn reviewed_copy_keeps_other_fields() -> Result<()> {
        let bill = Bill::from_record(record())?;
        let accepted = bill.reviewed(BillStatus::Accepted, "ok pour moi");
        assert_eq!(accepted.status, BillStatus::Accepted);
        assert_eq!(accepted.comment_admin.as_deref(), Some("ok pour moi"));
        assert_eq!(accepted.name, bill.name);
        assert_eq!(accepted.file, bill.file);
        Ok(())
    }

    #[test]
    fn json_uses_camel_case_keys() -> Result<()> {
        let bill = Bill::from_record(record())?.reviewed(BillStatus::Refused, "non");
        let json = bill.to_json()?;
        assert!(json.contains(r#""commentAdmin":"non""#));
        assert!(json.contains(r#""fileUrl":"https://test.storage.tld/receipt.jpg""#));
        assert!(json.contains(r#""type":"Hôtel et logement""#));
        assert!(json.contains(r#""status":"refused""#));
        Ok(())
    }

    #[test]
    fn session_user_serializes_type_key() -> Result<()> {
        let user = SessionUser::connected(UserType::Admin, "admin@test.tld");
        let json = serde_json::to_string(&user)?;
        assert_eq!(
            json,
            r#"{"type":"Admin","email":"admin@test.tld","status":"connected"}"#
        );
        Ok(())
    }
}
