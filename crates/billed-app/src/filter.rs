// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Bill, BillStatus, SessionUser};

/// Seeded accounts whose bills never show up on the review dashboard.
pub const TEST_ACCOUNTS: [&str; 4] = [
    "employee@test.tld",
    "employee@company.tld",
    "test@company.tld",
    "test@test.tld",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Keeps every owner, so fixtures stay deterministic.
    pub test_mode: bool,
    pub excluded_emails: Vec<String>,
    pub current_user_email: Option<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            test_mode: false,
            excluded_emails: TEST_ACCOUNTS.iter().map(|email| (*email).to_owned()).collect(),
            current_user_email: None,
        }
    }
}

impl FilterOptions {
    pub fn test_mode() -> Self {
        Self {
            test_mode: true,
            ..Self::default()
        }
    }

    pub fn for_session(user: Option<&SessionUser>, excluded_emails: &[String]) -> Self {
        Self {
            test_mode: false,
            excluded_emails: excluded_emails.to_vec(),
            current_user_email: user.map(|user| user.email.clone()),
        }
    }

    pub fn excludes(&self, email: &str) -> bool {
        if self.test_mode {
            return false;
        }
        self.current_user_email.as_deref() == Some(email)
            || self.excluded_emails.iter().any(|excluded| excluded == email)
    }
}

pub fn filtered_bills(
    bills: Option<&[Bill]>,
    status: BillStatus,
    options: &FilterOptions,
) -> Vec<Bill> {
    let Some(bills) = bills else {
        return Vec::new();
    };
    bills
        .iter()
        .filter(|bill| bill.status == status && !options.excludes(&bill.email))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FilterOptions, filtered_bills};
    use crate::{Bill, BillId, BillStatus, SessionUser, UserType};

    fn bill(id: &str, status: BillStatus, email: &str) -> Bill {
        Bill {
            id: BillId::new(id),
            email: email.to_owned(),
            name: format!("bill {id}"),
            bill_type: "Transports".to_owned(),
            amount: Some(10.0),
            date: "2023-09-01".to_owned(),
            status,
            comment_admin: None,
            file: None,
            vat: None,
            pct: None,
            commentary: None,
        }
    }

    fn ids(bills: &[Bill]) -> Vec<&str> {
        bills.iter().map(|bill| bill.id.as_str()).collect()
    }

    #[test]
    fn keeps_matching_status_in_original_order() {
        let bills = vec![
            bill("1", BillStatus::Pending, "a@a"),
            bill("2", BillStatus::Accepted, "a@a"),
            bill("3", BillStatus::Pending, "b@b"),
        ];

        let pending = filtered_bills(Some(&bills), BillStatus::Pending, &FilterOptions::test_mode());
        assert_eq!(ids(&pending), vec!["1", "3"]);
    }

    #[test]
    fn empty_or_absent_input_yields_nothing() {
        let options = FilterOptions::default();
        assert!(filtered_bills(None, BillStatus::Pending, &options).is_empty());
        assert!(filtered_bills(Some(&[]), BillStatus::Refused, &options).is_empty());
    }

    #[test]
    fn excludes_test_accounts_and_current_user_outside_test_mode() {
        let bills = vec![
            bill("1", BillStatus::Pending, "employee@test.tld"),
            bill("2", BillStatus::Pending, "admin@company.tld"),
            bill("3", BillStatus::Pending, "jane.doe@company.tld"),
        ];
        let user = SessionUser::connected(UserType::Admin, "admin@company.tld");
        let excluded = vec!["employee@test.tld".to_owned()];
        let options = FilterOptions::for_session(Some(&user), &excluded);

        let pending = filtered_bills(Some(&bills), BillStatus::Pending, &options);
        assert_eq!(ids(&pending), vec!["3"]);
    }

    #[test]
    fn test_mode_skips_exclusions() {
        let bills = vec![bill("1", BillStatus::Refused, "test@test.tld")];
        let options = FilterOptions {
            current_user_email: Some("test@test.tld".to_owned()),
            ..FilterOptions::test_mode()
        };

        let refused = filtered_bills(Some(&bills), BillStatus::Refused, &options);
        assert_eq!(ids(&refused), vec!["1"]);
    }
}
