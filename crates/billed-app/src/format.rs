// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use time::Date;
use time::macros::format_description;

const FRENCH_SHORT_MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

pub fn parse_bill_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid bill date {raw:?}; expected YYYY-MM-DD"))
}

/// Formats `2004-04-04` as `4 Avr. 04`.
pub fn format_date(raw: &str) -> Result<String> {
    let date = parse_bill_date(raw)?;
    let month = FRENCH_SHORT_MONTHS[usize::from(u8::from(date.month())) - 1];
    let year = date.year().rem_euclid(100);
    Ok(format!("{} {month}. {year:02}", date.day()))
}

/// Falls back to the raw value when the date cannot be formatted.
pub fn display_date(raw: &str) -> String {
    format_date(raw).unwrap_or_else(|_| raw.to_owned())
}

pub fn format_amount(amount: Option<f64>) -> String {
    amount.map_or_else(String::new, |value| value.to_string())
}
