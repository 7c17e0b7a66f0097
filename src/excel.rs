use crate::error::{InvoiceError, Result};
use chrono::{Datelike, NaiveDate};

/// Display format shared by ledger keys, invoice dates and period windows.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Proleptic-Gregorian ordinal of 1899-12-30, the anchor of Excel's
/// 1900 serial date system. Adding it to a serial lands two days before
/// the ordinal of 1900-01-01, which absorbs Excel's off-by-one epoch and
/// its phantom 1900-02-29.
pub const EXCEL_EPOCH_OFFSET: i64 = 693_594;

/// Parses a spreadsheet numeric cell that may use a decimal comma.
pub fn parse_decimal(raw: &str) -> Result<f64> {
    let normalized = raw.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| InvoiceError::Format(format!("Invalid numeric cell: '{}'", raw)))?;

    if !value.is_finite() {
        return Err(InvoiceError::Format(format!(
            "Numeric cell is not finite: '{}'",
            raw
        )));
    }

    Ok(value)
}

/// Converts an Excel 1900-system serial to a proleptic-Gregorian ordinal.
pub fn excel_serial_to_ordinal(serial: i64) -> Result<i64> {
    serial
        .checked_add(EXCEL_EPOCH_OFFSET)
        .ok_or_else(|| InvoiceError::Format(format!("Excel serial out of range: {}", serial)))
}

/// Proleptic-Gregorian ordinal of a date (1 = 0001-01-01).
pub fn ordinal_of(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

pub fn date_from_ordinal(ordinal: i64) -> Result<NaiveDate> {
    let days = i32::try_from(ordinal)
        .map_err(|_| InvoiceError::Format(format!("Ordinal out of range: {}", ordinal)))?;

    NaiveDate::from_num_days_from_ce_opt(days)
        .ok_or_else(|| InvoiceError::Format(format!("Ordinal out of range: {}", ordinal)))
}

pub fn excel_serial_to_date(serial: i64) -> Result<NaiveDate> {
    date_from_ordinal(excel_serial_to_ordinal(serial)?)
}

/// Renders a date as DD/MM/YYYY.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a DD/MM/YYYY date string.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        InvoiceError::Format(format!(
            "Invalid date string: '{}'. Expected DD/MM/YYYY",
            raw
        ))
    })
}

pub fn ordinal_to_date_string(ordinal: i64) -> Result<String> {
    Ok(format_date(date_from_ordinal(ordinal)?))
}

pub fn date_string_to_ordinal(raw: &str) -> Result<i64> {
    Ok(ordinal_of(parse_date(raw)?))
}
