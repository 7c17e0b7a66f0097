use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::error::{InvoiceError, Result};
use crate::excel::{excel_serial_to_date, parse_decimal};
use crate::ledger::{ClientContact, ClientLedger, Ledger, LedgerEntry};

const COL_CLIENTS: &str = "clients";
const COL_INVOICE_NUMBERS: &str = "invoiceNumbers";
const COL_INVOICE_DATES: &str = "invoiceDates";
const COL_PRICES_INCL: &str = "pricesIncl";
const COL_PRICES_EXCL: &str = "pricesExcl";
const COL_QUANTITY: &str = "quantity";
const COL_DESCRIPTIONS: &str = "descriptions";
const COL_AVAILABLE_CLIENTS: &str = "availableClients";
const COL_CLIENT_NUMBERS: &str = "clientNumbers";
const COL_CLIENT_CONTACTS: &str = "clientContacts";
const COL_CLIENT_STREETS: &str = "clientStreets";
const COL_CLIENT_POSTAL_CODES: &str = "clientPostalCodes";
const COL_CLIENT_CITIES: &str = "clientCities";
const COL_CLIENT_EMAILS: &str = "clientEmails";

const RECOGNIZED_COLUMNS: [&str; 14] = [
    COL_CLIENTS,
    COL_INVOICE_NUMBERS,
    COL_INVOICE_DATES,
    COL_PRICES_INCL,
    COL_PRICES_EXCL,
    COL_QUANTITY,
    COL_DESCRIPTIONS,
    COL_AVAILABLE_CLIENTS,
    COL_CLIENT_NUMBERS,
    COL_CLIENT_CONTACTS,
    COL_CLIENT_STREETS,
    COL_CLIENT_POSTAL_CODES,
    COL_CLIENT_CITIES,
    COL_CLIENT_EMAILS,
];

const REQUIRED_COLUMNS: [&str; 8] = [
    COL_CLIENTS,
    COL_INVOICE_NUMBERS,
    COL_INVOICE_DATES,
    COL_PRICES_INCL,
    COL_PRICES_EXCL,
    COL_QUANTITY,
    COL_AVAILABLE_CLIENTS,
    COL_CLIENT_NUMBERS,
];

type Column = Vec<Option<String>>;

/// Builds a ledger from the spreadsheet evaluator's output: a JSON
/// object mapping column name to a semicolon-joined string whose first
/// token is the column header.
///
/// Rows whose client is unknown, or that miss any of date, prices,
/// quantity or invoice number, are dropped; a malformed non-empty
/// numeric cell is an error. Duplicate dates within one client keep the
/// last row.
pub fn parse_finance_sheet(sheet: &Value) -> Result<Ledger> {
    let columns = split_columns(sheet)?;

    let available_clients: Vec<String> = columns[COL_AVAILABLE_CLIENTS]
        .iter()
        .flatten()
        .cloned()
        .collect();
    let client_numbers: Vec<String> = columns[COL_CLIENT_NUMBERS]
        .iter()
        .flatten()
        .cloned()
        .collect();
    if available_clients.len() != client_numbers.len() {
        return Err(InvoiceError::Schema(format!(
            "{} available clients against {} client numbers",
            available_clients.len(),
            client_numbers.len()
        )));
    }

    let contacts = build_contacts(&columns, available_clients.len());

    let mut ledger = Ledger {
        available_clients,
        client_numbers,
        contacts,
        ..Default::default()
    };
    for name in &ledger.available_clients {
        ledger.clients.insert(name.clone(), ClientLedger::default());
    }

    let clients = &columns[COL_CLIENTS];
    let numbers = &columns[COL_INVOICE_NUMBERS];
    let dates = &columns[COL_INVOICE_DATES];
    let prices_incl = &columns[COL_PRICES_INCL];
    let prices_excl = &columns[COL_PRICES_EXCL];
    let quantities = &columns[COL_QUANTITY];
    let empty = Column::new();
    let descriptions = columns.get(COL_DESCRIPTIONS).unwrap_or(&empty);

    let rows = clients
        .len()
        .max(numbers.len())
        .max(dates.len())
        .max(prices_incl.len())
        .max(prices_excl.len())
        .max(quantities.len());

    let mut skipped = 0usize;
    for row in 0..rows {
        let client = match cell(clients, row) {
            Some(client) => client,
            None => {
                skipped += 1;
                continue;
            }
        };
        if !ledger.available_clients.iter().any(|name| name == client) {
            skipped += 1;
            continue;
        }

        let row_cells = (
            cell(numbers, row),
            cell(dates, row),
            cell(prices_incl, row),
            cell(prices_excl, row),
            cell(quantities, row),
        );
        let (number, date_cell, price_incl, price_excl, quantity) = match row_cells {
            (Some(n), Some(d), Some(incl), Some(excl), Some(q)) => (n, d, incl, excl, q),
            _ => {
                skipped += 1;
                continue;
            }
        };

        // Excel serials may carry a time fraction; the day part is the date.
        let serial = parse_decimal(date_cell)? as i64;
        let date = excel_serial_to_date(serial)?;

        let entry = LedgerEntry {
            price_excl: parse_decimal(price_excl)?,
            price_incl: parse_decimal(price_incl)?,
            quantity: parse_decimal(quantity)?,
            invoice_number: number.clone(),
            description: cell(descriptions, row).cloned().unwrap_or_default(),
        };

        let client_ledger = ledger.clients.entry(client.clone()).or_default();
        client_ledger.record_invoice_number(number);
        client_ledger.entries.insert(date, entry);
    }

    debug!(
        "Parsed finance sheet: {} registered clients, {} entries, {} rows skipped",
        ledger.available_clients.len(),
        ledger.entry_count(),
        skipped
    );

    ledger.validate()?;
    Ok(ledger)
}

fn split_columns(sheet: &Value) -> Result<BTreeMap<String, Column>> {
    let object = sheet.as_object().ok_or_else(|| {
        InvoiceError::Schema("Finance sheet is not a JSON object".to_string())
    })?;

    let mut columns = BTreeMap::new();
    for (name, value) in object {
        if !RECOGNIZED_COLUMNS.contains(&name.as_str()) {
            return Err(InvoiceError::Schema(format!(
                "Unrecognized sheet column '{}'",
                name
            )));
        }
        let raw = value.as_str().ok_or_else(|| {
            InvoiceError::Schema(format!("Sheet column '{}' is not a string", name))
        })?;
        columns.insert(name.clone(), split_cells(raw));
    }

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(InvoiceError::Schema(format!(
                "Sheet is missing required column '{}'",
                required
            )));
        }
    }

    Ok(columns)
}

/// Splits a semicolon-joined column, dropping the header token. Empty
/// and `NA` cells become `None`.
fn split_cells(raw: &str) -> Column {
    raw.split(';')
        .skip(1)
        .map(|cell| {
            let cell = cell.trim();
            if cell.is_empty() || cell == "NA" {
                None
            } else {
                Some(cell.to_string())
            }
        })
        .collect()
}

fn cell(column: &[Option<String>], row: usize) -> Option<&String> {
    column.get(row).and_then(|cell| cell.as_ref())
}

fn build_contacts(columns: &BTreeMap<String, Column>, expected: usize) -> Vec<ClientContact> {
    let field = |name: &str, row: usize| -> Option<String> {
        columns
            .get(name)
            .and_then(|column| column.get(row))
            .and_then(|cell| cell.clone())
    };

    (0..expected)
        .map(|row| ClientContact {
            contact: field(COL_CLIENT_CONTACTS, row),
            street: field(COL_CLIENT_STREETS, row),
            postal_code: field(COL_CLIENT_POSTAL_CODES, row),
            city: field(COL_CLIENT_CITIES, row),
            email: field(COL_CLIENT_EMAILS, row),
        })
        .collect()
}
