use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::calendar::{period_date_range, period_index};
use crate::error::{InvoiceError, Result};
use crate::excel::format_date;
use crate::ledger::{ClientContact, Ledger};
use crate::number::InvoiceNumber;

/// Days between the invoice date and the printed expiration date.
pub const PAYMENT_TERM_DAYS: u64 = 30;

/// One payment row as printed on the invoice, every field pre-formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub date: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
    pub subtotal: String,
    pub tax_rate: String,
}

impl LineItem {
    /// Record form used in the renderer's lines table.
    pub fn record(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("date".to_string(), self.date.clone()),
            ("description".to_string(), self.description.clone()),
            ("price".to_string(), self.price.clone()),
            ("quantity".to_string(), self.quantity.clone()),
            ("subtotal".to_string(), self.subtotal.clone()),
            ("tax_rate".to_string(), self.tax_rate.clone()),
        ])
    }
}

/// The payment rows of one invoice period plus the running totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLines {
    pub lines: Vec<LineItem>,
    pub total_excl: f64,
    pub tax: f64,
    pub total: f64,
}

/// Derives the invoice lines of one client and period.
///
/// The tax rate is implied per entry from the price pair; an entry with
/// a zero tax-exclusive price has no defined rate and fails the build.
pub fn build_lines(
    ledger: &Ledger,
    client: &str,
    period_label: &str,
    year: i32,
) -> Result<InvoiceLines> {
    let period_number = period_index(year, period_label)?;
    let (start, end) = period_date_range(period_number, year)?;
    let history = ledger.client(client)?;

    let mut lines = Vec::new();
    let mut total_excl = 0.0;
    let mut tax = 0.0;
    let mut total = 0.0;

    for (date, entry) in &history.entries {
        if *date < start || *date > end {
            continue;
        }
        if entry.price_excl == 0.0 {
            return Err(InvoiceError::ZeroPriceTaxRate {
                date: format_date(*date),
            });
        }

        let subtotal = entry.quantity * entry.price_excl;
        let tax_rate = (entry.price_incl - entry.price_excl) / entry.price_excl * 100.0;

        lines.push(LineItem {
            date: format_date(*date),
            description: entry.description.clone(),
            price: format!("{:.2}", entry.price_excl),
            quantity: format!("{:.0}", entry.quantity),
            subtotal: format!("{:.2}", subtotal),
            tax_rate: format!("{:.0}", tax_rate),
        });

        // Only the subtotal scales by quantity; tax and total accumulate
        // the stored per-payment amounts.
        total_excl += subtotal;
        tax += entry.price_incl - entry.price_excl;
        total += entry.price_incl;
    }

    Ok(InvoiceLines {
        lines,
        total_excl,
        tax,
        total,
    })
}

/// Everything the Word renderer needs for one invoice, fully resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDocument {
    pub client_name: String,
    pub invoice_number: InvoiceNumber,
    pub period_label: String,
    pub invoice_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub contact: ClientContact,
    pub lines: InvoiceLines,
}

/// Resolves the lines, expiration date and contact details for one
/// invoice. The period comes from the invoice number.
pub fn build_document(
    ledger: &Ledger,
    client: &str,
    number: InvoiceNumber,
    invoice_date: NaiveDate,
) -> Result<InvoiceDocument> {
    let period_label = number.period_label()?;
    let lines = build_lines(ledger, client, &period_label, number.year)?;
    let expiration_date = invoice_date
        .checked_add_days(Days::new(PAYMENT_TERM_DAYS))
        .ok_or_else(|| {
            InvoiceError::Format(format!(
                "Cannot compute an expiration date from {}",
                format_date(invoice_date)
            ))
        })?;
    let contact = ledger.contact_for(client).cloned().unwrap_or_default();

    Ok(InvoiceDocument {
        client_name: client.to_string(),
        invoice_number: number,
        period_label,
        invoice_date,
        expiration_date,
        contact,
        lines,
    })
}

/// A renderer tag value: plain text or a table of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Text(String),
    Table(Vec<BTreeMap<String, String>>),
}

fn text<T: Into<String>>(value: T) -> TagValue {
    TagValue::Text(value.into())
}

/// Ordered `(tag, value)` pairs for the external Word renderer.
/// Unknown contact fields render as empty strings.
pub fn document_tags(document: &InvoiceDocument) -> Vec<(String, TagValue)> {
    let contact = &document.contact;

    let mut tags = vec![
        ("invoice_date".to_string(), text(format_date(document.invoice_date))),
        (
            "expiration_date".to_string(),
            text(format_date(document.expiration_date)),
        ),
        (
            "invoice_number".to_string(),
            text(document.invoice_number.encode()),
        ),
        ("invoice_period".to_string(), text(document.period_label.clone())),
        ("client_name".to_string(), text(document.client_name.clone())),
        (
            "client_number".to_string(),
            text(document.invoice_number.client_number.clone()),
        ),
        (
            "client_contact".to_string(),
            text(contact.contact.clone().unwrap_or_default()),
        ),
        (
            "client_street".to_string(),
            text(contact.street.clone().unwrap_or_default()),
        ),
        (
            "client_postal_code".to_string(),
            text(contact.postal_code.clone().unwrap_or_default()),
        ),
        (
            "client_city".to_string(),
            text(contact.city.clone().unwrap_or_default()),
        ),
        (
            "client_email".to_string(),
            text(contact.email.clone().unwrap_or_default()),
        ),
    ];

    let rows = document.lines.lines.iter().map(LineItem::record).collect();
    tags.push(("invoice_lines".to_string(), TagValue::Table(rows)));
    tags.push((
        "total_excl".to_string(),
        text(format!("{:.2}", document.lines.total_excl)),
    ));
    tags.push(("tax".to_string(), text(format!("{:.2}", document.lines.tax))));
    tags.push(("total".to_string(), text(format!("{:.2}", document.lines.total))));

    tags
}
