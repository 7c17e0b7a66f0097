//! # Auto Invoice
//!
//! A library that turns the bookkeeping spreadsheet of a small business into a
//! per-client payment ledger, composite invoice numbers and render-ready
//! invoice data.
//!
//! ## Core Concepts
//!
//! - **Finance sheet**: the spreadsheet evaluator's output, one semicolon-joined string per column
//! - **Ledger**: per-client payment history keyed by date, persisted wholesale as one JSON blob
//! - **Invoice number**: `{client}.{index}.{period:02}.{yy:02}`, e.g. `7.1.03.24`
//! - **Invoice period**: one calendar month of a year, labelled in Dutch (`1 maart - 31 maart`)
//! - **Invoice document**: resolved lines, totals and contact details for the external Word renderer
//!
//! ## Example
//!
//! ```rust,ignore
//! use auto_invoice::*;
//! use chrono::NaiveDate;
//! use serde_json::json;
//!
//! let sheet = json!({
//!     "clients": "Klant;Acme BV",
//!     "invoiceNumbers": "Factuurnummer;7.1.03.24",
//!     "invoiceDates": "Datum;45000",
//!     "pricesIncl": "Incl;121,00",
//!     "pricesExcl": "Excl;100,00",
//!     "quantity": "Aantal;2",
//!     "availableClients": "Klanten;Acme BV",
//!     "clientNumbers": "Nummers;7"
//! });
//!
//! let repository = BlobLedgerRepository::new(MemoryBlobStore::new());
//! let report = ingest_finance_sheet(&sheet, &repository).unwrap();
//!
//! let ledger = repository.load().unwrap();
//! let document = build_invoice(
//!     &ledger,
//!     "Acme BV",
//!     "1 maart - 31 maart",
//!     2023,
//!     "1",
//!     NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
//! )
//! .unwrap();
//! let tags = document_tags(&document);
//! ```

pub mod calendar;
pub mod error;
pub mod excel;
pub mod invoice;
pub mod ledger;
pub mod merge;
pub mod number;
pub mod sheet;
pub mod storage;

pub use calendar::{generate_periods, invoice_years, period_labels, InvoicePeriod};
pub use error::{InvoiceError, Result};
pub use invoice::{
    build_document, build_lines, document_tags, InvoiceDocument, InvoiceLines, LineItem, TagValue,
};
pub use ledger::{ClientContact, ClientLedger, Ledger, LedgerEntry};
pub use merge::{merge, MergeOutcome};
pub use number::{client_number_of, InvoiceNumber};
pub use sheet::parse_finance_sheet;
pub use storage::{
    invoice_storage_key, BlobLedgerRepository, BlobStore, LedgerRepository, MemoryBlobStore,
    LEDGER_KEY, WORKSPACE_SCOPE,
};

use chrono::NaiveDate;
use log::{debug, info};
use serde_json::Value;

/// Summary of one finance-sheet ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub outcome: MergeOutcome,
    pub clients: usize,
    pub entries: usize,
}

pub struct InvoiceProcessor;

impl InvoiceProcessor {
    /// Parses a finance sheet, folds it into the persisted ledger and
    /// saves the result only when anything changed.
    pub fn ingest_finance_sheet(
        sheet: &Value,
        repository: &dyn LedgerRepository,
    ) -> Result<IngestReport> {
        let incoming = parse_finance_sheet(sheet)?;

        let persisted = match repository.load() {
            Ok(ledger) => ledger,
            Err(InvoiceError::NotFound(_)) => {
                info!("No persisted ledger yet, starting from an empty one");
                Ledger::default()
            }
            Err(err) => return Err(err),
        };

        let (merged, outcome) = merge(&persisted, &incoming);
        debug!(
            "Merged finance sheet into ledger: {} clients, {} entries",
            merged.clients.len(),
            merged.entry_count()
        );

        match outcome {
            MergeOutcome::Updated => {
                repository.save(&merged)?;
                info!("Persisted updated ledger");
            }
            MergeOutcome::Unchanged => {
                info!("Ledger unchanged, skipping persist");
            }
        }

        Ok(IngestReport {
            outcome,
            clients: merged.clients.len(),
            entries: merged.entry_count(),
        })
    }

    /// Builds the invoice document for a period picked on the form. The
    /// invoice number is encoded from the client's registered number,
    /// the free-form index and the period.
    pub fn build_invoice(
        ledger: &Ledger,
        client: &str,
        period_label: &str,
        year: i32,
        index: &str,
        invoice_date: NaiveDate,
    ) -> Result<InvoiceDocument> {
        let client_number = ledger.client_number_for(client)?;
        let number = InvoiceNumber::from_period_label(client_number, index, period_label, year)?;
        invoice::build_document(ledger, client, number, invoice_date)
    }

    /// Builds the invoice document for an already-issued invoice number;
    /// the period comes out of the number itself.
    pub fn build_invoice_by_number(
        ledger: &Ledger,
        client: &str,
        raw_number: &str,
        invoice_date: NaiveDate,
    ) -> Result<InvoiceDocument> {
        let number = InvoiceNumber::decode(raw_number)?;
        invoice::build_document(ledger, client, number, invoice_date)
    }
}

pub fn ingest_finance_sheet(
    sheet: &Value,
    repository: &dyn LedgerRepository,
) -> Result<IngestReport> {
    InvoiceProcessor::ingest_finance_sheet(sheet, repository)
}

pub fn build_invoice(
    ledger: &Ledger,
    client: &str,
    period_label: &str,
    year: i32,
    index: &str,
    invoice_date: NaiveDate,
) -> Result<InvoiceDocument> {
    InvoiceProcessor::build_invoice(ledger, client, period_label, year, index, invoice_date)
}

pub fn build_invoice_by_number(
    ledger: &Ledger,
    client: &str,
    raw_number: &str,
    invoice_date: NaiveDate,
) -> Result<InvoiceDocument> {
    InvoiceProcessor::build_invoice_by_number(ledger, client, raw_number, invoice_date)
}
