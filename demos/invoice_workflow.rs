use auto_invoice::*;
use chrono::NaiveDate;
use serde_json::{json, Value};

fn column(header: &str, cells: &[&str]) -> String {
    let mut joined = header.to_string();
    for cell in cells {
        joined.push(';');
        joined.push_str(cell);
    }
    joined
}

// The shape a finance spreadsheet arrives in from the web form: one
// semicolon-joined string per column, headers included.
fn march_bookkeeping() -> Value {
    json!({
        "clients": column("Klant", &["Acme BV", "Acme BV", "Bakkerij Jansen"]),
        "invoiceNumbers": column(
            "Factuurnummer",
            &["7.1.03.23", "7.2.03.23", "12.1.03.23"]
        ),
        "invoiceDates": column("Datum", &["45000", "45008", "45016"]),
        "pricesIncl": column("Incl", &["121,00", "60,50", "330,00"]),
        "pricesExcl": column("Excl", &["100,00", "50,00", "300,00"]),
        "quantity": column("Aantal", &["2", "1", "3"]),
        "descriptions": column(
            "Beschrijving",
            &["Onderhoud maart", "Spoedklus", "Levering bloem"]
        ),
        "availableClients": column("Klanten", &["Acme BV", "Bakkerij Jansen"]),
        "clientNumbers": column("Nummers", &["7", "12"]),
        "clientContacts": column("Contact", &["J. de Vries", "NA"]),
        "clientStreets": column("Straat", &["Dorpsstraat 1", "Molenweg 8"]),
        "clientPostalCodes": column("Postcode", &["1234 AB", "5678 CD"]),
        "clientCities": column("Plaats", &["Utrecht", "Zwolle"]),
        "clientEmails": column("E-mail", &["jan@acme.nl", ""])
    })
}

fn main() -> anyhow::Result<()> {
    println!("🧾 Invoice Workflow Demonstration");
    println!("═══════════════════════════════════════════════════\n");

    // 1. Ingest the month's spreadsheet export
    let repository = BlobLedgerRepository::new(MemoryBlobStore::new());
    let sheet = march_bookkeeping();

    let report = ingest_finance_sheet(&sheet, &repository)?;
    println!("📥 Sheet ingested:");
    println!("   Outcome: {:?}", report.outcome);
    println!("   Clients: {}", report.clients);
    println!("   Payments: {}\n", report.entries);

    // 2. Re-uploading the same sheet changes nothing
    let report = ingest_finance_sheet(&sheet, &repository)?;
    println!("🔁 Same sheet again:");
    println!("   Outcome: {:?}\n", report.outcome);

    // 3. What the form would offer in its dropdowns
    let ledger = repository.load()?;
    println!("📋 Registered clients:");
    for name in &ledger.available_clients {
        let number = ledger.client_number_for(name)?;
        let history = ledger.client(name)?;
        println!(
            "   {} (client number {}, {} payments on record)",
            name,
            number,
            history.entries.len()
        );
    }
    println!();

    println!("📅 Selectable years: {:?}", invoice_years());
    println!("   Periods for 2024:");
    for label in period_labels(2024) {
        println!("      {}", label);
    }
    println!();

    // 4. Build the March invoice for Acme BV
    let invoice_date = NaiveDate::from_ymd_opt(2023, 4, 1)
        .ok_or_else(|| anyhow::anyhow!("invalid invoice date"))?;
    let document = build_invoice(
        &ledger,
        "Acme BV",
        "1 maart - 31 maart",
        2023,
        "1",
        invoice_date,
    )?;

    println!("🧾 Invoice {}", document.invoice_number);
    println!("   Period:     {}", document.period_label);
    println!("   Issued:     {}", document.invoice_date.format("%d/%m/%Y"));
    println!("   Due:        {}", document.expiration_date.format("%d/%m/%Y"));
    println!(
        "   Storage key: {}\n",
        invoice_storage_key(&document.client_name, &document.invoice_number.encode())
    );

    // 5. The tag map a document template would receive
    println!("🏷️  Template tags:");
    for (tag, value) in document_tags(&document) {
        match value {
            TagValue::Text(text) => println!("   {:<18} {}", tag, text),
            TagValue::Table(rows) => {
                println!("   {:<18} ({} rows)", tag, rows.len());
                for row in rows {
                    println!(
                        "      {} | {} | {} x {} = {} ({}% tax)",
                        row["date"],
                        row["description"],
                        row["price"],
                        row["quantity"],
                        row["subtotal"],
                        row["tax_rate"]
                    );
                }
            }
        }
    }
    println!();

    println!("═══════════════════════════════════════════════════");
    println!("✅ Workflow complete");

    Ok(())
}
