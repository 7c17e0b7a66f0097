use crate::ledger::Ledger;

/// Result of folding freshly parsed sheet data into the persisted ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    Updated,
}

/// Folds `incoming` into `persisted`, preserving payment history.
///
/// Per client the incoming entries win date-by-date; dates only the
/// persisted ledger knows stay untouched, and the invoice-number list
/// becomes the first-seen union with the persisted order first. The
/// index arrays are replaced by the incoming ones, so a client dropped
/// from the sheet keeps its history but leaves the registered set.
pub fn merge(persisted: &Ledger, incoming: &Ledger) -> (Ledger, MergeOutcome) {
    if persisted == incoming {
        return (persisted.clone(), MergeOutcome::Unchanged);
    }

    let mut merged = persisted.clone();

    for (name, incoming_client) in &incoming.clients {
        let target = merged.clients.entry(name.clone()).or_default();
        for (date, entry) in &incoming_client.entries {
            target.entries.insert(*date, entry.clone());
        }
        for number in &incoming_client.available_invoice_numbers {
            target.record_invoice_number(number);
        }
    }

    merged.available_clients = incoming.available_clients.clone();
    merged.client_numbers = incoming.client_numbers.clone();
    merged.contacts = incoming.contacts.clone();

    if merged == *persisted {
        (merged, MergeOutcome::Unchanged)
    } else {
        (merged, MergeOutcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ClientContact, ClientLedger, LedgerEntry};
    use chrono::NaiveDate;

    fn entry(price_excl: f64, number: &str) -> LedgerEntry {
        LedgerEntry {
            price_excl,
            price_incl: price_excl * 1.21,
            quantity: 1.0,
            invoice_number: number.to_string(),
            description: String::new(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn ledger_with(
        clients: &[(&str, &str)],
        entries: &[(&str, NaiveDate, LedgerEntry)],
    ) -> Ledger {
        let mut ledger = Ledger::default();
        for (name, number) in clients {
            ledger.available_clients.push(name.to_string());
            ledger.client_numbers.push(number.to_string());
            ledger.contacts.push(ClientContact::default());
            ledger.clients.insert(name.to_string(), ClientLedger::default());
        }
        for (name, date, entry) in entries {
            let client = ledger.clients.entry(name.to_string()).or_default();
            client.record_invoice_number(&entry.invoice_number);
            client.entries.insert(*date, entry.clone());
        }
        ledger
    }

    #[test]
    fn test_identical_ledgers_are_unchanged() {
        let ledger = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(15), entry(100.0, "7.1.03.24"))],
        );

        let (merged, outcome) = merge(&ledger, &ledger.clone());
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(merged, ledger);
    }

    #[test]
    fn test_subset_reupload_is_unchanged() {
        // Re-uploading an older sheet after more history accumulated:
        // the incoming ledger differs from the persisted one, yet folding
        // it in changes nothing.
        let persisted = ledger_with(
            &[("Acme BV", "7")],
            &[
                ("Acme BV", date(1), entry(50.0, "7.1.03.24")),
                ("Acme BV", date(15), entry(60.0, "7.2.03.24")),
            ],
        );
        let incoming = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(1), entry(50.0, "7.1.03.24"))],
        );
        assert_ne!(incoming, persisted);

        let (merged, outcome) = merge(&persisted, &incoming);
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(merged, persisted);
    }

    #[test]
    fn test_first_ingest_copies_incoming() {
        let incoming = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(15), entry(100.0, "7.1.03.24"))],
        );

        let (merged, outcome) = merge(&Ledger::default(), &incoming);
        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(merged, incoming);
    }

    #[test]
    fn test_history_is_preserved() {
        let persisted = ledger_with(
            &[("Acme BV", "7")],
            &[
                ("Acme BV", date(1), entry(50.0, "7.1.03.24")),
                ("Acme BV", date(8), entry(60.0, "7.2.03.24")),
            ],
        );
        let incoming = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(22), entry(70.0, "7.3.03.24"))],
        );

        let (merged, outcome) = merge(&persisted, &incoming);
        assert_eq!(outcome, MergeOutcome::Updated);

        let client = merged.client("Acme BV").unwrap();
        assert_eq!(client.entries.len(), 3);
        assert!(client.entries.contains_key(&date(1)));
        assert!(client.entries.contains_key(&date(8)));
        assert!(client.entries.contains_key(&date(22)));
    }

    #[test]
    fn test_incoming_wins_per_date() {
        let persisted = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(15), entry(100.0, "7.1.03.24"))],
        );
        let incoming = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(15), entry(250.0, "7.1.03.24"))],
        );

        let (merged, outcome) = merge(&persisted, &incoming);
        assert_eq!(outcome, MergeOutcome::Updated);

        let client = merged.client("Acme BV").unwrap();
        assert_eq!(client.entries[&date(15)].price_excl, 250.0);
    }

    #[test]
    fn test_invoice_numbers_union_keeps_persisted_order() {
        let persisted = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(1), entry(50.0, "7.1.03.24"))],
        );
        let incoming = ledger_with(
            &[("Acme BV", "7")],
            &[
                ("Acme BV", date(8), entry(60.0, "7.2.03.24")),
                ("Acme BV", date(15), entry(70.0, "7.1.03.24")),
            ],
        );

        let (merged, _) = merge(&persisted, &incoming);
        let client = merged.client("Acme BV").unwrap();
        assert_eq!(
            client.available_invoice_numbers,
            vec!["7.1.03.24".to_string(), "7.2.03.24".to_string()]
        );
    }

    #[test]
    fn test_departed_client_keeps_history_but_leaves_index() {
        let persisted = ledger_with(
            &[("Acme BV", "7"), ("Bakkerij Jansen", "12")],
            &[("Bakkerij Jansen", date(3), entry(80.0, "12.1.03.24"))],
        );
        let incoming = ledger_with(
            &[("Acme BV", "7")],
            &[("Acme BV", date(15), entry(100.0, "7.1.03.24"))],
        );

        let (merged, outcome) = merge(&persisted, &incoming);
        assert_eq!(outcome, MergeOutcome::Updated);

        assert_eq!(merged.available_clients, vec!["Acme BV".to_string()]);
        assert_eq!(merged.client_numbers, vec!["7".to_string()]);

        // History survives even though the client left the sheet.
        let departed = merged.client("Bakkerij Jansen").unwrap();
        assert_eq!(departed.entries.len(), 1);
        assert!(merged.client_number_for("Bakkerij Jansen").is_err());
    }

    #[test]
    fn test_index_only_change_is_an_update() {
        let persisted = ledger_with(&[("Acme BV", "7")], &[]);
        let mut incoming = persisted.clone();
        incoming.contacts[0].city = Some("Utrecht".to_string());

        let (merged, outcome) = merge(&persisted, &incoming);
        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(merged.contacts[0].city.as_deref(), Some("Utrecht"));
    }
}
