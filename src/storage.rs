use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{InvoiceError, Result};
use crate::ledger::Ledger;

/// Storage scope shared by every persisted blob of the application.
pub const WORKSPACE_SCOPE: &str = "workspace";
/// Key of the persisted ledger blob.
pub const LEDGER_KEY: &str = "financeData";

/// Key under which a rendered invoice document is stored.
pub fn invoice_storage_key(client_name: &str, invoice_number: &str) -> String {
    format!("{}_{}", client_name, invoice_number)
}

/// A scoped key-value blob store, the platform storage boundary.
pub trait BlobStore {
    /// Fetches a blob; not-found error when the key holds nothing.
    fn get(&self, key: &str, scope: &str) -> Result<Vec<u8>>;
    fn set(&self, key: &str, scope: &str, data: Vec<u8>) -> Result<()>;
    /// Keys present in a scope, sorted.
    fn list(&self, scope: &str) -> Result<Vec<String>>;
}

/// In-memory `BlobStore` for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str, scope: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        blobs
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                InvoiceError::NotFound(format!("No blob '{}' in scope '{}'", key, scope))
            })
    }

    fn set(&self, key: &str, scope: &str, data: Vec<u8>) -> Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        blobs.insert((scope.to_string(), key.to_string()), data);
        Ok(())
    }

    fn list(&self, scope: &str) -> Result<Vec<String>> {
        let blobs = self
            .blobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(blobs
            .keys()
            .filter(|(blob_scope, _)| blob_scope == scope)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

/// Load/save boundary for the persisted ledger.
pub trait LedgerRepository {
    /// Loads the persisted ledger; not-found error when none was saved yet.
    fn load(&self) -> Result<Ledger>;
    fn save(&self, ledger: &Ledger) -> Result<()>;
}

/// Stores the ledger as a UTF-8 JSON blob under `financeData` in the
/// workspace scope.
#[derive(Debug, Default)]
pub struct BlobLedgerRepository<S: BlobStore> {
    store: S,
}

impl<S: BlobStore> BlobLedgerRepository<S> {
    pub fn new(store: S) -> Self {
        BlobLedgerRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: BlobStore> LedgerRepository for BlobLedgerRepository<S> {
    fn load(&self) -> Result<Ledger> {
        let bytes = self.store.get(LEDGER_KEY, WORKSPACE_SCOPE)?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| InvoiceError::Schema("Persisted ledger blob is not UTF-8".to_string()))?;
        Ledger::from_json_str(&raw)
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        ledger.validate()?;
        let raw = ledger.to_json_string()?;
        self.store.set(LEDGER_KEY, WORKSPACE_SCOPE, raw.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ClientContact, ClientLedger, LedgerEntry};
    use chrono::NaiveDate;

    fn sample_ledger() -> Ledger {
        let mut client = ClientLedger::default();
        client.entries.insert(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            LedgerEntry {
                price_excl: 100.0,
                price_incl: 121.0,
                quantity: 2.0,
                invoice_number: "7.1.03.24".to_string(),
                description: "Onderhoud".to_string(),
            },
        );
        client.record_invoice_number("7.1.03.24");

        let mut ledger = Ledger {
            available_clients: vec!["Acme BV".to_string()],
            client_numbers: vec!["7".to_string()],
            contacts: vec![ClientContact::default()],
            ..Default::default()
        };
        ledger.clients.insert("Acme BV".to_string(), client);
        ledger
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryBlobStore::new();
        assert!(store.get("financeData", "workspace").is_err());

        store
            .set("financeData", "workspace", b"blob".to_vec())
            .unwrap();
        store.set("other", "workspace", b"blob2".to_vec()).unwrap();
        store.set("financeData", "elsewhere", b"x".to_vec()).unwrap();

        assert_eq!(store.get("financeData", "workspace").unwrap(), b"blob");
        assert_eq!(
            store.list("workspace").unwrap(),
            vec!["financeData".to_string(), "other".to_string()]
        );
        assert_eq!(
            store.list("elsewhere").unwrap(),
            vec!["financeData".to_string()]
        );
    }

    #[test]
    fn test_repository_round_trip() {
        let repository = BlobLedgerRepository::new(MemoryBlobStore::new());
        let ledger = sample_ledger();

        repository.save(&ledger).unwrap();
        assert_eq!(repository.load().unwrap(), ledger);

        assert_eq!(
            repository.store().list(WORKSPACE_SCOPE).unwrap(),
            vec![LEDGER_KEY.to_string()]
        );
    }

    #[test]
    fn test_load_without_blob_is_not_found() {
        let repository = BlobLedgerRepository::new(MemoryBlobStore::new());
        assert!(matches!(
            repository.load(),
            Err(InvoiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_rejects_malformed_blobs() {
        let repository = BlobLedgerRepository::new(MemoryBlobStore::new());

        repository
            .store()
            .set(LEDGER_KEY, WORKSPACE_SCOPE, vec![0xff, 0xfe])
            .unwrap();
        assert!(repository.load().is_err());

        repository
            .store()
            .set(LEDGER_KEY, WORKSPACE_SCOPE, b"not json".to_vec())
            .unwrap();
        assert!(repository.load().is_err());

        repository
            .store()
            .set(LEDGER_KEY, WORKSPACE_SCOPE, b"[1, 2]".to_vec())
            .unwrap();
        assert!(repository.load().is_err());
    }

    #[test]
    fn test_save_rejects_invalid_ledger() {
        let repository = BlobLedgerRepository::new(MemoryBlobStore::new());
        let mut ledger = sample_ledger();
        ledger.client_numbers.clear();

        assert!(repository.save(&ledger).is_err());
        assert!(repository.store().list(WORKSPACE_SCOPE).unwrap().is_empty());
    }

    #[test]
    fn test_invoice_storage_key() {
        assert_eq!(
            invoice_storage_key("Acme BV", "7.1.03.24"),
            "Acme BV_7.1.03.24"
        );
    }
}
