use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{InvoiceError, Result};
use crate::excel::{format_date, parse_date};

const KEY_AVAILABLE_CLIENTS: &str = "availableClients";
const KEY_CLIENT_NUMBERS: &str = "clientNumbers";
const KEY_CLIENT_CONTACTS: &str = "clientContacts";
const KEY_CLIENT_STREETS: &str = "clientStreets";
const KEY_CLIENT_POSTAL_CODES: &str = "clientPostalCodes";
const KEY_CLIENT_CITIES: &str = "clientCities";
const KEY_CLIENT_EMAILS: &str = "clientEmails";
const KEY_AVAILABLE_INVOICE_NUMBERS: &str = "availableInvoiceNumbers";
const NA_SENTINEL: &str = "NA";

/// One invoiced payment of a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub price_excl: f64,
    pub price_incl: f64,
    pub quantity: f64,
    pub invoice_number: String,
    #[serde(default)]
    pub description: String,
}

/// Payment history of a single client, keyed by payment date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientLedger {
    pub entries: BTreeMap<NaiveDate, LedgerEntry>,
    pub available_invoice_numbers: Vec<String>,
}

impl ClientLedger {
    /// Records an invoice number, keeping first-seen order without duplicates.
    pub fn record_invoice_number(&mut self, number: &str) {
        if !self.available_invoice_numbers.iter().any(|n| n == number) {
            self.available_invoice_numbers.push(number.to_string());
        }
    }
}

/// Contact details of a client, aligned by position with
/// `Ledger::available_clients`. Unknown fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub contact: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
}

/// The full payment ledger of the business.
///
/// The persisted form is one flat JSON object in which client names and
/// the index arrays (`availableClients`, `clientNumbers`, the contact
/// columns) share the top-level namespace, and inside each client object
/// `DD/MM/YYYY` date keys share the namespace with
/// `availableInvoiceNumbers`. The typed form keeps those apart; the wire
/// shape is reproduced by `to_value`/`from_value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub clients: BTreeMap<String, ClientLedger>,
    pub available_clients: Vec<String>,
    pub client_numbers: Vec<String>,
    pub contacts: Vec<ClientContact>,
}

impl Ledger {
    /// Payment history of a client, by name.
    pub fn client(&self, name: &str) -> Result<&ClientLedger> {
        self.clients.get(name).ok_or_else(|| {
            InvoiceError::NotFound(format!("Client '{}' has no ledger entries", name))
        })
    }

    /// Client number of a registered client.
    pub fn client_number_for(&self, name: &str) -> Result<&str> {
        let position = self
            .available_clients
            .iter()
            .position(|client| client == name)
            .ok_or_else(|| {
                InvoiceError::NotFound(format!("Client '{}' is not registered", name))
            })?;

        self.client_numbers
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| {
                InvoiceError::Schema(format!("Client '{}' has no client number", name))
            })
    }

    /// Name of the client carrying a client number. When a number is
    /// reused the first registered client wins.
    pub fn client_for_number(&self, number: &str) -> Result<&str> {
        self.client_numbers
            .iter()
            .position(|candidate| candidate == number)
            .and_then(|position| self.available_clients.get(position))
            .map(String::as_str)
            .ok_or_else(|| {
                InvoiceError::NotFound(format!("No client carries number {}", number))
            })
    }

    pub fn contact_for(&self, name: &str) -> Option<&ClientContact> {
        let position = self
            .available_clients
            .iter()
            .position(|client| client == name)?;
        self.contacts.get(position)
    }

    pub fn entry_count(&self) -> usize {
        self.clients.values().map(|client| client.entries.len()).sum()
    }

    /// Checks the index-array invariants and the per-entry invariants
    /// (`price_incl >= price_excl >= 0`, quantity non-negative).
    pub fn validate(&self) -> Result<()> {
        if self.available_clients.len() != self.client_numbers.len() {
            return Err(InvoiceError::Schema(format!(
                "{} registered clients against {} client numbers",
                self.available_clients.len(),
                self.client_numbers.len()
            )));
        }
        if self.contacts.len() != self.available_clients.len() {
            return Err(InvoiceError::Schema(format!(
                "{} contact records against {} registered clients",
                self.contacts.len(),
                self.available_clients.len()
            )));
        }

        for name in &self.available_clients {
            if name.is_empty() || name == NA_SENTINEL {
                return Err(InvoiceError::Schema(
                    "Registered client list contains an empty or sentinel name".to_string(),
                ));
            }
        }
        for number in &self.client_numbers {
            if number.is_empty() || number == NA_SENTINEL {
                return Err(InvoiceError::Schema(
                    "Client number list contains an empty or sentinel value".to_string(),
                ));
            }
        }

        for (name, client) in &self.clients {
            for (date, entry) in &client.entries {
                if entry.price_excl < 0.0 || entry.price_incl < entry.price_excl {
                    return Err(InvoiceError::Schema(format!(
                        "Entry {} of client '{}' has negative or inverted prices (incl {}, excl {})",
                        format_date(*date),
                        name,
                        entry.price_incl,
                        entry.price_excl
                    )));
                }
                if entry.quantity < 0.0 {
                    return Err(InvoiceError::Schema(format!(
                        "Entry {} of client '{}' has a negative quantity ({})",
                        format_date(*date),
                        name,
                        entry.quantity
                    )));
                }
            }
        }

        Ok(())
    }

    /// Renders the ledger in its persisted wire shape.
    pub fn to_value(&self) -> Result<Value> {
        let mut root = Map::new();

        for (name, client) in &self.clients {
            let mut object = Map::new();
            for (date, entry) in &client.entries {
                object.insert(format_date(*date), serde_json::to_value(entry)?);
            }
            object.insert(
                KEY_AVAILABLE_INVOICE_NUMBERS.to_string(),
                json!(client.available_invoice_numbers),
            );
            root.insert(name.clone(), Value::Object(object));
        }

        root.insert(KEY_AVAILABLE_CLIENTS.to_string(), json!(self.available_clients));
        root.insert(KEY_CLIENT_NUMBERS.to_string(), json!(self.client_numbers));

        // A contact column is written only when it holds at least one value.
        let contact_columns: [(&str, Vec<&Option<String>>); 5] = [
            (
                KEY_CLIENT_CONTACTS,
                self.contacts.iter().map(|c| &c.contact).collect(),
            ),
            (
                KEY_CLIENT_STREETS,
                self.contacts.iter().map(|c| &c.street).collect(),
            ),
            (
                KEY_CLIENT_POSTAL_CODES,
                self.contacts.iter().map(|c| &c.postal_code).collect(),
            ),
            (
                KEY_CLIENT_CITIES,
                self.contacts.iter().map(|c| &c.city).collect(),
            ),
            (
                KEY_CLIENT_EMAILS,
                self.contacts.iter().map(|c| &c.email).collect(),
            ),
        ];
        for (key, cells) in contact_columns {
            if cells.iter().any(|cell| cell.is_some()) {
                let values = cells
                    .into_iter()
                    .map(|cell| match cell {
                        Some(text) => Value::String(text.clone()),
                        None => Value::Null,
                    })
                    .collect();
                root.insert(key.to_string(), Value::Array(values));
            }
        }

        Ok(Value::Object(root))
    }

    /// Parses a persisted wire-shape blob back into a typed ledger.
    pub fn from_value(value: &Value) -> Result<Ledger> {
        let root = value.as_object().ok_or_else(|| {
            InvoiceError::Schema("Persisted ledger is not a JSON object".to_string())
        })?;

        let mut ledger = Ledger::default();
        for (key, entry) in root {
            match key.as_str() {
                KEY_AVAILABLE_CLIENTS => {
                    ledger.available_clients = string_array(key, entry)?;
                }
                KEY_CLIENT_NUMBERS => {
                    ledger.client_numbers = string_array(key, entry)?;
                }
                KEY_CLIENT_CONTACTS | KEY_CLIENT_STREETS | KEY_CLIENT_POSTAL_CODES
                | KEY_CLIENT_CITIES | KEY_CLIENT_EMAILS => {}
                _ => {
                    ledger
                        .clients
                        .insert(key.clone(), client_from_value(key, entry)?);
                }
            }
        }

        let expected = ledger.available_clients.len();
        let mut contact = optional_string_array(root, KEY_CLIENT_CONTACTS, expected)?.into_iter();
        let mut street = optional_string_array(root, KEY_CLIENT_STREETS, expected)?.into_iter();
        let mut postal_code =
            optional_string_array(root, KEY_CLIENT_POSTAL_CODES, expected)?.into_iter();
        let mut city = optional_string_array(root, KEY_CLIENT_CITIES, expected)?.into_iter();
        let mut email = optional_string_array(root, KEY_CLIENT_EMAILS, expected)?.into_iter();
        ledger.contacts = (0..expected)
            .map(|_| ClientContact {
                contact: contact.next().flatten(),
                street: street.next().flatten(),
                postal_code: postal_code.next().flatten(),
                city: city.next().flatten(),
                email: email.next().flatten(),
            })
            .collect();

        ledger.validate()?;
        Ok(ledger)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Ledger> {
        let value: Value = serde_json::from_str(raw)?;
        Ledger::from_value(&value)
    }
}

impl Serialize for Ledger {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ledger::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn string_array(key: &str, value: &Value) -> Result<Vec<String>> {
    let cells = value
        .as_array()
        .ok_or_else(|| InvoiceError::Schema(format!("'{}' is not an array", key)))?;

    cells
        .iter()
        .map(|cell| {
            cell.as_str().map(str::to_string).ok_or_else(|| {
                InvoiceError::Schema(format!("'{}' holds a non-string value: {}", key, cell))
            })
        })
        .collect()
}

fn optional_string_array(
    root: &Map<String, Value>,
    key: &str,
    expected: usize,
) -> Result<Vec<Option<String>>> {
    let value = match root.get(key) {
        Some(value) => value,
        None => return Ok(vec![None; expected]),
    };

    let cells = value
        .as_array()
        .ok_or_else(|| InvoiceError::Schema(format!("'{}' is not an array", key)))?;
    if cells.len() != expected {
        return Err(InvoiceError::Schema(format!(
            "'{}' holds {} values for {} registered clients",
            key,
            cells.len(),
            expected
        )));
    }

    cells
        .iter()
        .map(|cell| match cell {
            Value::Null => Ok(None),
            Value::String(text) if text.is_empty() || text == NA_SENTINEL => Ok(None),
            Value::String(text) => Ok(Some(text.clone())),
            other => Err(InvoiceError::Schema(format!(
                "'{}' holds a non-string value: {}",
                key, other
            ))),
        })
        .collect()
}

fn client_from_value(name: &str, value: &Value) -> Result<ClientLedger> {
    let object = value.as_object().ok_or_else(|| {
        InvoiceError::Schema(format!("Client '{}' is not a JSON object", name))
    })?;

    let mut client = ClientLedger::default();
    for (key, entry) in object {
        if key == KEY_AVAILABLE_INVOICE_NUMBERS {
            client.available_invoice_numbers = string_array(key, entry)?;
            continue;
        }

        let date = parse_date(key).map_err(|_| {
            InvoiceError::Schema(format!(
                "Client '{}' has an unparseable date key '{}'",
                name, key
            ))
        })?;
        let parsed: LedgerEntry = serde_json::from_value(entry.clone()).map_err(|err| {
            InvoiceError::Schema(format!("Entry {} of client '{}': {}", key, name, err))
        })?;
        client.entries.insert(date, parsed);
    }

    Ok(client)
}
