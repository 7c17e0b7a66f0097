use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::calendar;
use crate::error::{InvoiceError, Result};

/// A composite invoice number.
///
/// The encoded form is `{client}.{index}.{period:02}.{year_suffix:02}`,
/// e.g. `7.1.03.24` for client 7's first invoice of March 2024. Client
/// number and index are opaque tokens taken from the sheet and the form;
/// period and year suffix are always two digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub client_number: String,
    pub index: String,
    pub period_number: u32,
    pub year: i32,
}

impl InvoiceNumber {
    pub fn new(client_number: &str, index: &str, period_number: u32, year: i32) -> Result<Self> {
        for (token, what) in [(client_number, "client number"), (index, "index")] {
            if token.is_empty() || token.contains('.') {
                return Err(InvoiceError::Format(format!(
                    "Invalid {} token '{}': must be non-empty and dot-free",
                    what, token
                )));
            }
        }
        if !(1..=12).contains(&period_number) {
            return Err(InvoiceError::Format(format!(
                "Period number {} is outside 1..=12",
                period_number
            )));
        }
        if !(2000..=2099).contains(&year) {
            return Err(InvoiceError::Format(format!(
                "Year {} cannot be encoded in a two-digit suffix",
                year
            )));
        }

        Ok(InvoiceNumber {
            client_number: client_number.to_string(),
            index: index.to_string(),
            period_number,
            year,
        })
    }

    /// Builds a number from a period label as shown on the form.
    pub fn from_period_label(
        client_number: &str,
        index: &str,
        period_label: &str,
        year: i32,
    ) -> Result<Self> {
        let period_number = calendar::period_index(year, period_label)?;
        InvoiceNumber::new(client_number, index, period_number, year)
    }

    /// Parses an encoded invoice number back into its components.
    pub fn decode(raw: &str) -> Result<Self> {
        let tokens: Vec<&str> = raw.trim().split('.').collect();
        if tokens.len() != 4 {
            return Err(InvoiceError::Format(format!(
                "Invalid invoice number '{}'. Expected client.index.period.year",
                raw
            )));
        }

        let period_number: u32 = tokens[2].parse().map_err(|_| {
            InvoiceError::Format(format!(
                "Invalid period number '{}' in invoice number '{}'",
                tokens[2], raw
            ))
        })?;
        let year_suffix: u32 = tokens[3].parse().map_err(|_| {
            InvoiceError::Format(format!(
                "Invalid year suffix '{}' in invoice number '{}'",
                tokens[3], raw
            ))
        })?;
        if year_suffix > 99 {
            return Err(InvoiceError::Format(format!(
                "Year suffix {} in invoice number '{}' is outside 0..=99",
                year_suffix, raw
            )));
        }

        InvoiceNumber::new(tokens[0], tokens[1], period_number, 2000 + year_suffix as i32)
    }

    /// Label of the period this number was issued for.
    pub fn period_label(&self) -> Result<String> {
        calendar::period_label(self.period_number, self.year)
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{:02}.{:02}",
            self.client_number,
            self.index,
            self.period_number,
            self.year - 2000
        )
    }
}

impl Serialize for InvoiceNumber {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InvoiceNumber {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        InvoiceNumber::decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Client number component of an encoded invoice number.
pub fn client_number_of(raw: &str) -> Result<String> {
    Ok(InvoiceNumber::decode(raw)?.client_number)
}
