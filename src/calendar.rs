use crate::error::{InvoiceError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Dutch month names, indexed by month number minus one.
pub const MONTH_NAMES: [&str; 12] = [
    "januari",
    "februari",
    "maart",
    "april",
    "mei",
    "juni",
    "juli",
    "augustus",
    "september",
    "oktober",
    "november",
    "december",
];

/// First and last invoicing year offered to the form.
pub const FIRST_INVOICE_YEAR: i32 = 2024;
pub const LAST_INVOICE_YEAR: i32 = 2029;

/// One calendar month of an invoicing year.
///
/// `number` is 1-based: period 1 is January, period 12 is December.
/// The label is the human-readable range shown on the form and printed
/// on invoices, e.g. "1 februari - 29 februari" in a leap year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePeriod {
    pub number: u32,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl InvoicePeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

/// Builds the twelve invoicing periods of a year, in calendar order.
pub fn generate_periods(year: i32) -> Vec<InvoicePeriod> {
    (1..=12)
        .map(|month| {
            let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            let end = last_day_of_month(year, month);
            let name = MONTH_NAMES[(month - 1) as usize];

            InvoicePeriod {
                number: month,
                label: format!("1 {} - {} {}", name, end.day(), name),
                start,
                end,
            }
        })
        .collect()
}

/// Labels for the period dropdown, in calendar order.
pub fn period_labels(year: i32) -> Vec<String> {
    generate_periods(year)
        .into_iter()
        .map(|period| period.label)
        .collect()
}

/// Resolves a period label back to its 1-based period number.
pub fn period_index(year: i32, label: &str) -> Result<u32> {
    check_year(year)?;
    generate_periods(year)
        .into_iter()
        .find(|period| period.label == label)
        .map(|period| period.number)
        .ok_or_else(|| {
            InvoiceError::NotFound(format!("Period '{}' is not a period of {}", label, year))
        })
}

/// Date window of a 1-based period number.
pub fn period_date_range(number: u32, year: i32) -> Result<(NaiveDate, NaiveDate)> {
    check_year(year)?;
    if !(1..=12).contains(&number) {
        return Err(InvoiceError::NotFound(format!(
            "Period number {} is outside 1..=12",
            number
        )));
    }

    let start = NaiveDate::from_ymd_opt(year, number, 1).unwrap();
    Ok((start, last_day_of_month(year, number)))
}

fn check_year(year: i32) -> Result<()> {
    if !(1..=9999).contains(&year) {
        return Err(InvoiceError::NotFound(format!(
            "Year {} is outside 1..=9999",
            year
        )));
    }
    Ok(())
}

pub fn period_label(number: u32, year: i32) -> Result<String> {
    let (_, end) = period_date_range(number, year)?;
    let name = MONTH_NAMES[(number - 1) as usize];
    Ok(format!("1 {} - {} {}", name, end.day(), name))
}

/// Years offered for invoicing, oldest first.
pub fn invoice_years() -> Vec<i32> {
    (FIRST_INVOICE_YEAR..=LAST_INVOICE_YEAR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_periods_covers_year() {
        let periods = generate_periods(2024);
        assert_eq!(periods.len(), 12);

        assert_eq!(
            periods[0].start,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(
            periods[11].end,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );

        // Consecutive periods share no gap and no overlap.
        for window in periods.windows(2) {
            assert_eq!(
                window[0].end.checked_add_days(Days::new(1)).unwrap(),
                window[1].start
            );
        }
    }

    #[test]
    fn test_period_labels_respect_leap_years() {
        let leap = generate_periods(2024);
        assert_eq!(leap[1].label, "1 februari - 29 februari");

        let common = generate_periods(2023);
        assert_eq!(common[1].label, "1 februari - 28 februari");
        assert_eq!(common[0].label, "1 januari - 31 januari");
        assert_eq!(common[11].label, "1 december - 31 december");
    }

    #[test]
    fn test_period_index_round_trip() {
        for period in generate_periods(2025) {
            assert_eq!(period_index(2025, &period.label).unwrap(), period.number);
        }
    }

    #[test]
    fn test_period_index_unknown_label() {
        let err = period_index(2024, "1 january - 31 january").unwrap_err();
        assert!(err.to_string().contains("not a period"));
    }

    #[test]
    fn test_period_date_range() {
        let (start, end) = period_date_range(2, 2024).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        assert!(period_date_range(0, 2024).is_err());
        assert!(period_date_range(13, 2024).is_err());
    }

    #[test]
    fn test_rejects_years_outside_calendar_range() {
        assert!(period_index(0, "1 maart - 31 maart").is_err());
        assert!(period_index(10_000, "1 maart - 31 maart").is_err());
        assert!(period_index(i32::MAX, "1 maart - 31 maart").is_err());

        assert!(period_date_range(3, 0).is_err());
        assert!(period_date_range(3, -1).is_err());
        assert!(period_date_range(3, i32::MAX).is_err());

        assert!(period_date_range(3, 1).is_ok());
        assert!(period_date_range(3, 9999).is_ok());
    }

    #[test]
    fn test_period_label_matches_generated() {
        for period in generate_periods(2024) {
            assert_eq!(period_label(period.number, 2024).unwrap(), period.label);
        }
    }

    #[test]
    fn test_contains() {
        let periods = generate_periods(2024);
        let march = &periods[2];

        assert!(march.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(march.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!march.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert!(!march.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    }

    #[test]
    fn test_invoice_years() {
        assert_eq!(invoice_years(), vec![2024, 2025, 2026, 2027, 2028, 2029]);
    }
}
