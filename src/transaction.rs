use std::fmt;
use std::str::FromStr;
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use crate::csv_handler::LedgerRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Income,
    Expense,
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("income") {
            Ok(Category::Income)
        } else if s.eq_ignore_ascii_case("expense") {
            Ok(Category::Expense)
        } else {
            Err(anyhow!("unknown category '{}', expected 'Income' or 'Expense'", s))
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so table columns can align category names
        match self {
            Category::Income => f.pad("Income"),
            Category::Expense => f.pad("Expense"),
        }
    }
}

/// A single ledger entry. Rows carry no identifier; two identical entries are
/// two distinct transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: Category,
    pub description: String,
}

impl Transaction {
    /// Converts a raw CSV row, parsing the date with `date_format`.
    pub fn from_row(row: LedgerRow, date_format: &str) -> anyhow::Result<Self> {
        let date = NaiveDate::parse_from_str(row.date.trim(), date_format)
            .with_context(|| format!("invalid date '{}'", row.date))?;
        let amount = Decimal::from_str(row.amount.trim())
            .with_context(|| format!("invalid amount '{}'", row.amount))?;
        let category = row.category.parse()?;
        Ok(Transaction {
            date,
            amount,
            category,
            description: row.description,
        })
    }

    pub fn to_row(&self, date_format: &str) -> LedgerRow {
        LedgerRow {
            date: self.date.format(date_format).to_string(),
            amount: self.amount.to_string(),
            category: self.category.to_string(),
            description: self.description.clone(),
        }
    }
}
