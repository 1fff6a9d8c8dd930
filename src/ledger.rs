use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use anyhow::Context;
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use crate::csv_handler;
use crate::transaction::{Category, Transaction};

/// Environment variable that overrides the ledger file location.
pub const LEDGER_FILE_ENV: &str = "FINANCE_LEDGER_FILE";

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub date_format: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            path: PathBuf::from("finance_data.csv"),
            date_format: "%d-%m-%Y".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let mut config = LedgerConfig::default();
        if let Some(path) = std::env::var_os(LEDGER_FILE_ENV) {
            config.path = PathBuf::from(path);
        }
        config
    }
}

/// Income and expense totals over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub income: Decimal,
    pub expense: Decimal,
    balance: Decimal,
}

impl Summary {
    /// Fails instead of panicking when a total leaves the `Decimal` range.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> anyhow::Result<Self> {
        let mut income = Decimal::ZERO;
        let mut expense = Decimal::ZERO;
        for transaction in transactions {
            let total = match transaction.category {
                Category::Income => &mut income,
                Category::Expense => &mut expense,
            };
            *total = total.checked_add(transaction.amount)
                .with_context(|| format!("{} total overflows", transaction.category.to_string().to_lowercase()))?;
        }
        let balance = income.checked_sub(expense)
            .context("balance overflows")?;
        Ok(Summary { income, expense, balance })
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }
}

#[derive(Debug)]
pub struct QueryResult {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub transactions: Vec<Transaction>,
    pub summary: Summary,
    date_format: String,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No transaction found in the given date range");
        }

        writeln!(f, "Transactions from {} to {}", self.start.format(&self.date_format), self.end.format(&self.date_format))?;

        let dates: Vec<String> = self.transactions.iter()
            .map(|t| t.date.format(&self.date_format).to_string())
            .collect();
        let amounts: Vec<String> = self.transactions.iter()
            .map(|t| t.amount.to_string())
            .collect();
        let date_width = dates.iter().map(String::len).chain([4]).max().unwrap_or(4);
        let amount_width = amounts.iter().map(String::len).chain([6]).max().unwrap_or(6);
        let description_width = self.transactions.iter()
            .map(|t| t.description.chars().count())
            .chain([11])
            .max()
            .unwrap_or(11);

        writeln!(f, "{:>date_width$} {:>amount_width$} {:>8} {:>description_width$}", "date", "amount", "category", "description")?;
        for ((transaction, date), amount) in self.transactions.iter().zip(&dates).zip(&amounts) {
            writeln!(f, "{:>date_width$} {:>amount_width$} {:>8} {:>description_width$}", date, amount, transaction.category, transaction.description)?;
        }

        writeln!(f)?;
        writeln!(f, "Summary")?;
        writeln!(f, "Total income: €{:.2}", self.summary.income)?;
        writeln!(f, "Total expense: €{:.2}", self.summary.expense)?;
        writeln!(f, "Remaining balance: €{:.2}", self.summary.balance())
    }
}

/// Append-only store over a single CSV ledger file. Each operation opens and
/// closes the file; there is no locking between concurrent writers.
#[derive(Debug)]
pub struct LedgerStore {
    config: LedgerConfig,
}

impl LedgerStore {
    pub fn new(config: LedgerConfig) -> Self {
        LedgerStore { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Creates the ledger file with its header if it does not exist yet.
    pub fn initialize(&self) -> anyhow::Result<()> {
        let path = &self.config.path;
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.len() > 0 => return Ok(()),
            Ok(_) => warn!("Ledger file {} is empty. Writing header.", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => debug!("Creating ledger file {}", path.display()),
            Err(e) => return Err(e).with_context(|| format!("failed to inspect {}", path.display())),
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        csv_handler::write_header(file)
    }

    pub fn add_entry(&self, transaction: &Transaction) -> anyhow::Result<()> {
        self.initialize()?;
        let path = &self.config.path;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {} for writing", path.display()))?;
        csv_handler::append_row(file, &transaction.to_row(&self.config.date_format))?;
        debug!("Appended {} {} on {} to {}", transaction.category, transaction.amount, transaction.date, path.display());
        Ok(())
    }

    /// Loads and parses every transaction in file order. A single malformed
    /// row fails the whole load.
    pub fn load(&self) -> anyhow::Result<Vec<Transaction>> {
        let path = &self.config.path;
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let rows = csv_handler::read_rows(file)
            .with_context(|| format!("failed to read {}", path.display()))?;
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| {
                Transaction::from_row(row, &self.config.date_format)
                    .with_context(|| format!("malformed record {} in {}", index + 1, path.display()))
            })
            .collect()
    }

    /// Returns every transaction dated within `start..=end`, in file order.
    pub fn query(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<QueryResult> {
        self.initialize()?;
        let all = self.load()?;
        let total = all.len();
        let transactions: Vec<Transaction> = all.into_iter()
            .filter(|t| start <= t.date && t.date <= end)
            .collect();
        debug!("Query {} to {} matched {} of {} transactions", start, end, transactions.len(), total);

        let summary = Summary::from_transactions(&transactions)?;
        Ok(QueryResult {
            start,
            end,
            transactions,
            summary,
            date_format: self.config.date_format.clone(),
        })
    }
}
