use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use log::error;
use rust_decimal::Decimal;
use crate::ledger::LedgerStore;
use crate::transaction::{Category, Transaction};

/// Callback that plots a query result.
pub type ChartRenderer = Box<dyn FnMut(&[Transaction]) -> anyhow::Result<()>>;

/// Raised when the input stream ends in the middle of a session.
#[derive(Debug)]
pub struct InputClosed;

impl fmt::Display for InputClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input closed")
    }
}

impl std::error::Error for InputClosed {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Add,
    Query,
    Exit,
}

impl FromStr for MenuChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MenuChoice::Add),
            "2" => Ok(MenuChoice::Query),
            "3" => Ok(MenuChoice::Exit),
            other => Err(anyhow!("invalid menu choice '{}'", other)),
        }
    }
}

/// Interactive menu loop over line-based input and output.
pub struct Console<R, W> {
    store: LedgerStore,
    input: R,
    output: W,
    chart: ChartRenderer,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(store: LedgerStore, input: R, output: W, chart: ChartRenderer) -> Self {
        Console { store, input, output, chart }
    }

    /// Runs the menu until the user exits or input ends.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.store.initialize()?;
        loop {
            writeln!(self.output, "1. Add transaction")?;
            writeln!(self.output, "2. View transaction summary within a date range")?;
            writeln!(self.output, "3. Exit")?;
            writeln!(self.output, "\n")?;
            let Some(answer) = self.prompt("Choose number 1, 2, or 3: ")? else {
                return Ok(());
            };

            let res = match answer.parse::<MenuChoice>() {
                Ok(MenuChoice::Add) => self.add_transaction(),
                Ok(MenuChoice::Query) => self.view_summary(),
                Ok(MenuChoice::Exit) => {
                    writeln!(self.output, "Exiting!")?;
                    return Ok(());
                }
                Err(_) => {
                    writeln!(self.output, "Invalid choice. Enter 1, 2 or 3.")?;
                    continue;
                }
            };

            if let Err(err) = res {
                if err.is::<InputClosed>() {
                    return Ok(());
                }
                error!("{:#}", err);
                writeln!(self.output, "Error: {:#}", err)?;
            }
        }
    }

    fn add_transaction(&mut self) -> anyhow::Result<()> {
        let date = self.prompt_date(
            "Enter the transaction date (dd-mm-yyyy) or press enter for today's date: ",
            Some(Local::now().date_naive()),
        )?;
        let amount = self.prompt_amount()?;
        let category = self.prompt_category()?;
        let description = self.require("Enter a description (optional): ")?;

        self.store.add_entry(&Transaction { date, amount, category, description })?;
        writeln!(self.output, "Entry added successfully!")?;
        Ok(())
    }

    fn view_summary(&mut self) -> anyhow::Result<()> {
        let start = self.prompt_date("Enter the start date (dd-mm-yyyy): ", None)?;
        let end = self.prompt_date("Enter the end date (dd-mm-yyyy): ", None)?;

        let result = self.store.query(start, end)?;
        write!(self.output, "{}", result)?;

        if !result.is_empty() && self.prompt_yes_no("Do you want to see a plot? (y/n): ")? {
            (self.chart)(&result.transactions)?;
        }
        Ok(())
    }

    /// Reads a date in the ledger format. A blank answer yields `default`
    /// when one is given.
    fn prompt_date(&mut self, message: &str, default: Option<NaiveDate>) -> anyhow::Result<NaiveDate> {
        loop {
            let answer = self.require(message)?;
            if answer.is_empty() {
                if let Some(date) = default {
                    return Ok(date);
                }
            }
            match NaiveDate::parse_from_str(&answer, &self.store.config().date_format) {
                Ok(date) => return Ok(date),
                Err(_) => writeln!(self.output, "Invalid date format. Please enter the date in dd-mm-yyyy format")?,
            }
        }
    }

    fn prompt_amount(&mut self) -> anyhow::Result<Decimal> {
        loop {
            let answer = self.require("Enter the amount: ")?;
            match Decimal::from_str(&answer) {
                Ok(amount) if amount > Decimal::ZERO => return Ok(amount),
                Ok(_) => writeln!(self.output, "Amount must be a positive non-zero value.")?,
                Err(_) => writeln!(self.output, "Invalid amount. Please enter a number.")?,
            }
        }
    }

    fn prompt_category(&mut self) -> anyhow::Result<Category> {
        loop {
            let answer = self.require("Enter the category ('Income' or 'Expense'): ")?;
            match answer.parse() {
                Ok(category) => return Ok(category),
                Err(_) => writeln!(self.output, "Invalid category. Please enter 'Income' or 'Expense'.")?,
            }
        }
    }

    fn prompt_yes_no(&mut self, message: &str) -> anyhow::Result<bool> {
        loop {
            let answer = self.require(message)?.to_lowercase();
            match answer.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer 'y' or 'n'.")?,
            }
        }
    }

    fn require(&mut self, message: &str) -> anyhow::Result<String> {
        self.prompt(message)?.ok_or_else(|| InputClosed.into())
    }

    /// Writes `message` and reads one trimmed line, or `None` at end of input.
    fn prompt(&mut self, message: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
