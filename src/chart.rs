use std::collections::BTreeMap;
use std::io;
use anyhow::Context;
use chrono::NaiveDate;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Constraint,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame, Terminal,
};
use log::warn;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use crate::transaction::{Category, Transaction};

const LABEL_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
}

/// Sums income and expense per calendar day, with one entry for every day
/// from the earliest to the latest transaction. Days without transactions
/// are zero.
pub fn daily_totals(transactions: &[Transaction]) -> anyhow::Result<Vec<DailyTotal>> {
    let mut by_day: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for transaction in transactions {
        let (income, expense) = by_day.entry(transaction.date).or_default();
        let total = match transaction.category {
            Category::Income => income,
            Category::Expense => expense,
        };
        *total = total.checked_add(transaction.amount)
            .with_context(|| format!("{} total for {} overflows", transaction.category.to_string().to_lowercase(), transaction.date))?;
    }

    let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
        return Ok(Vec::new());
    };

    Ok(first.iter_days()
        .take_while(|date| *date <= last)
        .map(|date| {
            let (income, expense) = by_day.get(&date).copied().unwrap_or_default();
            DailyTotal { date, income, expense }
        })
        .collect())
}

/// Runs the wrapped teardown when dropped, so every exit path after terminal
/// setup restores the terminal.
struct Restore<F: FnMut()>(F);

impl<F: FnMut()> Drop for Restore<F> {
    fn drop(&mut self) {
        (self.0)();
    }
}

/// Shows the daily income and expense series full screen until a key is
/// pressed.
pub fn render(transactions: &[Transaction]) -> anyhow::Result<()> {
    let days = daily_totals(transactions)?;
    if days.is_empty() {
        return Ok(());
    }

    enable_raw_mode()?;
    let _restore = Restore(|| {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
            warn!("Failed to leave alternate screen: {}", e);
        }
    });

    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    show(&mut terminal, &days)
}

fn show<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, days: &[DailyTotal]) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| draw(f, days))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

fn draw(f: &mut Frame, days: &[DailyTotal]) {
    let income: Vec<(f64, f64)> = days.iter()
        .enumerate()
        .map(|(i, day)| (i as f64, day.income.to_f64().unwrap_or(0.0)))
        .collect();
    let expense: Vec<(f64, f64)> = days.iter()
        .enumerate()
        .map(|(i, day)| (i as f64, day.expense.to_f64().unwrap_or(0.0)))
        .collect();

    let x_max = (days.len().saturating_sub(1) as f64).max(1.0);
    let y_max = income.iter()
        .chain(&expense)
        .map(|&(_, y)| y)
        .fold(0.0, f64::max)
        .max(1.0);

    let x_labels: Vec<Span> = x_label_dates(days)
        .into_iter()
        .map(|date| Span::raw(date.format(LABEL_FORMAT).to_string()))
        .collect();
    let y_labels = vec![
        Span::raw("0.00"),
        Span::raw(format!("{:.2}", y_max / 2.0)),
        Span::raw(format!("{:.2}", y_max)),
    ];

    let datasets = vec![
        Dataset::default()
            .name("Income")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&income),
        Dataset::default()
            .name("Expense")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&expense),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().title("Daily totals (press any key to return)").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Amount")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, y_max])
                .labels(y_labels),
        )
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, f.size());
}

/// First, middle and last day of the span, without repeats.
fn x_label_dates(days: &[DailyTotal]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    if days.is_empty() {
        return dates;
    }
    for index in [0, days.len() / 2, days.len() - 1] {
        if dates.last() != Some(&days[index].date) {
            dates.push(days[index].date);
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::str::FromStr;
    use ratatui::backend::TestBackend;

    fn date(day: u32, month: u32, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn transaction(date: NaiveDate, amount: i64, category: Category) -> Transaction {
        Transaction {
            date,
            amount: Decimal::new(amount, 0),
            category,
            description: String::new(),
        }
    }

    #[test]
    fn test_daily_totals_empty() {
        assert!(daily_totals(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_daily_totals_fills_missing_days() {
        let transactions = vec![
            transaction(date(4, 3, 2024), 40, Category::Expense),
            transaction(date(1, 3, 2024), 100, Category::Income),
            transaction(date(4, 3, 2024), 10, Category::Income),
            transaction(date(4, 3, 2024), 5, Category::Expense),
        ];

        let days = daily_totals(&transactions).unwrap();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], DailyTotal { date: date(1, 3, 2024), income: Decimal::new(100, 0), expense: Decimal::ZERO });
        assert_eq!(days[1], DailyTotal { date: date(2, 3, 2024), income: Decimal::ZERO, expense: Decimal::ZERO });
        assert_eq!(days[2], DailyTotal { date: date(3, 3, 2024), income: Decimal::ZERO, expense: Decimal::ZERO });
        assert_eq!(days[3], DailyTotal { date: date(4, 3, 2024), income: Decimal::new(10, 0), expense: Decimal::new(45, 0) });
    }

    #[test]
    fn test_daily_totals_overflow_is_an_error() {
        let big = Decimal::from_str("50000000000000000000000000000").unwrap();
        let mut first = transaction(date(1, 3, 2024), 0, Category::Expense);
        first.amount = big;
        let second = first.clone();

        let err = daily_totals(&[first, second]).unwrap_err();
        assert_eq!(err.to_string(), "expense total for 2024-03-01 overflows");
    }

    #[test]
    fn test_restore_runs_on_early_return() {
        fn fails_after_setup(restored: &Cell<u32>) -> anyhow::Result<()> {
            let _restore = Restore(|| restored.set(restored.get() + 1));
            "not a number".parse::<u32>()?;
            Ok(())
        }

        let restored = Cell::new(0);
        assert!(fails_after_setup(&restored).is_err());
        assert_eq!(restored.get(), 1);
    }

    #[test]
    fn test_daily_totals_span_crosses_month_end() {
        let transactions = vec![
            transaction(date(28, 2, 2024), 1, Category::Income),
            transaction(date(2, 3, 2024), 1, Category::Expense),
        ];

        let days: Vec<NaiveDate> = daily_totals(&transactions).unwrap().iter().map(|d| d.date).collect();
        assert_eq!(days, vec![date(28, 2, 2024), date(29, 2, 2024), date(1, 3, 2024), date(2, 3, 2024)]);
    }

    #[test]
    fn test_x_label_dates_single_day() {
        let days = daily_totals(&[transaction(date(1, 3, 2024), 1, Category::Income)]).unwrap();
        assert_eq!(x_label_dates(&days), vec![date(1, 3, 2024)]);
    }

    #[test]
    fn test_draw_shows_axes_and_legend() {
        let transactions = vec![
            transaction(date(1, 3, 2024), 100, Category::Income),
            transaction(date(3, 3, 2024), 40, Category::Expense),
        ];
        let days = daily_totals(&transactions).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &days)).unwrap();

        let content: String = terminal.backend().buffer().content().iter().map(|cell| cell.symbol()).collect();
        assert!(content.contains("Income"));
        assert!(content.contains("Expense"));
        assert!(content.contains("Date"));
        assert!(content.contains("Amount"));
        assert!(content.contains("01-03-2024"));
        assert!(content.contains("03-03-2024"));
    }
}
