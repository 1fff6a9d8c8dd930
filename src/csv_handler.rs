use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs::File;

/// Fixed column order of the ledger file.
pub const COLUMNS: [&str; 4] = ["date", "amount", "category", "description"];

/// One ledger row exactly as it appears on disk, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: String,
    pub amount: String,
    pub category: String,
    pub description: String,
}

/// Writes the header row to a fresh ledger file.
pub fn write_header(file: File) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(COLUMNS)?;
    writer.flush()?;
    Ok(())
}

/// Reads every row of a ledger file. The header must match `COLUMNS` and any
/// malformed record fails the whole read. Field values are returned untrimmed.
pub fn read_rows(file: File) -> anyhow::Result<Vec<LedgerRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = reader.headers()?;
    if !headers.iter().eq(COLUMNS) {
        bail!("unexpected ledger header '{}', expected '{}'", headers.iter().collect::<Vec<_>>().join(","), COLUMNS.join(","));
    }

    reader.deserialize()
        .enumerate()
        .map(|(index, result)| result.with_context(|| format!("malformed record {}", index + 1)))
        .collect()
}

/// Appends a single row to the end of a ledger file opened in append mode.
pub fn append_row(file: File, row: &LedgerRow) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn row(date: &str, amount: &str, category: &str, description: &str) -> LedgerRow {
        LedgerRow {
            date: date.to_string(),
            amount: amount.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        write_header(File::create(&path).unwrap()).unwrap();
        append_row(OpenOptions::new().append(true).open(&path).unwrap(), &row("01-03-2024", "100.00", "Income", "salary")).unwrap();
        append_row(OpenOptions::new().append(true).open(&path).unwrap(), &row("02-03-2024", "40.00", "Expense", "rent, utilities")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "date,amount,category,description\n01-03-2024,100.00,Income,salary\n02-03-2024,40.00,Expense,\"rent, utilities\"\n");

        let rows = read_rows(File::open(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row("02-03-2024", "40.00", "Expense", "rent, utilities"));
    }

    #[test]
    fn test_header_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"date,amount,category,description\n").unwrap();

        let rows = read_rows(file.reopen().unwrap()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_description() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"date,amount,category,description\n05-01-2024,12.5,Expense,\n").unwrap();

        let rows = read_rows(file.reopen().unwrap()).unwrap();
        assert_eq!(rows, vec![row("05-01-2024", "12.5", "Expense", "")]);
    }

    #[test]
    fn test_wrong_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"type,client,tx,amount\ndeposit,1,1,100.0\n").unwrap();

        let err = read_rows(file.reopen().unwrap()).unwrap_err();
        assert!(err.to_string().contains("unexpected ledger header"));
    }

    #[test]
    fn test_missing_field_fails_whole_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"date,amount,category,description\n01-03-2024,1,Income,ok\n02-03-2024,2\n").unwrap();

        let err = read_rows(file.reopen().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "malformed record 2");
    }

    #[test]
    fn test_fields_keep_surrounding_spaces() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b" date , amount ,category,description\n01-03-2024, 7 ,Income,  padded  \n").unwrap();

        let rows = read_rows(file.reopen().unwrap()).unwrap();
        assert_eq!(rows, vec![row("01-03-2024", " 7 ", "Income", "  padded  ")]);
    }
}
