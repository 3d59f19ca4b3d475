use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::error::{PrecoError, Result};

/// A single table cell. Numbers keep their unformatted value; formatting for
/// display happens in the presenter, never here.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(n) = trimmed.parse::<f64>() {
            Cell::Number(n)
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Unformatted string form, used for filtering and persistence.
    pub fn string_form(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Empty => String::new(),
        }
    }
}

/// Writes a float without a trailing `.0` for whole values, so `10.0` rows
/// round-trip through CSV as `10`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// The in-memory table. Columns are discovered from the source header; there
/// is no fixed schema. A dataset is replaced wholesale on refresh, never
/// merged with its predecessor.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive, whitespace-trimmed column lookup. Server exports
    /// sometimes carry trailing spaces in header names.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_uppercase();
        self.columns
            .iter()
            .position(|c| c.trim().to_uppercase() == wanted)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Sorted distinct non-empty values of one column.
    pub fn distinct_values(&self, col: usize) -> Vec<String> {
        let mut values: Vec<String> = self
            .rows
            .iter()
            .filter_map(|row| row.get(col))
            .map(Cell::string_form)
            .filter(|v| !v.is_empty())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns: Vec<String> = csv
            .headers()
            .map_err(|e| PrecoError::Validation(e.to_string()))?
            .iter()
            .map(String::from)
            .collect();
        if columns.is_empty() {
            return Err(PrecoError::Validation("data file has no header".into()));
        }

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record.map_err(|e| PrecoError::Validation(e.to_string()))?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let mut row: Vec<Cell> = record.iter().map(Cell::parse).collect();
            row.resize(columns.len(), Cell::Empty);
            rows.push(row);
        }

        debug!("Parsed dataset: {} columns, {} rows", columns.len(), rows.len());
        Ok(Self { columns, rows })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }

    /// Cheap well-formedness check on a persisted file: the header and the
    /// first record must parse. Used to validate a fresh download before the
    /// fetch attempt is declared a success.
    pub fn validate_csv_file(path: &Path) -> Result<()> {
        let file = std::fs::File::open(path)?;
        let mut csv = ReaderBuilder::new().flexible(true).from_reader(file);
        csv.headers()
            .map_err(|e| PrecoError::Validation(e.to_string()))?;
        if let Some(record) = csv.records().next() {
            record.map_err(|e| PrecoError::Validation(e.to_string()))?;
        }
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            let record: Vec<String> = row.iter().map(Cell::string_form).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The fixed demonstration dataset used when neither the server nor the
    /// local cache can provide data.
    pub fn placeholder() -> Self {
        let text = |s: &str| Cell::Text(s.to_string());
        Self {
            columns: vec![
                "Código".to_string(),
                "Produto".to_string(),
                "Preço".to_string(),
                "Estoque".to_string(),
                "Categoria".to_string(),
            ],
            rows: vec![
                vec![
                    Cell::Number(1.0),
                    text("Produto A"),
                    Cell::Number(100.0),
                    Cell::Number(10.0),
                    text("Categoria 1"),
                ],
                vec![
                    Cell::Number(2.0),
                    text("Produto B"),
                    Cell::Number(200.0),
                    Cell::Number(20.0),
                    text("Categoria 2"),
                ],
                vec![
                    Cell::Number(3.0),
                    text("Produto C"),
                    Cell::Number(300.0),
                    Cell::Number(30.0),
                    text("Categoria 3"),
                ],
            ],
        }
    }
}

impl From<csv::Error> for PrecoError {
    fn from(e: csv::Error) -> Self {
        PrecoError::Validation(e.to_string())
    }
}

/// Extract a numeric price from a cell. Text values keep only digits and the
/// decimal point before parsing, so "R$ 10.50" and "10.50" both work.
pub fn parse_price(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        Cell::Empty => None,
    }
}

/// Format a value as Brazilian currency: period as the thousands separator,
/// comma as the decimal separator. `1234.5` becomes `R$ 1.234,50`.
pub fn format_brl(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("R$ {sign}{grouped},{frac:02}")
}
