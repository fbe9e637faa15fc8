//! Portfolio exports (CSV or spreadsheet) into a [`PortfolioSnapshot`].
//!
//! Broker exports often carry a block of account metadata above the real table; callers pass
//! how many of those leading rows to drop.

use crate::domain::portfolio::{Holding, PortfolioSnapshot, Scalar};
use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Leading rows in a Groww holdings export before the header row.
pub const GROWW_SKIP_ROWS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub skip_rows: usize,
}

impl LoadOptions {
    pub fn groww() -> Self {
        Self {
            skip_rows: GROWW_SKIP_ROWS,
        }
    }
}

pub fn load_portfolio(path: &Path, opts: &LoadOptions) -> Result<PortfolioSnapshot> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let rows = match ext.as_deref() {
        Some("csv") => read_csv_rows(path, opts.skip_rows)?,
        Some("xls") | Some("xlsx") => read_sheet_rows(path, opts.skip_rows)?,
        _ => bail!(
            "Unsupported file format: {}. Only CSV and Excel files are supported.",
            path.display()
        ),
    };

    let snapshot = rows_to_snapshot(rows).with_context(|| {
        format!(
            "failed to read portfolio table from {} after skipping {} rows",
            path.display(),
            opts.skip_rows
        )
    })?;
    tracing::info!(
        path = %path.display(),
        skip_rows = opts.skip_rows,
        holdings = snapshot.len(),
        "loaded portfolio"
    );
    Ok(snapshot)
}

/// `skip_rows` counts physical lines, blank ones included. The `csv` reader drops empty
/// lines, so the preamble is consumed before it sees the file.
fn read_csv_rows(path: &Path, skip_rows: usize) -> Result<Vec<Vec<Scalar>>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut input = BufReader::new(file);
    let mut line = Vec::new();
    for _ in 0..skip_rows {
        line.clear();
        let read = input
            .read_until(b'\n', &mut line)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to parse {}", path.display()))?;
        rows.push(record.iter().map(Scalar::infer).collect());
    }
    Ok(rows)
}

fn read_sheet_rows(path: &Path, skip_rows: usize) -> Result<Vec<Vec<Scalar>>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("failed to open {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .with_context(|| format!("failed to read first worksheet of {}", path.display()))?;

    Ok(sheet_rows(&range, skip_rows))
}

/// The range begins at the first used cell, so sheet rows above it count toward `skip_rows`.
fn sheet_rows(range: &Range<Data>, skip_rows: usize) -> Vec<Vec<Scalar>> {
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    range
        .rows()
        .skip(skip_rows.saturating_sub(first_row))
        .map(|row| row.iter().map(cell_to_scalar).collect())
        .collect()
}

fn cell_to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty | Data::Error(_) => Scalar::Null,
        Data::Int(n) => Scalar::Int(*n),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Scalar::Int(*f as i64),
        Data::Float(f) => Scalar::Float(*f),
        Data::Bool(b) => Scalar::Bool(*b),
        Data::String(s) => Scalar::infer(s),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(at) => Scalar::Text(iso_datetime(at)),
            None => Scalar::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Scalar::Text(s.clone()),
        other => Scalar::Text(other.to_string()),
    }
}

/// Date-only cells (midnight) render as `YYYY-MM-DD`.
fn iso_datetime(at: NaiveDateTime) -> String {
    if at.time() == NaiveTime::MIN {
        at.date().format("%Y-%m-%d").to_string()
    } else {
        at.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

fn is_blank(row: &[Scalar]) -> bool {
    row.iter().all(|c| matches!(c, Scalar::Null))
}

fn header_name(index: usize, cell: Option<&Scalar>) -> String {
    match cell {
        Some(Scalar::Text(s)) => s.clone(),
        Some(Scalar::Int(n)) => n.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        Some(Scalar::Bool(b)) => b.to_string(),
        Some(Scalar::Null) | None => format!("Unnamed: {index}"),
    }
}

/// Takes the first non-blank row as the header, then keeps one holding per non-blank row.
/// Short rows are padded with nulls; cells past the header are dropped.
fn rows_to_snapshot(rows: Vec<Vec<Scalar>>) -> Result<PortfolioSnapshot> {
    let mut rows = rows.into_iter().filter(|row| !is_blank(row));

    let Some(header) = rows.next() else {
        bail!("no header row");
    };
    let columns: Vec<String> = (0..header.len())
        .map(|i| header_name(i, header.get(i)))
        .collect();

    let holdings = rows
        .map(|row| {
            let mut cells = row.into_iter();
            Holding::new(
                columns
                    .iter()
                    .map(|name| (name.clone(), cells.next().unwrap_or(Scalar::Null)))
                    .collect(),
            )
        })
        .collect();

    Ok(PortfolioSnapshot::new(holdings))
}
