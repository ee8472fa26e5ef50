// Primitives shared by the spreadsheet and the TSV readers.

use chrono::{NaiveDate, NaiveDateTime};

use crate::pipeline::*;

pub const PROPOSAL_NO: &str = "proposal_no";
pub const DATE_SUBMITTED: &str = "date_submitted";
pub const TITLE: &str = "title";
pub const SPONSOR: &str = "sponsor";
pub const PRIME_SPONSOR: &str = "prime_sponsor";
pub const PI: &str = "PI";
pub const CREDIT: &str = "credit";
pub const FIRST: &str = "first";
pub const TOTAL: &str = "total";
pub const THEME: &str = "theme";

/// A cell, as read from any of the input formats.
#[derive(PartialEq, Debug, Clone)]
pub enum SheetCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// The content of a file: a header and the data rows.
///
/// Rows may be shorter than the header; the missing cells are empty.
#[derive(PartialEq, Debug, Clone)]
pub struct Sheet {
    pub path: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
}

impl Sheet {
    /// The index of a column, by exact name.
    pub fn column(&self, name: &str) -> PipelineResult<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .context(MissingColumnSnafu {
                column: name,
                header: self.header.clone(),
            })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Xlsx,
    Tsv,
    Csv,
}

impl InputType {
    /// Uses the explicit type if provided, otherwise the extension of the file.
    pub fn resolve(input_type: Option<&str>, path: &str) -> PipelineResult<InputType> {
        let t = match input_type {
            Some(t) => t.to_lowercase(),
            None => Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default(),
        };
        match t.as_str() {
            "xlsx" | "xlsm" => Ok(InputType::Xlsx),
            "tsv" | "txt" | "tab" => Ok(InputType::Tsv),
            "csv" => Ok(InputType::Csv),
            _ => UnknownInputTypeSnafu { input_type: t }.fail(),
        }
    }
}

/// A row of the aggregated TSV file, as needed for the sponsor report.
#[derive(PartialEq, Debug, Clone)]
pub struct FundingRow {
    pub sponsor: Option<String>,
    pub total: Option<f64>,
}

impl FundedRecord for FundingRow {
    fn sponsor(&self) -> Option<&str> {
        self.sponsor.as_deref()
    }

    fn total(&self) -> Option<f64> {
        self.total
    }
}

// The line number of a data row in the original file. The header is line 1.
fn lineno(idx: usize) -> u64 {
    (idx + 2) as u64
}

/// Converts the rows of a sheet to records, checking that all the columns
/// are present.
pub fn read_raw_records(sheet: &Sheet) -> PipelineResult<Vec<RawRecord>> {
    let pid_col = sheet.column(PROPOSAL_NO)?;
    let date_col = sheet.column(DATE_SUBMITTED)?;
    let title_col = sheet.column(TITLE)?;
    let sponsor_col = sheet.column(SPONSOR)?;
    let prime_col = sheet.column(PRIME_SPONSOR)?;
    let pi_col = sheet.column(PI)?;
    let credit_col = sheet.column(CREDIT)?;
    let first_col = sheet.column(FIRST)?;
    let total_col = sheet.column(TOTAL)?;
    let theme_col = sheet.column(THEME)?;

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate() {
        let lineno = lineno(idx);
        if is_blank_row(row) {
            warn!("Line {}: skipping blank row", lineno);
            continue;
        }
        let text = |col: usize| cell_text(row.get(col));
        let amount = |col: usize, name: &str| cell_amount(row.get(col), lineno, name);

        let proposal_no = match row.get(pid_col) {
            Some(SheetCell::Number(x)) => ProposalId::from_number(*x),
            c => match cell_text(c) {
                Some(s) => ProposalId::new(&s),
                None => return MissingProposalNumberSnafu { lineno }.fail(),
            },
        };
        let rec = RawRecord {
            proposal_no,
            date_submitted: cell_date(row.get(date_col)),
            title: text(title_col),
            sponsor: text(sponsor_col),
            prime_sponsor: text(prime_col),
            pi: text(pi_col),
            credit: amount(credit_col, CREDIT)?,
            first: amount(first_col, FIRST)?,
            total: amount(total_col, TOTAL)?,
            theme: text(theme_col),
        };
        debug!("read_raw_records: line {}: {:?}", lineno, rec);
        res.push(rec);
    }
    info!("Read {} records from {}", res.len(), sheet.path);
    Ok(res)
}

// Trailing formatted rows of a workbook, or lines with only delimiters.
fn is_blank_row(row: &[SheetCell]) -> bool {
    row.iter().all(|c| cell_text(Some(c)).is_none())
}

/// Reads the sponsor and total columns of the aggregated file.
pub fn read_funding_rows(sheet: &Sheet) -> PipelineResult<Vec<FundingRow>> {
    let sponsor_col = sheet.column(SPONSOR)?;
    let total_col = sheet.column(TOTAL)?;
    sheet
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            Ok(FundingRow {
                sponsor: cell_text(row.get(sponsor_col)),
                total: cell_amount(row.get(total_col), lineno(idx), TOTAL)?,
            })
        })
        .collect()
}

/// The text of a cell. Empty cells and blank strings are missing.
pub fn cell_text(cell: Option<&SheetCell>) -> Option<String> {
    match cell {
        None | Some(SheetCell::Empty) => None,
        Some(SheetCell::Text(s)) if s.trim().is_empty() => None,
        Some(SheetCell::Text(s)) => Some(s.clone()),
        Some(SheetCell::Number(x)) => Some(format_amount(*x)),
        Some(SheetCell::Date(d)) => Some(d.format("%Y-%m-%d").to_string()),
    }
}

/// The text of a text cell, without copying.
pub fn cell_str(cell: Option<&SheetCell>) -> Option<&str> {
    match cell {
        Some(SheetCell::Text(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Reads an amount. Text cells may use `$` and thousands separators.
pub fn cell_amount(
    cell: Option<&SheetCell>,
    lineno: u64,
    column: &str,
) -> PipelineResult<Option<f64>> {
    let x = match cell {
        None | Some(SheetCell::Empty) => return Ok(None),
        Some(SheetCell::Number(x)) => *x,
        Some(SheetCell::Text(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != '$' && *c != ',')
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            match cleaned.parse::<f64>() {
                Ok(x) => x,
                Err(_) => {
                    return WrongCellTypeSnafu {
                        lineno,
                        column,
                        content: s.clone(),
                    }
                    .fail()
                }
            }
        }
        Some(c @ SheetCell::Date(_)) => {
            return WrongCellTypeSnafu {
                lineno,
                column,
                content: format!("{:?}", c),
            }
            .fail()
        }
    };
    ensure!(
        x.is_finite(),
        WrongCellTypeSnafu {
            lineno,
            column,
            content: x.to_string(),
        }
    );
    Ok(Some(x))
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Reads a date and writes it as YYYY-MM-DD. Text that does not look like a
/// date is kept as it is.
pub fn cell_date(cell: Option<&SheetCell>) -> Option<String> {
    match cell {
        Some(SheetCell::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            let parsed = DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                        .map(|dt| dt.date())
                });
            match parsed {
                Some(d) => Some(d.format("%Y-%m-%d").to_string()),
                None => Some(s.to_string()),
            }
        }
        c => cell_text(c),
    }
}

/// Amounts that are whole numbers are written without a fractional part.
pub fn format_amount(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        x.to_string()
    }
}
