use log::{debug, info, warn};

use proposal_records::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use text_diff::print_diff;

use crate::args::{Args, Command, ConvertArgs, SponsorsArgs, ThemesArgs};
use crate::pipeline::config_reader::*;
use crate::pipeline::io_common::*;

mod config_reader;
mod io_common;
mod io_excel;
mod io_tsv;
mod report;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("File not found: {path}"))]
    FileNotFound { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name:?} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("The file {path} does not contain a header row"))]
    EmptyInput { path: String },
    #[snafu(display("Column {column:?} not found in header: {header:?}"))]
    MissingColumn { column: String, header: Vec<String> },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: u64,
    },
    #[snafu(display("Line {lineno}: could not understand the value {content} in column {column}"))]
    WrongCellType {
        lineno: u64,
        column: String,
        content: String,
    },
    #[snafu(display("Line {lineno}: missing proposal number"))]
    MissingProposalNumber { lineno: u64 },
    #[snafu(display("Unknown input type {input_type:?} (expected xlsx, tsv or csv)"))]
    UnknownInputType { input_type: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the output and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(PartialEq, Debug, Clone)]
pub struct ConversionStats {
    pub input_rows: usize,
    pub output_rows: usize,
    pub inconsistent_totals: Vec<InconsistentTotal>,
}

/// Runs the command selected on the command line.
pub fn run(args: &Args) -> PipelineResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => PipelineConfig::default(),
    };
    debug!("run: config: {:?}", config);

    match &args.command {
        Command::Convert(c) => {
            let (path, stats) = run_convert(c, &config)?;
            println!("Successfully converted the input to {}", path);
            println!("{}", report::conversion_summary(&stats));
        }
        Command::Themes(t) => {
            print!("{}", run_themes(t, &config)?);
        }
        Command::Sponsors(s) => {
            let (console, csv_path) = run_sponsors(s)?;
            print!("{}", console);
            println!("\nResults saved to: {}", csv_path);
        }
    }
    Ok(())
}

/// Reads the proposal spreadsheet, aggregates it and writes the TSV file.
///
/// Returns the path of the output and the statistics of the conversion.
/// Nothing is written if any step fails.
pub fn run_convert(
    cargs: &ConvertArgs,
    config: &PipelineConfig,
) -> PipelineResult<(String, ConversionStats)> {
    let input = cargs
        .input
        .clone()
        .or_else(|| config.input_path.clone())
        .unwrap_or_else(|| DEFAULT_INPUT_PATH.to_string());
    let output = cargs
        .out
        .clone()
        .or_else(|| config.output_path.clone())
        .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string());
    let worksheet = cargs
        .excel_worksheet_name
        .clone()
        .or_else(|| config.worksheet_name.clone());
    let input_type = InputType::resolve(cargs.input_type.as_deref(), &input)?;

    ensure_file(&input)?;
    info!("Attempting to read {:?} as {:?}", input, input_type);
    let sheet = match input_type {
        InputType::Xlsx => io_excel::read_excel_file(&input, worksheet.as_deref())?,
        InputType::Tsv => io_tsv::read_delimited(&input, b'\t')?,
        InputType::Csv => io_tsv::read_delimited(&input, b',')?,
    };
    if sheet.rows.is_empty() {
        warn!("The file {} has a header but no data rows", input);
    }
    let raw_records = read_raw_records(&sheet)?;

    let (records, stats) = if cargs.no_aggregate {
        let records = format_records(&raw_records);
        let stats = ConversionStats {
            input_rows: raw_records.len(),
            output_rows: records.len(),
            inconsistent_totals: vec![],
        };
        (records, stats)
    } else {
        let rules = config.aggregation_rules(cargs.sorted)?;
        let agg = aggregate(&raw_records, &rules);
        for it in agg.stats.inconsistent_totals.iter().take(10) {
            warn!(
                "Proposal {}: {} different totals over {} rows (min {}, max {})",
                it.proposal_no, it.distinct, it.count, it.min, it.max
            );
        }
        let stats = ConversionStats {
            input_rows: agg.stats.input_rows,
            output_rows: agg.stats.output_groups,
            inconsistent_totals: agg.stats.inconsistent_totals,
        };
        (agg.records, stats)
    };

    let contents = report::render_tsv(&records, &output)?;

    // The reference output, if provided for comparison
    if let Some(reference_p) = &cargs.reference {
        let reference = fs::read_to_string(reference_p).context(OpeningFileSnafu {
            path: reference_p.clone(),
        })?;
        if reference != contents {
            warn!("Found differences with the reference file");
            print_diff(reference.as_str(), contents.as_str(), "\n");
            return ReferenceMismatchSnafu {
                path: reference_p.clone(),
            }
            .fail();
        }
    }

    write_output(&output, &contents)?;
    Ok((output, stats))
}

/// Lists the distinct values of a category column.
pub fn run_themes(targs: &ThemesArgs, config: &PipelineConfig) -> PipelineResult<String> {
    ensure_file(&targs.file)?;
    let sheet = io_tsv::read_delimited(&targs.file, b'\t')?;
    let col = sheet.column(&targs.column)?;
    let normalizer = config.theme_normalizer();
    let themes = catalog_themes(
        sheet.rows.iter().map(|row| cell_str(row.get(col))),
        if targs.normalize {
            Some(&normalizer)
        } else {
            None
        },
    );
    let color_path = targs
        .colors
        .clone()
        .or_else(|| config.color_map_path.clone())
        .unwrap_or_else(|| DEFAULT_COLOR_MAP_PATH.to_string());
    let colors = read_color_map(&color_path);

    if targs.map_lines {
        Ok(report::themes_map_lines(&themes, &colors))
    } else if targs.json {
        report::themes_json(&targs.file, targs.normalize, &themes, &colors)
    } else {
        Ok(report::themes_list(&themes, &colors))
    }
}

/// Sums the funding per sponsor, and writes the CSV report.
///
/// Returns the console table and the path of the report.
pub fn run_sponsors(sargs: &SponsorsArgs) -> PipelineResult<(String, String)> {
    ensure_file(&sargs.file)?;
    let sheet = io_tsv::read_delimited(&sargs.file, b'\t')?;
    let rows = read_funding_rows(&sheet)?;
    let summary = summarize_sponsors(&rows);
    info!(
        "Found {} sponsors for a total of {}",
        summary.sponsors.len(),
        summary.grand_total
    );
    let csv_contents = report::render_sponsor_csv(&summary, &sargs.out)?;
    write_output(&sargs.out, &csv_contents)?;
    Ok((report::sponsor_table(&summary), sargs.out.clone()))
}

fn ensure_file(path: &str) -> PipelineResult<()> {
    ensure!(
        Path::new(path).is_file(),
        FileNotFoundSnafu {
            path: path.to_string()
        }
    );
    Ok(())
}

fn write_output(path: &str, contents: &str) -> PipelineResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingFileSnafu { path })?;
        }
    }
    fs::write(path, contents).context(WritingFileSnafu { path })?;
    info!("Wrote {}", path);
    Ok(())
}
