// Primitives for reading delimited text files.

use crate::pipeline::*;

/// Reads a delimited file with a header row. All the cells are read as text.
pub fn read_delimited(path: &str, delimiter: u8) -> PipelineResult<Sheet> {
    let rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();

    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { path, lineno: 1u64 })?
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
        None => return EmptyInputSnafu { path }.fail(),
    };
    debug!("read_delimited: header: {:?}", header);

    let mut rows: Vec<Vec<SheetCell>> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let row: Vec<SheetCell> = line
            .iter()
            .map(|s| {
                if s.is_empty() {
                    SheetCell::Empty
                } else {
                    SheetCell::Text(s.to_string())
                }
            })
            .collect();
        rows.push(row);
    }
    info!("Read {} rows from {}", rows.len(), path);
    Ok(Sheet {
        path: path.to_string(),
        header,
        rows,
    })
}
