use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::{Duration, NaiveDate};

use crate::pipeline::*;

/// Reads a worksheet of an Excel file: the first one, unless a name is given.
pub fn read_excel_file(path: &str, worksheet_name: Option<&str>) -> PipelineResult<Sheet> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyInputSnafu { path })?,
    }
    .context(OpeningExcelSnafu { path })?;

    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyInputSnafu { path })?
        .iter()
        .map(|c| match read_cell(c) {
            SheetCell::Text(s) => s.trim().to_string(),
            other => cell_text(Some(&other)).unwrap_or_default(),
        })
        .collect();
    debug!("read_excel_file: header: {:?}", header);

    let mut rows: Vec<Vec<SheetCell>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let cells: Vec<SheetCell> = row.iter().map(read_cell).collect();
        debug!("read_excel_file: line {}: {:?}", idx + 2, cells);
        rows.push(cells);
    }
    info!("Read {} rows from {}", rows.len(), path);
    Ok(Sheet {
        path: path.to_string(),
        header,
        rows,
    })
}

fn read_cell(cell: &DataType) -> SheetCell {
    match cell {
        DataType::String(s) => SheetCell::Text(s.clone()),
        DataType::Float(f) => SheetCell::Number(*f),
        DataType::Int(i) => SheetCell::Number(*i as f64),
        DataType::Bool(b) => SheetCell::Text(b.to_string()),
        DataType::DateTime(serial) => match excel_serial_date(*serial) {
            Some(d) => SheetCell::Date(d),
            None => SheetCell::Number(*serial),
        },
        DataType::Empty => SheetCell::Empty,
        other => {
            warn!("read_cell: could not understand cell {:?}, treating it as empty", other);
            SheetCell::Empty
        }
    }
}

/// Dates in Excel are a number of days since 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31.
    if !serial.is_finite() || !(0.0..=2958465.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    enum XCell {
        Text(&'static str),
        Number(f64),
        Empty,
    }

    fn worksheet_xml(rows: &[Vec<XCell>]) -> String {
        let mut res = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, row) in rows.iter().enumerate() {
            res.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate() {
                let pos = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                match cell {
                    XCell::Text(s) => res.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        pos, s
                    )),
                    XCell::Number(x) => {
                        res.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, pos, x))
                    }
                    XCell::Empty => (),
                }
            }
            res.push_str("</row>");
        }
        res.push_str("</sheetData></worksheet>");
        res
    }

    // A workbook with the given worksheets, in order.
    fn write_workbook(path: &str, sheets: &[(&str, Vec<Vec<XCell>>)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (idx, (name, rows)) in sheets.iter().enumerate() {
            let n = idx + 1;
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name, n, n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                n, n
            ));
            zip.start_file(format!("xl/worksheets/sheet{}.xml", n), options)
                .unwrap();
            zip.write_all(worksheet_xml(rows).as_bytes()).unwrap();
        }
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(workbook.as_bytes()).unwrap();
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    fn proposal_rows() -> Vec<Vec<XCell>> {
        use XCell::*;
        vec![
            vec![
                Text("proposal_no"),
                Text("date_submitted"),
                Text("title"),
                Text("sponsor"),
                Text("prime_sponsor"),
                Text("PI"),
                Text("credit"),
                Text("first"),
                Text("total"),
                Text("theme"),
            ],
            vec![
                Number(101.0),
                Text("2023-01-05"),
                Text("Smart grids"),
                Text("NSF"),
                Empty,
                Text("Smith, Jane"),
                Number(0.5),
                Number(1000.0),
                Number(100.0),
                Text("energy"),
            ],
            vec![
                Text("101"),
                Text("2023-01-05"),
                Text("Smart grids"),
                Text("NSF"),
                Empty,
                Text("Doe, John"),
                Number(0.5),
                Number(0.0),
                Number(100.0),
                Text("energy"),
            ],
        ]
    }

    fn notes_rows() -> Vec<Vec<XCell>> {
        vec![vec![XCell::Text("note")], vec![XCell::Text("draft")]]
    }

    fn workbook_path(dir: &TempDir) -> String {
        dir.path().join("all 2.xlsx").display().to_string()
    }

    #[test]
    fn reads_first_worksheet() {
        let dir = TempDir::new().unwrap();
        let path = workbook_path(&dir);
        write_workbook(&path, &[("Proposals", proposal_rows()), ("Notes", notes_rows())]);

        let sheet = read_excel_file(&path, None).unwrap();
        assert_eq!(sheet.header.len(), 10);
        assert_eq!(sheet.header[0], "proposal_no");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], SheetCell::Number(101.0));
        assert_eq!(sheet.rows[0][4], SheetCell::Empty);
        assert_eq!(sheet.rows[1][0], SheetCell::Text("101".to_string()));

        // Numeric and text cells name the same proposal.
        let records = read_raw_records(&sheet).unwrap();
        assert_eq!(records[0].proposal_no, ProposalId::new("101"));
        assert_eq!(records[1].proposal_no, ProposalId::new("101"));
        let agg = aggregate(&records, &AggregationRules::default());
        assert_eq!(agg.records.len(), 1);
        assert_eq!(
            agg.records[0].authors,
            Some("Jane Smith,John Doe".to_string())
        );
        assert_eq!(agg.records[0].credit, Some(1.0));
        assert_eq!(agg.records[0].first, Some(1000.0));
    }

    #[test]
    fn reads_named_worksheet() {
        let dir = TempDir::new().unwrap();
        let path = workbook_path(&dir);
        write_workbook(&path, &[("Notes", notes_rows()), ("Proposals", proposal_rows())]);

        let first = read_excel_file(&path, None).unwrap();
        assert_eq!(first.header, vec!["note".to_string()]);

        let named = read_excel_file(&path, Some("Proposals")).unwrap();
        assert_eq!(named.header[5], "PI");
        assert_eq!(named.rows.len(), 2);
    }

    #[test]
    fn missing_worksheet() {
        let dir = TempDir::new().unwrap();
        let path = workbook_path(&dir);
        write_workbook(&path, &[("Proposals", proposal_rows())]);
        match read_excel_file(&path, Some("Budget")) {
            Err(PipelineError::MissingWorksheet { name, .. }) => assert_eq!(name, "Budget"),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn empty_worksheet() {
        let dir = TempDir::new().unwrap();
        let path = workbook_path(&dir);
        write_workbook(&path, &[("Proposals", vec![])]);
        assert!(matches!(
            read_excel_file(&path, None),
            Err(PipelineError::EmptyInput { .. })
        ));
    }

    #[test]
    fn serial_dates() {
        assert_eq!(
            excel_serial_date(44927.0),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(
            excel_serial_date(44927.75),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(excel_serial_date(-1.0), None);
    }

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Int(12)), SheetCell::Number(12.0));
        assert_eq!(
            read_cell(&DataType::String("Smith, Jane".to_string())),
            SheetCell::Text("Smith, Jane".to_string())
        );
        assert_eq!(read_cell(&DataType::Empty), SheetCell::Empty);
        assert_eq!(
            read_cell(&DataType::DateTime(44927.0)),
            SheetCell::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        );
    }

    #[test]
    fn missing_workbook() {
        assert!(matches!(
            read_excel_file("/nonexistent/all 2.xlsx", None),
            Err(PipelineError::OpeningExcel { .. })
        ));
    }
}
