// Rendering of the output files and of the console reports.

use serde_json::json;
use std::collections::BTreeMap;

use crate::pipeline::*;

pub const OUTPUT_COLUMNS: [&str; 10] = [
    "proposal_no",
    "date_submitted",
    "title",
    "sponsor",
    "prime_sponsor",
    "Authors",
    "credit",
    "first",
    "total",
    "theme",
];

const RULE_WIDTH: usize = 80;
const SPONSOR_WIDTH: usize = 60;

fn text_or_empty(x: &Option<String>) -> &str {
    x.as_deref().unwrap_or("")
}

fn amount_or_empty(x: Option<f64>) -> String {
    x.map(format_amount).unwrap_or_default()
}

/// Renders the records as TSV with a header row. `path` is only used to
/// report errors.
pub fn render_tsv(records: &[AggregatedRecord], path: &str) -> PipelineResult<String> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(vec![]);
    wtr.write_record(OUTPUT_COLUMNS)
        .context(WritingCsvSnafu { path })?;
    for r in records.iter() {
        let credit = amount_or_empty(r.credit);
        let first = amount_or_empty(r.first);
        let total = amount_or_empty(r.total);
        wtr.write_record([
            r.proposal_no.as_str(),
            text_or_empty(&r.date_submitted),
            text_or_empty(&r.title),
            text_or_empty(&r.sponsor),
            text_or_empty(&r.prime_sponsor),
            text_or_empty(&r.authors),
            credit.as_str(),
            first.as_str(),
            total.as_str(),
            text_or_empty(&r.theme),
        ])
        .context(WritingCsvSnafu { path })?;
    }
    finish(wtr, path)
}

pub fn render_sponsor_csv(summary: &SponsorSummary, path: &str) -> PipelineResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Sponsor", "Total Funding"])
        .context(WritingCsvSnafu { path })?;
    for s in summary.sponsors.iter() {
        let total = format_amount(s.total);
        wtr.write_record([s.sponsor.as_str(), total.as_str()])
            .context(WritingCsvSnafu { path })?;
    }
    finish(wtr, path)
}

fn finish(wtr: csv::Writer<Vec<u8>>, path: &str) -> PipelineResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context(WritingFileSnafu { path })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn conversion_summary(stats: &ConversionStats) -> String {
    let mut res = format!(
        "Original rows: {}\nConsolidated rows: {}\nNumber of columns: {}",
        stats.input_rows,
        stats.output_rows,
        OUTPUT_COLUMNS.len()
    );
    if !stats.inconsistent_totals.is_empty() {
        res.push_str(&format!(
            "\nProposals with different totals per author: {} (the maximum total was used for every proposal)",
            stats.inconsistent_totals.len()
        ));
    }
    res
}

/// Formats an amount with thousands separators and two decimals.
pub fn format_money(x: f64) -> String {
    let s = format!("{:.2}", x.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (idx, c) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    let sign = if x < 0.0 && s.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn truncate_sponsor(sponsor: &str) -> String {
    if sponsor.chars().count() > SPONSOR_WIDTH {
        let head: String = sponsor.chars().take(SPONSOR_WIDTH - 2).collect();
        format!("{}..", head)
    } else {
        sponsor.to_string()
    }
}

pub fn sponsor_table(summary: &SponsorSummary) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut lines: Vec<String> = vec![
        heavy.clone(),
        "Sponsors Grouped by Total Funding".to_string(),
        heavy,
        String::new(),
        format!("Total number of unique sponsors: {}", summary.sponsors.len()),
        String::new(),
        format!(
            "Total funding across all sponsors: ${}",
            format_money(summary.grand_total)
        ),
        String::new(),
        light.clone(),
        format!(
            "{:<w$} {:>20}",
            "Sponsor",
            "Total Funding",
            w = SPONSOR_WIDTH
        ),
        light.clone(),
    ];
    for s in summary.sponsors.iter() {
        lines.push(format!(
            "{:<w$} ${:>19}",
            truncate_sponsor(&s.sponsor),
            format_money(s.total),
            w = SPONSOR_WIDTH
        ));
    }
    lines.push(light);
    let mut res = lines.join("\n");
    res.push('\n');
    res
}

pub fn themes_list(themes: &[ThemeCount], colors: &BTreeMap<String, String>) -> String {
    let mut res = format!("Total unique themes: {}\n\n", themes.len());
    for t in themes.iter() {
        match colors.get(&t.theme) {
            Some(c) => res.push_str(&format!("{} (color: {})\n", t.theme, c)),
            None => res.push_str(&format!("{}\n", t.theme)),
        }
    }
    res
}

/// One line per theme, ready to be pasted in the color map.
pub fn themes_map_lines(themes: &[ThemeCount], colors: &BTreeMap<String, String>) -> String {
    let mut res = String::new();
    for t in themes.iter() {
        match colors.get(&t.theme) {
            Some(c) => res.push_str(&format!("{}: {}\n", json!(t.theme), json!(c))),
            None => res.push_str(&format!("{}\n", t.theme)),
        }
    }
    res
}

pub fn themes_json(
    file: &str,
    normalized: bool,
    themes: &[ThemeCount],
    colors: &BTreeMap<String, String>,
) -> PipelineResult<String> {
    let enriched: Vec<serde_json::Value> = themes
        .iter()
        .map(|t| {
            json!({
                "theme": t.theme,
                "count": t.count,
                "color": colors.get(&t.theme),
            })
        })
        .collect();
    let js = json!({
        "file": file,
        "normalized": normalized,
        "total_unique": themes.len(),
        "themes": enriched,
    });
    let mut res = serde_json::to_string_pretty(&js)
        .whatever_context::<_, PipelineError>("could not render the themes")?;
    res.push('\n');
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money() {
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(999.999), "1,000.00");
        assert_eq!(format_money(1234567.5), "1,234,567.50");
        assert_eq!(format_money(-1500.0), "-1,500.00");
        assert_eq!(format_money(-0.001), "0.00");
    }

    #[test]
    fn long_sponsors_are_truncated() {
        let long = "X".repeat(75);
        let t = truncate_sponsor(&long);
        assert_eq!(t.chars().count(), 60);
        assert!(t.ends_with(".."));
        assert_eq!(truncate_sponsor("NSF"), "NSF");
    }

    #[test]
    fn sponsor_table_rows() {
        let summary = SponsorSummary {
            sponsors: vec![SponsorTotal {
                sponsor: "National Science Foundation".to_string(),
                total: 1250000.0,
            }],
            grand_total: 1250000.0,
        };
        let table = sponsor_table(&summary);
        let row = format!(
            "{:<60} ${:>19}",
            "National Science Foundation", "1,250,000.00"
        );
        assert!(table.contains(&row));
        assert!(table.contains("Total funding across all sponsors: $1,250,000.00"));
    }

    #[test]
    fn tsv_output() {
        let mut r = format_records(&[RawRecord {
            pi: Some("Lee, Ann".to_string()),
            title: Some("Tabs\tand \"quotes\"".to_string()),
            credit: Some(0.5),
            total: Some(1000.0),
            ..RawRecord::new("7")
        }]);
        r[0].theme = Some("AI".to_string());
        let out = render_tsv(&r, "out.tsv").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], OUTPUT_COLUMNS.join("\t"));
        assert_eq!(
            lines[1],
            "7\t\t\"Tabs\tand \"\"quotes\"\"\"\t\t\tAnn Lee\t0.5\t\t1000\tAI"
        );
    }

    #[test]
    fn summary_without_inconsistent_totals() {
        let stats = ConversionStats {
            input_rows: 3,
            output_rows: 1,
            inconsistent_totals: vec![],
        };
        assert_eq!(
            conversion_summary(&stats),
            "Original rows: 3\nConsolidated rows: 1\nNumber of columns: 10"
        );
    }
}
