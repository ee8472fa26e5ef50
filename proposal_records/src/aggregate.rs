use log::{debug, info, warn};
use std::collections::HashMap;

use crate::config::*;
use crate::names::format_name;

// The value of one column for one row, before or after reduction.
#[derive(PartialEq, Debug, Clone)]
enum Cell {
    Text(Option<String>),
    Amount(Option<f64>),
}

impl Cell {
    fn is_missing(&self) -> bool {
        matches!(self, Cell::Text(None) | Cell::Amount(None))
    }

    fn into_text(self) -> Option<String> {
        match self {
            Cell::Text(t) => t,
            Cell::Amount(a) => a.map(|x| x.to_string()),
        }
    }

    fn into_amount(self) -> Option<f64> {
        match self {
            Cell::Text(t) => t.and_then(|s| s.trim().parse::<f64>().ok()),
            Cell::Amount(a) => a,
        }
    }
}

/// The rows of one proposal, in input order.
type Group<'a> = (ProposalId, Vec<&'a RawRecord>);

/// Folds the rows of every proposal into a single record.
///
/// The policy for the total amount is decided once over all the groups
/// before any of them is reduced: if a single proposal has rows that
/// disagree on the total, the maximum is used for every proposal.
///
/// An empty input gives an empty aggregation.
pub fn aggregate(records: &[RawRecord], rules: &AggregationRules) -> Aggregation {
    info!("aggregate: processing {} rows", records.len());
    let groups = group_records(records, rules.group_order);

    let inconsistent_totals = check_totals(&groups);
    let total_policy = if inconsistent_totals.is_empty() {
        TotalPolicy::First
    } else {
        warn!(
            "Found {} proposals with different total amounts per author, using the maximum total for every proposal",
            inconsistent_totals.len()
        );
        TotalPolicy::Max
    };
    debug!("aggregate: total policy: {:?}", total_policy);

    let aggregated: Vec<AggregatedRecord> = groups
        .iter()
        .map(|(pid, rows)| reduce_group(pid, rows, total_policy, rules))
        .collect();

    let stats = AggregationStats {
        input_rows: records.len(),
        output_groups: aggregated.len(),
        inconsistent_totals,
    };
    info!(
        "aggregate: {} rows -> {} proposals ({} with inconsistent totals)",
        stats.input_rows,
        stats.output_groups,
        stats.inconsistent_totals.len()
    );
    Aggregation {
        records: aggregated,
        total_policy,
        stats,
    }
}

/// Formats every row on its own, without grouping.
///
/// Each output record corresponds to one input row, with the PI name
/// formatted into the authors column.
pub fn format_records(records: &[RawRecord]) -> Vec<AggregatedRecord> {
    records
        .iter()
        .map(|r| AggregatedRecord {
            proposal_no: r.proposal_no.clone(),
            date_submitted: r.date_submitted.clone(),
            title: r.title.clone(),
            sponsor: r.sponsor.clone(),
            prime_sponsor: r.prime_sponsor.clone(),
            authors: format_name(r.pi.as_deref()),
            credit: r.credit,
            first: r.first,
            total: r.total,
            theme: r.theme.clone(),
        })
        .collect()
}

fn group_records(records: &[RawRecord], order: GroupOrder) -> Vec<Group<'_>> {
    let mut positions: HashMap<&ProposalId, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for r in records.iter() {
        match positions.get(&r.proposal_no) {
            Some(idx) => groups[*idx].1.push(r),
            None => {
                positions.insert(&r.proposal_no, groups.len());
                groups.push((r.proposal_no.clone(), vec![r]));
            }
        }
    }
    if order == GroupOrder::Sorted {
        // Integers first, in numeric order, then everything else.
        groups.sort_by(|(p1, _), (p2, _)| {
            let k1 = (p1.as_number().is_none(), p1.as_number(), p1);
            let k2 = (p2.as_number().is_none(), p2.as_number(), p2);
            k1.cmp(&k2)
        });
    }
    groups
}

/// Lists the proposals with more than one distinct total amount.
fn check_totals(groups: &[Group]) -> Vec<InconsistentTotal> {
    let mut res: Vec<InconsistentTotal> = Vec::new();
    for (pid, rows) in groups.iter() {
        let mut totals: Vec<f64> = rows.iter().filter_map(|r| r.total).collect();
        let count = totals.len();
        totals.sort_by(|a, b| a.total_cmp(b));
        totals.dedup_by(|a, b| a == b);
        if let (Some(min), Some(max)) = (totals.first(), totals.last()) {
            if totals.len() > 1 {
                debug!("check_totals: {}: distinct totals {:?}", pid, totals);
                res.push(InconsistentTotal {
                    proposal_no: pid.clone(),
                    distinct: totals.len(),
                    min: *min,
                    max: *max,
                    count,
                });
            }
        }
    }
    res
}

fn reduce_group(
    pid: &ProposalId,
    rows: &[&RawRecord],
    total_policy: TotalPolicy,
    rules: &AggregationRules,
) -> AggregatedRecord {
    let mut res = AggregatedRecord::empty(pid.clone());
    for (field, reduction) in FIELD_RULES.iter() {
        let cell = reduce_field(rows, *field, *reduction, total_policy, rules);
        set_field(&mut res, *field, cell);
    }
    res
}

fn reduce_field(
    rows: &[&RawRecord],
    field: Field,
    reduction: Reduction,
    total_policy: TotalPolicy,
    rules: &AggregationRules,
) -> Cell {
    let cells: Vec<Cell> = rows.iter().map(|r| read_field(r, field)).collect();
    match (reduction, total_policy) {
        (Reduction::First, _) | (Reduction::ConditionalMax, TotalPolicy::First) => {
            first_present(cells)
        }
        (Reduction::Sum, _) => Cell::Amount(Some(amounts(cells).sum())),
        (Reduction::ConditionalMax, TotalPolicy::Max) => {
            Cell::Amount(amounts(cells).reduce(f64::max))
        }
        (Reduction::Join, _) => {
            let texts: Vec<String> = cells.into_iter().filter_map(Cell::into_text).collect();
            if texts.is_empty() {
                Cell::Text(None)
            } else {
                Cell::Text(Some(texts.join(&rules.author_separator)))
            }
        }
    }
}

// The first value that is not missing. Groups are never empty.
fn first_present(cells: Vec<Cell>) -> Cell {
    let fallback = match cells.first() {
        Some(Cell::Amount(_)) => Cell::Amount(None),
        _ => Cell::Text(None),
    };
    cells
        .into_iter()
        .find(|c| !c.is_missing())
        .unwrap_or(fallback)
}

fn amounts(cells: Vec<Cell>) -> impl Iterator<Item = f64> {
    cells.into_iter().filter_map(Cell::into_amount)
}

fn read_field(r: &RawRecord, field: Field) -> Cell {
    match field {
        Field::DateSubmitted => Cell::Text(r.date_submitted.clone()),
        Field::Title => Cell::Text(r.title.clone()),
        Field::Sponsor => Cell::Text(r.sponsor.clone()),
        Field::PrimeSponsor => Cell::Text(r.prime_sponsor.clone()),
        Field::Authors => Cell::Text(format_name(r.pi.as_deref())),
        Field::Credit => Cell::Amount(r.credit),
        Field::First => Cell::Amount(r.first),
        Field::Total => Cell::Amount(r.total),
        Field::Theme => Cell::Text(r.theme.clone()),
    }
}

fn set_field(res: &mut AggregatedRecord, field: Field, cell: Cell) {
    match field {
        Field::DateSubmitted => res.date_submitted = cell.into_text(),
        Field::Title => res.title = cell.into_text(),
        Field::Sponsor => res.sponsor = cell.into_text(),
        Field::PrimeSponsor => res.prime_sponsor = cell.into_text(),
        Field::Authors => res.authors = cell.into_text(),
        Field::Credit => res.credit = cell.into_amount(),
        Field::First => res.first = cell.into_amount(),
        Field::Total => res.total = cell.into_amount(),
        Field::Theme => res.theme = cell.into_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(pid: &str, pi: &str, credit: f64, total: f64) -> RawRecord {
        RawRecord {
            pi: Some(pi.to_string()),
            credit: Some(credit),
            first: Some(credit / 2.0),
            total: Some(total),
            sponsor: Some("NSF".to_string()),
            ..RawRecord::new(pid)
        }
    }

    #[test]
    fn authors_are_joined_in_row_order() {
        init();
        let rows = vec![
            row("P1", "Smith, Jane", 10.0, 100.0),
            row("P1", "Doe, John", 20.0, 100.0),
            row("P1", "Lee, Ann", 30.0, 100.0),
        ];
        let agg = aggregate(&rows, &AggregationRules::default());
        assert_eq!(agg.records.len(), 1);
        assert_eq!(
            agg.records[0].authors,
            Some("Jane Smith,John Doe,Ann Lee".to_string())
        );
        assert_eq!(agg.records[0].credit, Some(60.0));
        assert_eq!(agg.records[0].first, Some(30.0));
        assert_eq!(agg.total_policy, TotalPolicy::First);
        assert_eq!(agg.records[0].total, Some(100.0));
    }

    #[test]
    fn one_inconsistent_group_switches_every_group_to_max() {
        init();
        let rows = vec![
            row("P1", "A, B", 1.0, 100.0),
            row("P2", "C, D", 1.0, 200.0),
            row("P1", "E, F", 1.0, 100.0),
            row("P1", "G, H", 1.0, 150.0),
            row("P2", "I, J", 1.0, 200.0),
        ];
        let agg = aggregate(&rows, &AggregationRules::default());
        assert_eq!(agg.total_policy, TotalPolicy::Max);
        assert_eq!(agg.records[0].proposal_no, ProposalId::new("P1"));
        assert_eq!(agg.records[0].total, Some(150.0));
        assert_eq!(agg.records[1].total, Some(200.0));
        assert_eq!(
            agg.stats.inconsistent_totals,
            vec![InconsistentTotal {
                proposal_no: ProposalId::new("P1"),
                distinct: 2,
                min: 100.0,
                max: 150.0,
                count: 3,
            }]
        );
    }

    #[test]
    fn first_policy_takes_first_row() {
        init();
        // Only the first row of P1 carries a total: still consistent.
        let mut r2 = row("P1", "C, D", 1.0, 0.0);
        r2.total = None;
        let rows = vec![row("P1", "A, B", 1.0, 42.0), r2];
        let agg = aggregate(&rows, &AggregationRules::default());
        assert_eq!(agg.total_policy, TotalPolicy::First);
        assert_eq!(agg.records[0].total, Some(42.0));
    }

    #[test]
    fn credit_is_conserved_and_ids_are_unique() {
        init();
        let rows: Vec<RawRecord> = (0..30)
            .map(|i| row(&format!("{}", i % 7), "X, Y", i as f64 * 1.5, 10.0))
            .collect();
        let agg = aggregate(&rows, &AggregationRules::default());
        assert_eq!(agg.records.len(), 7);
        assert_eq!(agg.stats.input_rows, 30);
        assert_eq!(agg.stats.output_groups, 7);
        let in_credit: f64 = rows.iter().filter_map(|r| r.credit).sum();
        let out_credit: f64 = agg.records.iter().filter_map(|r| r.credit).sum();
        assert!((in_credit - out_credit).abs() < 1e-9);
        let mut ids: Vec<&ProposalId> = agg.records.iter().map(|r| &r.proposal_no).collect();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn first_seen_and_sorted_orders() {
        init();
        let rows = vec![
            row("10", "A, B", 1.0, 1.0),
            row("9", "A, B", 1.0, 1.0),
            row("abc", "A, B", 1.0, 1.0),
            row("10.0", "C, D", 1.0, 1.0),
        ];
        let first_seen = aggregate(&rows, &AggregationRules::default());
        let ids: Vec<&str> = first_seen
            .records
            .iter()
            .map(|r| r.proposal_no.as_str())
            .collect();
        assert_eq!(ids, vec!["10", "9", "abc"]);
        assert_eq!(first_seen.records[0].authors, Some("B A,D C".to_string()));

        let sorted = aggregate(&rows, &AggregationRules::new(",", GroupOrder::Sorted));
        let ids: Vec<&str> = sorted
            .records
            .iter()
            .map(|r| r.proposal_no.as_str())
            .collect();
        assert_eq!(ids, vec!["9", "10", "abc"]);
    }

    #[test]
    fn first_skips_missing_values() {
        init();
        let mut r1 = row("P1", "A, B", 1.0, 1.0);
        r1.title = None;
        let mut r2 = row("P1", "C, D", 1.0, 1.0);
        r2.title = Some("Second".to_string());
        r2.pi = None;
        let agg = aggregate(&[r1, r2], &AggregationRules::new(";", GroupOrder::FirstSeen));
        assert_eq!(agg.records[0].title, Some("Second".to_string()));
        assert_eq!(agg.records[0].authors, Some("B A".to_string()));
        assert_eq!(agg.records[0].theme, None);
    }

    #[test]
    fn missing_amounts_sum_to_zero() {
        init();
        let mut r = RawRecord::new("P1");
        r.total = None;
        let agg = aggregate(&[r], &AggregationRules::default());
        assert_eq!(agg.records[0].credit, Some(0.0));
        assert_eq!(agg.records[0].total, None);
        assert_eq!(agg.records[0].authors, None);
    }

    #[test]
    fn format_records_keeps_every_row() {
        let rows = vec![
            row("P1", "Smith, Jane", 1.0, 100.0),
            row("P1", "Doe, John", 2.0, 150.0),
        ];
        let formatted = format_records(&rows);
        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[1].authors, Some("John Doe".to_string()));
        assert_eq!(formatted[1].total, Some(150.0));
    }

    #[test]
    fn empty_input_is_valid() {
        init();
        let agg = aggregate(&[], &AggregationRules::default());
        assert!(agg.records.is_empty());
        assert_eq!(agg.stats.input_rows, 0);
        assert_eq!(agg.total_policy, TotalPolicy::First);
    }
}
