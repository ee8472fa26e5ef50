// ********* Input data structures ***********

use std::fmt::Display;

/// The identifier of a proposal.
///
/// Identifiers are compared as strings. Spreadsheets frequently store the
/// same number either as an integer or as a float, so the constructor
/// canonicalizes integral numbers written with a fractional part:
/// `"1234.0"` and `"1234"` are the same proposal. Leading zeros are kept.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Default)]
pub struct ProposalId(String);

impl ProposalId {
    pub fn new(raw: &str) -> ProposalId {
        let s = raw.trim();
        if let Some((int_part, frac_part)) = s.split_once('.') {
            let digits = int_part.strip_prefix('-').unwrap_or(int_part);
            let is_int = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
            if is_int && !frac_part.is_empty() && frac_part.chars().all(|c| c == '0') {
                return ProposalId(int_part.to_string());
            }
        }
        ProposalId(s.to_string())
    }

    /// Builds an identifier from a numeric spreadsheet cell.
    pub fn from_number(x: f64) -> ProposalId {
        if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
            ProposalId(format!("{}", x as i64))
        } else {
            ProposalId(x.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value, if the identifier is a plain integer.
    pub fn as_number(&self) -> Option<i64> {
        self.0.parse::<i64>().ok()
    }
}

impl Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the source spreadsheet.
///
/// A proposal with several co-authors appears once per author.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawRecord {
    pub proposal_no: ProposalId,
    pub date_submitted: Option<String>,
    pub title: Option<String>,
    pub sponsor: Option<String>,
    pub prime_sponsor: Option<String>,
    /// The principal investigator, usually as "Last, First".
    pub pi: Option<String>,
    pub credit: Option<f64>,
    pub first: Option<f64>,
    pub total: Option<f64>,
    pub theme: Option<String>,
}

impl RawRecord {
    pub fn new(proposal_no: &str) -> RawRecord {
        RawRecord {
            proposal_no: ProposalId::new(proposal_no),
            ..Default::default()
        }
    }
}

// ******** Output data structures *********

/// One row per proposal after aggregation.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregatedRecord {
    pub proposal_no: ProposalId,
    pub date_submitted: Option<String>,
    pub title: Option<String>,
    pub sponsor: Option<String>,
    pub prime_sponsor: Option<String>,
    /// The formatted names of all the authors, in row order.
    pub authors: Option<String>,
    pub credit: Option<f64>,
    pub first: Option<f64>,
    pub total: Option<f64>,
    pub theme: Option<String>,
}

impl AggregatedRecord {
    pub(crate) fn empty(proposal_no: ProposalId) -> AggregatedRecord {
        AggregatedRecord {
            proposal_no,
            date_submitted: None,
            title: None,
            sponsor: None,
            prime_sponsor: None,
            authors: None,
            credit: None,
            first: None,
            total: None,
            theme: None,
        }
    }
}

/// A proposal whose rows disagree on the total amount.
#[derive(PartialEq, Debug, Clone)]
pub struct InconsistentTotal {
    pub proposal_no: ProposalId,
    /// The number of distinct total values.
    pub distinct: usize,
    pub min: f64,
    pub max: f64,
    /// The number of rows that carry a total.
    pub count: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AggregationStats {
    pub input_rows: usize,
    pub output_groups: usize,
    pub inconsistent_totals: Vec<InconsistentTotal>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Aggregation {
    pub records: Vec<AggregatedRecord>,
    pub total_policy: TotalPolicy,
    pub stats: AggregationStats,
}

// ********* Configuration **********

/// How the total amount of a proposal is reduced over its rows.
///
/// The policy is decided once for a whole run by looking at all the groups.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TotalPolicy {
    /// All the groups agree on their totals: take the first one.
    First,
    /// At least one group disagrees: take the maximum for every group.
    Max,
}

/// The reduction applied to one output column.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Reduction {
    First,
    Sum,
    Join,
    /// Resolved with the run's `TotalPolicy`.
    ConditionalMax,
}

/// The columns of an aggregated record, in output order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Field {
    DateSubmitted,
    Title,
    Sponsor,
    PrimeSponsor,
    Authors,
    Credit,
    First,
    Total,
    Theme,
}

/// The reduction rule for every aggregated column.
pub const FIELD_RULES: [(Field, Reduction); 9] = [
    (Field::DateSubmitted, Reduction::First),
    (Field::Title, Reduction::First),
    (Field::Sponsor, Reduction::First),
    (Field::PrimeSponsor, Reduction::First),
    (Field::Authors, Reduction::Join),
    (Field::Credit, Reduction::Sum),
    (Field::First, Reduction::Sum),
    (Field::Total, Reduction::ConditionalMax),
    (Field::Theme, Reduction::First),
];

/// The order of the aggregated records.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GroupOrder {
    /// In the order in which proposal numbers first appear in the input.
    FirstSeen,
    /// Sorted by proposal number (numerically when both are integers).
    Sorted,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregationRules {
    /// Inserted between author names. There is no space after it.
    pub author_separator: String,
    pub group_order: GroupOrder,
}

impl AggregationRules {
    pub fn new(author_separator: &str, group_order: GroupOrder) -> AggregationRules {
        AggregationRules {
            author_separator: author_separator.to_string(),
            group_order,
        }
    }
}

impl Default for AggregationRules {
    fn default() -> Self {
        AggregationRules::new(",", GroupOrder::FirstSeen)
    }
}

/// The acronyms that keep their spelling in normalized themes.
pub const DEFAULT_ACRONYMS: [&str; 6] = ["AI", "CPS", "IoT", "VR", "AR", "ML"];
