use log::debug;
use std::collections::HashMap;

use crate::config::AggregatedRecord;

/// A record that carries a sponsor and a funding amount.
pub trait FundedRecord {
    fn sponsor(&self) -> Option<&str>;
    fn total(&self) -> Option<f64>;
}

impl FundedRecord for AggregatedRecord {
    fn sponsor(&self) -> Option<&str> {
        self.sponsor.as_deref()
    }

    fn total(&self) -> Option<f64> {
        self.total
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct SponsorTotal {
    pub sponsor: String,
    pub total: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SponsorSummary {
    /// Sorted by decreasing total. Sponsors with the same total are in the
    /// order of their first appearance.
    pub sponsors: Vec<SponsorTotal>,
    pub grand_total: f64,
}

/// Sums the funding of every sponsor.
///
/// Records without a sponsor are not counted. Missing totals count as zero.
pub fn summarize_sponsors<R: FundedRecord>(records: &[R]) -> SponsorSummary {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut sponsors: Vec<SponsorTotal> = Vec::new();
    for r in records.iter() {
        let sponsor = match r.sponsor() {
            Some(s) => s,
            None => continue,
        };
        let amount = r.total().unwrap_or(0.0);
        match positions.get(sponsor) {
            Some(idx) => sponsors[*idx].total += amount,
            None => {
                positions.insert(sponsor, sponsors.len());
                sponsors.push(SponsorTotal {
                    sponsor: sponsor.to_string(),
                    total: amount,
                });
            }
        }
    }
    // Stable: ties keep the first appearance order.
    sponsors.sort_by(|a, b| b.total.total_cmp(&a.total));
    let grand_total = sponsors.iter().map(|s| s.total).sum();
    debug!(
        "summarize_sponsors: {} records, {} sponsors",
        records.len(),
        sponsors.len()
    );
    SponsorSummary {
        sponsors,
        grand_total,
    }
}
