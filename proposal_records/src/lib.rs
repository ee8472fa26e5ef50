/*!
Aggregation and normalization of research-proposal records.

The spreadsheets exported by the proposal office contain one row per author
of a proposal. This crate folds these rows into one record per proposal,
formats the author names, normalizes theme labels and sums the funding of
every sponsor. It does not do any I/O: see the `proptsv` program for
reading and writing files.

```
use proposal_records::*;

let rows = vec![
    RawRecord { pi: Some("Smith, Jane".to_string()), total: Some(100.0), ..RawRecord::new("1") },
    RawRecord { pi: Some("Doe, John".to_string()), total: Some(100.0), ..RawRecord::new("1") },
];
let agg = aggregate(&rows, &AggregationRules::default());
assert_eq!(agg.records[0].authors.as_deref(), Some("Jane Smith,John Doe"));
```
*/
mod aggregate;
mod config;
pub mod manual;
mod names;
mod sponsors;
mod themes;

pub use crate::aggregate::{aggregate, format_records};
pub use crate::config::*;
pub use crate::names::format_name;
pub use crate::sponsors::{summarize_sponsors, FundedRecord, SponsorSummary, SponsorTotal};
pub use crate::themes::{catalog_themes, ThemeCount, ThemeNormalizer};
