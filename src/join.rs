use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::records::{CaseRecord, GeoRecord, JoinStats, JoinedRecord};

/// Inner join of case rows and geo rows on exact country-name equality.
///
/// Output follows the order of `cases`. A name repeated on both sides yields
/// one row per matching pair. Rows without a partner are dropped and counted.
pub fn join(cases: &[CaseRecord], geo: &[GeoRecord]) -> (Vec<JoinedRecord>, JoinStats) {
    let mut by_name: HashMap<&str, Vec<&GeoRecord>> = HashMap::new();
    for record in geo {
        by_name.entry(record.country.as_str()).or_default().push(record);
    }

    let mut joined = Vec::new();
    let mut matched_names: HashSet<&str> = HashSet::new();
    let mut stats = JoinStats::default();

    for case in cases {
        match by_name.get(case.country.as_str()) {
            Some(partners) => {
                matched_names.insert(case.country.as_str());
                joined.extend(partners.iter().map(|g| JoinedRecord::from_parts(case, g)));
            }
            None => stats.unmatched_cases += 1,
        }
    }

    stats.unmatched_geo = geo
        .iter()
        .filter(|g| !matched_names.contains(g.country.as_str()))
        .count();

    if joined.is_empty() {
        warn!(action = "complete", component = "join", "Join produced no records; the map will be empty");
    } else {
        info!(
            action = "complete",
            component = "join",
            joined = joined.len(),
            unmatched_cases = stats.unmatched_cases,
            unmatched_geo = stats.unmatched_geo,
            "Case and geo records joined"
        );
    }

    (joined, stats)
}
