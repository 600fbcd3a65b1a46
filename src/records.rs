use chrono::{DateTime, Utc};

/// Per-country case statistics from the summary endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub country: String,
    pub total_confirmed: u64,
    pub total_deaths: u64,
    pub total_recovered: u64,
}

/// Country centroid from the metadata endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub country: String,
    /// `None` when the upstream entry has no usable coordinate pair.
    pub lat_lng: Option<(f64, f64)>,
}

/// A country present in both the case and metadata sources.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    /// Join key; rewritten to the boundary-dataset name by reconciliation.
    pub country: String,
    /// Name as reported by the case API, shown in marker popups.
    pub display_name: String,
    pub total_confirmed: u64,
    pub total_deaths: u64,
    pub total_recovered: u64,
    pub lat_lng: Option<(f64, f64)>,
}

impl JoinedRecord {
    pub fn from_parts(cases: &CaseRecord, geo: &GeoRecord) -> Self {
        Self {
            country: cases.country.clone(),
            display_name: cases.country.clone(),
            total_confirmed: cases.total_confirmed,
            total_deaths: cases.total_deaths,
            total_recovered: cases.total_recovered,
            lat_lng: geo.lat_lng,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeverityTier {
    Low,
    Medium,
    High,
}

impl SeverityTier {
    /// Marker color used by the renderer.
    pub fn color(self) -> &'static str {
        match self {
            SeverityTier::Low => "green",
            SeverityTier::Medium => "orange",
            SeverityTier::High => "red",
        }
    }
}

/// Parsed case payload: the per-country rows plus the report date, if any.
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub records: Vec<CaseRecord>,
    pub reported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct JoinStats {
    pub unmatched_cases: usize,
    pub unmatched_geo: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TierCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl TierCounts {
    pub fn add(&mut self, tier: SeverityTier) {
        match tier {
            SeverityTier::Low => self.low += 1,
            SeverityTier::Medium => self.medium += 1,
            SeverityTier::High => self.high += 1,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub reported_at: Option<DateTime<Utc>>,
    pub case_records: usize,
    pub geo_records: usize,
    pub joined: usize,
    pub join_stats: JoinStats,
    pub renamed: usize,
    pub tiers: TierCounts,
    pub boundary_features: usize,
    pub unmatched_boundaries: Vec<String>,
    pub output: std::path::PathBuf,
}
