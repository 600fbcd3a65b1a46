use crate::records::SeverityTier;

/// A tier applies to ratios strictly below `max_ratio`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityBand {
    pub max_ratio: f64,
    pub tier: SeverityTier,
}

/// Bands in ascending order. A ratio at or above the last bound is `High`.
pub const DEFAULT_BANDS: &[SeverityBand] = &[
    SeverityBand {
        max_ratio: 5.0,
        tier: SeverityTier::Low,
    },
    SeverityBand {
        max_ratio: 20.0,
        tier: SeverityTier::Medium,
    },
];

/// Deaths over confirmed cases, as a percentage. `None` when nothing is confirmed.
pub fn case_fatality_ratio(total_deaths: u64, total_confirmed: u64) -> Option<f64> {
    if total_confirmed == 0 {
        return None;
    }
    Some(total_deaths as f64 * 100.0 / total_confirmed as f64)
}

pub fn classify(total_deaths: u64, total_confirmed: u64) -> SeverityTier {
    classify_with(total_deaths, total_confirmed, DEFAULT_BANDS)
}

/// Zero confirmed cases classify as `Low`.
pub fn classify_with(total_deaths: u64, total_confirmed: u64, bands: &[SeverityBand]) -> SeverityTier {
    let Some(ratio) = case_fatality_ratio(total_deaths, total_confirmed) else {
        return SeverityTier::Low;
    };

    bands
        .iter()
        .find(|band| ratio < band.max_ratio)
        .map(|band| band.tier)
        .unwrap_or(SeverityTier::High)
}
