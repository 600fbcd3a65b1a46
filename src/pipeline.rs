use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::aliases::{self, AliasTable};
use crate::fetch::{HttpFetcher, JsonSource};
use crate::records::{RunSummary, TierCounts};
use crate::utils::format_number;
use crate::{join, normalize, render, severity, Args};

/// Runs the whole pipeline against the live endpoints.
pub fn generate_map(args: &Args) -> Result<RunSummary> {
    let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout))?;
    generate_map_with(args, &fetcher)
}

/// fetch, normalize, join, reconcile, classify, render, write.
pub fn generate_map_with(args: &Args, source: &impl JsonSource) -> Result<RunSummary> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "pipeline", "Starting map generation");

    let alias_table = if args.no_aliases {
        AliasTable::default()
    } else {
        aliases::load_aliases(args.aliases.as_deref())?
    };

    let case_report = normalize::normalize_cases(source.fetch(&args.cases_url)?)
        .context("Failed to normalize case statistics")?;
    let geo_records = normalize::normalize_geo(source.fetch(&args.countries_url)?)
        .context("Failed to normalize country metadata")?;

    let (mut records, join_stats) = join::join(&case_report.records, &geo_records);

    let boundaries = normalize::normalize_boundaries(source.fetch(&args.borders_url)?)
        .context("Failed to decode country boundaries")?;

    let renamed = aliases::reconcile(&mut records, &alias_table);

    let mut tiers = TierCounts::default();
    for record in &records {
        if record.lat_lng.is_none() {
            warn!(action = "validate", component = "marker", country = %record.country, "No coordinates; marker skipped");
        }
        if record.total_confirmed == 0 {
            debug!(action = "classify", component = "severity", country = %record.country, "No confirmed cases; classified as low");
        }
        tiers.add(severity::classify(record.total_deaths, record.total_confirmed));
    }

    let unmatched_boundaries = render::unmatched_countries(&records, &boundaries);
    if !unmatched_boundaries.is_empty() {
        warn!(
            action = "validate",
            component = "choropleth",
            unmatched = unmatched_boundaries.len(),
            countries = ?unmatched_boundaries,
            "Countries without a boundary feature will not be shaded"
        );
    }

    let render_start = Instant::now();
    let html = render::render(&records, &boundaries, case_report.reported_at)?;
    info!(
        action = "complete",
        component = "render",
        bytes = html.len(),
        duration_ms = render_start.elapsed().as_millis(),
        "Map document rendered"
    );

    write_output(&args.output, &html)?;

    info!(
        action = "complete",
        component = "pipeline",
        output = ?args.output,
        duration_ms = total_start_time.elapsed().as_millis(),
        "Map generation completed successfully"
    );

    Ok(RunSummary {
        reported_at: case_report.reported_at,
        case_records: case_report.records.len(),
        geo_records: geo_records.len(),
        joined: records.len(),
        join_stats,
        renamed,
        tiers,
        boundary_features: boundaries.features.len(),
        unmatched_boundaries,
        output: args.output.clone(),
    })
}

/// Writes to a sibling `.tmp` file, then renames it over `path`.
pub fn write_output(path: &Path, html: &str) -> Result<()> {
    let mut tmp_name: OsString = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, html).with_context(|| format!("Failed to write {:?}", tmp_path))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            warn!(action = "cleanup", component = "output", path = ?tmp_path, error = %cleanup, "Failed to remove temporary file");
        }
        return Err(e).with_context(|| format!("Failed to move map into {:?}", path));
    }

    info!(action = "write", component = "output", path = ?path, bytes = html.len(), "Map written");
    Ok(())
}

pub fn print_run_summary(summary: &RunSummary) {
    println!("\n--- COVID-19 Map ---");

    if let Some(date) = summary.reported_at {
        println!("Data as of: {}", date.format("%B %-d, %Y"));
    }

    println!(
        "Countries with case data: {}",
        format_number(summary.case_records as u64)
    );
    println!(
        "Countries with metadata: {}",
        format_number(summary.geo_records as u64)
    );
    println!(
        "Countries mapped: {} (dropped: {} without country metadata, {} without case data)",
        format_number(summary.joined as u64),
        format_number(summary.join_stats.unmatched_cases as u64),
        format_number(summary.join_stats.unmatched_geo as u64)
    );
    println!("Names reconciled: {}", format_number(summary.renamed as u64));
    println!(
        "Severity: {} low, {} medium, {} high",
        format_number(summary.tiers.low as u64),
        format_number(summary.tiers.medium as u64),
        format_number(summary.tiers.high as u64)
    );
    println!(
        "Boundary features: {}",
        format_number(summary.boundary_features as u64)
    );

    if !summary.unmatched_boundaries.is_empty() {
        println!(
            "\nCountries without a boundary ({}):",
            summary.unmatched_boundaries.len()
        );
        for country in &summary.unmatched_boundaries {
            println!("- {}", country);
        }
    }

    println!("\nMap written to {}", summary.output.display());
}
