use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::records::{CaseReport, CaseRecord, GeoRecord};

#[derive(Deserialize)]
struct RawSummary {
    #[serde(rename = "Countries")]
    countries: Vec<Value>,
    #[serde(rename = "Date", default)]
    date: Option<Value>,
}

/// A non-negative integer count. Missing or `null` is zero; any other shape is
/// logged and also becomes zero.
fn count_field(row: &Value, key: &str, country: &str) -> u64 {
    match row.get(key) {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().unwrap_or_else(|| {
            warn!(action = "parse", component = "case_normalizer", country = country, field = key, value = %value, "Invalid count; using 0");
            0
        }),
    }
}

fn string_field(row: &Value, key: &str, component: &'static str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(value) => {
            warn!(action = "parse", component = component, field = key, value = %value, "Invalid string field; using empty name");
            String::new()
        }
    }
}

/// The first two elements of `latlng` when both are numbers.
fn lat_lng_field(row: &Value, country: &str) -> Option<(f64, f64)> {
    let value = row.get("latlng")?;
    let pair = match value.as_array().map(Vec::as_slice) {
        Some([lat, lng, ..]) => lat.as_f64().zip(lng.as_f64()),
        Some(_) => return None,
        None if value.is_null() => return None,
        None => None,
    };
    if pair.is_none() {
        warn!(action = "parse", component = "geo_normalizer", country = country, value = %value, "Invalid coordinates; ignoring");
    }
    pair
}

/// Flattens the summary payload's `Countries` array into case rows.
///
/// Malformed fields inside a row default instead of failing the payload.
pub fn normalize_cases(json: Value) -> Result<CaseReport> {
    let raw: RawSummary =
        serde_json::from_value(json).context("Case payload has no `Countries` array")?;

    let reported_at = raw.date.as_ref().and_then(|value| {
        let date = value.as_str()?;
        match DateTime::parse_from_rfc3339(date) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(e) => {
                warn!(action = "parse", component = "case_normalizer", date = date, error = %e, "Ignoring unparseable report date");
                None
            }
        }
    });

    let records: Vec<CaseRecord> = raw
        .countries
        .iter()
        .map(|row| {
            let country = string_field(row, "Country", "case_normalizer");
            CaseRecord {
                total_confirmed: count_field(row, "TotalConfirmed", &country),
                total_deaths: count_field(row, "TotalDeaths", &country),
                total_recovered: count_field(row, "TotalRecovered", &country),
                country,
            }
        })
        .collect();

    info!(action = "complete", component = "case_normalizer", record_count = records.len(), "Case records normalized");
    Ok(CaseReport {
        records,
        reported_at,
    })
}

/// Flattens the country metadata array into name/coordinate rows.
pub fn normalize_geo(json: Value) -> Result<Vec<GeoRecord>> {
    let raw: Vec<Value> =
        serde_json::from_value(json).context("Country metadata payload is not an array")?;

    let records: Vec<GeoRecord> = raw
        .iter()
        .map(|row| {
            let country = string_field(row, "name", "geo_normalizer");
            GeoRecord {
                lat_lng: lat_lng_field(row, &country),
                country,
            }
        })
        .collect();

    info!(action = "complete", component = "geo_normalizer", record_count = records.len(), "Geo records normalized");
    Ok(records)
}

/// Decodes the boundary payload as a GeoJSON feature collection.
pub fn normalize_boundaries(json: Value) -> Result<FeatureCollection> {
    let collection: FeatureCollection = serde_json::from_value(json)
        .context("Boundary payload is not a GeoJSON FeatureCollection")?;

    let unnamed = collection
        .features
        .iter()
        .filter(|feature| feature_name(feature).is_none())
        .count();
    if unnamed > 0 {
        warn!(action = "validate", component = "boundary_normalizer", unnamed_features = unnamed, "Boundary features without a name property");
    }

    info!(action = "complete", component = "boundary_normalizer", feature_count = collection.features.len(), "Boundary features decoded");
    Ok(collection)
}

/// The `properties.name` string of a boundary feature.
pub fn feature_name(feature: &geojson::Feature) -> Option<&str> {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_cases_selects_fields() {
        let payload = json!({
            "Global": {"TotalConfirmed": 5},
            "Countries": [{
                "Country": "India",
                "CountryCode": "IN",
                "Slug": "india",
                "NewConfirmed": 3,
                "TotalConfirmed": 1200,
                "TotalDeaths": 30,
                "TotalRecovered": 800
            }],
            "Date": "2020-05-01T12:00:00Z"
        });

        let report = normalize_cases(payload).unwrap();
        assert_eq!(
            report.records,
            vec![CaseRecord {
                country: "India".to_string(),
                total_confirmed: 1200,
                total_deaths: 30,
                total_recovered: 800,
            }]
        );
        assert_eq!(
            report.reported_at.unwrap().format("%B %-d, %Y").to_string(),
            "May 1, 2020"
        );
    }

    #[test]
    fn test_normalize_cases_missing_fields_default() {
        let payload = json!({"Countries": [{"Country": "Chad", "TotalDeaths": null}]});
        let report = normalize_cases(payload).unwrap();
        assert_eq!(report.records[0].total_confirmed, 0);
        assert_eq!(report.records[0].total_deaths, 0);
        assert!(report.reported_at.is_none());
    }

    #[test]
    fn test_normalize_cases_malformed_counts_default() {
        let payload = json!({"Countries": [
            {"Country": "Chad", "TotalConfirmed": "n/a", "TotalDeaths": 12.0, "TotalRecovered": -3},
            {"Country": "Peru", "TotalConfirmed": 900, "TotalDeaths": 40, "TotalRecovered": 700},
            {"Country": 7, "TotalConfirmed": 1}
        ]});

        let report = normalize_cases(payload).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(
            report.records[0],
            CaseRecord {
                country: "Chad".to_string(),
                total_confirmed: 0,
                total_deaths: 0,
                total_recovered: 0,
            }
        );
        assert_eq!(report.records[1].total_confirmed, 900);
        assert_eq!(report.records[1].total_recovered, 700);
        assert_eq!(report.records[2].country, "");
        assert_eq!(report.records[2].total_confirmed, 1);
    }

    #[test]
    fn test_normalize_cases_bad_date_is_ignored() {
        let payload = json!({"Countries": [], "Date": "yesterday"});
        assert!(normalize_cases(payload).unwrap().reported_at.is_none());
    }

    #[test]
    fn test_normalize_cases_requires_countries() {
        assert!(normalize_cases(json!({"Message": "Caching in progress"})).is_err());
    }

    #[test]
    fn test_normalize_geo() {
        let payload = json!([
            {"name": "Russian Federation", "latlng": [60.0, 100.0], "capital": "Moscow"},
            {"name": "Antarctica", "latlng": []},
            {"name": "Nowhere"}
        ]);

        let records = normalize_geo(payload).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].lat_lng, Some((60.0, 100.0)));
        assert_eq!(records[1].lat_lng, None);
        assert_eq!(records[2].lat_lng, None);
    }

    #[test]
    fn test_normalize_geo_malformed_coordinates() {
        let payload = json!([
            {"name": "Chad", "latlng": [null, 5.0]},
            {"name": "Peru", "latlng": "10,-76"},
            {"name": "Mali", "latlng": [17.0, -4.0]},
            {"name": null, "latlng": [1.0, 2.0]}
        ]);

        let records = normalize_geo(payload).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].lat_lng, None);
        assert_eq!(records[1].lat_lng, None);
        assert_eq!(records[2].lat_lng, Some((17.0, -4.0)));
        assert_eq!(records[3].country, "");
        assert_eq!(records[3].lat_lng, Some((1.0, 2.0)));
    }

    #[test]
    fn test_normalize_geo_rejects_object() {
        assert!(normalize_geo(json!({"status": 404})).is_err());
    }

    #[test]
    fn test_normalize_boundaries() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": "Russia"},
                "geometry": {"type": "Polygon", "coordinates": [[[30.0, 50.0], [40.0, 50.0], [40.0, 60.0], [30.0, 50.0]]]}
            }]
        });

        let collection = normalize_boundaries(payload).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(feature_name(&collection.features[0]), Some("Russia"));
    }

    #[test]
    fn test_normalize_boundaries_rejects_non_collection() {
        assert!(normalize_boundaries(json!([1, 2, 3])).is_err());
    }
}
