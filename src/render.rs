//! Leaflet map document generation.
//!
//! Produces a single HTML page with a tile base layer, a toggleable marker
//! overlay (one marker per country, colored by severity) and a choropleth of
//! confirmed cases over the boundary features. Identifiers are fixed, so the
//! same input always yields the same bytes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::normalize::feature_name;
use crate::records::JoinedRecord;
use crate::severity::classify;
use crate::utils::format_number;

const MAP_CENTER: [f64; 2] = [21.0, 78.0];
const MAP_ZOOM: u8 = 4;

const TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
const TILE_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

const BASE_LAYER_NAME: &str = "Covid-19 Map";
const MARKER_LAYER_NAME: &str = "Details";
const CHOROPLETH_LAYER_NAME: &str = "Choropleth COVID-19";
const LEGEND_NAME: &str = "Confirmed cases";

const POPUP_MAX_WIDTH: u32 = 200;
const MISSING_FILL_COLOR: &str = "gray";
const BOUNDARY_LINE_COLOR: &str = "blue";

/// ColorBrewer "Blues", six classes.
const BLUES: [&str; 6] = ["#eff3ff", "#c6dbef", "#9ecae1", "#6baed6", "#3182bd", "#08519c"];

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no" />
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css"/>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@3.4.1/dist/css/bootstrap.min.css"/>
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css"/>
    <script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js"></script>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
    <style>
        html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
        #map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
        .legend { background: #ffffff; padding: 6px 10px; border-radius: 4px; box-shadow: 0 1px 4px rgba(0, 0, 0, 0.3); font: 12px/1.5 sans-serif; }
        .legend-title { font-weight: bold; margin-bottom: 4px; }
        .legend-swatch { display: inline-block; width: 14px; height: 14px; margin-right: 6px; vertical-align: middle; border: 1px solid #999999; }
        .legend-note { margin-top: 4px; color: #555555; }
    </style>
"#;

/// Linear binning of confirmed-case counts onto the `BLUES` ramp.
///
/// Each bin includes its lower edge; the last bin also includes the maximum.
/// When every value is equal there is a single bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    thresholds: Vec<f64>,
}

impl ColorScale {
    /// Evenly spaced bins between the smallest and largest value. `None` without data.
    pub fn linear(values: &[u64]) -> Option<Self> {
        let min = *values.iter().min()? as f64;
        let max = *values.iter().max()? as f64;
        if min == max {
            return Some(Self {
                thresholds: vec![min, max],
            });
        }
        let bins = BLUES.len();
        let thresholds = (0..=bins)
            .map(|i| min + (max - min) * i as f64 / bins as f64)
            .collect();
        Some(Self { thresholds })
    }

    pub fn color_for(&self, value: u64) -> &'static str {
        let value = value as f64;
        let last = self.thresholds.len() - 1;
        let bin = self.thresholds[1..last]
            .iter()
            .filter(|&&edge| value >= edge)
            .count();
        BLUES[bin]
    }

    /// `(color, lower, upper)` for each bin.
    pub fn bins(&self) -> impl Iterator<Item = (&'static str, f64, f64)> + '_ {
        self.thresholds
            .windows(2)
            .zip(BLUES)
            .map(|(bounds, color)| (color, bounds[0], bounds[1]))
    }
}

#[derive(Serialize)]
struct MarkerData {
    location: [f64; 2],
    color: &'static str,
    popup: String,
}

/// Escape text for HTML.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON literal safe to embed inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn popup_html(record: &JoinedRecord) -> String {
    format!(
        "<strong>Country : {}</strong><br>\
         <strong>Total Cases : {}</strong><br>\
         <strong><span style=\"color:red\">Deaths : </span>{}</strong><br>\
         <strong><span style=\"color:green\">Recovered : </span>{}</strong>",
        escape_html(&record.display_name),
        record.total_confirmed,
        record.total_deaths,
        record.total_recovered
    )
}

fn legend_html(scale: Option<&ColorScale>, reported_at: Option<DateTime<Utc>>) -> String {
    let mut legend = format!("<div class=\"legend-title\">{}</div>", LEGEND_NAME);
    if let Some(scale) = scale {
        for (color, lower, upper) in scale.bins() {
            legend.push_str(&format!(
                "<div><span class=\"legend-swatch\" style=\"background:{}\"></span>{} - {}</div>",
                color,
                format_number(lower.round() as u64),
                format_number(upper.round() as u64)
            ));
        }
    }
    legend.push_str(&format!(
        "<div><span class=\"legend-swatch\" style=\"background:{}\"></span>No data</div>",
        MISSING_FILL_COLOR
    ));
    if let Some(date) = reported_at {
        legend.push_str(&format!(
            "<div class=\"legend-note\">Data as of {}</div>",
            date.format("%B %-d, %Y")
        ));
    }
    legend
}

/// Record countries that no boundary feature is named after, sorted and deduplicated.
pub fn unmatched_countries(records: &[JoinedRecord], boundaries: &FeatureCollection) -> Vec<String> {
    let names: BTreeSet<&str> = boundaries.features.iter().filter_map(feature_name).collect();
    records
        .iter()
        .map(|r| r.country.as_str())
        .filter(|country| !names.contains(country))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn render(
    records: &[JoinedRecord],
    boundaries: &FeatureCollection,
    reported_at: Option<DateTime<Utc>>,
) -> Result<String> {
    let markers: Vec<MarkerData> = records
        .iter()
        .filter_map(|record| {
            let (lat, lng) = record.lat_lng?;
            Some(MarkerData {
                location: [lat, lng],
                color: classify(record.total_deaths, record.total_confirmed).color(),
                popup: popup_html(record),
            })
        })
        .collect();

    let confirmed: Vec<u64> = records.iter().map(|r| r.total_confirmed).collect();
    let scale = ColorScale::linear(&confirmed);
    let fills: BTreeMap<&str, &str> = match &scale {
        Some(scale) => records
            .iter()
            .map(|r| (r.country.as_str(), scale.color_for(r.total_confirmed)))
            .collect(),
        None => BTreeMap::new(),
    };

    let title = match reported_at {
        Some(date) => format!("COVID-19 Map - Data as of {}", date.format("%B %-d, %Y")),
        None => "COVID-19 Map".to_string(),
    };

    let map_options = serde_json::json!({ "center": MAP_CENTER, "zoom": MAP_ZOOM });
    let tile_options = serde_json::json!({
        "attribution": TILE_ATTRIBUTION,
        "subdomains": "abcd",
        "maxZoom": 20,
    });
    let style = serde_json::json!({
        "color": BOUNDARY_LINE_COLOR,
        "weight": 1,
        "opacity": 1,
        "fillOpacity": 1,
    });

    let mut html = String::with_capacity(64 * 1024);
    html.push_str(HEAD);
    writeln!(html, "    <title>{}</title>", escape_html(&title))?;
    html.push_str("</head>\n<body>\n    <div id=\"map\"></div>\n<script>\n");

    writeln!(html, "var map = L.map(\"map\", {});", script_json(&map_options)?)?;
    writeln!(
        html,
        "var base_layer = L.tileLayer({}, {}).addTo(map);",
        script_json(TILE_URL)?,
        script_json(&tile_options)?
    )?;

    // Markers live in a group that starts detached, so the overlay is unchecked.
    writeln!(html, "var marker_data = {};", script_json(&markers)?)?;
    html.push_str("var marker_layer = L.featureGroup();\n");
    writeln!(
        html,
        "marker_data.forEach(function (m) {{\n    L.marker(m.location, {{icon: L.AwesomeMarkers.icon({{icon: \"info-sign\", iconColor: \"white\", markerColor: m.color, prefix: \"glyphicon\"}})}})\n        .bindPopup(m.popup, {{maxWidth: {}}})\n        .addTo(marker_layer);\n}});",
        POPUP_MAX_WIDTH
    )?;

    writeln!(html, "var choropleth_fills = {};", script_json(&fills)?)?;
    writeln!(html, "var choropleth_style = {};", script_json(&style)?)?;
    writeln!(html, "var boundaries = {};", script_json(boundaries)?)?;
    writeln!(
        html,
        "var choropleth_layer = L.geoJson(boundaries, {{\n    style: function (feature) {{\n        var name = (feature.properties || {{}}).name;\n        var fill = Object.prototype.hasOwnProperty.call(choropleth_fills, name) ? choropleth_fills[name] : {};\n        return Object.assign({{fillColor: fill}}, choropleth_style);\n    }}\n}}).bindTooltip(function (layer) {{\n    var name = (layer.feature.properties || {{}}).name;\n    return name == null ? \"\" : String(name);\n}}, {{sticky: true}}).addTo(map);",
        script_json(MISSING_FILL_COLOR)?
    )?;

    writeln!(html, "var legend = L.control({{position: \"bottomright\"}});")?;
    writeln!(
        html,
        "legend.onAdd = function () {{\n    var div = L.DomUtil.create(\"div\", \"legend\");\n    div.innerHTML = {};\n    return div;\n}};\nlegend.addTo(map);",
        script_json(&legend_html(scale.as_ref(), reported_at))?
    )?;

    writeln!(
        html,
        "L.control.layers({{{}: base_layer}}, {{{}: marker_layer, {}: choropleth_layer}}, {{position: \"topright\", collapsed: true}}).addTo(map);",
        script_json(BASE_LAYER_NAME)?,
        script_json(MARKER_LAYER_NAME)?,
        script_json(CHOROPLETH_LAYER_NAME)?
    )?;
    html.push_str("</script>\n</body>\n</html>\n");

    Ok(html)
}
