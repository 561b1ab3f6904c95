// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::distance::Coordinate;
use crate::select::Candidate;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LEAFLET_VERSION: &str = "1.9.4";
const DEFAULT_ZOOM: u8 = 6;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct FilmMarker {
    lat: f64,
    lon: f64,
    /// Already HTML-escaped; Leaflet popups take markup.
    title: String,
}

/// File name of the map produced for `year`.
pub fn map_file_name(year: u32) -> String {
    format!("{}_movies_map.html", year)
}

/// Builds a standalone Leaflet page with one marker and one line per film.
pub fn render_html(
    candidates: &[Candidate],
    reference: Coordinate,
    year: u32,
) -> Result<String, RenderError> {
    let films: Vec<FilmMarker> = candidates
        .iter()
        .map(|c| FilmMarker {
            lat: c.coordinate.lat,
            lon: c.coordinate.lon,
            title: html_escape::encode_safe(&c.title).into_owned(),
        })
        .collect();

    let films_json = serde_json::to_string(&films)?;
    let start_json = serde_json::to_string(&reference.as_pair())?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta name="generator" content="film-map {version}">
<meta name="generated" content="{generated}">
<title>Films of {year} near you</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const start = {start};
const films = {films};
const map = L.map("map").setView(start, {zoom});
L.tileLayer("https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);

const markers = L.featureGroup();
films.forEach(function (f) {{
  L.marker([f.lat, f.lon]).bindPopup(f.title).addTo(markers);
}});
L.circleMarker(start, {{ color: "green", fillColor: "green", fillOpacity: 0.8, radius: 9 }})
  .bindPopup("You are here!")
  .addTo(markers);
markers.addTo(map);

const lines = L.featureGroup();
films.forEach(function (f) {{
  L.polyline([[f.lat, f.lon], start], {{ color: "red" }}).addTo(lines);
}});
lines.addTo(map);

L.control.layers(null, {{ "Markers with films": markers, "Lines": lines }}).addTo(map);
</script>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION"),
        generated = chrono::Local::now().to_rfc3339(),
        year = year,
        leaflet = LEAFLET_VERSION,
        start = start_json,
        films = films_json,
        zoom = DEFAULT_ZOOM,
    ))
}

/// Writes `<dir>/<year>_movies_map.html` and returns its path.
pub fn save_map(
    dir: &Path,
    candidates: &[Candidate],
    reference: Coordinate,
    year: u32,
) -> Result<PathBuf, RenderError> {
    let html = render_html(candidates, reference, year)?;
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)?;
    }
    let path = dir.join(map_file_name(year));
    fs::write(&path, html)?;
    info!(
        "Map written — path={} markers={}",
        path.display(),
        candidates.len()
    );
    Ok(path)
}
