//! 地圖輸出：Plotly 圖表 JSON、獨立 HTML，以及每種藥物一張 SVG 靜態圖。

use crate::domain::model::{AvailabilityReport, CountryAvailability};
use crate::utils::error::Result;
use serde_json::{json, Value};

pub const FIGURE_TITLE: &str = "European ADHD medication";
pub const UNAVAILABLE_COLOR: &str = "#d73027";
pub const AVAILABLE_COLOR: &str = "#1a9850";
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// 紅→綠；整層數值相同時改用單色，避免漸層暗示差異
pub fn colorscale(z: &[u8]) -> Value {
    let uniform = z.windows(2).all(|pair| pair[0] == pair[1]);
    match (uniform, z.first()) {
        (true, Some(&value)) => {
            let color = if value == 0 { UNAVAILABLE_COLOR } else { AVAILABLE_COLOR };
            json!([[0.0, color], [1.0, color]])
        }
        _ => json!([[0.0, UNAVAILABLE_COLOR], [1.0, AVAILABLE_COLOR]]),
    }
}

fn layer_values(countries: &[CountryAvailability], medication: &str) -> Vec<u8> {
    countries.iter().map(|c| c.flag(medication).as_z()).collect()
}

pub fn build_figure(report: &AvailabilityReport) -> Value {
    let locations: Vec<&str> = report.countries.iter().map(|c| c.iso_alpha3.as_str()).collect();
    let text: Vec<String> = report.countries.iter().map(CountryAvailability::hover_text).collect();
    let count = report.medications.len();

    let traces: Vec<Value> = report
        .medications
        .iter()
        .enumerate()
        .map(|(i, medication)| {
            let z = layer_values(&report.countries, medication);
            let scale = colorscale(&z);
            json!({
                "type": "choropleth",
                "name": medication,
                "locations": locations,
                "locationmode": "ISO-3",
                "z": z,
                "zmin": 0,
                "zmax": 1,
                "colorscale": scale,
                "hoverinfo": "text",
                "text": text,
                "showscale": false,
                "visible": i == 0,
            })
        })
        .collect();

    let steps: Vec<Value> = report
        .medications
        .iter()
        .enumerate()
        .map(|(i, medication)| {
            let visible: Vec<bool> = (0..count).map(|j| j == i).collect();
            json!({
                "method": "update",
                "label": medication,
                "args": [
                    {"visible": visible},
                    {"title": {"text": format!("{}: {}", FIGURE_TITLE, medication)}}
                ],
            })
        })
        .collect();

    let initial_title = match report.medications.first() {
        Some(first) => format!("{}: {}", FIGURE_TITLE, first),
        None => FIGURE_TITLE.to_string(),
    };

    json!({
        "data": traces,
        "layout": {
            "title": {"text": initial_title},
            "geo": {"scope": "europe", "showframe": false},
            "margin": {"l": 0, "r": 0, "t": 60, "b": 0},
            "sliders": [{
                "active": 0,
                "currentvalue": {"prefix": "Select medication: "},
                "steps": steps,
            }],
        },
    })
}

/// 獨立 HTML 文件，plotly.js 由 CDN 載入
pub fn to_html(figure: &Value) -> Result<String> {
    // 避免 JSON 內容提前關閉 <script>
    let payload = serde_json::to_string(figure)?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
<style>html, body, #map {{ margin: 0; width: 100%; height: 100%; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const figure = {payload};
Plotly.newPlot("map", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#,
        title = FIGURE_TITLE,
        cdn = PLOTLY_CDN,
        payload = payload,
    ))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 檔名用：小寫英數，其餘換成 '-'
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "layer".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 單一藥物的靜態圖：每個國家一格方塊
pub fn layer_svg(report: &AvailabilityReport, medication: &str) -> String {
    const COLUMNS: usize = 8;
    const TILE_W: usize = 120;
    const TILE_H: usize = 56;
    const GAP: usize = 6;
    const HEADER: usize = 48;

    let rows = report.countries.len().div_ceil(COLUMNS);
    let width = COLUMNS * (TILE_W + GAP) + GAP;
    let height = HEADER + rows * (TILE_H + GAP) + GAP;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">
<rect width="100%" height="100%" fill="white"/>
<text x="{gap}" y="32" font-size="20">{title}: {medication}</text>
"#,
        w = width,
        h = height,
        gap = GAP,
        title = FIGURE_TITLE,
        medication = escape_xml(medication),
    );

    for (i, country) in report.countries.iter().enumerate() {
        let x = GAP + (i % COLUMNS) * (TILE_W + GAP);
        let y = HEADER + GAP + (i / COLUMNS) * (TILE_H + GAP);
        let fill = if country.flag(medication).as_z() == 1 {
            AVAILABLE_COLOR
        } else {
            UNAVAILABLE_COLOR
        };
        svg.push_str(&format!(
            r#"<g><title>{tooltip}</title><rect x="{x}" y="{y}" width="{tw}" height="{th}" rx="4" fill="{fill}"/><text x="{tx}" y="{ty1}" font-size="16" fill="white" text-anchor="middle">{code}</text><text x="{tx}" y="{ty2}" font-size="11" fill="white" text-anchor="middle">{name}</text></g>
"#,
            tooltip = escape_xml(&country.hover_text().replace("<br>", ": ")),
            tw = TILE_W,
            th = TILE_H,
            tx = x + TILE_W / 2,
            ty1 = y + 24,
            ty2 = y + 44,
            code = escape_xml(&country.iso_alpha3),
            name = escape_xml(&country.country),
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
