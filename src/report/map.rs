use crate::analysis::statistics::format_thousands;
use crate::models::{EnrichedDetection, RiskCategory};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use serde_json::json;

const LEAFLET_VERSION: &str = "1.9.4";

#[derive(Serialize)]
struct MarkerData {
    lat: f64,
    lon: f64,
    color: &'static str,
    tooltip: String,
    popup: String,
}

fn popup_html(item: &EnrichedDetection) -> String {
    let d = &item.detection;
    let w = &item.weather;
    format!(
        "<b>Incendio - Riesgo: {risk}</b><br>\
         Fecha: {date}<br>\
         Hora: {time} UTC<br>\
         FRP: {frp:.1} MW<br>\
         Confianza: {conf:.0}%<br>\
         Ubicación: {lat:.4}, {lon:.4}<br>\
         <hr>\
         <b>Datos meteorológicos{fallback}:</b><br>\
         Viento: {wind} km/h<br>\
         Humedad: {hum}%<br>\
         Temperatura: {temp}°C<br>\
         Lluvia 7d: {rain} mm<br>\
         Índice de riesgo: {index}/100",
        risk = item.risk.category.label(),
        date = d.acq_date.format("%d/%m/%Y"),
        time = d.acq_time_label(),
        frp = d.frp,
        conf = d.confidence,
        lat = d.latitude,
        lon = d.longitude,
        fallback = if w.origin == crate::models::WeatherOrigin::Fallback { " (valores por defecto)" } else { "" },
        wind = w.wind_kmh,
        hum = w.humidity_pct,
        temp = w.temperature_c,
        rain = w.rain_7d_mm,
        index = item.risk.index,
    )
}

fn legend_html(detections: &[EnrichedDetection], start: NaiveDate, generated_at: DateTime<FixedOffset>) -> String {
    let risk_mean = if detections.is_empty() {
        0.0
    } else {
        detections.iter().map(|d| d.risk.index).sum::<f64>() / detections.len() as f64
    };

    let bands = [
        (RiskCategory::Bajo, "0-20"),
        (RiskCategory::Moderado, "20-40"),
        (RiskCategory::Alto, "40-60"),
        (RiskCategory::MuyAlto, "60-80"),
        (RiskCategory::Extremo, "80-100"),
        (RiskCategory::Critico, "30-30-30"),
    ];
    let rows: String = bands
        .iter()
        .map(|(c, range)| {
            format!(
                "<p style=\"margin:2px 0;\"><span style=\"color:{};\">&#9679;</span> {} ({})</p>",
                c.color(),
                c.label(),
                range
            )
        })
        .collect();

    format!(
        "<div style=\"position: fixed; bottom: 50px; right: 50px; width: 320px; background-color: white; \
         border:2px solid grey; z-index:9999; font-size:12px; padding: 12px; border-radius: 5px;\">\
         <p style=\"margin:0; font-weight:bold; font-size:14px;\">Incendios Patagonia Argentina</p>\
         <p style=\"margin:5px 0; font-size:11px; color:#666;\">Del {start} al {end}</p>\
         <hr style=\"margin: 8px 0;\">\
         <p style=\"margin:3px 0; font-weight:bold;\">Niveles de Riesgo:</p>{rows}\
         <hr style=\"margin: 8px 0;\">\
         <p style=\"margin:8px 0 0 0; font-size:11px; color:gray;\">Total: {total} detecciones<br>\
         Riesgo promedio: {mean:.1}/100</p></div>",
        start = start.format("%d/%m/%Y"),
        end = generated_at.format("%d/%m/%Y"),
        rows = rows,
        total = format_thousands(detections.len() as f64),
        mean = risk_mean,
    )
}

/// Standalone Leaflet page: FRP-weighted heat layer, clustered markers
/// coloured by risk category and a legend.
pub fn render_map(detections: &[EnrichedDetection], start: NaiveDate, generated_at: DateTime<FixedOffset>) -> String {
    let n = detections.len().max(1) as f64;
    let center_lat = detections.iter().map(|d| d.detection.latitude).sum::<f64>() / n;
    let center_lon = detections.iter().map(|d| d.detection.longitude).sum::<f64>() / n;

    let heat: Vec<[f64; 3]> = detections
        .iter()
        .map(|d| [d.detection.latitude, d.detection.longitude, d.detection.frp])
        .collect();

    let markers: Vec<MarkerData> = detections
        .iter()
        .map(|d| MarkerData {
            lat: d.detection.latitude,
            lon: d.detection.longitude,
            color: d.risk.category.color(),
            tooltip: format!("Riesgo: {} - FRP: {:.1} MW", d.risk.category.label(), d.detection.frp),
            popup: popup_html(d),
        })
        .collect();

    let data = json!({
        "center": [center_lat, center_lon],
        "heat": heat,
        "markers": markers,
    });

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Mapa de incendios</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{v}/dist/leaflet.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css">
<script src="https://unpkg.com/leaflet@{v}/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
<script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
{legend}
<script>
const data = {data};
const map = L.map('map').setView(data.center, 6);
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
L.heatLayer(data.heat, {{ radius: 15, blur: 20, maxZoom: 13 }}).addTo(map);
const cluster = L.markerClusterGroup();
for (const m of data.markers) {{
  L.circleMarker([m.lat, m.lon], {{ radius: 7, color: m.color, fillColor: m.color, fillOpacity: 0.8 }})
    .bindPopup(m.popup, {{ maxWidth: 300 }})
    .bindTooltip(m.tooltip)
    .addTo(cluster);
}}
map.addLayer(cluster);
</script>
</body>
</html>
"#,
        v = LEAFLET_VERSION,
        legend = legend_html(detections, start, generated_at),
        data = data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Detection, RiskAssessment, WeatherSample};
    use chrono::TimeZone;

    fn item(category: RiskCategory) -> EnrichedDetection {
        EnrichedDetection {
            detection: Detection {
                latitude: -43.25,
                longitude: -71.75,
                acq_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
                acq_time: 1745,
                frp: 42.0,
                confidence: 95.0,
                satellite: None,
                instrument: None,
                daynight: None,
            },
            weather: WeatherSample::neutral(),
            risk: RiskAssessment { index: 100.0, category, override_applied: true },
        }
    }

    #[test]
    fn test_map_embeds_markers_and_legend() {
        let now = FixedOffset::east_opt(-3 * 3600).unwrap().with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let html = render_map(&[item(RiskCategory::Critico)], NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), now);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("L.heatLayer"));
        assert!(html.contains("\"color\":\"black\""));
        assert!(html.contains("CRÍTICO (30-30-30)"));
        assert!(html.contains("Del 01/01/2026 al 01/02/2026"));
        assert!(html.contains("17:45 UTC"));
        assert!(html.contains("valores por defecto"));
    }

    #[test]
    fn test_empty_map_still_renders() {
        let now = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let html = render_map(&[], NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), now);
        assert!(html.contains("\"markers\":[]"));
        assert!(html.contains("Total: 0 detecciones"));
    }
}
