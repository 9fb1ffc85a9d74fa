use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, TimeZone};
use std::path::PathBuf;
use wildfire_monitor_lib::config::{AppConfig, BoundingBox};
use wildfire_monitor_lib::core::orchestrator::{update_with_sources, PipelineOutcome};
use wildfire_monitor_lib::db;
use wildfire_monitor_lib::fetcher::{HotspotSource, WeatherSource};
use wildfire_monitor_lib::models::{RawDetection, RiskCategory, WeatherOrigin, WeatherSample};
use wildfire_monitor_lib::report::{MAP_FILE, CHART_FILE, WORKBOOK_FILE};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn raw(lat: f64, lon: f64, day: &str, time: u32, frp: f64, confidence: &str) -> RawDetection {
    RawDetection {
        latitude: lat,
        longitude: lon,
        acq_date: date(day),
        acq_time: time,
        frp,
        confidence: confidence.to_string(),
        satellite: Some("N".to_string()),
        instrument: Some("VIIRS".to_string()),
        daynight: Some("D".to_string()),
    }
}

/// Serves a fixed batch per window start date; unknown windows fail.
struct FakeFirms {
    windows: Vec<(NaiveDate, Vec<RawDetection>)>,
}

#[async_trait]
impl HotspotSource for FakeFirms {
    fn name(&self) -> &str {
        "FAKE_FIRMS"
    }

    async fn fetch_window(&self, _bbox: &BoundingBox, start: NaiveDate, _days: u32) -> Result<Option<Vec<RawDetection>>> {
        self.windows
            .iter()
            .find(|(d, _)| *d == start)
            .map(|(_, batch)| Some(batch.clone()))
            .ok_or_else(|| anyhow!("HTTP 503"))
    }
}

/// 30-30-30 conditions around -43.1; everything else is unreachable.
struct FakeWeather;

#[async_trait]
impl WeatherSource for FakeWeather {
    fn name(&self) -> &str {
        "FAKE_WEATHER"
    }

    async fn fetch_weather(&self, latitude: f64, _longitude: f64) -> Result<WeatherSample> {
        if (latitude * 10.0).round() as i32 == -431 {
            Ok(WeatherSample {
                wind_kmh: 35.0,
                humidity_pct: 25.0,
                temperature_c: 31.0,
                rain_7d_mm: 0.0,
                origin: WeatherOrigin::Observed,
            })
        } else {
            Err(anyhow!("timeout"))
        }
    }
}

fn test_config(name: &str) -> AppConfig {
    let output_dir: PathBuf = std::env::temp_dir().join(format!("wildfire-monitor-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&output_dir);
    AppConfig {
        start_date: date("2026-01-01"),
        end_date: Some(date("2026-01-07")),
        output_dir,
        ..AppConfig::default()
    }
}

fn now() -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(-3 * 3600).unwrap().with_ymd_and_hms(2026, 1, 8, 6, 30, 0).unwrap()
}

fn january_fires() -> FakeFirms {
    FakeFirms {
        windows: vec![
            (
                date("2026-01-01"),
                vec![
                    raw(-43.12, -71.50, "2026-01-02", 1400, 20.0, "h"),
                    raw(-43.12, -71.50, "2026-01-02", 1400, 20.0, "h"),
                    raw(-43.14, -71.46, "2026-01-02", 1500, 10.0, "n"),
                    raw(-44.50, -70.00, "2026-01-03", 300, 5.0, "l"),
                    // Chilean side
                    raw(-42.50, -72.30, "2026-01-03", 300, 50.0, "h"),
                ],
            ),
            (date("2026-01-06"), vec![raw(-45.00, -70.50, "2026-01-06", 200, 30.0, "85")]),
        ],
    }
}

#[tokio::test]
async fn test_full_run_publishes_artifacts_and_summary() {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    let config = test_config("full");

    let outcome = update_with_sources(&pool, &config, &january_fires(), &FakeWeather, now()).await.unwrap();
    let report = match outcome {
        PipelineOutcome::Report(report) => report,
        other => panic!("expected a report, got {:?}", other),
    };

    // duplicate and western point dropped before the filter, "l" dropped by it
    assert_eq!(report.fetched, 4);
    assert_eq!(report.detections.len(), 3);

    let critical = report.detections.iter().filter(|d| d.risk.category == RiskCategory::Critico).count();
    assert_eq!(critical, 2);
    let fallback = report.detections.iter().find(|d| d.weather.origin == WeatherOrigin::Fallback).unwrap();
    assert_eq!(fallback.risk.index, 46.3);
    assert_eq!(fallback.risk.category, RiskCategory::Alto);

    let cumulative: Vec<usize> = report.evolution.iter().map(|d| d.cumulative_detections).collect();
    assert_eq!(cumulative, vec![2, 3]);

    let summary = db::get_summary_stats(&pool).await.unwrap().unwrap();
    assert_eq!(summary.total_detections, 3);
    assert_eq!(summary.dominant_risk, "CRÍTICO (30-30-30)");
    assert_eq!(summary.intensity, "20.0 MW");
    assert_eq!(summary.area, "42 ha");
    assert_eq!(summary.last_updated, "08/01/2026 06:30");

    let map = std::fs::read_to_string(config.output_dir.join(MAP_FILE)).unwrap();
    assert!(map.contains("Total: 3 detecciones"));
    let chart = std::fs::read_to_string(config.output_dir.join(CHART_FILE)).unwrap();
    assert!(chart.contains("Plotly.newPlot"));
    let workbook = std::fs::read(config.output_dir.join(WORKBOOK_FILE)).unwrap();
    assert_eq!(&workbook[..2], b"PK");

    let runs = db::recent_runs(&pool, 1).await.unwrap();
    assert_eq!(runs[0].status, db::STATUS_SUCCESS);
    assert_eq!(runs[0].detections, Some(3));

    let _ = std::fs::remove_dir_all(&config.output_dir);
}

#[tokio::test]
async fn test_empty_runs_leave_summary_untouched() {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    let config = test_config("empty");

    update_with_sources(&pool, &config, &january_fires(), &FakeWeather, now()).await.unwrap();
    let published = db::get_summary_stats(&pool).await.unwrap().unwrap();

    // every window fails
    let offline = FakeFirms { windows: vec![] };
    let outcome = update_with_sources(&pool, &config, &offline, &FakeWeather, now()).await.unwrap();
    assert!(matches!(outcome, PipelineOutcome::NoDetections));

    // only low confidence
    let weak = FakeFirms {
        windows: vec![(date("2026-01-01"), vec![raw(-44.0, -70.0, "2026-01-02", 100, 3.0, "l")])],
    };
    let outcome = update_with_sources(&pool, &config, &weak, &FakeWeather, now()).await.unwrap();
    assert!(matches!(outcome, PipelineOutcome::NoneAboveThreshold { fetched: 1 }));

    assert_eq!(db::get_summary_stats(&pool).await.unwrap().unwrap(), published);

    let statuses: Vec<String> = db::recent_runs(&pool, 3).await.unwrap().into_iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![db::STATUS_NO_DATA, db::STATUS_NO_DATA, db::STATUS_SUCCESS]);

    let _ = std::fs::remove_dir_all(&config.output_dir);
}

#[tokio::test]
async fn test_no_summary_before_first_successful_run() {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    let config = test_config("nodata");

    let offline = FakeFirms { windows: vec![] };
    update_with_sources(&pool, &config, &offline, &FakeWeather, now()).await.unwrap();

    assert!(db::get_summary_stats(&pool).await.unwrap().is_none());
    assert!(!config.output_dir.join(MAP_FILE).exists());
}
