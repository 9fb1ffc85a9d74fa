use crate::analysis::confidence::filter_by_confidence;
use crate::analysis::enrich::enrich_detections;
use crate::analysis::statistics::{run_statistics, summary_record, RunStatistics};
use crate::config::AppConfig;
use crate::core::timeseries::{daily_evolution, top_days, weekly_summary};
use crate::db;
use crate::fetcher::firms::FirmsFetcher;
use crate::fetcher::hotspots::fetch_range;
use crate::fetcher::openmeteo::OpenMeteoFetcher;
use crate::fetcher::{HotspotSource, WeatherSource};
use crate::models::{DailyAggregate, EnrichedDetection, WeeklyAggregate};
use crate::report::{self, excel::TOP_DAYS};
use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::SqlitePool;

pub const MAP_KEY_SETTING: &str = "MAP_KEY";

/// Everything one successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Detections downloaded before the confidence filter
    pub fetched: usize,
    pub min_confidence: f64,
    pub detections: Vec<EnrichedDetection>,
    pub evolution: Vec<DailyAggregate>,
    pub weekly: Vec<WeeklyAggregate>,
    pub top_days: Vec<DailyAggregate>,
    pub stats: RunStatistics,
}

/// Empty conditions are outcomes, not errors.
#[derive(Debug)]
pub enum PipelineOutcome {
    NoDetections,
    NoneAboveThreshold { fetched: usize },
    Report(Box<PipelineReport>),
}

impl PipelineOutcome {
    pub fn detections(&self) -> Option<usize> {
        match self {
            PipelineOutcome::Report(report) => Some(report.detections.len()),
            _ => None,
        }
    }
}

/// Fetch, filter, enrich and aggregate. Touches neither the filesystem nor
/// the database.
pub async fn run_pipeline(
    config: &AppConfig,
    today: NaiveDate,
    hotspots: &dyn HotspotSource,
    weather: &dyn WeatherSource,
) -> PipelineOutcome {
    let end_date = config.end_date.unwrap_or(today);

    // 1. Download
    let raw = match fetch_range(hotspots, &config.region, config.start_date, end_date, config.min_longitude).await {
        Some(raw) => raw,
        None => return PipelineOutcome::NoDetections,
    };
    let fetched = raw.len();

    // 2. Confidence filter
    let detections = filter_by_confidence(raw, config.min_confidence);
    if detections.is_empty() {
        log::warn!("None of the {} detections reach {}% confidence", fetched, config.min_confidence);
        return PipelineOutcome::NoneAboveThreshold { fetched };
    }

    // 3. Weather + risk
    let enriched = enrich_detections(detections, weather).await;

    // 4. Aggregates
    let evolution = daily_evolution(&enriched);
    let weekly = weekly_summary(&enriched);
    let top = top_days(&evolution, TOP_DAYS);

    let Some(stats) = run_statistics(&enriched, &evolution) else {
        return PipelineOutcome::NoneAboveThreshold { fetched };
    };

    PipelineOutcome::Report(Box::new(PipelineReport {
        start_date: config.start_date,
        end_date,
        fetched,
        min_confidence: config.min_confidence,
        detections: enriched,
        evolution,
        weekly,
        top_days: top,
        stats,
    }))
}

/// Env first, then the settings table.
pub async fn resolve_map_key(pool: &SqlitePool, config: &AppConfig) -> Result<String> {
    if let Some(key) = &config.map_key {
        return Ok(key.clone());
    }
    match db::get_setting(pool, MAP_KEY_SETTING).await? {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(anyhow!("MAP_KEY not configured (set it in the environment or run `set-key`)")),
    }
}

fn log_final_report(report: &PipelineReport) {
    let s = &report.stats;
    log::info!("========================================");
    log::info!("FINAL REPORT {} -> {}", report.start_date, report.end_date);
    log::info!("   - Downloaded:            {}", report.fetched);
    log::info!("   - Above {:.0}% confidence: {}", report.min_confidence, s.total_detections);
    log::info!("   - Days with activity:    {}", report.evolution.len());
    log::info!("   - Peak day:              {} ({} detections)", s.peak_day, s.peak_day_detections);
    log::info!("   - Mean risk index:       {:.1} ({})", s.risk_index_mean, s.dominant_risk.label());
    log::info!("   - Mean FRP:              {:.1} MW", s.frp_mean);
    log::info!("   - Estimated area:        {:.0} ha", s.total_area_ha);
    log::info!("========================================");
}

/// One full run against the given sources: pipeline, artifacts, summary
/// record and the run log entry.
pub async fn update_with_sources(
    pool: &SqlitePool,
    config: &AppConfig,
    hotspots: &dyn HotspotSource,
    weather: &dyn WeatherSource,
    now: DateTime<FixedOffset>,
) -> Result<PipelineOutcome> {
    let run_id = db::start_run(pool).await?;
    log::info!("Update run #{} started", run_id);

    let outcome = run_pipeline(config, now.date_naive(), hotspots, weather).await;

    let published = match &outcome {
        PipelineOutcome::Report(report) => publish(pool, config, report, now).await,
        _ => Ok(()),
    };

    if let Err(e) = published {
        log::error!("Update run #{} failed: {:#}", run_id, e);
        let detections = outcome.detections().map(|n| n as i64);
        db::finish_run(pool, run_id, db::STATUS_ERROR, detections, Some(&format!("{:#}", e))).await?;
        return Err(e);
    }

    let (status, detections, message) = match &outcome {
        PipelineOutcome::NoDetections => {
            log::warn!("Update run #{}: no detections, summary left unchanged", run_id);
            (db::STATUS_NO_DATA, 0, Some("no detections".to_string()))
        }
        PipelineOutcome::NoneAboveThreshold { fetched } => {
            let message = format!("{} detections, none above threshold", fetched);
            log::warn!("Update run #{}: {}, summary left unchanged", run_id, message);
            (db::STATUS_NO_DATA, 0, Some(message))
        }
        PipelineOutcome::Report(report) => {
            log_final_report(report);
            (db::STATUS_SUCCESS, report.detections.len() as i64, None)
        }
    };
    db::finish_run(pool, run_id, status, Some(detections), message.as_deref()).await?;

    Ok(outcome)
}

async fn publish(pool: &SqlitePool, config: &AppConfig, report: &PipelineReport, now: DateTime<FixedOffset>) -> Result<()> {
    report::write_artifacts(&config.output_dir, report, now)?;
    let record = summary_record(&report.stats, now);
    db::save_summary_stats(pool, &record).await?;
    log::info!(
        "Summary published: {} detections, {}, {}, {}",
        record.total_detections,
        record.dominant_risk,
        record.intensity,
        record.area
    );
    Ok(())
}

/// Scheduled / CLI entry point using the live FIRMS and Open-Meteo clients.
pub async fn update(pool: &SqlitePool, config: &AppConfig) -> Result<PipelineOutcome> {
    let map_key = match resolve_map_key(pool, config).await {
        Ok(key) => key,
        Err(e) => {
            let run_id = db::start_run(pool).await?;
            db::finish_run(pool, run_id, db::STATUS_ERROR, None, Some(&e.to_string())).await?;
            return Err(e);
        }
    };

    let hotspots = FirmsFetcher::new(&config.firms_base_url, map_key, &config.firms_source);
    let weather = OpenMeteoFetcher::new(&config.open_meteo_url);
    let now = Utc::now().with_timezone(&config.local_offset());

    update_with_sources(pool, config, &hotspots, &weather, now).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::risk;
    use crate::models::{Detection, WeatherSample};

    fn item(day: &str, lat: f64, frp: f64, wind: f64) -> EnrichedDetection {
        let weather = WeatherSample { wind_kmh: wind, ..WeatherSample::neutral() };
        EnrichedDetection {
            detection: Detection {
                latitude: lat,
                longitude: -71.3,
                acq_date: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
                acq_time: 1420,
                frp,
                confidence: 95.0,
                satellite: Some("N".to_string()),
                instrument: Some("VIIRS".to_string()),
                daynight: Some("D".to_string()),
            },
            weather,
            risk: risk::assess(&weather),
        }
    }

    /// Small finished report shared by the renderer tests.
    pub fn sample_report() -> PipelineReport {
        let detections = vec![
            item("2026-01-10", -43.1, 12.0, 10.0),
            item("2026-01-10", -43.2, 30.0, 40.0),
            item("2026-01-12", -44.0, 8.5, 5.0),
        ];
        let evolution = daily_evolution(&detections);
        let weekly = weekly_summary(&detections);
        let top = top_days(&evolution, TOP_DAYS);
        let stats = run_statistics(&detections, &evolution).unwrap();
        PipelineReport {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            fetched: 5,
            min_confidence: 70.0,
            detections,
            evolution,
            weekly,
            top_days: top,
            stats,
        }
    }

    #[test]
    fn test_sample_report_is_consistent() {
        let report = sample_report();
        assert_eq!(report.stats.total_detections, 3);
        assert_eq!(report.evolution.len(), 2);
        assert_eq!(report.top_days[0].new_detections, 2);
    }

    #[tokio::test]
    async fn test_resolve_map_key_prefers_env_then_settings() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        let mut config = AppConfig::default();

        assert!(resolve_map_key(&pool, &config).await.is_err());

        db::save_setting(&pool, MAP_KEY_SETTING, "stored").await.unwrap();
        assert_eq!(resolve_map_key(&pool, &config).await.unwrap(), "stored");

        config.map_key = Some("from-env".to_string());
        assert_eq!(resolve_map_key(&pool, &config).await.unwrap(), "from-env");
    }

    #[tokio::test]
    async fn test_update_without_key_records_error_run() {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        assert!(update(&pool, &AppConfig::default()).await.is_err());

        let runs = db::recent_runs(&pool, 1).await.unwrap();
        assert_eq!(runs[0].status, db::STATUS_ERROR);
        assert!(runs[0].message.as_deref().unwrap().contains("MAP_KEY"));
    }
}
