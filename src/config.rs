use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_FIRMS_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov";
pub const DEFAULT_FIRMS_SOURCE: &str = "VIIRS_SNPP_NRT";
pub const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_UPDATE_CRON: &str = "0 0 0,6,12,18 * * *";

/// West, south, east, north in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// FIRMS area coordinate segment, e.g. "-72.5,-47,-69,-42"
    pub fn to_firms_area(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl FromStr for BoundingBox {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| anyhow!("Invalid bounding box '{}': {}", s, e))?;

        if parts.len() != 4 {
            return Err(anyhow!("Bounding box '{}' needs 4 values (W,S,E,N)", s));
        }
        let bbox = BoundingBox { west: parts[0], south: parts[1], east: parts[2], north: parts[3] };
        if bbox.west >= bbox.east || bbox.south >= bbox.north {
            return Err(anyhow!("Bounding box '{}' is empty", s));
        }
        Ok(bbox)
    }
}

/// Everything the pipeline needs, passed explicitly into each run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub map_key: Option<String>,
    pub firms_base_url: String,
    pub firms_source: String,
    pub region: BoundingBox,
    /// Points at or west of this longitude are dropped (Chilean side)
    pub min_longitude: f64,
    pub start_date: NaiveDate,
    /// None means "today" at run time
    pub end_date: Option<NaiveDate>,
    pub min_confidence: f64,
    pub open_meteo_url: String,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub update_cron: String,
    pub utc_offset_hours: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            map_key: None,
            firms_base_url: DEFAULT_FIRMS_BASE_URL.to_string(),
            firms_source: DEFAULT_FIRMS_SOURCE.to_string(),
            region: BoundingBox { west: -72.5, south: -47.0, east: -69.0, north: -42.0 },
            min_longitude: -72.2,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
            end_date: None,
            min_confidence: 70.0,
            open_meteo_url: DEFAULT_OPEN_METEO_URL.to_string(),
            output_dir: PathBuf::from("static"),
            data_dir: PathBuf::from("./data"),
            update_cron: DEFAULT_UPDATE_CRON.to_string(),
            utc_offset_hours: -3,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        config.map_key = get("MAP_KEY");
        if let Some(v) = get("FIRMS_BASE_URL") {
            config.firms_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("FIRMS_SOURCE") {
            config.firms_source = v;
        }
        if let Some(v) = get("REGION_BOUNDS") {
            config.region = v.parse().context("REGION_BOUNDS")?;
        }
        if let Some(v) = get("MIN_LONGITUDE") {
            config.min_longitude = parse_key("MIN_LONGITUDE", &v)?;
        }
        if let Some(v) = get("START_DATE") {
            config.start_date = parse_date("START_DATE", &v)?;
        }
        if let Some(v) = get("END_DATE") {
            config.end_date = Some(parse_date("END_DATE", &v)?);
        }
        if let Some(v) = get("MIN_CONFIDENCE") {
            let threshold: f64 = parse_key("MIN_CONFIDENCE", &v)?;
            if !(0.0..=100.0).contains(&threshold) {
                return Err(anyhow!("MIN_CONFIDENCE must be within 0-100, got {}", threshold));
            }
            config.min_confidence = threshold;
        }
        if let Some(v) = get("OPEN_METEO_URL") {
            config.open_meteo_url = v;
        }
        if let Some(v) = get("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("UPDATE_CRON") {
            config.update_cron = v;
        }
        if let Some(v) = get("UTC_OFFSET_HOURS") {
            let hours: i32 = parse_key("UTC_OFFSET_HOURS", &v)?;
            if !(-23..=23).contains(&hours) {
                return Err(anyhow!("UTC_OFFSET_HOURS out of range: {}", hours));
            }
            config.utc_offset_hours = hours;
        }

        if let Some(end) = config.end_date {
            if end < config.start_date {
                return Err(anyhow!("END_DATE {} is before START_DATE {}", end, config.start_date));
            }
        }

        Ok(config)
    }

    /// Offset used for the dashboard's "last updated" timestamp.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

fn parse_key<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| anyhow!("Invalid {} '{}': {}", key, value, e))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid {} '{}' (expected YYYY-MM-DD): {}", key, value, e))
}
