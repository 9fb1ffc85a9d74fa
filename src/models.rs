use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// One FIRMS CSV row as downloaded, before any normalization.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RawDetection {
    pub latitude: f64,
    pub longitude: f64,
    pub acq_date: NaiveDate,
    /// HHMM in UTC, e.g. 412 for 04:12
    pub acq_time: u32,
    pub frp: f64,
    /// Numeric text for MODIS, "l"/"n"/"h" for VIIRS
    pub confidence: String,
    #[serde(default)]
    pub satellite: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub daynight: Option<String>,
}

/// A detection whose confidence passed normalization (0-100).
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Detection {
    pub latitude: f64,
    pub longitude: f64,
    pub acq_date: NaiveDate,
    pub acq_time: u32,
    pub frp: f64,
    pub confidence: f64,
    pub satellite: Option<String>,
    pub instrument: Option<String>,
    pub daynight: Option<String>,
}

impl Detection {
    pub fn from_raw(raw: RawDetection, confidence: f64) -> Self {
        Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            acq_date: raw.acq_date,
            acq_time: raw.acq_time,
            frp: raw.frp,
            confidence,
            satellite: raw.satellite,
            instrument: raw.instrument,
            daynight: raw.daynight,
        }
    }

    /// "04:12" style label for `acq_time`
    pub fn acq_time_label(&self) -> String {
        format!("{:02}:{:02}", self.acq_time / 100, self.acq_time % 100)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum WeatherOrigin {
    Observed,
    Fallback,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub wind_kmh: f64,
    pub humidity_pct: f64,
    pub temperature_c: f64,
    pub rain_7d_mm: f64,
    pub origin: WeatherOrigin,
}

impl WeatherSample {
    /// Neutral climate used whenever a lookup fails.
    pub fn neutral() -> Self {
        Self {
            wind_kmh: 10.0,
            humidity_pct: 50.0,
            temperature_c: 20.0,
            rain_7d_mm: 0.0,
            origin: WeatherOrigin::Fallback,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskCategory {
    Bajo,
    Moderado,
    Alto,
    MuyAlto,
    Extremo,
    /// Only produced by the 30-30-30 rule
    Critico,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 6] = [
        RiskCategory::Bajo,
        RiskCategory::Moderado,
        RiskCategory::Alto,
        RiskCategory::MuyAlto,
        RiskCategory::Extremo,
        RiskCategory::Critico,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::Bajo => "BAJO",
            RiskCategory::Moderado => "MODERADO",
            RiskCategory::Alto => "ALTO",
            RiskCategory::MuyAlto => "MUY ALTO",
            RiskCategory::Extremo => "EXTREMO",
            RiskCategory::Critico => "CRÍTICO (30-30-30)",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskCategory::Bajo => "green",
            RiskCategory::Moderado => "lightgreen",
            RiskCategory::Alto => "orange",
            RiskCategory::MuyAlto => "red",
            RiskCategory::Extremo => "purple",
            RiskCategory::Critico => "black",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub index: f64,
    pub category: RiskCategory,
    pub override_applied: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EnrichedDetection {
    pub detection: Detection,
    pub weather: WeatherSample,
    pub risk: RiskAssessment,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub new_detections: usize,
    pub cumulative_detections: usize,
    pub cumulative_area_ha: f64,
    pub frp_sum: f64,
    pub frp_mean: f64,
    pub frp_max: f64,
    pub confidence_mean: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct WeeklyAggregate {
    pub iso_year: i32,
    pub iso_week: u32,
    pub detections: usize,
    pub frp_mean: f64,
    pub frp_max: f64,
    pub frp_sum: f64,
    pub confidence_mean: f64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub estimated_area_ha: f64,
}

/// The singleton record read by the dashboard page.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_detections: i64,
    pub dominant_risk: String,
    pub intensity: String,
    pub area: String,
    pub last_updated: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PipelineRun {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: String,
    pub detections: Option<i64>,
    pub message: Option<String>,
}
