use crate::analysis::risk;
use crate::core::rate_limiter::{RateLimiter, WEATHER_PAUSE_EVERY};
use crate::fetcher::WeatherSource;
use crate::models::{Detection, EnrichedDetection, RiskAssessment, WeatherOrigin, WeatherSample};
use anyhow::Result;
use std::collections::{HashMap, HashSet};

/// Latitude/longitude rounded to 0.1° (~11 km), stored as tenths of a degree.
/// Exact halves round to even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationKey {
    lat_tenths: i32,
    lon_tenths: i32,
}

impl LocationKey {
    pub fn from_coords(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_tenths: (latitude * 10.0).round_ties_even() as i32,
            lon_tenths: (longitude * 10.0).round_ties_even() as i32,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat_tenths as f64 / 10.0
    }

    pub fn longitude(&self) -> f64 {
        self.lon_tenths as f64 / 10.0
    }
}

/// Failure policy for a weather lookup: any error becomes the neutral sample.
pub fn weather_or_neutral(result: Result<WeatherSample>, key: &LocationKey) -> WeatherSample {
    match result {
        Ok(sample) => sample,
        Err(e) => {
            log::warn!(
                "Weather lookup failed at {:.1},{:.1}, using neutral defaults: {:#}",
                key.latitude(),
                key.longitude(),
                e
            );
            WeatherSample::neutral()
        }
    }
}

/// Attaches weather and risk to every detection. Weather is fetched once per
/// rounded location and shared by all detections at that location.
pub async fn enrich_detections(detections: Vec<Detection>, source: &dyn WeatherSource) -> Vec<EnrichedDetection> {
    let mut cache: HashMap<LocationKey, (WeatherSample, RiskAssessment)> = HashMap::new();
    let mut lookups = 0usize;

    // First-seen order keeps the request sequence stable between runs
    let mut seen = HashSet::new();
    let unique_keys: Vec<LocationKey> = detections
        .iter()
        .map(|d| LocationKey::from_coords(d.latitude, d.longitude))
        .filter(|key| seen.insert(*key))
        .collect();

    log::info!(
        "Fetching weather for {} unique locations ({} detections)",
        unique_keys.len(),
        detections.len()
    );

    for key in &unique_keys {
        if lookups % 10 == 0 {
            log::debug!("  Weather location {}/{}", lookups + 1, unique_keys.len());
        }

        let weather = weather_or_neutral(source.fetch_weather(key.latitude(), key.longitude()).await, key);
        let assessment = risk::assess(&weather);
        cache.insert(*key, (weather, assessment));

        lookups += 1;
        if lookups % WEATHER_PAUSE_EVERY == 0 {
            RateLimiter::wait(source.name()).await;
        }
    }

    let fallbacks = cache.values().filter(|(w, _)| w.origin == WeatherOrigin::Fallback).count();
    if fallbacks > 0 {
        log::warn!("{} of {} locations fell back to neutral weather", fallbacks, cache.len());
    }

    detections
        .into_iter()
        .map(|detection| {
            let key = LocationKey::from_coords(detection.latitude, detection.longitude);
            let (weather, risk) = cache
                .get(&key)
                .copied()
                .unwrap_or_else(|| {
                    let w = WeatherSample::neutral();
                    (w, risk::assess(&w))
                });
            EnrichedDetection { detection, weather, risk }
        })
        .collect()
}
