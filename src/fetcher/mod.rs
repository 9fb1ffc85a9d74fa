use async_trait::async_trait;
use anyhow::Result;
use chrono::NaiveDate;
use crate::config::BoundingBox;
use crate::models::{RawDetection, WeatherSample};

pub mod firms;
pub mod hotspots;
pub mod openmeteo;

/// Satellite hotspot provider, queried one date window at a time.
#[async_trait]
pub trait HotspotSource: Send + Sync {
    fn name(&self) -> &str;

    /// Detections inside `bbox` for `days` days starting at `start`.
    /// `Ok(None)` means the provider answered but had nothing for the window.
    async fn fetch_window(&self, bbox: &BoundingBox, start: NaiveDate, days: u32) -> Result<Option<Vec<RawDetection>>>;
}

/// Point weather provider.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_weather(&self, latitude: f64, longitude: f64) -> Result<WeatherSample>;
}
