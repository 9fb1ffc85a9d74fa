use crate::config::BoundingBox;
use crate::core::rate_limiter::RateLimiter;
use crate::models::RawDetection;
use super::HotspotSource;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

/// FIRMS area API accepts at most this many days per request.
pub const MAX_CHUNK_DAYS: u32 = 5;

/// Splits [start, end] (inclusive) into consecutive windows of at most `max_days`.
/// Returns (window start, window length in days).
pub fn date_chunks(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<(NaiveDate, u32)> {
    let mut chunks = Vec::new();
    if end < start || max_days == 0 {
        return chunks;
    }

    let mut current = start;
    while current <= end {
        let remaining = (end - current).num_days() + 1;
        let days = remaining.min(max_days as i64) as u32;
        chunks.push((current, days));
        current += Duration::days(days as i64);
    }

    chunks
}

/// Keeps the first occurrence of each (latitude, longitude, acq_date, acq_time).
pub fn dedup_detections(detections: Vec<RawDetection>) -> Vec<RawDetection> {
    let mut seen = HashSet::with_capacity(detections.len());
    detections
        .into_iter()
        .filter(|d| seen.insert((d.latitude.to_bits(), d.longitude.to_bits(), d.acq_date, d.acq_time)))
        .collect()
}

/// Drops points at or west of `min_longitude`.
pub fn exclude_west_of(detections: Vec<RawDetection>, min_longitude: f64) -> Vec<RawDetection> {
    let before = detections.len();
    let kept: Vec<RawDetection> = detections.into_iter().filter(|d| d.longitude > min_longitude).collect();

    if kept.len() < before {
        log::info!(
            "Longitude filter: {} detections kept ({} west of {}° excluded)",
            kept.len(),
            before - kept.len(),
            min_longitude
        );
    }
    kept
}

/// Downloads [start, end] chunk by chunk, merges, deduplicates and applies the
/// longitude filter. A failing or empty chunk is skipped; `None` when the whole
/// range produced nothing.
pub async fn fetch_range(
    source: &dyn HotspotSource,
    bbox: &BoundingBox,
    start: NaiveDate,
    end: NaiveDate,
    min_longitude: f64,
) -> Option<Vec<RawDetection>> {
    let chunks = date_chunks(start, end, MAX_CHUNK_DAYS);
    log::info!(
        "Fetching {} hotspots {} -> {} ({} days, {} requests), area {}",
        source.name(),
        start,
        end,
        (end - start).num_days() + 1,
        chunks.len(),
        bbox.to_firms_area()
    );

    let mut all = Vec::new();

    for (i, (chunk_start, days)) in chunks.iter().enumerate() {
        log::debug!("  Chunk {}/{}: {} (+{} days)", i + 1, chunks.len(), chunk_start, days);

        match source.fetch_window(bbox, *chunk_start, *days).await {
            Ok(Some(batch)) => {
                log::debug!("    {} detections", batch.len());
                all.extend(batch);
            }
            Ok(None) => log::debug!("    no detections"),
            Err(e) => log::warn!("Chunk starting {} skipped: {:#}", chunk_start, e),
        }

        if i + 1 < chunks.len() {
            RateLimiter::wait(source.name()).await;
        }
    }

    let unique = dedup_detections(all);
    let filtered = exclude_west_of(unique, min_longitude);

    if filtered.is_empty() {
        log::warn!("No hotspot data found for {} -> {}", start, end);
        return None;
    }

    log::info!("Downloaded {} unique detections", filtered.len());
    Some(filtered)
}
