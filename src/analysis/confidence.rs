use crate::models::{Detection, RawDetection};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 70.0;

/// Value given to tokens that are neither numeric nor a known band.
pub const NEUTRAL_CONFIDENCE: f64 = 50.0;

/// VIIRS reports categorical bands, MODIS reports percentages.
static CONFIDENCE_BANDS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("low", 30.0),
        ("l", 30.0),
        ("nominal", 75.0),
        ("n", 75.0),
        ("high", 95.0),
        ("h", 95.0),
    ])
});

/// Maps a raw FIRMS confidence value onto 0-100. Never fails.
pub fn normalize_confidence(raw: &str) -> f64 {
    let token = raw.trim();

    if let Ok(value) = token.parse::<f64>() {
        if value.is_finite() {
            return value.clamp(0.0, 100.0);
        }
    }

    CONFIDENCE_BANDS
        .get(token.to_lowercase().as_str())
        .copied()
        .unwrap_or(NEUTRAL_CONFIDENCE)
}

/// Normalizes every detection, then keeps those at or above `min_confidence`.
pub fn filter_by_confidence(raw: Vec<RawDetection>, min_confidence: f64) -> Vec<Detection> {
    let total = raw.len();

    let kept: Vec<Detection> = raw
        .into_iter()
        .map(|r| {
            let confidence = normalize_confidence(&r.confidence);
            Detection::from_raw(r, confidence)
        })
        .filter(|d| d.confidence >= min_confidence)
        .collect();

    if total > 0 {
        log::info!(
            "Confidence filter >= {}%: kept {} of {} detections ({:.1}%)",
            min_confidence,
            kept.len(),
            total,
            kept.len() as f64 / total as f64 * 100.0
        );
    }

    kept
}
