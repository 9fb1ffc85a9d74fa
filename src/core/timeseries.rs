use crate::models::{DailyAggregate, EnrichedDetection, WeeklyAggregate};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Estimated burned area attributed to each detection (hectares).
pub const HECTARES_PER_DETECTION: f64 = 14.0;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Default)]
struct Bucket {
    count: usize,
    frp_sum: f64,
    frp_max: f64,
    confidence_sum: f64,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

impl Bucket {
    fn add(&mut self, item: &EnrichedDetection) {
        let d = &item.detection;
        if self.count == 0 || d.frp > self.frp_max {
            self.frp_max = d.frp;
        }
        self.count += 1;
        self.frp_sum += d.frp;
        self.confidence_sum += d.confidence;
        self.first = Some(self.first.map_or(d.acq_date, |f| f.min(d.acq_date)));
        self.last = Some(self.last.map_or(d.acq_date, |l| l.max(d.acq_date)));
    }

    fn frp_mean(&self) -> f64 {
        self.frp_sum / self.count as f64
    }

    fn confidence_mean(&self) -> f64 {
        self.confidence_sum / self.count as f64
    }
}

/// One row per calendar date present (no gap filling), ascending.
/// Cumulative area = cumulative count × 14 ha.
pub fn daily_evolution(detections: &[EnrichedDetection]) -> Vec<DailyAggregate> {
    // BTreeMap keeps the buckets in chronological order
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for item in detections {
        buckets.entry(item.detection.acq_date).or_default().add(item);
    }

    let mut cumulative = 0usize;
    buckets
        .into_iter()
        .map(|(date, bucket)| {
            cumulative += bucket.count;
            DailyAggregate {
                date,
                new_detections: bucket.count,
                cumulative_detections: cumulative,
                cumulative_area_ha: cumulative as f64 * HECTARES_PER_DETECTION,
                frp_sum: round2(bucket.frp_sum),
                frp_mean: round2(bucket.frp_mean()),
                frp_max: round2(bucket.frp_max),
                confidence_mean: round2(bucket.confidence_mean()),
            }
        })
        .collect()
}

/// Rollup per ISO (year, week).
pub fn weekly_summary(detections: &[EnrichedDetection]) -> Vec<WeeklyAggregate> {
    let mut buckets: BTreeMap<(i32, u32), Bucket> = BTreeMap::new();
    for item in detections {
        let week = item.detection.acq_date.iso_week();
        buckets.entry((week.year(), week.week())).or_default().add(item);
    }

    buckets
        .into_iter()
        .filter_map(|((iso_year, iso_week), bucket)| {
            Some(WeeklyAggregate {
                iso_year,
                iso_week,
                detections: bucket.count,
                frp_mean: round2(bucket.frp_mean()),
                frp_max: round2(bucket.frp_max),
                frp_sum: round2(bucket.frp_sum),
                confidence_mean: round2(bucket.confidence_mean()),
                first_date: bucket.first?,
                last_date: bucket.last?,
                estimated_area_ha: bucket.count as f64 * HECTARES_PER_DETECTION,
            })
        })
        .collect()
}

/// Days with the most new detections, ties kept in date order.
pub fn top_days(evolution: &[DailyAggregate], n: usize) -> Vec<DailyAggregate> {
    let mut sorted = evolution.to_vec();
    // sort_by is stable, so equal counts stay chronological
    sorted.sort_by(|a, b| b.new_detections.cmp(&a.new_detections));
    sorted.truncate(n);
    sorted
}
