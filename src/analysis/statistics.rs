use crate::models::{DailyAggregate, EnrichedDetection, RiskCategory, SummaryStats};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole-run figures behind the summary sheets and the final log report.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RunStatistics {
    pub total_detections: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub days_spanned: i64,
    pub risk_index_mean: f64,
    pub dominant_risk: RiskCategory,
    pub risk_distribution: BTreeMap<RiskCategory, usize>,
    /// Share of detections with index >= 40 (ALTO or worse), in percent
    pub high_risk_share_pct: f64,
    pub wind_mean_kmh: f64,
    pub humidity_mean_pct: f64,
    pub temperature_mean_c: f64,
    pub rain_mean_mm: f64,
    pub frp_mean: f64,
    pub frp_max: f64,
    pub confidence_mean: f64,
    pub peak_day: NaiveDate,
    pub peak_day_detections: usize,
    pub total_area_ha: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Most frequent category; a tie goes to the more severe one.
pub fn dominant_category(detections: &[EnrichedDetection]) -> Option<RiskCategory> {
    let mut counts: BTreeMap<RiskCategory, usize> = BTreeMap::new();
    for d in detections {
        *counts.entry(d.risk.category).or_default() += 1;
    }
    // max_by_key returns the last maximum, and BTreeMap iterates mildest first
    counts.into_iter().max_by_key(|(_, n)| *n).map(|(category, _)| category)
}

/// None when there are no detections or no aggregates.
pub fn run_statistics(detections: &[EnrichedDetection], evolution: &[DailyAggregate]) -> Option<RunStatistics> {
    let first_date = detections.iter().map(|d| d.detection.acq_date).min()?;
    let last_date = detections.iter().map(|d| d.detection.acq_date).max()?;
    let dominant_risk = dominant_category(detections)?;
    let last_day = evolution.last()?;

    // first maximum, i.e. the earliest of the busiest days
    let peak = evolution
        .iter()
        .fold(None::<&DailyAggregate>, |best, day| match best {
            Some(b) if b.new_detections >= day.new_detections => Some(b),
            _ => Some(day),
        })?;

    let mut risk_distribution = BTreeMap::new();
    for category in RiskCategory::ALL {
        risk_distribution.insert(category, 0);
    }
    for d in detections {
        *risk_distribution.entry(d.risk.category).or_insert(0) += 1;
    }

    let total = detections.len();
    let high_risk = detections.iter().filter(|d| d.risk.index >= 40.0).count();

    Some(RunStatistics {
        total_detections: total,
        first_date,
        last_date,
        days_spanned: (last_date - first_date).num_days() + 1,
        risk_index_mean: mean(detections.iter().map(|d| d.risk.index)),
        dominant_risk,
        risk_distribution,
        high_risk_share_pct: high_risk as f64 / total as f64 * 100.0,
        wind_mean_kmh: mean(detections.iter().map(|d| d.weather.wind_kmh)),
        humidity_mean_pct: mean(detections.iter().map(|d| d.weather.humidity_pct)),
        temperature_mean_c: mean(detections.iter().map(|d| d.weather.temperature_c)),
        rain_mean_mm: mean(detections.iter().map(|d| d.weather.rain_7d_mm)),
        frp_mean: mean(detections.iter().map(|d| d.detection.frp)),
        frp_max: detections.iter().map(|d| d.detection.frp).fold(0.0, f64::max),
        confidence_mean: mean(detections.iter().map(|d| d.detection.confidence)),
        peak_day: peak.date,
        peak_day_detections: peak.new_detections,
        total_area_ha: last_day.cumulative_area_ha,
    })
}

/// 1234567.8 -> "1,234,568"
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

/// The record the dashboard reads, stamped with local time.
pub fn summary_record(stats: &RunStatistics, now: DateTime<FixedOffset>) -> SummaryStats {
    SummaryStats {
        total_detections: stats.total_detections as i64,
        dominant_risk: stats.dominant_risk.label().to_string(),
        intensity: format!("{:.1} MW", stats.frp_mean),
        area: format!("{} ha", format_thousands(stats.total_area_ha)),
        last_updated: now.format("%d/%m/%Y %H:%M").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timeseries::daily_evolution;
    use crate::models::{Detection, RiskAssessment, WeatherSample};
    use chrono::TimeZone;

    fn item(day: &str, frp: f64, index: f64, category: RiskCategory) -> EnrichedDetection {
        EnrichedDetection {
            detection: Detection {
                latitude: -43.0,
                longitude: -71.0,
                acq_date: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
                acq_time: 300,
                frp,
                confidence: 90.0,
                satellite: None,
                instrument: None,
                daynight: None,
            },
            weather: WeatherSample::neutral(),
            risk: RiskAssessment { index, category, override_applied: category == RiskCategory::Critico },
        }
    }

    fn sample() -> Vec<EnrichedDetection> {
        vec![
            item("2026-01-01", 10.0, 46.3, RiskCategory::Alto),
            item("2026-01-01", 30.0, 46.3, RiskCategory::Alto),
            item("2026-01-03", 5.0, 12.0, RiskCategory::Bajo),
            item("2026-01-03", 15.0, 100.0, RiskCategory::Critico),
        ]
    }

    #[test]
    fn test_run_statistics() {
        let detections = sample();
        let evo = daily_evolution(&detections);
        let stats = run_statistics(&detections, &evo).unwrap();

        assert_eq!(stats.total_detections, 4);
        assert_eq!(stats.days_spanned, 3);
        assert_eq!(stats.dominant_risk, RiskCategory::Alto);
        assert_eq!(stats.risk_distribution[&RiskCategory::Alto], 2);
        assert_eq!(stats.risk_distribution[&RiskCategory::Extremo], 0);
        assert_eq!(stats.high_risk_share_pct, 75.0);
        assert_eq!(stats.frp_mean, 15.0);
        assert_eq!(stats.frp_max, 30.0);
        // both days have 2, the earliest wins
        assert_eq!(stats.peak_day, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(stats.total_area_ha, 56.0);
    }

    #[test]
    fn test_run_statistics_empty() {
        assert!(run_statistics(&[], &[]).is_none());
    }

    #[test]
    fn test_dominant_tie_prefers_severe() {
        let detections = vec![
            item("2026-01-01", 1.0, 10.0, RiskCategory::Bajo),
            item("2026-01-01", 1.0, 85.0, RiskCategory::Extremo),
        ];
        assert_eq!(dominant_category(&detections), Some(RiskCategory::Extremo));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(84.0), "84");
        assert_eq!(format_thousands(1234.4), "1,234");
        assert_eq!(format_thousands(1234567.8), "1,234,568");
        assert_eq!(format_thousands(-4200.0), "-4,200");
    }

    #[test]
    fn test_summary_record_fields() {
        let detections = sample();
        let evo = daily_evolution(&detections);
        let stats = run_statistics(&detections, &evo).unwrap();
        let offset = FixedOffset::east_opt(-3 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 2, 3, 9, 5, 0).unwrap();

        let record = summary_record(&stats, now);
        assert_eq!(record.total_detections, 4);
        assert_eq!(record.dominant_risk, "ALTO");
        assert_eq!(record.intensity, "15.0 MW");
        assert_eq!(record.area, "56 ha");
        assert_eq!(record.last_updated, "03/02/2026 09:05");
    }
}
