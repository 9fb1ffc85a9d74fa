use crate::models::{RiskAssessment, RiskCategory, WeatherSample};

const WIND_WEIGHT: f64 = 0.4;
const HUMIDITY_WEIGHT: f64 = 0.3;
const RAIN_WEIGHT: f64 = 0.2;
const TEMPERATURE_WEIGHT: f64 = 0.1;

/// Wind that saturates the wind term (km/h)
const WIND_CEILING_KMH: f64 = 50.0;
/// Rain that zeroes the rain term (mm over 7 days)
const RAIN_CEILING_MM: f64 = 50.0;
const TEMPERATURE_BASE_C: f64 = 10.0;
const TEMPERATURE_SPAN_C: f64 = 30.0;

/// 30-30-30 rule: temperature >= 30 °C, humidity <= 30 %, wind >= 30 km/h.
pub fn is_extreme_conditions(wind_kmh: f64, humidity_pct: f64, temperature_c: f64) -> bool {
    temperature_c >= 30.0 && humidity_pct <= 30.0 && wind_kmh >= 30.0
}

/// Simplified fire-weather index in [0, 100], one decimal.
/// Weighting: wind 40%, humidity 30%, rain 20%, temperature 10%.
pub fn risk_index(wind_kmh: f64, humidity_pct: f64, rain_7d_mm: f64, temperature_c: f64) -> f64 {
    if is_extreme_conditions(wind_kmh, humidity_pct, temperature_c) {
        return 100.0;
    }

    let wind = (wind_kmh / WIND_CEILING_KMH).min(1.0);
    let humidity = (100.0 - humidity_pct) / 100.0;
    let rain = (1.0 - rain_7d_mm / RAIN_CEILING_MM).max(0.0);
    let temperature = ((temperature_c - TEMPERATURE_BASE_C) / TEMPERATURE_SPAN_C).min(1.0);

    let weighted = wind * WIND_WEIGHT
        + humidity * HUMIDITY_WEIGHT
        + rain * RAIN_WEIGHT
        + temperature * TEMPERATURE_WEIGHT;

    let index = (weighted * 100.0).clamp(0.0, 100.0);
    if index.is_nan() {
        return 0.0;
    }
    (index * 10.0).round() / 10.0
}

/// Ordinary bands. `Critico` is never returned here.
pub fn classify(index: f64) -> RiskCategory {
    if index < 20.0 {
        RiskCategory::Bajo
    } else if index < 40.0 {
        RiskCategory::Moderado
    } else if index < 60.0 {
        RiskCategory::Alto
    } else if index < 80.0 {
        RiskCategory::MuyAlto
    } else {
        RiskCategory::Extremo
    }
}

pub fn assess(weather: &WeatherSample) -> RiskAssessment {
    let override_applied = is_extreme_conditions(weather.wind_kmh, weather.humidity_pct, weather.temperature_c);
    let index = risk_index(weather.wind_kmh, weather.humidity_pct, weather.rain_7d_mm, weather.temperature_c);

    let category = if override_applied {
        RiskCategory::Critico
    } else {
        classify(index)
    };

    RiskAssessment { index, category, override_applied }
}
