use async_trait::async_trait;
use crate::models::{WeatherOrigin, WeatherSample};
use super::WeatherSource;
use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,precipitation";

/// Open-Meteo forecast endpoint, last 7 days of hourly data. No key needed.
pub struct OpenMeteoFetcher {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Hourly,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    /// requested in m/s
    wind_speed_10m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

impl OpenMeteoFetcher {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            client: Client::builder()
                .user_agent("WildfireMonitor/1.0")
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Latest hour supplies wind/humidity/temperature; precipitation is summed
    /// over every hour up to it.
    pub fn parse_forecast(body: &str) -> Result<WeatherSample> {
        let parsed: ForecastResponse = serde_json::from_str(body)?;
        let hourly = parsed.hourly;

        let last_idx = hourly
            .time
            .len()
            .checked_sub(1)
            .ok_or_else(|| anyhow!("Open-Meteo returned no hourly data"))?;

        let latest = |series: &[Option<f64>], field: &str| -> Result<f64> {
            series
                .get(last_idx)
                .copied()
                .flatten()
                .ok_or_else(|| anyhow!("Open-Meteo field '{}' missing at latest hour", field))
        };

        let wind_ms = latest(&hourly.wind_speed_10m, "wind_speed_10m")?;
        let humidity = latest(&hourly.relative_humidity_2m, "relative_humidity_2m")?;
        let temperature = latest(&hourly.temperature_2m, "temperature_2m")?;

        let rain_total: f64 = hourly
            .precipitation
            .iter()
            .take(last_idx + 1)
            .flatten()
            .sum();

        Ok(WeatherSample {
            wind_kmh: round1(wind_ms * 3.6),
            humidity_pct: round1(humidity),
            temperature_c: round1(temperature),
            rain_7d_mm: round1(rain_total),
            origin: WeatherOrigin::Observed,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoFetcher {
    fn name(&self) -> &str {
        "OPEN_METEO"
    }

    async fn fetch_weather(&self, latitude: f64, longitude: f64) -> Result<WeatherSample> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("past_days", "7".to_string()),
                ("forecast_days", "0".to_string()),
                ("timezone", "auto".to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Open-Meteo API Error: {} - Body: {}", status, error_text));
        }

        let body = resp.text().await?;
        Self::parse_forecast(&body)
    }
}
