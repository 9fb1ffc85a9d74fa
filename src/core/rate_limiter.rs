use std::time::Duration;
use tokio::time::sleep;

/// Every N weather lookups the enricher rests briefly.
pub const WEATHER_PAUSE_EVERY: usize = 20;

pub struct RateLimiter;

impl RateLimiter {
    /// Pause appropriate for the given source after a request.
    pub fn delay_for(source: &str) -> Duration {
        match source.to_uppercase().as_str() {
            // FIRMS area API: MAP_KEY is limited per 10 minutes
            "FIRMS" => Duration::from_millis(500),
            // Open-Meteo free tier, only hit every WEATHER_PAUSE_EVERY calls
            "OPEN_METEO" => Duration::from_millis(100),
            _ => Duration::ZERO,
        }
    }

    /// Wait appropriate duration based on the data source
    pub async fn wait(source: &str) {
        let delay = Self::delay_for(source);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
