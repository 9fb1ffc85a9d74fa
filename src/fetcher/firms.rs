use async_trait::async_trait;
use crate::config::BoundingBox;
use crate::models::RawDetection;
use super::HotspotSource;
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

/// Markers FIRMS puts in a 200 body when the key or query is rejected.
const ERROR_MARKERS: [&str; 2] = ["Invalid", "Error"];

/// NASA FIRMS area API (CSV).
/// [BASE_URL]/api/area/csv/[MAP_KEY]/[SOURCE]/[W,S,E,N]/[DAY_RANGE]/[DATE]
pub struct FirmsFetcher {
    base_url: String,
    map_key: String,
    source: String,
    client: Client,
}

impl FirmsFetcher {
    pub fn new(base_url: &str, map_key: String, source: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("WildfireMonitor/1.0"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            map_key,
            source: source.to_string(),
            client,
        }
    }

    fn window_url(&self, bbox: &BoundingBox, start: NaiveDate, days: u32) -> String {
        format!(
            "{}/api/area/csv/{}/{}/{}/{}/{}",
            self.base_url,
            self.map_key.trim(),
            self.source,
            bbox.to_firms_area(),
            days,
            start.format("%Y-%m-%d")
        )
    }

    /// Parses a FIRMS CSV body. `None` for an empty body, an error message or a
    /// CSV that lacks the `acq_date` column; rows that fail to parse are skipped.
    pub fn parse_csv(body: &str) -> Option<Vec<RawDetection>> {
        let text = body.trim();
        if text.is_empty() {
            return None;
        }
        if ERROR_MARKERS.iter().any(|m| text.contains(m)) {
            log::warn!("FIRMS API error: {}", text.chars().take(100).collect::<String>());
            return None;
        }

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        match reader.headers() {
            Ok(headers) if headers.iter().any(|h| h == "acq_date") => {}
            _ => return None,
        }

        let mut detections = Vec::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<RawDetection>() {
            match row {
                Ok(d) if d.frp >= 0.0 && d.latitude.is_finite() && d.longitude.is_finite() => detections.push(d),
                Ok(_) => skipped += 1,
                Err(e) => {
                    log::debug!("Skipping malformed FIRMS row: {}", e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} malformed FIRMS rows", skipped);
        }

        if detections.is_empty() {
            None
        } else {
            Some(detections)
        }
    }
}

#[async_trait]
impl HotspotSource for FirmsFetcher {
    fn name(&self) -> &str {
        "FIRMS"
    }

    async fn fetch_window(&self, bbox: &BoundingBox, start: NaiveDate, days: u32) -> Result<Option<Vec<RawDetection>>> {
        if self.map_key.trim().is_empty() {
            return Err(anyhow!("FIRMS MAP_KEY is empty or missing!"));
        }

        let url = self.window_url(bbox, start, days);
        // Never echo the URL, it carries the MAP_KEY
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("FIRMS request failed: {}", e.without_url()))?;

        if !resp.status().is_success() {
            return Err(anyhow!("FIRMS API Error: {}", resp.status()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| anyhow!("FIRMS response unreadable: {}", e.without_url()))?;
        Ok(Self::parse_csv(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIIRS_CSV: &str = "\
latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight
-43.12345,-71.54321,335.2,0.39,0.36,2026-01-05,0412,N,VIIRS,h,2.0NRT,290.1,12.7,N
-44.00001,-70.90000,301.0,0.40,0.37,2026-01-05,1735,N,VIIRS,n,2.0NRT,288.4,3.1,D
";

    #[test]
    fn test_parse_valid_csv() {
        let rows = FirmsFetcher::parse_csv(VIIRS_CSV).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].latitude, -43.12345);
        assert_eq!(rows[0].acq_date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(rows[0].acq_time, 412);
        assert_eq!(rows[0].confidence, "h");
        assert_eq!(rows[0].satellite.as_deref(), Some("N"));
        assert_eq!(rows[1].frp, 3.1);
        assert_eq!(rows[1].daynight.as_deref(), Some("D"));
    }

    #[test]
    fn test_parse_modis_numeric_confidence() {
        let csv = "latitude,longitude,acq_date,acq_time,confidence,frp\n-45.1,-70.2,2026-02-01,1320,87,40.5\n";
        let rows = FirmsFetcher::parse_csv(csv).unwrap();
        assert_eq!(rows[0].confidence, "87");
        assert!(rows[0].satellite.is_none());
    }

    #[test]
    fn test_error_body_is_no_data() {
        assert!(FirmsFetcher::parse_csv("Invalid MAP_KEY.").is_none());
        assert!(FirmsFetcher::parse_csv("Error: too many requests").is_none());
    }

    #[test]
    fn test_empty_and_header_only_are_no_data() {
        assert!(FirmsFetcher::parse_csv("").is_none());
        assert!(FirmsFetcher::parse_csv("   \n").is_none());
        assert!(FirmsFetcher::parse_csv("latitude,longitude,acq_date,acq_time,confidence,frp\n").is_none());
    }

    #[test]
    fn test_missing_acq_date_column_is_no_data() {
        assert!(FirmsFetcher::parse_csv("latitude,longitude,frp\n-43,-71,2.0\n").is_none());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let csv = "latitude,longitude,acq_date,acq_time,confidence,frp\n\
                   -43.0,-71.0,2026-01-01,100,h,5.0\n\
                   oops,-71.0,2026-01-01,100,h,5.0\n\
                   -43.5,-71.5,not-a-date,100,h,5.0\n";
        let rows = FirmsFetcher::parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_window_url_layout() {
        let fetcher = FirmsFetcher::new("https://firms.example/", "KEY".to_string(), "VIIRS_SNPP_NRT");
        let bbox = BoundingBox { west: -72.5, south: -47.0, east: -69.0, north: -42.0 };
        let url = fetcher.window_url(&bbox, NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(), 5);
        assert_eq!(url, "https://firms.example/api/area/csv/KEY/VIIRS_SNPP_NRT/-72.5,-47,-69,-42/5/2026-01-06");
    }
}
