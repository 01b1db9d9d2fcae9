use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::types::{WeatherSeverity, WeatherSnapshot};
use crate::TARGET_WEB_REQUEST;

/// Current-weather provider contract. Implementations must degrade to a
/// clearly-marked synthetic reading rather than failing, so the pipeline can
/// treat weather as best-effort.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot>;
}

/// OpenWeatherMap-backed source. When the API key is unset, the provider is
/// unreachable, or the reply is unusable, a synthetic severe-weather reading
/// is returned instead; `current` never errors.
pub struct OpenWeatherSource {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    fetch_timeout: Duration,
    cache: Arc<TtlCache<WeatherSnapshot>>,
}

impl OpenWeatherSource {
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        fetch_timeout: Duration,
        cache: Arc<TtlCache<WeatherSnapshot>>,
    ) -> Self {
        OpenWeatherSource {
            http: reqwest::Client::new(),
            api_key,
            base_url,
            fetch_timeout,
            cache,
        }
    }

    async fn fetch(&self, lat: f64, lon: f64, api_key: &str) -> Result<WeatherSnapshot> {
        let url = format!("{}/weather", self.base_url);
        let request = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send();

        let response = timeout(self.fetch_timeout, request).await??;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("weather API returned status {}", status);
        }

        let data: Value = response.json().await?;
        Ok(Self::parse_reading(&data))
    }

    fn parse_reading(data: &Value) -> WeatherSnapshot {
        let temperature = data["main"]["temp"].as_f64().unwrap_or(0.0);
        // OpenWeatherMap reports wind in m/s.
        let wind_speed = data["wind"]["speed"].as_f64().unwrap_or(0.0) * 3.6;
        let rain = data["rain"]["1h"].as_f64().unwrap_or(0.0);
        let snow = data["snow"]["1h"].as_f64().unwrap_or(0.0);
        let visibility_m = data["visibility"].as_f64().unwrap_or(10_000.0);

        WeatherSnapshot {
            condition: data["weather"][0]["main"]
                .as_str()
                .unwrap_or("unknown")
                .to_lowercase(),
            description: data["weather"][0]["description"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            temperature,
            feels_like: data["main"]["feels_like"].as_f64().unwrap_or(temperature),
            humidity: data["main"]["humidity"].as_f64().unwrap_or(0.0),
            wind_speed,
            precipitation: rain + snow,
            visibility_km: visibility_m / 1000.0,
            warnings: Self::warnings(temperature, wind_speed, rain, snow, visibility_m),
            severity: Self::severity(temperature, wind_speed, rain, snow),
            synthetic: false,
        }
    }

    fn warnings(temp: f64, wind_kmh: f64, rain: f64, snow: f64, visibility_m: f64) -> Vec<String> {
        let mut warnings = Vec::new();
        if temp < -20.0 {
            warnings.push("Extreme cold warning".to_string());
        } else if temp < -10.0 {
            warnings.push("Cold weather advisory".to_string());
        }
        if wind_kmh > 70.0 {
            warnings.push("High wind warning".to_string());
        } else if wind_kmh > 50.0 {
            warnings.push("Wind advisory".to_string());
        }
        if rain > 10.0 {
            warnings.push("Heavy rain warning".to_string());
        }
        if snow > 5.0 {
            warnings.push("Heavy snow warning".to_string());
        }
        if visibility_m < 1000.0 {
            warnings.push("Poor visibility warning".to_string());
        }
        warnings
    }

    fn severity(temp: f64, wind_kmh: f64, rain: f64, snow: f64) -> WeatherSeverity {
        if temp < -20.0 || wind_kmh > 70.0 || rain > 15.0 || snow > 10.0 {
            WeatherSeverity::Severe
        } else if temp < -10.0 || wind_kmh > 50.0 || rain > 10.0 || snow > 5.0 {
            WeatherSeverity::Moderate
        } else {
            WeatherSeverity::Mild
        }
    }

    /// Degraded reading used whenever the real provider cannot answer.
    pub fn synthetic_reading() -> WeatherSnapshot {
        WeatherSnapshot {
            condition: "ice_storm".to_string(),
            description: "freezing rain and ice accumulation".to_string(),
            temperature: -5.0,
            feels_like: -12.0,
            humidity: 95.0,
            wind_speed: 45.0,
            precipitation: 15.0,
            visibility_km: 2.5,
            warnings: vec![
                "Ice storm warning".to_string(),
                "Power outage risk".to_string(),
                "Travel not recommended".to_string(),
            ],
            severity: WeatherSeverity::Severe,
            synthetic: true,
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn current(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        let cache_key = format!("weather_{:.2}_{:.2}", lat, lon);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let reading = match &self.api_key {
            None => {
                warn!(target: TARGET_WEB_REQUEST, "no weather API key configured, using synthetic reading");
                Self::synthetic_reading()
            }
            Some(key) => match self.fetch(lat, lon, key).await {
                Ok(reading) => {
                    info!(target: TARGET_WEB_REQUEST, "weather for ({:.2}, {:.2}): {}", lat, lon, reading.condition);
                    reading
                }
                Err(err) => {
                    warn!(target: TARGET_WEB_REQUEST, "weather fetch failed ({}), using synthetic reading", err);
                    Self::synthetic_reading()
                }
            },
        };

        self.cache.set(cache_key, reading.clone());
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reading_converts_units_and_derives_severity() {
        let data: Value = serde_json::json!({
            "weather": [{"main": "Snow", "description": "heavy snow"}],
            "main": {"temp": -12.0, "feels_like": -19.0, "humidity": 90},
            "wind": {"speed": 15.0},
            "snow": {"1h": 7.0},
            "visibility": 800
        });
        let reading = OpenWeatherSource::parse_reading(&data);

        assert_eq!(reading.condition, "snow");
        assert!((reading.wind_speed - 54.0).abs() < 1e-9);
        assert_eq!(reading.visibility_km, 0.8);
        assert_eq!(reading.severity, WeatherSeverity::Moderate);
        assert!(reading.warnings.iter().any(|w| w.contains("snow")));
        assert!(reading.warnings.iter().any(|w| w.contains("visibility")));
        assert!(!reading.synthetic);
    }

    #[test]
    fn severe_thresholds() {
        assert_eq!(
            OpenWeatherSource::severity(-25.0, 10.0, 0.0, 0.0),
            WeatherSeverity::Severe
        );
        assert_eq!(
            OpenWeatherSource::severity(5.0, 10.0, 0.0, 0.0),
            WeatherSeverity::Mild
        );
    }

    #[tokio::test]
    async fn missing_api_key_degrades_to_synthetic() {
        let source = OpenWeatherSource::new(
            None,
            "https://unused.example.com".to_string(),
            Duration::from_secs(1),
            Arc::new(TtlCache::new(Duration::from_secs(60))),
        );
        let reading = source.current(43.65, -79.38).await.unwrap();
        assert!(reading.synthetic);
        assert_eq!(reading.severity, WeatherSeverity::Severe);
    }

    #[tokio::test]
    async fn readings_are_memoized_by_coordinates() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let source = OpenWeatherSource::new(
            None,
            "https://unused.example.com".to_string(),
            Duration::from_secs(1),
            Arc::clone(&cache),
        );
        source.current(43.65, -79.38).await.unwrap();
        assert!(cache.get("weather_43.65_-79.38").is_some());
    }
}
