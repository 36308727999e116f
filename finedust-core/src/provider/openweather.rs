use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::AirQualityError,
    model::{Coordinate, WeatherReading},
    provider::{WeatherProvider, http_client, truncate_body},
};

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Weather provider backed by the OpenWeather current-conditions API.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, http: http_client() }
    }

    async fn fetch_current(
        &self,
        coordinate: &Coordinate,
    ) -> Result<WeatherReading, AirQualityError> {
        let lat = coordinate.latitude().to_string();
        let lon = coordinate.longitude().to_string();

        let res = self
            .http
            .get(CURRENT_WEATHER_URL)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "kr"),
            ])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AirQualityError::UpstreamTimeout("OpenWeather current weather".to_string())
                } else {
                    AirQualityError::WeatherUnavailable(format!(
                        "failed to reach OpenWeather: {err}"
                    ))
                }
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|err| {
            AirQualityError::WeatherUnavailable(format!(
                "failed to read OpenWeather response body: {err}"
            ))
        })?;

        if !status.is_success() {
            return Err(AirQualityError::WeatherUnavailable(format!(
                "OpenWeather request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|err| {
            AirQualityError::WeatherUnavailable(format!(
                "failed to parse OpenWeather JSON: {err}"
            ))
        })?;

        parsed.into_reading()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

impl OwCurrentResponse {
    fn into_reading(self) -> Result<WeatherReading, AirQualityError> {
        let condition = self.weather.into_iter().next().ok_or_else(|| {
            AirQualityError::WeatherUnavailable(
                "OpenWeather response contained no weather condition".to_string(),
            )
        })?;

        let observed_at = DateTime::<Utc>::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now);

        Ok(WeatherReading {
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            icon: condition.icon,
            description: condition.description,
            observed_at,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_weather(
        &self,
        coordinate: &Coordinate,
    ) -> Result<WeatherReading, AirQualityError> {
        self.fetch_current(coordinate).await
    }
}
