//! Request orchestration: validate, consult the cache, fan out to the
//! pollution and weather providers, grade, compose, and cache the result.

use std::sync::Arc;

use tokio::time::Duration;

use crate::{
    cache::ResultCache,
    error::AirQualityError,
    grade,
    model::{AirQualityResult, Coordinate, GradeInfo, ServiceArea, StationReport, WeatherReading},
    provider::{PollutionProvider, WeatherProvider},
};

#[derive(Debug)]
pub struct AirQualityService {
    pollution: Arc<dyn PollutionProvider>,
    weather: Arc<dyn WeatherProvider>,
    cache: ResultCache,
    service_area: Option<ServiceArea>,
}

impl AirQualityService {
    pub fn new(
        pollution: Arc<dyn PollutionProvider>,
        weather: Arc<dyn WeatherProvider>,
        cache_ttl: Duration,
        service_area: Option<ServiceArea>,
    ) -> Self {
        Self { pollution, weather, cache: ResultCache::new(cache_ttl), service_area }
    }

    /// Aggregate air quality and weather for a coordinate.
    ///
    /// Weather failures are non-fatal: they are logged and the result is
    /// composed without weather fields. Station resolution and pollution
    /// failures propagate.
    pub async fn get_air_quality(
        &self,
        coordinate: Coordinate,
    ) -> Result<AirQualityResult, AirQualityError> {
        if let Some(area) = &self.service_area {
            if !area.contains(&coordinate) {
                return Err(AirQualityError::OutOfServiceArea {
                    latitude: coordinate.latitude(),
                    longitude: coordinate.longitude(),
                });
            }
        }

        let key = coordinate.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("cache hit for {key}");
            return Ok(cached);
        }

        tracing::info!(
            "fetching air quality for ({}, {})",
            coordinate.latitude(),
            coordinate.longitude()
        );

        let (pollution, weather) = tokio::join!(
            self.pollution.fetch_pollution(&coordinate),
            self.weather.fetch_weather(&coordinate),
        );

        let report = pollution?;
        let weather = match weather {
            Ok(reading) => Some(reading),
            Err(err) => {
                tracing::warn!("proceeding without weather data: {err}");
                None
            }
        };

        let grade = grade::classify(report.reading.pm10, report.reading.pm25);
        let result = compose(report, grade, weather);

        self.cache.insert(key, result.clone()).await;
        Ok(result)
    }
}

/// Merge station, reading, grade, and optional weather into the response.
/// Missing weather only leaves its fields unset; it never fails composition.
pub fn compose(
    report: StationReport,
    grade: GradeInfo,
    weather: Option<WeatherReading>,
) -> AirQualityResult {
    let (temperature, feels_like, weather_icon, weather_description) = match weather {
        Some(w) => (
            Some(w.temperature_c.round() as i32),
            Some(w.feels_like_c.round() as i32),
            Some(w.icon),
            Some(w.description),
        ),
        None => (None, None, None, None),
    };

    AirQualityResult {
        sido_name: report.station.region,
        station_name: report.station.name,
        pm10_value: report.reading.pm10,
        pm25_value: report.reading.pm25,
        pm10_grade: report.reading.pm10_grade,
        pm25_grade: report.reading.pm25_grade,
        data_time: report.reading.measured_at,
        grade_emoji: grade.emoji.to_string(),
        background_color: grade.color.to_string(),
        warning_message: grade.warning.to_string(),
        temperature,
        feels_like,
        weather_icon,
        weather_description,
    }
}
