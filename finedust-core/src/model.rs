use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AirQualityError;

/// Decimal places kept when building cache keys. Two places (~1.1 km) keeps
/// nearby requests on the same key without merging distinct neighborhoods.
pub const CACHE_KEY_PRECISION: usize = 2;

/// A validated WGS84 coordinate. Constructed per request; immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Validate raw degrees: latitude in [-90, 90], longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AirQualityError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(AirQualityError::InvalidCoordinate(format!(
                "coordinates must be finite numbers, got ({latitude}, {longitude})"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AirQualityError::InvalidCoordinate(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AirQualityError::InvalidCoordinate(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }

        Ok(Self { latitude, longitude })
    }

    /// Parse coordinates that arrived as strings (e.g. HTTP query parameters).
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, AirQualityError> {
        let latitude: f64 = latitude.trim().parse().map_err(|_| {
            AirQualityError::InvalidCoordinate(format!("latitude '{latitude}' is not a number"))
        })?;
        let longitude: f64 = longitude.trim().parse().map_err(|_| {
            AirQualityError::InvalidCoordinate(format!("longitude '{longitude}' is not a number"))
        })?;

        Self::new(latitude, longitude)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Cache key with coordinates rounded to a fixed precision, so that
    /// requests from the same neighborhood share an entry.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.prec$}:{:.prec$}",
            self.latitude,
            self.longitude,
            prec = CACHE_KEY_PRECISION
        )
    }
}

/// Optional bounding box restricting the service to a region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceArea {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl ServiceArea {
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&coordinate.latitude())
            && (self.min_longitude..=self.max_longitude).contains(&coordinate.longitude())
    }
}

/// A fixed-location monitoring station, resolved per request.
#[derive(Debug, Clone)]
pub struct Station {
    pub name: String,
    pub region: String,
    /// Projected coordinates as reported upstream, when present.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Particulate readings for one station. Upstream reports these as strings;
/// unparsable values default to 0 (grades to 1).
#[derive(Debug, Clone)]
pub struct PollutionReading {
    pub pm10: u32,
    pub pm25: u32,
    pub pm10_grade: u8,
    pub pm25_grade: u8,
    pub measured_at: String,
}

/// A station together with its most recent reading.
#[derive(Debug, Clone)]
pub struct StationReport {
    pub station: Station,
    pub reading: PollutionReading,
}

/// Current weather at the requested coordinate. Absence of weather data must
/// never fail the overall request.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub icon: String,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

/// Derived severity bucket for a pair of PM10/PM2.5 readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeInfo {
    /// 1 = best air quality, 8 = worst.
    pub tier: u8,
    pub emoji: &'static str,
    /// Background color hex, e.g. "#4E7BEE".
    pub color: &'static str,
    pub warning: &'static str,
}

/// The composed response. Field names match the public JSON shape; weather
/// fields are omitted when the weather fetch failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityResult {
    pub sido_name: String,
    pub station_name: String,
    pub pm10_value: u32,
    pub pm25_value: u32,
    pub pm10_grade: u8,
    pub pm25_grade: u8,
    pub data_time: String,
    pub grade_emoji: String,
    pub background_color: String,
    pub warning_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_seoul_coordinates() {
        let coordinate = Coordinate::new(37.5, 127.0).expect("valid coordinate");
        assert_eq!(coordinate.latitude(), 37.5);
        assert_eq!(coordinate.longitude(), 127.0);
    }

    #[test]
    fn rejects_latitude_out_of_range() {
        let err = Coordinate::new(100.0, 0.0).unwrap_err();
        assert!(matches!(err, AirQualityError::InvalidCoordinate(_)));
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        let err = Coordinate::new(0.0, 181.0).unwrap_err();
        assert!(matches!(err, AirQualityError::InvalidCoordinate(_)));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn parses_string_input() {
        let coordinate = Coordinate::parse(" 37.5 ", "127.0").expect("valid strings");
        assert_eq!(coordinate.latitude(), 37.5);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        let err = Coordinate::parse("abc", "127.0").unwrap_err();
        assert!(matches!(err, AirQualityError::InvalidCoordinate(_)));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn cache_key_rounds_to_fixed_precision() {
        let a = Coordinate::new(37.5011, 127.0049).unwrap();
        let b = Coordinate::new(37.4992, 126.9951).unwrap();
        assert_eq!(a.cache_key(), "37.50:127.00");
        assert_eq!(a.cache_key(), b.cache_key());

        let far = Coordinate::new(37.52, 127.0).unwrap();
        assert_ne!(a.cache_key(), far.cache_key());
    }

    #[test]
    fn service_area_bounds_are_inclusive() {
        let area = ServiceArea {
            min_latitude: 33.0,
            max_latitude: 39.0,
            min_longitude: 124.0,
            max_longitude: 132.0,
        };

        let inside = Coordinate::new(37.5, 127.0).unwrap();
        let edge = Coordinate::new(33.0, 132.0).unwrap();
        let outside = Coordinate::new(48.8, 2.3).unwrap();

        assert!(area.contains(&inside));
        assert!(area.contains(&edge));
        assert!(!area.contains(&outside));
    }

    #[test]
    fn weather_fields_are_omitted_when_absent() {
        let result = AirQualityResult {
            sido_name: "서울".to_string(),
            station_name: "강남구".to_string(),
            pm10_value: 30,
            pm25_value: 15,
            pm10_grade: 2,
            pm25_grade: 2,
            data_time: "2025-03-31 14:00".to_string(),
            grade_emoji: "🙂".to_string(),
            background_color: "#50A0E5".to_string(),
            warning_message: String::new(),
            temperature: None,
            feels_like: None,
            weather_icon: None,
            weather_description: None,
        };

        let json = serde_json::to_value(&result).expect("serializable");
        assert_eq!(json["stationName"], "강남구");
        assert_eq!(json["pm10Value"], 30);
        assert!(json.get("temperature").is_none());
        assert!(json.get("weatherIcon").is_none());
    }
}
