use thiserror::Error;

/// Error taxonomy for the air-quality pipeline.
///
/// Validation failures are client errors; everything upstream surfaces as a
/// server error unless the service explicitly downgrades it (weather only).
#[derive(Debug, Error)]
pub enum AirQualityError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("coordinates ({latitude}, {longitude}) are outside the service area")]
    OutOfServiceArea { latitude: f64, longitude: f64 },

    #[error("no monitoring station found near ({latitude}, {longitude})")]
    NoStationFound { latitude: f64, longitude: f64 },

    #[error("station '{0}' has no recent readings")]
    NoReadingAvailable(String),

    #[error("weather data unavailable: {0}")]
    WeatherUnavailable(String),

    #[error("upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AirQualityError {
    /// True for errors caused by the caller's input rather than upstream
    /// state; these map to 400-class responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoordinate(_) | Self::OutOfServiceArea { .. }
        )
    }
}
