//! HTTP surface: `GET /air-quality?latitude=..&longitude=..`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use finedust_core::{
    AirQualityError, AirQualityResult, AirQualityService, Config, Coordinate,
    provider::{airkorea::AirKoreaProvider, openweather::OpenWeatherProvider},
};

/// Shared application state, built once at startup and injected into every
/// handler through axum's `State`.
#[derive(Debug)]
pub struct AppContext {
    service: AirQualityService,
}

impl AppContext {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let strategy = config.station_strategy()?;
        let pollution = Arc::new(AirKoreaProvider::new(
            config.air_korea.api_key.clone(),
            strategy,
        ));
        let weather = Arc::new(OpenWeatherProvider::new(config.open_weather.api_key.clone()));

        let service =
            AirQualityService::new(pollution, weather, config.cache_ttl(), config.service_area);

        Ok(Self { service })
    }
}

pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/air-quality", get(get_air_quality))
        .with_state(context)
}

/// Coordinates arrive as strings so the core validator owns the numeric
/// parsing; `lat`/`lng`/`lon` are accepted as aliases.
#[derive(Debug, Deserialize)]
struct CoordinateQuery {
    #[serde(alias = "lat")]
    latitude: Option<String>,
    #[serde(alias = "lng", alias = "lon")]
    longitude: Option<String>,
}

async fn get_air_quality(
    State(context): State<Arc<AppContext>>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<AirQualityResult>, ApiError> {
    let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
        return Err(ApiError::bad_request("latitude and longitude are required"));
    };

    tracing::debug!("raw coordinates received: latitude={latitude}, longitude={longitude}");

    let coordinate = Coordinate::parse(&latitude, &longitude)?;
    let result = context.service.get_air_quality(coordinate).await?;

    Ok(Json(result))
}

/// JSON error envelope: `{"error": "<message>"}` with the mapped status.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.to_string() }
    }
}

impl From<AirQualityError> for ApiError {
    fn from(err: AirQualityError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!("request failed: {err}");
        }

        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
