//! Core library for the fine-dust air quality service.
//!
//! This crate defines:
//! - Coordinate validation and the shared domain model
//! - Upstream providers (AirKorea pollution data, OpenWeather conditions)
//! - The PM10/PM2.5 grade classifier
//! - A TTL cache for composed results
//! - The request-scoped aggregation service
//!
//! It is used by `finedust-server`, but can also be reused by other binaries.

pub mod cache;
pub mod config;
pub mod error;
pub mod grade;
pub mod model;
pub mod provider;
pub mod service;

pub use config::Config;
pub use error::AirQualityError;
pub use model::{AirQualityResult, Coordinate, ServiceArea};
pub use provider::{PollutionProvider, StationStrategy, WeatherProvider};
pub use service::AirQualityService;
