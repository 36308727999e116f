use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::AirQualityError,
    model::{Coordinate, PollutionReading, Station, StationReport},
    provider::{PollutionProvider, StationStrategy, get_json, http_client},
};

use async_trait::async_trait;

const REALTIME_BY_REGION_URL: &str =
    "https://apis.data.go.kr/B552584/ArpltnInforInqireSvc/getCtprvnRltmMesureDnsty";
const REALTIME_BY_STATION_URL: &str =
    "https://apis.data.go.kr/B552584/ArpltnInforInqireSvc/getMsrstnAcctoRltmMesureDnsty";
const NEARBY_STATION_URL: &str =
    "https://apis.data.go.kr/B552584/MsrstnInfoInqireSvc/getNearbyMsrstnList";

/// The 17 first-level administrative regions (sido) AirKorea reports on.
const SIDO_NAMES: [&str; 17] = [
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "경기", "강원", "충북", "충남",
    "전북", "전남", "경북", "경남", "제주", "세종",
];

/// Pollution provider backed by the AirKorea open API.
#[derive(Debug, Clone)]
pub struct AirKoreaProvider {
    api_key: String,
    strategy: StationStrategy,
    http: Client,
}

impl AirKoreaProvider {
    pub fn new(api_key: String, strategy: StationStrategy) -> Self {
        Self { api_key, strategy, http: http_client() }
    }

    /// Realtime readings for every station in one region. An empty body is
    /// not an error here; the caller aggregates across regions.
    async fn fetch_region(&self, sido: &str) -> Result<Vec<RealtimeItem>, AirQualityError> {
        let response: RealtimeResponse = get_json(
            &self.http,
            REALTIME_BY_REGION_URL,
            &[
                ("serviceKey", self.api_key.as_str()),
                ("returnType", "json"),
                ("sidoName", sido),
                ("ver", "1.0"),
                ("numOfRows", "100"),
                ("pageNo", "1"),
                ("dataTerm", "DAILY"),
            ],
            "AirKorea realtime density",
        )
        .await?;

        Ok(response.items())
    }

    /// Query all regions concurrently and keep whatever succeeded. A single
    /// failing region is logged and skipped; it must not abort the scan.
    async fn bulk_scan(&self, coordinate: &Coordinate) -> Result<RealtimeItem, AirQualityError> {
        let fetches = SIDO_NAMES.iter().map(|sido| self.fetch_region(sido));
        let results = join_all(fetches).await;

        let mut items = Vec::new();
        for (sido, result) in SIDO_NAMES.iter().zip(results) {
            match result {
                Ok(mut regional) => items.append(&mut regional),
                Err(err) => tracing::warn!("skipping region {sido}: {err}"),
            }
        }

        pick_nearest(items, coordinate).ok_or(AirQualityError::NoStationFound {
            latitude: coordinate.latitude(),
            longitude: coordinate.longitude(),
        })
    }

    /// First station returned by the nearest-station endpoint.
    async fn nearby_station(
        &self,
        coordinate: &Coordinate,
    ) -> Result<NearbyItem, AirQualityError> {
        let tm_x = coordinate.longitude().to_string();
        let tm_y = coordinate.latitude().to_string();

        let response: NearbyResponse = get_json(
            &self.http,
            NEARBY_STATION_URL,
            &[
                ("serviceKey", self.api_key.as_str()),
                ("returnType", "json"),
                ("tmX", tm_x.as_str()),
                ("tmY", tm_y.as_str()),
                ("ver", "1.1"),
            ],
            "AirKorea nearby stations",
        )
        .await?;

        response.response.and_then(|r| r.body).map(|b| b.items).unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(AirQualityError::NoStationFound {
                latitude: coordinate.latitude(),
                longitude: coordinate.longitude(),
            })
    }

    /// Most recent reading for a named station.
    async fn station_reading(&self, station_name: &str) -> Result<RealtimeItem, AirQualityError> {
        let response: RealtimeResponse = get_json(
            &self.http,
            REALTIME_BY_STATION_URL,
            &[
                ("serviceKey", self.api_key.as_str()),
                ("returnType", "json"),
                ("stationName", station_name),
                ("dataTerm", "DAILY"),
                ("numOfRows", "1"),
                ("pageNo", "1"),
                ("ver", "1.0"),
            ],
            "AirKorea station reading",
        )
        .await?;

        response
            .items()
            .into_iter()
            .next()
            .ok_or_else(|| AirQualityError::NoReadingAvailable(station_name.to_string()))
    }
}

#[async_trait]
impl PollutionProvider for AirKoreaProvider {
    async fn fetch_pollution(
        &self,
        coordinate: &Coordinate,
    ) -> Result<StationReport, AirQualityError> {
        let report = match self.strategy {
            StationStrategy::BulkScan => {
                let item = self.bulk_scan(coordinate).await?;
                item.into_report()
            }
            StationStrategy::Nearby => {
                let nearby = self.nearby_station(coordinate).await?;
                let station_name = nearby.station_name.clone().unwrap_or_default();
                let item = self.station_reading(&station_name).await?;

                let mut report = item.into_report();
                if report.station.name.is_empty() {
                    report.station.name = station_name;
                }
                if report.station.region.is_empty() {
                    report.station.region = nearby.region();
                }
                report
            }
        };

        tracing::debug!(
            "using station {} in {}",
            report.station.name,
            report.station.region
        );
        Ok(report)
    }
}

/// Select the item minimizing Manhattan distance to the coordinate.
/// The first minimum wins on ties.
fn pick_nearest(items: Vec<RealtimeItem>, coordinate: &Coordinate) -> Option<RealtimeItem> {
    let mut best: Option<(f64, RealtimeItem)> = None;
    for item in items {
        let distance = item.manhattan_distance(coordinate);
        match &best {
            Some((best_distance, _)) if distance >= *best_distance => {}
            _ => best = Some((distance, item)),
        }
    }
    best.map(|(_, item)| item)
}

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    response: Option<ResponseEnvelope>,
}

impl RealtimeResponse {
    fn items(self) -> Vec<RealtimeItem> {
        self.response.and_then(|r| r.body).map(|b| b.items).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    body: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    items: Vec<RealtimeItem>,
}

/// One station reading as AirKorea reports it: every field is a nullable
/// string, including the numeric ones ("-" marks a failed measurement).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeItem {
    #[serde(default)]
    station_name: Option<String>,
    #[serde(default)]
    sido_name: Option<String>,
    #[serde(default)]
    data_time: Option<String>,
    #[serde(default)]
    pm10_value: Option<String>,
    #[serde(default)]
    pm25_value: Option<String>,
    #[serde(default)]
    pm10_grade: Option<String>,
    #[serde(default)]
    pm25_grade: Option<String>,
    #[serde(default)]
    dm_x: Option<String>,
    #[serde(default)]
    dm_y: Option<String>,
}

impl RealtimeItem {
    /// |dmX − lon| + |dmY − lat|, with unparsable projections read as 0.
    fn manhattan_distance(&self, coordinate: &Coordinate) -> f64 {
        let dm_x = parse_f64_or_zero(self.dm_x.as_deref());
        let dm_y = parse_f64_or_zero(self.dm_y.as_deref());

        (dm_x - coordinate.longitude()).abs() + (dm_y - coordinate.latitude()).abs()
    }

    fn into_report(self) -> StationReport {
        let latitude = self.dm_y.as_deref().and_then(|v| v.trim().parse().ok());
        let longitude = self.dm_x.as_deref().and_then(|v| v.trim().parse().ok());

        StationReport {
            station: Station {
                name: self.station_name.unwrap_or_default(),
                region: self.sido_name.unwrap_or_default(),
                latitude,
                longitude,
            },
            reading: PollutionReading {
                pm10: parse_u32_or(self.pm10_value.as_deref(), 0),
                pm25: parse_u32_or(self.pm25_value.as_deref(), 0),
                pm10_grade: parse_u8_or(self.pm10_grade.as_deref(), 1),
                pm25_grade: parse_u8_or(self.pm25_grade.as_deref(), 1),
                measured_at: self.data_time.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    response: Option<NearbyEnvelope>,
}

#[derive(Debug, Deserialize)]
struct NearbyEnvelope {
    body: Option<NearbyBody>,
}

#[derive(Debug, Deserialize)]
struct NearbyBody {
    #[serde(default)]
    items: Vec<NearbyItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NearbyItem {
    #[serde(default)]
    station_name: Option<String>,
    #[serde(default)]
    addr: Option<String>,
}

impl NearbyItem {
    /// Region is the leading token of the station address ("서울 종로구 ...").
    fn region(&self) -> String {
        self.addr
            .as_deref()
            .and_then(|addr| addr.split_whitespace().next())
            .unwrap_or_default()
            .to_string()
    }
}

fn parse_u32_or(value: Option<&str>, default: u32) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_u8_or(value: Option<&str>, default: u8) -> u8 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_f64_or_zero(value: Option<&str>) -> f64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0.0)
}
