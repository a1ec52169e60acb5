// Client for the busca_vagas booking API
// Handles health checks, the hotel list, vacancy searches and weekend searches.

use crate::cache::{CacheStatsReport, HotelListCache, SearchResponseCache};
use crate::config::{AppConfig, Environment, RetryConfig, MAX_WEEKENDS, MIN_WEEKENDS};
use crate::criteria::SearchQuery;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

// Error codes the API uses for booking rule violations
pub const BOOKING_RULE_CODES: [&str; 4] = ["WEEKEND_ONLY", "MIN_NIGHTS", "MAX_ADVANCE", "CLOSED_DATES"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("{0}")]
    Api(String),

    #[error("{message}")]
    BookingRule { code: String, message: String },

    #[error("Invalid response: {0}")]
    DecodeError(String),

    #[error("Weekend count must be between {min} and {max}, got {0}", min = MIN_WEEKENDS, max = MAX_WEEKENDS)]
    InvalidWeekendCount(u32),

    #[error("Client error: {0}")]
    ClientError(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError(_) | ApiError::Timeout(_) => true,
            ApiError::ApiResponseError { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum HotelType {
    All,
    #[default]
    #[serde(other)]
    Hotel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    #[serde(alias = "id")]
    pub hotel_id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub hotel_type: HotelType,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HolidayPackageInfo {
    #[serde(rename = "type")]
    pub package_type: String,
    pub name: String,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacancyResult {
    #[serde(default)]
    pub has_availability: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub vacancies: Vec<String>,
    // hotel name -> vacancy descriptions, in the order the API sent them
    #[serde(default)]
    pub hotel_groups: serde_json::Map<String, Value>,
}

impl VacancyResult {
    pub fn grouped_vacancies(&self) -> Vec<(String, Vec<String>)> {
        self.hotel_groups
            .iter()
            .map(|(hotel, entries)| {
                let texts = entries
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                (hotel.clone(), texts)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacancySearchData {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub has_availability: bool,
    #[serde(default)]
    pub result: VacancyResult,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub hotel_filter: Option<String>,
    #[serde(default)]
    pub holiday_package: Option<HolidayPackageInfo>,
    pub data: VacancySearchData,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendResult {
    pub weekend_number: u32,
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub friday: Option<String>,
    #[serde(default)]
    pub sunday: Option<String>,
    #[serde(flatten)]
    pub vacancies: VacancySearchData,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDetails {
    #[serde(default)]
    pub total_weekends_searched: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendAvailability {
    #[serde(default)]
    pub weekends_with_vacancies: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendSearchData {
    #[serde(default, alias = "weekends")]
    pub weekend_results: Vec<WeekendResult>,
    #[serde(default)]
    pub search_details: Option<SearchDetails>,
    #[serde(default)]
    pub availability: Option<WeekendAvailability>,
}

impl WeekendSearchData {
    pub fn weekends_with_vacancies(&self) -> u32 {
        match &self.availability {
            Some(a) => a.weekends_with_vacancies,
            None => self
                .weekend_results
                .iter()
                .filter(|w| w.vacancies.has_availability)
                .count() as u32,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_retried: usize,
    pub requests_timeout: usize,
    pub cache_hits: usize,
    pub average_response_time_ms: f64,
}

#[async_trait]
pub trait VacancyApi: Send + Sync + 'static {
    async fn check_health(&self) -> Result<HealthStatus, ApiError>;

    // Hotel list, served from the local cache unless expired or forced
    async fn get_hotels(&self, force_refresh: bool) -> Result<Vec<Hotel>, ApiError>;

    // Fresh list straight from the upstream site, including the "Todas" option
    async fn scrape_hotels(&self) -> Result<Vec<Hotel>, ApiError>;

    async fn search_vacancies(&self, query: &SearchQuery) -> Result<SearchResponse, ApiError>;

    async fn search_weekends(&self, count: u32) -> Result<WeekendSearchData, ApiError>;

    fn cache_stats(&self) -> CacheStatsReport;

    fn clear_cache(&self);
}

pub fn build_health_url(base_url: &str) -> String {
    format!("{}/health", base_url)
}

pub fn build_hotels_url(base_url: &str) -> String {
    format!("{}/vagas/hoteis", base_url)
}

pub fn build_scrape_url(base_url: &str) -> String {
    format!("{}/vagas/hoteis/scrape", base_url)
}

pub fn build_search_url(base_url: &str, query: &SearchQuery) -> Result<Url, ApiError> {
    let check_in = query.check_in.format("%Y-%m-%d").to_string();
    let check_out = query.check_out.format("%Y-%m-%d").to_string();
    let mut params = vec![
        ("hotel", query.hotel.as_str()),
        ("checkin", check_in.as_str()),
        ("checkout", check_out.as_str()),
    ];
    if !query.apply_booking_rules {
        params.push(("applyBookingRules", "false"));
    }

    Url::parse_with_params(&format!("{}/vagas/search", base_url), &params)
        .map_err(|e| ApiError::ClientError(e.to_string()))
}

pub fn build_weekend_search_url(base_url: &str, count: u32) -> String {
    format!("{}/vagas/search/weekends?count={}", base_url, count)
}

pub fn validate_weekend_count(count: u32) -> Result<(), ApiError> {
    if (MIN_WEEKENDS..=MAX_WEEKENDS).contains(&count) {
        Ok(())
    } else {
        Err(ApiError::InvalidWeekendCount(count))
    }
}

// Exponential backoff with jitter
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}

// The API wraps payloads as { success, data, error? }; success=false is a
// business failure even on HTTP 200.
pub fn check_envelope(body: &Value) -> Result<(), ApiError> {
    if body.get("success").and_then(Value::as_bool) != Some(false) {
        return Ok(());
    }

    let message = body
        .get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("API returned error without message")
        .to_string();

    match body.get("code").and_then(Value::as_str) {
        Some(code) if BOOKING_RULE_CODES.contains(&code) => Err(ApiError::BookingRule {
            code: code.to_string(),
            message,
        }),
        _ => Err(ApiError::Api(message)),
    }
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::DecodeError(e.to_string()))
}

fn decode_data<T: DeserializeOwned>(mut body: Value) -> Result<T, ApiError> {
    match body.get_mut("data") {
        Some(data) => decode(data.take()),
        None => Err(ApiError::DecodeError("missing field `data`".to_string())),
    }
}

pub struct BuscaVagasClient {
    http: reqwest::Client,
    config: AppConfig,
    responses: SearchResponseCache,
    hotels: HotelListCache,
    stats: Mutex<ClientStats>,
}

impl BuscaVagasClient {
    pub fn new(config: AppConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("monitora-vagas/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeouts.weekend_search);

        // A local mock API is reached directly, never through a proxy
        let local = Url::parse(&config.api_base_url)
            .ok()
            .and_then(|url| url.host_str().map(Environment::detect_from_host))
            == Some(Environment::Development);
        if local {
            builder = builder.no_proxy();
        }

        let http = builder
            .build()
            .map_err(|e| ApiError::ClientError(e.to_string()))?;

        let responses =
            SearchResponseCache::new(config.cache.max_responses, config.cache.response_ttl);
        let hotels = HotelListCache::new(config.cache.hotel_list_ttl);

        info!(base_url = %config.api_base_url, "BuscaVagasClient initialized");

        Ok(Self {
            http,
            config,
            responses,
            hotels,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    pub fn with_hotel_cache(mut self, hotels: HotelListCache) -> Self {
        self.hotels = hotels;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_base_url
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value, ApiError> {
        let bytes = self.fetch_with_retry(url, timeout).await?;
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::DecodeError(e.to_string()))?;
        check_envelope(&body)?;
        Ok(body)
    }

    async fn fetch_with_retry(&self, url: &str, timeout: Duration) -> Result<Bytes, ApiError> {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let result = self.fetch_once(url, timeout).await;
            self.record(&result, started.elapsed());

            match result {
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let backoff = calculate_backoff(attempt, &self.config.retry);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    self.stats.lock().requests_retried += 1;
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<Bytes, ApiError> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(e, timeout))?;

        if status.is_success() {
            return Ok(body);
        }

        // Error bodies usually still follow the envelope format
        let message = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        Err(ApiError::ApiResponseError {
            status_code: status.as_u16(),
            message,
            is_retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        })
    }

    fn record(&self, result: &Result<Bytes, ApiError>, elapsed: Duration) {
        let mut stats = self.stats.lock();
        stats.requests_sent += 1;
        match result {
            Ok(_) => stats.requests_succeeded += 1,
            Err(ApiError::Timeout(_)) => {
                stats.requests_failed += 1;
                stats.requests_timeout += 1;
            }
            Err(_) => stats.requests_failed += 1,
        }
        let n = stats.requests_sent as f64;
        stats.average_response_time_ms =
            (stats.average_response_time_ms * (n - 1.0) + elapsed.as_secs_f64() * 1000.0) / n;
    }
}

fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout(timeout.as_millis() as u64)
    } else {
        ApiError::NetworkError(error.to_string())
    }
}

#[async_trait]
impl VacancyApi for BuscaVagasClient {
    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let url = build_health_url(self.base_url());
        info!(%url, "checking API health");
        let body = self.fetch_json(&url, self.config.timeouts.default).await?;
        let health: HealthStatus = decode(body)?;
        info!(status = %health.status, "API health");
        Ok(health)
    }

    async fn get_hotels(&self, force_refresh: bool) -> Result<Vec<Hotel>, ApiError> {
        let now = Utc::now();
        if !force_refresh {
            if let Some(cached) = self.hotels.get(now) {
                self.stats.lock().cache_hits += 1;
                return Ok(cached);
            }
        }

        let url = build_hotels_url(self.base_url());
        info!(%url, "fetching hotel list");
        let body = self.fetch_json(&url, self.config.timeouts.default).await?;
        let hotels: Vec<Hotel> = decode_data(body)?;

        self.hotels.set(hotels.clone(), now);
        info!(count = hotels.len(), "retrieved hotels from API");
        Ok(hotels)
    }

    async fn scrape_hotels(&self) -> Result<Vec<Hotel>, ApiError> {
        let url = build_scrape_url(self.base_url());
        info!(%url, "scraping hotel list");
        let body = self.fetch_json(&url, self.config.timeouts.search).await?;
        let hotels: Vec<Hotel> = decode_data(body)?;
        info!(count = hotels.len(), "scraped hotel options");
        Ok(hotels)
    }

    async fn search_vacancies(&self, query: &SearchQuery) -> Result<SearchResponse, ApiError> {
        if let Some(cached) = self.responses.get(query) {
            self.stats.lock().cache_hits += 1;
            let body: Value = serde_json::from_slice(&cached)
                .map_err(|e| ApiError::DecodeError(e.to_string()))?;
            return decode(body);
        }

        let url = build_search_url(self.base_url(), query)?;
        info!(
            %url,
            hotel = %query.hotel,
            check_in = %query.check_in,
            check_out = %query.check_out,
            "searching vacancies"
        );

        let bytes = self
            .fetch_with_retry(url.as_str(), self.config.timeouts.search)
            .await?;
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::DecodeError(e.to_string()))?;
        check_envelope(&body)?;
        let response: SearchResponse = decode(body)?;

        self.responses.store(query, bytes, None);
        info!(
            method = response.method.as_deref().unwrap_or("N/A"),
            has_availability = response.data.has_availability,
            status = response.data.result.status.as_deref().unwrap_or("N/A"),
            "search completed"
        );
        Ok(response)
    }

    async fn search_weekends(&self, count: u32) -> Result<WeekendSearchData, ApiError> {
        validate_weekend_count(count)?;

        let url = build_weekend_search_url(self.base_url(), count);
        info!(%url, count, "searching weekends, this may take several minutes");
        let body = self
            .fetch_json(&url, self.config.timeouts.weekend_search)
            .await?;
        let data: WeekendSearchData = decode_data(body)?;

        info!(
            searched = data
                .search_details
                .as_ref()
                .map(|d| d.total_weekends_searched)
                .unwrap_or(count),
            with_vacancies = data.weekends_with_vacancies(),
            "weekend search completed"
        );
        Ok(data)
    }

    fn cache_stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            hotel_list: self.hotels.stats(Utc::now()),
            responses: self.responses.stats(),
        }
    }

    fn clear_cache(&self) {
        self.responses.clear();
        self.hotels.clear();
        info!("all caches cleared");
    }
}

// Scriptable in-process API used by the session tests
#[cfg(test)]
pub mod mock_server {
    use super::*;
    use crate::cache::{HotelCacheStats, ResponseCacheStats};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockVacancyApi {
        pub request_count: AtomicUsize,
        fail_next_requests: AtomicUsize,
        failure: Mutex<ApiError>,
        hotels: Mutex<Vec<Hotel>>,
        search_response: Mutex<Option<SearchResponse>>,
        last_query: Mutex<Option<SearchQuery>>,
    }

    impl MockVacancyApi {
        pub fn new() -> Self {
            Self {
                request_count: AtomicUsize::new(0),
                fail_next_requests: AtomicUsize::new(0),
                failure: Mutex::new(ApiError::NetworkError("connection refused".to_string())),
                hotels: Mutex::new(sample_hotels()),
                search_response: Mutex::new(Some(sample_search_response())),
                last_query: Mutex::new(None),
            }
        }

        pub fn fail_next_requests(&self, count: usize, error: ApiError) {
            *self.failure.lock() = error;
            self.fail_next_requests.store(count, Ordering::SeqCst);
        }

        pub fn set_search_response(&self, response: SearchResponse) {
            *self.search_response.lock() = Some(response);
        }

        pub fn last_query(&self) -> Option<SearchQuery> {
            self.last_query.lock().clone()
        }

        fn maybe_fail(&self) -> Result<(), ApiError> {
            self.request_count.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_next_requests.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_next_requests.store(remaining - 1, Ordering::SeqCst);
                return Err(self.failure.lock().clone());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl VacancyApi for MockVacancyApi {
        async fn check_health(&self) -> Result<HealthStatus, ApiError> {
            self.maybe_fail()?;
            Ok(HealthStatus {
                status: "OK".to_string(),
                version: Some("1.3.0-mock".to_string()),
                message: None,
                name: Some("busca_vagas_mock_api".to_string()),
                timestamp: None,
            })
        }

        async fn get_hotels(&self, _force_refresh: bool) -> Result<Vec<Hotel>, ApiError> {
            self.maybe_fail()?;
            Ok(self.hotels.lock().clone())
        }

        async fn scrape_hotels(&self) -> Result<Vec<Hotel>, ApiError> {
            self.get_hotels(true).await
        }

        async fn search_vacancies(&self, query: &SearchQuery) -> Result<SearchResponse, ApiError> {
            *self.last_query.lock() = Some(query.clone());
            self.maybe_fail()?;
            self.search_response
                .lock()
                .clone()
                .ok_or_else(|| ApiError::DecodeError("no response configured".to_string()))
        }

        async fn search_weekends(&self, count: u32) -> Result<WeekendSearchData, ApiError> {
            validate_weekend_count(count)?;
            self.maybe_fail()?;
            Ok(WeekendSearchData::default())
        }

        fn cache_stats(&self) -> CacheStatsReport {
            CacheStatsReport {
                hotel_list: HotelCacheStats::default(),
                responses: ResponseCacheStats::default(),
            }
        }

        fn clear_cache(&self) {}
    }

    pub fn sample_hotels() -> Vec<Hotel> {
        decode(serde_json::json!([
            { "hotelId": "-1", "name": "Todas", "type": "All" },
            { "hotelId": "amparo", "name": "Amparo", "type": "Hotel" },
            { "hotelId": "appenzell", "name": "Appenzell", "type": "Hotel" },
            { "hotelId": "areado", "name": "Areado", "type": "Hotel" }
        ]))
        .unwrap()
    }

    pub fn sample_search_response() -> SearchResponse {
        decode(serde_json::json!({
            "success": true,
            "method": "puppeteer-mock",
            "hotelFilter": "-1",
            "data": {
                "success": true,
                "date": "6/10/2025",
                "hasAvailability": true,
                "result": {
                    "hasAvailability": true,
                    "status": "AVAILABLE",
                    "summary": "Found vacancies in 2 hotel(s): Amparo, Appenzell",
                    "vacancies": [
                        "Amparo: COQUEIROS (até 3 pessoas)10/06 - 12/06 (2 dias livres) - 2 Quarto(s)",
                        "Amparo: JAZZ Luxo (até 2 pessoas)10/06 - 12/06 (2 dias livres) - 1 Quarto(s)",
                        "Appenzell: FURNAS STANDARD (até 2 pessoas)10/06 - 12/06 (2 dias livres) - 3 Quarto(s)"
                    ],
                    "hotelGroups": {
                        "Amparo": [
                            "COQUEIROS (até 3 pessoas)10/06 - 12/06 (2 dias livres) - 2 Quarto(s)",
                            "JAZZ Luxo (até 2 pessoas)10/06 - 12/06 (2 dias livres) - 1 Quarto(s)"
                        ],
                        "Appenzell": [
                            "FURNAS STANDARD (até 2 pessoas)10/06 - 12/06 (2 dias livres) - 3 Quarto(s)"
                        ]
                    }
                }
            }
        }))
        .unwrap()
    }
}
