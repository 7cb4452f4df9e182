//! Upstream Client: issues the two yr.no GETs and validates response shape.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::errors::AppError;
use crate::timeseries::is_valid_response;

const LOCATIONFORECAST_URL: &str = "https://api.met.no/weatherapi/locationforecast/2.0/complete";
const NOWCAST_URL: &str = "https://api.met.no/weatherapi/nowcast/2.0/complete";

/// HTTP request timeout for yr.no API calls.
const UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Locationforecast,
    Nowcast,
}

impl CastType {
    pub fn cache_key_name(self) -> &'static str {
        match self {
            CastType::Locationforecast => "locationforecast",
            CastType::Nowcast => "nowcast",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    user_agent: String,
    /// Base URL per cast type. `new` points these at the real yr.no
    /// endpoints; `with_base_urls` overrides them in tests to point at a
    /// `wiremock` server instead.
    locationforecast_url: String,
    nowcast_url: String,
}

impl UpstreamClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_urls(user_agent, LOCATIONFORECAST_URL, NOWCAST_URL)
    }

    pub(crate) fn with_base_urls(
        user_agent: &str,
        locationforecast_url: &str,
        nowcast_url: &str,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(UPSTREAM_HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            user_agent: user_agent.to_string(),
            locationforecast_url: locationforecast_url.to_string(),
            nowcast_url: nowcast_url.to_string(),
        }
    }

    fn url_for(&self, cast_type: CastType) -> &str {
        match cast_type {
            CastType::Locationforecast => &self.locationforecast_url,
            CastType::Nowcast => &self.nowcast_url,
        }
    }

    /// Issue a single GET. `Ok` only for a validated 200/203 response body;
    /// everything else (network error, 422, any other status, malformed
    /// JSON, failed shape validation) is `Err` — the Fetch Coordinator
    /// treats all of these uniformly as "fall back to stale cache".
    pub async fn fetch(
        &self,
        cast_type: CastType,
        lat: f64,
        lon: f64,
    ) -> Result<serde_json::Value, AppError> {
        let url = format!("{}?lat={:.3}&lon={:.3}", self.url_for(cast_type), lat, lon);

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| AppError::InternalError(format!("invalid User-Agent: {}", e)))?,
        );

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("{} request failed: {}", url, e))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            // fall through
        } else if status == reqwest::StatusCode::NON_AUTHORITATIVE_INFORMATION {
            tracing::warn!("{} returned 203 (non-authoritative)", url);
        } else if status.as_u16() == 422 {
            tracing::warn!("{} returned 422, data not available", url);
            return Err(AppError::ExternalServiceError(format!(
                "{} reported data unavailable (422)",
                url
            )));
        } else {
            tracing::warn!("{} returned unexpected status {}", url, status);
            return Err(AppError::ExternalServiceError(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("{} returned invalid JSON: {}", url, e))
        })?;

        if !is_valid_response(&body) {
            return Err(AppError::ExternalServiceError(format!(
                "{} response failed shape validation",
                url
            )));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn valid_body() -> serde_json::Value {
        json!({"properties": {"timeseries": [{"time": "2026-01-01T00:00:00Z", "data": {"instant": {"details": {}}}}]}})
    }

    async fn client_against(server: &MockServer) -> UpstreamClient {
        let base = server.uri();
        UpstreamClient::with_base_urls("TestAgent/0.1", &base, &base)
    }

    #[tokio::test]
    async fn test_fetch_200_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_body()))
            .mount(&server)
            .await;

        let client = client_against(&server).await;
        let body = client.fetch(CastType::Nowcast, 60.0, 24.0).await.unwrap();
        assert!(is_valid_response(&body));
    }

    #[tokio::test]
    async fn test_fetch_203_is_treated_as_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(203).set_body_json(valid_body()))
            .mount(&server)
            .await;

        let client = client_against(&server).await;
        let body = client
            .fetch(CastType::Locationforecast, 60.0, 24.0)
            .await
            .unwrap();
        assert!(is_valid_response(&body));
    }

    #[tokio::test]
    async fn test_fetch_422_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let client = client_against(&server).await;
        let err = client.fetch(CastType::Nowcast, 60.0, 24.0).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn test_fetch_500_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_against(&server).await;
        let err = client.fetch(CastType::Nowcast, 60.0, 24.0).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn test_fetch_valid_status_but_empty_timeseries_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"timeseries": []}
            })))
            .mount(&server)
            .await;

        let client = client_against(&server).await;
        let err = client.fetch(CastType::Nowcast, 60.0, 24.0).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }

    #[test]
    fn test_cache_key_names() {
        assert_eq!(CastType::Nowcast.cache_key_name(), "nowcast");
        assert_eq!(
            CastType::Locationforecast.cache_key_name(),
            "locationforecast"
        );
    }
}
