//! HTTP transport for the Wyebot external API.
//!
//! The [`Transport`] trait is the only seam between the fetchers and the
//! network. [`HttpTransport`] is the reqwest-backed implementation used in
//! production; any closure with the right signature also works, which keeps
//! the rest of the pipeline testable without sockets.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{ApiError, Result};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "api_key";

/// Request parameters, sent form-encoded on POST endpoints.
pub type Params = [(&'static str, String)];

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Logical API endpoints, one per resource fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Locations,
    Sensors,
    SensorInfo,
    SensorNetworkInfo,
    AccessPoints,
    Clients,
    Ssids,
    Issues,
    RfAnalytics,
    ClientDistribution,
    TestProfiles,
    TestResults,
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Locations => "org/get_locations",
            Endpoint::Sensors => "org/get_sensors",
            Endpoint::SensorInfo => "org/get_sensor_info",
            Endpoint::SensorNetworkInfo => "org/get_sensor_network_info",
            Endpoint::AccessPoints => "dashboard/accesspointlist",
            Endpoint::Clients => "dashboard/clientlist",
            Endpoint::Ssids => "dashboard/ssidlist",
            Endpoint::Issues => "dashboard/sensor_issues",
            Endpoint::RfAnalytics => "dashboard/rf_analytics",
            Endpoint::ClientDistribution => "dashboard/clientdistributionlist",
            Endpoint::TestProfiles => "test/get_network_test_profiles",
            Endpoint::TestResults => "test/get_network_test_results",
        }
    }

    /// HTTP method for this endpoint.
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Locations => Method::Get,
            _ => Method::Post,
        }
    }

    /// Logical operation name, used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Locations => "get_locations",
            Endpoint::Sensors => "get_sensors",
            Endpoint::SensorInfo => "get_sensor_info",
            Endpoint::SensorNetworkInfo => "get_sensor_network_info",
            Endpoint::AccessPoints => "get_access_point_details",
            Endpoint::Clients => "get_client_details",
            Endpoint::Ssids => "get_ssid_details",
            Endpoint::Issues => "get_issue_details",
            Endpoint::RfAnalytics => "get_rf_analytics",
            Endpoint::ClientDistribution => "get_client_distribution",
            Endpoint::TestProfiles => "get_network_test_profiles",
            Endpoint::TestResults => "get_network_test_results",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issues one request against a named endpoint and returns the parsed body.
///
/// Implementations must not retry: a failure is reported as-is and the
/// caller decides what to abort.
pub trait Transport: Send + Sync {
    fn call(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> impl Future<Output = Result<Value>> + Send;
}

impl<F> Transport for F
where
    F: Fn(Endpoint, &Params) -> Result<Value> + Send + Sync,
{
    fn call(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> impl Future<Output = Result<Value>> + Send {
        std::future::ready(self(endpoint, params))
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport for `base_url`, authenticating with `api_key`.
    ///
    /// `timeout` bounds each request, connect included.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Self::with_client(http, base_url, api_key)
    }

    /// Create a transport around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.base_url.join(endpoint.path())?)
    }
}

impl Transport for HttpTransport {
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Result<Value> {
        let url = self.url(endpoint)?;

        let request = match endpoint.method() {
            Method::Get => self.http.get(url.clone()).query(params),
            Method::Post => self.http.post(url.clone()).form(params),
        };

        debug!(%endpoint, %url, params = params.len(), "Calling Wyebot API");

        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        serde_json::from_slice(&body).map_err(|e| ApiError::decode(endpoint, e.to_string()))
    }
}
