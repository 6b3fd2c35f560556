//! Resource fetchers.
//!
//! Each method performs exactly one API call, unwraps the response envelope
//! and decodes the typed record. Transport and HTTP failures are returned
//! unchanged; nothing is retried here.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::envelope::{self, DATA};
use crate::error::Result;
use crate::label::LabelText;
use crate::records::{
    AccessPoint, BandUsage, Client, ClientBand, Issue, Location, NetworkInfo, RfAnalytics,
    Sensor, SensorInfo, Ssid, TestProfile, TestResult,
};
use crate::transport::{Endpoint, Transport};

/// Timestamp format expected by the test results endpoint.
pub const TEST_WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Optional location/sensor scoping for dashboard endpoints.
///
/// Empty ids are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceScope {
    pub location_id: Option<LabelText>,
    pub sensor_id: Option<LabelText>,
}

impl ResourceScope {
    /// Scope to one sensor of one location.
    pub fn sensor(location_id: &LabelText, sensor_id: &LabelText) -> Self {
        Self {
            location_id: Some(location_id.clone()),
            sensor_id: Some(sensor_id.clone()),
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(id) = self.location_id.as_ref().filter(|id| !id.is_empty()) {
            params.push(("location_id", id.to_string()));
        }
        if let Some(id) = self.sensor_id.as_ref().filter(|id| !id.is_empty()) {
            params.push(("sensor_id", id.to_string()));
        }
        params
    }
}

/// Time range for test result queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TestWindow {
    /// The `lookback` period ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, lookback: std::time::Duration) -> Self {
        let lookback = Duration::from_std(lookback).unwrap_or(Duration::MAX);
        let start = end.checked_sub_signed(lookback).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// The `lookback` period ending now.
    pub fn last(lookback: std::time::Duration) -> Self {
        Self::ending_at(Utc::now(), lookback)
    }

    pub fn start_param(&self) -> String {
        self.start.format(TEST_WINDOW_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(TEST_WINDOW_FORMAT).to_string()
    }
}

/// Typed access to the Wyebot API resources.
pub struct WyebotClient<T> {
    transport: T,
}

impl<T: Transport> WyebotClient<T> {
    /// Create a client over a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn fetch<R>(
        &self,
        endpoint: Endpoint,
        params: &[(&'static str, String)],
        key: &str,
        field: &str,
    ) -> Result<R>
    where
        R: DeserializeOwned + Default,
    {
        let document = self.transport.call(endpoint, params).await?;
        trace!(%endpoint, key, field, "Unwrapping response envelope");
        envelope::unwrap(endpoint, &document, key, field)
    }

    /// All locations of the organization.
    pub async fn locations(&self) -> Result<Vec<Location>> {
        self.fetch(Endpoint::Locations, &[], "location_details", DATA)
            .await
    }

    /// Sensors deployed at a location.
    pub async fn sensors(&self, location_id: &LabelText) -> Result<Vec<Sensor>> {
        let params = [("location_id", location_id.to_string())];
        self.fetch(Endpoint::Sensors, &params, "sensor_details", DATA)
            .await
    }

    /// Hardware, software and LLDP facts of a sensor.
    pub async fn sensor_info(&self, sensor_id: &LabelText) -> Result<SensorInfo> {
        let params = [("sensor_id", sensor_id.to_string())];
        self.fetch(Endpoint::SensorInfo, &params, "sensor_info", DATA)
            .await
    }

    /// Network configuration of a sensor.
    pub async fn sensor_network_info(&self, sensor_id: &LabelText) -> Result<NetworkInfo> {
        let params = [("sensor_id", sensor_id.to_string())];
        self.fetch(
            Endpoint::SensorNetworkInfo,
            &params,
            "sensor_network_info",
            DATA,
        )
        .await
    }

    pub async fn access_points(&self, scope: &ResourceScope) -> Result<Vec<AccessPoint>> {
        self.fetch(
            Endpoint::AccessPoints,
            &scope.params(),
            "access_point_details",
            DATA,
        )
        .await
    }

    pub async fn clients(&self, scope: &ResourceScope) -> Result<Vec<Client>> {
        self.fetch(Endpoint::Clients, &scope.params(), "client_details", DATA)
            .await
    }

    pub async fn ssids(&self, scope: &ResourceScope) -> Result<Vec<Ssid>> {
        self.fetch(Endpoint::Ssids, &scope.params(), "ssid_details", DATA)
            .await
    }

    /// Problems detected by a sensor.
    pub async fn issues(&self, sensor_id: &LabelText) -> Result<Vec<Issue>> {
        let params = [("sensor_id", sensor_id.to_string())];
        self.fetch(Endpoint::Issues, &params, "issue_details", DATA)
            .await
    }

    /// RF analytics, in whichever shape the API returns.
    pub async fn rf_analytics(&self, scope: &ResourceScope) -> Result<RfAnalytics> {
        self.fetch(Endpoint::RfAnalytics, &scope.params(), "rf_details", DATA)
            .await
    }

    /// Aggregate band usage from the client distribution endpoint.
    pub async fn band_usage(&self, scope: &ResourceScope) -> Result<Vec<BandUsage>> {
        self.fetch(
            Endpoint::ClientDistribution,
            &scope.params(),
            "client_distribution_list",
            "band_usage_array",
        )
        .await
    }

    /// Per-client band assignment from the client distribution endpoint.
    ///
    /// This is a separate request from [`band_usage`](Self::band_usage).
    pub async fn client_bands(&self, scope: &ResourceScope) -> Result<Vec<ClientBand>> {
        self.fetch(
            Endpoint::ClientDistribution,
            &scope.params(),
            "client_distribution_list",
            DATA,
        )
        .await
    }

    /// Network test profiles defined for a location.
    pub async fn test_profiles(&self, location_id: &LabelText) -> Result<Vec<TestProfile>> {
        let params = [("location_id", location_id.to_string())];
        self.fetch(Endpoint::TestProfiles, &params, "network_test_profiles", DATA)
            .await
    }

    /// Results of one test profile within a time window.
    pub async fn test_results(
        &self,
        location_id: &LabelText,
        profile_id: &LabelText,
        window: &TestWindow,
    ) -> Result<Vec<TestResult>> {
        let params = [
            ("location_id", location_id.to_string()),
            ("network_test_profile_id", profile_id.to_string()),
            ("data_range_start_time", window.start_param()),
            ("data_range_end_time", window.end_param()),
        ];
        self.fetch(Endpoint::TestResults, &params, "network_test_results", DATA)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scope_params_skip_missing_and_empty() {
        let scope = ResourceScope {
            location_id: Some(LabelText::from("1")),
            sensor_id: Some(LabelText::default()),
        };
        assert_eq!(scope.params(), vec![("location_id", "1".to_string())]);
        assert!(ResourceScope::default().params().is_empty());
    }

    #[test]
    fn test_scope_for_sensor() {
        let scope = ResourceScope::sensor(&LabelText::from("1"), &LabelText::from("10"));
        assert_eq!(
            scope.params(),
            vec![
                ("location_id", "1".to_string()),
                ("sensor_id", "10".to_string())
            ]
        );
    }

    #[test]
    fn test_window_formatting() {
        let end = Utc.with_ymd_and_hms(2021, 2, 25, 0, 40, 0).unwrap();
        let window = TestWindow::ending_at(end, std::time::Duration::from_secs(4 * 86_400));

        assert_eq!(window.start_param(), "2021-02-21 00:40:00");
        assert_eq!(window.end_param(), "2021-02-25 00:40:00");
    }
}
