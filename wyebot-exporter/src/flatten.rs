//! Flattening of typed API records into metric samples.
//!
//! Every function here is pure: records and their enclosing scope go in,
//! rows for one family come out. Parent identity is re-stated on every row.

use wyebot_api::LabelText;
use wyebot_api::label::join;
use wyebot_api::records::{
    AccessPoint, BandUsage, Client, ClientBand, Issue, Location, NetworkInfo, RadioPair,
    RadioStats, RfAnalytics, Sensor, SensorInfo, Ssid, TestProfile, TestResult,
};

use crate::families::{
    ACCESS_POINT_DETAILS, CLIENT_DETAILS, CLIENT_DISTRIBUTION, ISSUE_DETAILS, LOCATION_COUNT,
    LOCATION_DETAILS, NETWORK_TEST_PROFILES, NETWORK_TEST_RESULTS, RF_ANALYTICS, SENSOR_COUNT,
    SENSOR_DATA, SENSOR_DETAILS, SENSOR_LLDP_INFO, SENSOR_NETWORK_INFO, SSID_DETAILS,
};
use crate::registry::{LabelSet, Sample};

/// Identity of the location being traversed.
#[derive(Debug, Clone, Default)]
pub struct LocationScope {
    pub location_id: LabelText,
    pub location_name: LabelText,
}

impl LocationScope {
    fn labels(&self) -> LabelSet {
        LabelSet::new()
            .with("location_id", self.location_id.as_str())
            .with("location_name", self.location_name.as_str())
    }
}

impl From<&Location> for LocationScope {
    fn from(location: &Location) -> Self {
        Self {
            location_id: location.location_id.clone(),
            location_name: location.location_name.clone(),
        }
    }
}

/// Identity of the sensor being traversed, with its location.
#[derive(Debug, Clone, Default)]
pub struct SensorScope {
    pub location: LocationScope,
    pub sensor_id: LabelText,
    pub sensor_name: LabelText,
}

impl SensorScope {
    pub fn new(location: &LocationScope, sensor: &Sensor) -> Self {
        Self {
            location: location.clone(),
            sensor_id: sensor.sensor_id.clone(),
            sensor_name: sensor.sensor_name.clone(),
        }
    }

    fn labels(&self) -> LabelSet {
        self.location
            .labels()
            .with("sensor_id", self.sensor_id.as_str())
            .with("sensor_name", self.sensor_name.as_str())
    }
}

pub fn location_count(count: usize) -> Sample {
    Sample::gauge(&LOCATION_COUNT, LabelSet::new(), count as f64)
}

pub fn location(scope: &LocationScope) -> Sample {
    Sample::info(&LOCATION_DETAILS, scope.labels())
}

pub fn sensor_count(scope: &LocationScope, count: usize) -> Sample {
    Sample::gauge(&SENSOR_COUNT, scope.labels(), count as f64)
}

pub fn sensor(scope: &SensorScope) -> Sample {
    Sample::info(&SENSOR_DETAILS, scope.labels())
}

/// Hardware specification and service facts of a sensor.
pub fn sensor_data(scope: &SensorScope, info: &SensorInfo) -> Sample {
    let hw = &info.hardware_details.specification;
    let service = &info.hardware_details.service;

    let labels = scope
        .labels()
        .with("model", hw.model.as_str())
        .with("serial_number", hw.serial_number.as_str())
        .with("wireless_mac_address", hw.wireless_mac_address.as_str())
        .with("wired_mac_address", hw.wired_mac_address.as_str())
        .with("link_speed", hw.link_speed.as_str())
        .with("power_source", hw.power_source.as_str())
        .with("uptime", service.uptime.as_str())
        .with("software_version", service.software_version.as_str())
        .with("license_info", service.license_info.as_str());

    Sample::info(&SENSOR_DATA, labels)
}

pub fn network_info(scope: &SensorScope, info: &NetworkInfo) -> Sample {
    let labels = scope
        .labels()
        .with("connection_type", info.connection_type.as_str())
        .with("dhcp", info.dhcp.as_str())
        .with("ipaddr", info.ipaddr.as_str())
        .with("ip_subnet", info.ip_subnet.as_str())
        .with("ip_gateway", info.ip_gateway.as_str())
        .with("dns1", info.dns1.as_str())
        .with("dns2", info.dns2.as_str())
        .with("wireless_network", info.wireless_network.as_str());

    Sample::info(&SENSOR_NETWORK_INFO, labels)
}

/// One row per LLDP interface.
pub fn lldp(scope: &SensorScope, info: &SensorInfo) -> Vec<Sample> {
    info.lldp_interfaces()
        .iter()
        .map(|(name, iface)| {
            let chassis = iface.primary_chassis().cloned().unwrap_or_default();

            let labels = scope
                .labels()
                .with("interface", name.as_str())
                .with("via", iface.via.as_str())
                .with("age", iface.age.as_str())
                .with("vlan_id", iface.vlan.vlan_id.as_str())
                .with("pvid", iface.vlan.pvid.as_str())
                .with("chassis_capability", chassis.capability.types().into_string())
                .with("chassis_mgmt_ip", chassis.mgmt_ip.as_str())
                .with("chassis_id", chassis.id.value.as_str())
                .with("chassis_descr", chassis.descr.as_str())
                .with("port_descr", iface.port.descr.as_str())
                .with("port_id", iface.port.id.value.as_str())
                .with(
                    "auto_negotiation_current",
                    iface.port.auto_negotiation.current.as_str(),
                );

            Sample::info(&SENSOR_LLDP_INFO, labels)
        })
        .collect()
}

pub fn access_points(scope: &SensorScope, access_points: &[AccessPoint]) -> Vec<Sample> {
    access_points
        .iter()
        .map(|ap| {
            let labels = scope
                .labels()
                .with("mac_address", ap.mac_address.as_str())
                .with("hostname", ap.hostname.as_str())
                .with("hostname_type_id", ap.hostname_type_id.as_str())
                .with("channel", ap.channel.as_str())
                .with("phy_type", ap.phy_type.as_str())
                .with("max_data_rate", ap.max_data_rate.as_str())
                .with("signal_strength", ap.signal_strength.as_str())
                .with("vendor", ap.vendor.as_str())
                .with("classification_type", ap.classification_type.as_str());

            Sample::info(&ACCESS_POINT_DETAILS, labels)
        })
        .collect()
}

pub fn clients(scope: &SensorScope, clients: &[Client]) -> Vec<Sample> {
    clients
        .iter()
        .map(|client| {
            let labels = scope
                .labels()
                .with("mac_address", client.mac_address.as_str())
                .with("hostname", client.hostname.as_str())
                .with("ssid", client.ssid.as_str())
                .with("bssid", client.bssid.as_str())
                .with("vendor", client.vendor.as_str())
                .with("phy_type", client.phy_type.as_str())
                .with("band_name", client.band_name.as_str())
                .with("channel", client.channel.as_str());

            Sample::info(&CLIENT_DETAILS, labels)
        })
        .collect()
}

/// One row per BSSID; SSIDs without BSSIDs produce nothing.
pub fn ssids(scope: &SensorScope, ssids: &[Ssid]) -> Vec<Sample> {
    ssids
        .iter()
        .flat_map(|ssid| {
            let ssid_labels = scope
                .labels()
                .with("ssid", ssid.ssid.as_str())
                .with("total_bssids", ssid.total_bssids.as_str())
                .with("security_name", ssid.security_name.as_str())
                .with("hidden_ssid", ssid.hidden_ssid.as_str());

            ssid.bssid_details_array.iter().map(move |bssid| {
                let labels = ssid_labels
                    .clone()
                    .with("bssid", bssid.bssid.as_str())
                    .with("hostname", bssid.hostname.as_str())
                    .with("hidden_bssid", bssid.hidden_bssid.as_str())
                    .with("total_clients", bssid.total_clients.as_str())
                    .with("channel", bssid.channel.as_str())
                    .with("signal_strength", bssid.signal_strength.as_str());

                Sample::info(&SSID_DETAILS, labels)
            })
        })
        .collect()
}

pub fn issues(scope: &SensorScope, issues: &[Issue]) -> Vec<Sample> {
    issues
        .iter()
        .map(|issue| {
            let labels = scope
                .labels()
                .with("severity_name", issue.severity_name.as_str())
                .with("problem", issue.problem.as_str())
                .with("problem_description", issue.problem_description.as_str())
                .with("solution", issue.solution.as_str());

            Sample::info(&ISSUE_DETAILS, labels)
        })
        .collect()
}

/// RF analytics rows for either response shape.
pub fn rf_analytics(scope: &SensorScope, rf: &RfAnalytics) -> Vec<Sample> {
    match rf {
        RfAnalytics::TwoRadioList(pairs) => pairs
            .iter()
            .flat_map(|pair| radio_pair(scope, pair))
            .collect(),
        RfAnalytics::RadioMap(radios) => radios
            .iter()
            .map(|(radio_id, stats)| radio_stats(scope, radio_id, stats))
            .collect(),
    }
}

fn rf_labels(
    location: &LocationScope,
    sensor_id: &LabelText,
    sensor_name: &LabelText,
    radio_id: &str,
) -> LabelSet {
    location
        .labels()
        .with("sensor_id", sensor_id.as_str())
        .with("sensor_name", sensor_name.as_str())
        .with("radio_id", radio_id)
}

/// The two fixed radio slots of a list record; no breakdown is available.
fn radio_pair(scope: &SensorScope, pair: &RadioPair) -> [Sample; 2] {
    let sensor_id = pair.sensor_id.clone().or(&scope.sensor_id);
    let sensor_name = pair.sensor_name.clone().or(&scope.sensor_name);

    let slot = |radio_id: &str, channel: &LabelText, airtime: &LabelText| {
        let labels = rf_labels(&scope.location, &sensor_id, &sensor_name, radio_id)
            .with("channel", channel.as_str())
            .with("airtime_total_percent", airtime.as_str())
            .with("mgmt_percent", "")
            .with("ctrl_percent", "")
            .with("data_percent", "")
            .with("others_percent", "")
            .with("available_percent", "")
            .with("noise", "")
            .with("client_mac_list", "")
            .with("client_hostname_list", "")
            .with("client_airtime_percentage", "");
        Sample::info(&RF_ANALYTICS, labels)
    };

    [
        slot("radio1", &pair.channel_radio1, &pair.airtime_percent_radio1),
        slot("radio2", &pair.channel_radio2, &pair.airtime_percent_radio2),
    ]
}

fn radio_stats(scope: &SensorScope, radio_id: &str, stats: &RadioStats) -> Sample {
    let labels = rf_labels(&scope.location, &scope.sensor_id, &scope.sensor_name, radio_id)
        .with("channel", stats.channel.as_str())
        .with("airtime_total_percent", stats.airtime_total_percent.as_str())
        .with("mgmt_percent", stats.mgmt_percent.as_str())
        .with("ctrl_percent", stats.ctrl_percent.as_str())
        .with("data_percent", stats.data_percent.as_str())
        .with("others_percent", stats.others_percent.as_str())
        .with("available_percent", stats.available_percent.as_str())
        .with("noise", stats.noise.as_str())
        .with("client_mac_list", join(&stats.client_mac_list).into_string())
        .with(
            "client_hostname_list",
            join(&stats.client_hostname_list).into_string(),
        )
        .with(
            "client_airtime_percentage",
            stats.client_airtime_percentage.as_str(),
        );

    Sample::info(&RF_ANALYTICS, labels)
}

const BAND_FIELDS: [&str; 3] = ["band", "total", "percentage"];
const CLIENT_BAND_FIELDS: [&str; 7] = [
    "mac_address",
    "hostname",
    "current_band",
    "capability_band",
    "category_id",
    "vendor",
    "ssid",
];

/// Aggregate per-band rows; per-client columns stay empty.
pub fn band_usage(scope: &SensorScope, usage: &[BandUsage]) -> Vec<Sample> {
    usage
        .iter()
        .map(|band| {
            let mut labels = scope
                .labels()
                .with("band", band.band.as_str())
                .with("total", band.total.as_str())
                .with("percentage", band.percentage.as_str());
            for field in CLIENT_BAND_FIELDS {
                labels.insert(field, "");
            }

            Sample::info(&CLIENT_DISTRIBUTION, labels)
        })
        .collect()
}

/// Per-client band rows; aggregate columns stay empty.
pub fn client_bands(scope: &SensorScope, bands: &[ClientBand]) -> Vec<Sample> {
    bands
        .iter()
        .map(|client| {
            let mut labels = scope.labels();
            for field in BAND_FIELDS {
                labels.insert(field, "");
            }
            let labels = labels
                .with("mac_address", client.mac_address.as_str())
                .with("hostname", client.hostname.as_str())
                .with("current_band", client.current_band.as_str())
                .with("capability_band", client.capability_band.as_str())
                .with("category_id", client.category_id.as_str())
                .with("vendor", client.vendor.as_str())
                .with("ssid", client.ssid.as_str());

            Sample::info(&CLIENT_DISTRIBUTION, labels)
        })
        .collect()
}

pub fn test_profiles(scope: &LocationScope, profiles: &[TestProfile]) -> Vec<Sample> {
    profiles
        .iter()
        .map(|profile| {
            let labels = scope
                .labels()
                .with("network_test_profile_id", profile.network_test_profile_id.as_str())
                .with(
                    "network_test_profile_name",
                    profile.network_test_profile_name.as_str(),
                )
                .with("network_test_suite_id", profile.network_test_suite_id.as_str())
                .with(
                    "network_test_suite_name",
                    profile.network_test_suite_name.as_str(),
                )
                .with("ssid", profile.ssid.as_str())
                .with("schedule_type_id", profile.schedule_type_id.as_str())
                .with("schedule", profile.schedule.as_str())
                .with("enabled", profile.enabled.as_str())
                .with("is_valid", profile.is_valid.as_str());

            Sample::info(&NETWORK_TEST_PROFILES, labels)
        })
        .collect()
}

/// Results of one profile. Sensor identity comes from each result.
pub fn test_results(
    scope: &LocationScope,
    profile: &TestProfile,
    results: &[TestResult],
) -> Vec<Sample> {
    results
        .iter()
        .map(|result| {
            let labels = scope
                .labels()
                .with("sensor_id", result.sensor_id.as_str())
                .with("sensor_name", result.sensor_name.as_str())
                .with("network_test_profile_id", profile.network_test_profile_id.as_str())
                .with(
                    "network_test_profile_name",
                    profile.network_test_profile_name.as_str(),
                )
                .with("network_test_suite_id", result.network_test_suite_id.as_str())
                .with(
                    "network_test_suite_name",
                    result.network_test_suite_name.as_str(),
                )
                .with("result_status_id", result.result_status_id.as_str())
                .with("result_status_name", result.result_status_name.as_str())
                .with("start_time", result.start_time.as_str())
                .with("scheduled_time", result.scheduled_time.as_str())
                .with("execution_id", result.execution_id.as_str());

            Sample::info(&NETWORK_TEST_RESULTS, labels)
        })
        .collect()
}
