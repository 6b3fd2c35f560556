//! Typed records for each API resource.
//!
//! Every field is defaulted, so a record decodes from whatever subset of
//! fields the API happened to send. Scalars go through [`LabelText`];
//! nested objects accept `null` as their default.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::label::{LabelText, join};

/// Deserialize `null` as `T::default()`.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A physical site.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Location {
    pub location_id: LabelText,
    pub location_name: LabelText,
}

/// A monitoring device deployed at a location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Sensor {
    pub sensor_id: LabelText,
    pub sensor_name: LabelText,
}

/// Hardware and software facts about a sensor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorInfo {
    #[serde(deserialize_with = "null_default")]
    pub hardware_details: HardwareDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardwareDetails {
    #[serde(deserialize_with = "null_default")]
    pub specification: Specification,
    #[serde(deserialize_with = "null_default")]
    pub service: Service,
    #[serde(deserialize_with = "null_default")]
    pub lldp_info: LldpInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Specification {
    pub model: LabelText,
    pub serial_number: LabelText,
    pub wireless_mac_address: LabelText,
    pub wired_mac_address: LabelText,
    pub link_speed: LabelText,
    pub power_source: LabelText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Service {
    pub uptime: LabelText,
    pub software_version: LabelText,
    pub license_info: LabelText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LldpInfo {
    #[serde(deserialize_with = "null_default")]
    pub lldp: Lldp,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Lldp {
    /// Neighbours keyed by local interface name.
    #[serde(deserialize_with = "null_default")]
    pub interface: BTreeMap<String, LldpInterface>,
}

impl SensorInfo {
    /// LLDP neighbours keyed by local interface name.
    pub fn lldp_interfaces(&self) -> &BTreeMap<String, LldpInterface> {
        &self.hardware_details.lldp_info.lldp.interface
    }
}

/// One LLDP neighbour as seen on a local interface.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LldpInterface {
    pub via: LabelText,
    pub age: LabelText,
    #[serde(deserialize_with = "null_default")]
    pub vlan: LldpVlan,
    /// Chassis entries keyed by neighbour system name.
    #[serde(deserialize_with = "null_default")]
    pub chassis: BTreeMap<String, LldpChassis>,
    #[serde(deserialize_with = "null_default")]
    pub port: LldpPort,
}

impl LldpInterface {
    /// The neighbour chassis, first by system name when several are reported.
    pub fn primary_chassis(&self) -> Option<&LldpChassis> {
        self.chassis.values().next()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LldpVlan {
    #[serde(rename = "vlan-id")]
    pub vlan_id: LabelText,
    pub pvid: LabelText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LldpChassis {
    #[serde(deserialize_with = "null_default")]
    pub capability: Capabilities,
    #[serde(rename = "mgmt-ip")]
    pub mgmt_ip: LabelText,
    #[serde(deserialize_with = "null_default")]
    pub id: TypedValue,
    pub descr: LabelText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LldpPort {
    pub descr: LabelText,
    #[serde(deserialize_with = "null_default")]
    pub id: TypedValue,
    #[serde(rename = "auto-negotiation", deserialize_with = "null_default")]
    pub auto_negotiation: AutoNegotiation,
}

/// An LLDP `{type, value}` pair.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub kind: LabelText,
    pub value: LabelText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoNegotiation {
    pub current: LabelText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Capability {
    #[serde(rename = "type")]
    pub kind: LabelText,
    pub enabled: LabelText,
}

/// Chassis capabilities, sent either as one object or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Capabilities {
    // A struct also accepts a sequence, so the list form must be tried first.
    Many(Vec<Capability>),
    One(Capability),
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::One(Capability::default())
    }
}

impl Capabilities {
    /// Capability types, comma-joined.
    pub fn types(&self) -> LabelText {
        match self {
            Capabilities::One(cap) => cap.kind.clone(),
            Capabilities::Many(caps) => {
                let kinds: Vec<LabelText> = caps.iter().map(|c| c.kind.clone()).collect();
                join(&kinds)
            }
        }
    }
}

/// A sensor's network configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkInfo {
    pub connection_type: LabelText,
    pub dhcp: LabelText,
    pub ipaddr: LabelText,
    pub ip_subnet: LabelText,
    pub ip_gateway: LabelText,
    pub dns1: LabelText,
    pub dns2: LabelText,
    pub wireless_network: LabelText,
}

/// An access point heard by a sensor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccessPoint {
    pub mac_address: LabelText,
    pub hostname: LabelText,
    pub hostname_type_id: LabelText,
    pub channel: LabelText,
    pub phy_type: LabelText,
    pub max_data_rate: LabelText,
    pub signal_strength: LabelText,
    pub vendor: LabelText,
    pub classification_type: LabelText,
}

/// A wireless client heard by a sensor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Client {
    pub mac_address: LabelText,
    pub hostname: LabelText,
    pub ssid: LabelText,
    pub bssid: LabelText,
    pub vendor: LabelText,
    pub phy_type: LabelText,
    pub band_name: LabelText,
    pub channel: LabelText,
}

/// A wireless network and the BSSIDs broadcasting it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Ssid {
    pub ssid: LabelText,
    pub total_bssids: LabelText,
    pub security_name: LabelText,
    pub hidden_ssid: LabelText,
    #[serde(deserialize_with = "null_default")]
    pub bssid_details_array: Vec<Bssid>,
}

/// One broadcast instance of an SSID.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Bssid {
    pub bssid: LabelText,
    pub hostname: LabelText,
    pub hidden_bssid: LabelText,
    pub total_clients: LabelText,
    pub channel: LabelText,
    pub signal_strength: LabelText,
}

/// A problem detected by a sensor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub severity_name: LabelText,
    pub problem: LabelText,
    pub problem_description: LabelText,
    pub solution: LabelText,
}

/// RF analytics, in either of the two shapes the API returns.
#[derive(Debug, Clone, PartialEq)]
pub enum RfAnalytics {
    /// One record per sensor, with two fixed radio slots each.
    TwoRadioList(Vec<RadioPair>),
    /// Full per-radio breakdown keyed by radio id.
    RadioMap(BTreeMap<String, RadioStats>),
}

impl Default for RfAnalytics {
    fn default() -> Self {
        RfAnalytics::RadioMap(BTreeMap::new())
    }
}

impl RfAnalytics {
    /// Pick the variant from the top-level kind of `value`.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(_) => Ok(RfAnalytics::TwoRadioList(serde_json::from_value(value)?)),
            Value::Object(_) => Ok(RfAnalytics::RadioMap(serde_json::from_value(value)?)),
            Value::Null => Ok(RfAnalytics::default()),
            other => Err(serde_json::Error::custom(format!(
                "expected a list or a map of radios, found {other}"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for RfAnalytics {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RfAnalytics::from_value(value).map_err(D::Error::custom)
    }
}

/// Two-slot RF summary for one sensor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadioPair {
    pub sensor_id: LabelText,
    pub sensor_name: LabelText,
    pub channel_radio1: LabelText,
    pub airtime_percent_radio1: LabelText,
    pub channel_radio2: LabelText,
    pub airtime_percent_radio2: LabelText,
}

/// Channel utilization breakdown for one radio.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadioStats {
    pub channel: LabelText,
    pub airtime_total_percent: LabelText,
    pub mgmt_percent: LabelText,
    pub ctrl_percent: LabelText,
    pub data_percent: LabelText,
    pub others_percent: LabelText,
    pub available_percent: LabelText,
    pub noise: LabelText,
    #[serde(deserialize_with = "null_default")]
    pub client_mac_list: Vec<LabelText>,
    #[serde(deserialize_with = "null_default")]
    pub client_hostname_list: Vec<LabelText>,
    pub client_airtime_percentage: LabelText,
}

/// Aggregate client count for one band.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BandUsage {
    pub band: LabelText,
    pub total: LabelText,
    pub percentage: LabelText,
}

/// Band assignment of a single client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientBand {
    pub mac_address: LabelText,
    pub hostname: LabelText,
    pub current_band: LabelText,
    pub capability_band: LabelText,
    pub category_id: LabelText,
    pub vendor: LabelText,
    pub ssid: LabelText,
}

/// A scheduled network test definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TestProfile {
    pub network_test_profile_id: LabelText,
    pub network_test_profile_name: LabelText,
    pub network_test_suite_id: LabelText,
    pub network_test_suite_name: LabelText,
    pub ssid: LabelText,
    pub schedule_type_id: LabelText,
    pub schedule: LabelText,
    pub enabled: LabelText,
    pub is_valid: LabelText,
}

/// One executed run of a test profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TestResult {
    pub sensor_id: LabelText,
    pub sensor_name: LabelText,
    pub network_test_suite_id: LabelText,
    pub network_test_suite_name: LabelText,
    pub result_status_id: LabelText,
    pub result_status_name: LabelText,
    pub start_time: LabelText,
    pub scheduled_time: LabelText,
    pub execution_id: LabelText,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_numeric_id() {
        let loc: Location =
            serde_json::from_value(json!({ "location_id": 1, "location_name": "HQ" })).unwrap();
        assert_eq!(loc.location_id.as_str(), "1");
        assert_eq!(loc.location_name.as_str(), "HQ");
    }

    #[test]
    fn test_sensor_info_nested() {
        let info: SensorInfo = serde_json::from_value(json!({
            "hardware_details": {
                "specification": { "model": "WS-3000", "serial_number": "SN1" },
                "service": { "uptime": 3600, "software_version": "4.2" },
                "lldp_info": {
                    "lldp": {
                        "interface": {
                            "eth0": {
                                "via": "LLDP",
                                "vlan": { "vlan-id": "20", "pvid": true },
                                "chassis": {
                                    "sw01": {
                                        "id": { "type": "mac", "value": "00:11:22:33:44:55" },
                                        "mgmt-ip": "10.0.0.2",
                                        "capability": [
                                            { "type": "Bridge", "enabled": true },
                                            { "type": "Router", "enabled": false }
                                        ]
                                    }
                                },
                                "port": {
                                    "id": { "type": "ifname", "value": "Gi1/0/4" },
                                    "auto-negotiation": { "current": "1000BaseTFD" }
                                }
                            }
                        }
                    }
                }
            }
        }))
        .unwrap();

        let hw = &info.hardware_details.specification;
        assert_eq!(hw.model.as_str(), "WS-3000");
        assert_eq!(hw.wired_mac_address.as_str(), "");
        assert_eq!(info.hardware_details.service.uptime.as_str(), "3600");

        let eth0 = &info.lldp_interfaces()["eth0"];
        assert_eq!(eth0.vlan.vlan_id.as_str(), "20");
        assert_eq!(eth0.vlan.pvid.as_str(), "true");
        let chassis = eth0.primary_chassis().unwrap();
        assert_eq!(chassis.mgmt_ip.as_str(), "10.0.0.2");
        assert_eq!(chassis.id.value.as_str(), "00:11:22:33:44:55");
        assert_eq!(chassis.capability.types().as_str(), "Bridge,Router");
        assert_eq!(eth0.port.auto_negotiation.current.as_str(), "1000BaseTFD");
    }

    #[test]
    fn test_sensor_info_null_sections() {
        let info: SensorInfo =
            serde_json::from_value(json!({ "hardware_details": { "lldp_info": null } })).unwrap();
        assert!(info.lldp_interfaces().is_empty());
    }

    #[test]
    fn test_ssid_without_bssids() {
        let ssid: Ssid = serde_json::from_value(json!({ "ssid": "Guest" })).unwrap();
        assert!(ssid.bssid_details_array.is_empty());
        assert_eq!(ssid.total_bssids.as_str(), "");
    }

    #[test]
    fn test_rf_analytics_list_shape() {
        let rf = RfAnalytics::from_value(json!([
            { "sensor_id": 10, "channel_radio1": 6, "channel_radio2": 36 }
        ]))
        .unwrap();

        match rf {
            RfAnalytics::TwoRadioList(pairs) => {
                assert_eq!(pairs.len(), 1);
                assert_eq!(pairs[0].channel_radio2.as_str(), "36");
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn test_rf_analytics_map_shape() {
        let rf = RfAnalytics::from_value(json!({
            "wlan0": { "channel": 11, "client_mac_list": ["aa", "bb"] }
        }))
        .unwrap();

        match rf {
            RfAnalytics::RadioMap(radios) => {
                assert_eq!(radios["wlan0"].channel.as_str(), "11");
                assert_eq!(radios["wlan0"].client_mac_list.len(), 2);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn test_rf_analytics_rejects_scalars() {
        assert!(RfAnalytics::from_value(json!("n/a")).is_err());
        assert_eq!(
            RfAnalytics::from_value(Value::Null).unwrap(),
            RfAnalytics::default()
        );
    }
}
