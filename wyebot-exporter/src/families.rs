//! Metric family catalogue and Prometheus naming rules.
//!
//! Every exported row belongs to one of the families declared here, and
//! carries exactly the labels of that family's schema.

/// How a family is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A numeric gauge.
    Gauge,
    /// A constant-1 row whose information lives in its labels.
    Info,
}

impl MetricKind {
    /// The TYPE comment string for Prometheus text exposition.
    ///
    /// The text format has no info type, so info families are gauges.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Info => "gauge",
        }
    }

    /// Suffix appended to the family name on exposition.
    pub fn suffix(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "",
            MetricKind::Info => "_info",
        }
    }
}

/// A named group of same-shaped rows with a fixed label schema.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricFamily {
    /// Family name without prefix.
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Declared label names, in exposition order.
    pub labels: &'static [&'static str],
}

impl MetricFamily {
    /// Position of a label in the schema.
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| *l == label)
    }
}

pub const LOCATION_COUNT: MetricFamily = MetricFamily {
    name: "location_count",
    help: "Total number of locations",
    kind: MetricKind::Gauge,
    labels: &[],
};

pub const SENSOR_COUNT: MetricFamily = MetricFamily {
    name: "sensor_count",
    help: "Total number of sensors per location",
    kind: MetricKind::Gauge,
    labels: &["location_id", "location_name"],
};

pub const LOCATION_DETAILS: MetricFamily = MetricFamily {
    name: "location_details",
    help: "Details of locations",
    kind: MetricKind::Info,
    labels: &["location_id", "location_name"],
};

pub const SENSOR_DETAILS: MetricFamily = MetricFamily {
    name: "sensor_details",
    help: "Details of sensors per location",
    kind: MetricKind::Info,
    labels: &["location_id", "location_name", "sensor_id", "sensor_name"],
};

pub const SENSOR_DATA: MetricFamily = MetricFamily {
    name: "sensor_data",
    help: "Details of sensor data",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "model",
        "serial_number",
        "wireless_mac_address",
        "wired_mac_address",
        "link_speed",
        "power_source",
        "uptime",
        "software_version",
        "license_info",
    ],
};

pub const SENSOR_NETWORK_INFO: MetricFamily = MetricFamily {
    name: "sensor_network_info",
    help: "Network information of sensors",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "connection_type",
        "dhcp",
        "ipaddr",
        "ip_subnet",
        "ip_gateway",
        "dns1",
        "dns2",
        "wireless_network",
    ],
};

pub const SENSOR_LLDP_INFO: MetricFamily = MetricFamily {
    name: "sensor_lldp_info",
    help: "LLDP information of sensors",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "interface",
        "via",
        "age",
        "vlan_id",
        "pvid",
        "chassis_capability",
        "chassis_mgmt_ip",
        "chassis_id",
        "chassis_descr",
        "port_descr",
        "port_id",
        "auto_negotiation_current",
    ],
};

pub const ACCESS_POINT_DETAILS: MetricFamily = MetricFamily {
    name: "access_point_details",
    help: "Access point details",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "mac_address",
        "hostname",
        "hostname_type_id",
        "channel",
        "phy_type",
        "max_data_rate",
        "signal_strength",
        "vendor",
        "classification_type",
    ],
};

pub const CLIENT_DETAILS: MetricFamily = MetricFamily {
    name: "client_details",
    help: "Client details",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "mac_address",
        "hostname",
        "ssid",
        "bssid",
        "vendor",
        "phy_type",
        "band_name",
        "channel",
    ],
};

pub const SSID_DETAILS: MetricFamily = MetricFamily {
    name: "ssid_details",
    help: "SSID details",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "ssid",
        "total_bssids",
        "security_name",
        "hidden_ssid",
        "bssid",
        "hostname",
        "hidden_bssid",
        "total_clients",
        "channel",
        "signal_strength",
    ],
};

pub const ISSUE_DETAILS: MetricFamily = MetricFamily {
    name: "issue_details",
    help: "Issue details",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "severity_name",
        "problem",
        "problem_description",
        "solution",
    ],
};

pub const RF_ANALYTICS: MetricFamily = MetricFamily {
    name: "rf_analytics",
    help: "RF analytics details",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "radio_id",
        "channel",
        "airtime_total_percent",
        "mgmt_percent",
        "ctrl_percent",
        "data_percent",
        "others_percent",
        "available_percent",
        "noise",
        "client_mac_list",
        "client_hostname_list",
        "client_airtime_percentage",
    ],
};

pub const CLIENT_DISTRIBUTION: MetricFamily = MetricFamily {
    name: "client_distribution",
    help: "Client distribution details",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "band",
        "total",
        "percentage",
        "mac_address",
        "hostname",
        "current_band",
        "capability_band",
        "category_id",
        "vendor",
        "ssid",
    ],
};

pub const NETWORK_TEST_PROFILES: MetricFamily = MetricFamily {
    name: "network_test_profiles",
    help: "Network test profiles",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "network_test_profile_id",
        "network_test_profile_name",
        "network_test_suite_id",
        "network_test_suite_name",
        "ssid",
        "schedule_type_id",
        "schedule",
        "enabled",
        "is_valid",
    ],
};

pub const NETWORK_TEST_RESULTS: MetricFamily = MetricFamily {
    name: "network_test_results",
    help: "Network test results",
    kind: MetricKind::Info,
    labels: &[
        "location_id",
        "location_name",
        "sensor_id",
        "sensor_name",
        "network_test_profile_id",
        "network_test_profile_name",
        "network_test_suite_id",
        "network_test_suite_name",
        "result_status_id",
        "result_status_name",
        "start_time",
        "scheduled_time",
        "execution_id",
    ],
};

/// Every family the exporter publishes.
pub const ALL: &[&MetricFamily] = &[
    &LOCATION_COUNT,
    &SENSOR_COUNT,
    &LOCATION_DETAILS,
    &SENSOR_DETAILS,
    &SENSOR_DATA,
    &SENSOR_NETWORK_INFO,
    &SENSOR_LLDP_INFO,
    &ACCESS_POINT_DETAILS,
    &CLIENT_DETAILS,
    &SSID_DETAILS,
    &ISSUE_DETAILS,
    &RF_ANALYTICS,
    &CLIENT_DISTRIBUTION,
    &NETWORK_TEST_PROFILES,
    &NETWORK_TEST_RESULTS,
];

/// Sanitize a metric name to be Prometheus-compatible.
///
/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
/// Invalid characters become underscores, runs of underscores collapse,
/// and a leading digit gets an underscore prefix.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut last_was_underscore = false;

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        result.push('_');
        last_was_underscore = true;
    }

    for c in name.chars() {
        if c == '_' || !(c.is_ascii_alphanumeric() || c == ':') {
            if !last_was_underscore {
                result.push('_');
                last_was_underscore = true;
            }
        } else {
            result.push(c);
            last_was_underscore = false;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    result
}

/// Sanitize a label name to be Prometheus-compatible.
///
/// Prometheus label names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Labels starting with `__` are reserved for internal use.
pub fn sanitize_label_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for (i, c) in name.chars().enumerate() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };

        if valid {
            result.push(c);
            last_was_underscore = c == '_';
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return "label".to_string();
    }

    if result.starts_with("__") {
        result.insert(0, 'z');
    }

    result
}

/// Build the exposed metric name of a family.
///
/// Format: `{prefix}_{family}{suffix}`, where info families end in `_info`.
pub fn build_metric_name(prefix: &str, family: &MetricFamily) -> String {
    let prefix = sanitize_metric_name(prefix);
    let suffix = family.kind.suffix();

    if prefix.is_empty() {
        format!("{}{}", family.name, suffix)
    } else {
        format!("{}_{}{}", prefix, family.name, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize_metric_name() {
        assert_eq!(sanitize_metric_name("wyebot"), "wyebot");
        assert_eq!(sanitize_metric_name("my-site.prod"), "my_site_prod");
        assert_eq!(sanitize_metric_name("a__b"), "a_b");
        assert_eq!(sanitize_metric_name("1st"), "_1st");
        assert_eq!(sanitize_metric_name("foo:bar"), "foo:bar");
        assert_eq!(sanitize_metric_name(""), "");
    }

    #[test]
    fn test_sanitize_label_name() {
        assert_eq!(sanitize_label_name("site"), "site");
        assert_eq!(sanitize_label_name("data-center"), "data_center");
        assert_eq!(sanitize_label_name("__meta"), "z__meta");
        assert_eq!(sanitize_label_name("!!"), "label");
    }

    #[test]
    fn test_build_metric_name() {
        assert_eq!(
            build_metric_name("wyebot", &LOCATION_COUNT),
            "wyebot_location_count"
        );
        assert_eq!(
            build_metric_name("wyebot", &SSID_DETAILS),
            "wyebot_ssid_details_info"
        );
        assert_eq!(build_metric_name("", &SENSOR_COUNT), "sensor_count");
    }

    #[test]
    fn test_family_names_unique() {
        let names: HashSet<_> = ALL.iter().map(|f| f.name).collect();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_family_labels_are_valid_and_unique() {
        for family in ALL {
            let labels: HashSet<_> = family.labels.iter().collect();
            assert_eq!(labels.len(), family.labels.len(), "{}", family.name);
            for label in family.labels {
                assert_eq!(sanitize_label_name(label), *label, "{}", family.name);
            }
        }
    }

    #[test]
    fn test_label_index() {
        assert_eq!(SENSOR_COUNT.label_index("location_name"), Some(1));
        assert_eq!(SENSOR_COUNT.label_index("sensor_id"), None);
    }
}
