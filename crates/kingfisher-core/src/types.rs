use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One UDP datagram as handed from the receiver to a worker.
#[derive(Debug, Clone)]
pub struct RawDatagram {
    pub source: IpAddr,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// A complete syslog message: a single unfragmented datagram, or the
/// concatenation of all fragments of one uid in index order.
#[derive(Debug, Clone)]
pub struct WholeMessage {
    pub source: IpAddr,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Target table for a classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Failed TACACS authentications.
    Fta,
    /// Failed wireless authentications.
    Fwa,
    /// Failed LAN authentications.
    Fla,
    /// Passed wireless authentications.
    Pwa,
    /// Passed LAN authentications.
    Pla,
    /// TACACS command accounting.
    Tca,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Fta,
        Family::Fwa,
        Family::Fla,
        Family::Pwa,
        Family::Pla,
        Family::Tca,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Family::Fta => "fta",
            Family::Fwa => "fwa",
            Family::Fla => "fla",
            Family::Pwa => "pwa",
            Family::Pla => "pla",
            Family::Tca => "tca",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// A row destined for the `fta` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FtaRow {
    pub timestamp: String,
    pub ip_address: Option<String>,
    pub username: Option<String>,
    pub nas_ip_address: Option<String>,
    pub remote_address: Option<String>,
    pub failure_reason: Option<String>,
    pub network_device_name: Option<String>,
    pub request_latency: Option<String>,
}

impl FtaRow {
    pub fn into_values(self) -> Vec<Option<String>> {
        let FtaRow {
            timestamp,
            ip_address,
            username,
            nas_ip_address,
            remote_address,
            failure_reason,
            network_device_name,
            request_latency,
        } = self;
        vec![
            Some(timestamp),
            ip_address,
            username,
            nas_ip_address,
            remote_address,
            failure_reason,
            network_device_name,
            request_latency,
        ]
    }
}

/// A row destined for the `fwa` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FwaRow {
    pub timestamp: String,
    pub ip_address: Option<String>,
    pub username: Option<String>,
    pub nas_ip_address: Option<String>,
    pub called_station_id: Option<String>,
    pub failure_reason: Option<String>,
    pub network_device_name: Option<String>,
}

impl FwaRow {
    pub fn into_values(self) -> Vec<Option<String>> {
        let FwaRow {
            timestamp,
            ip_address,
            username,
            nas_ip_address,
            called_station_id,
            failure_reason,
            network_device_name,
        } = self;
        vec![
            Some(timestamp),
            ip_address,
            username,
            nas_ip_address,
            called_station_id,
            failure_reason,
            network_device_name,
        ]
    }
}

/// A row destined for the `fla` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlaRow {
    pub timestamp: String,
    pub ip_address: Option<String>,
    pub username: Option<String>,
    pub nas_ip_address: Option<String>,
    pub nas_port_id: Option<String>,
    pub failure_reason: Option<String>,
    pub network_device_name: Option<String>,
}

impl FlaRow {
    pub fn into_values(self) -> Vec<Option<String>> {
        let FlaRow {
            timestamp,
            ip_address,
            username,
            nas_ip_address,
            nas_port_id,
            failure_reason,
            network_device_name,
        } = self;
        vec![
            Some(timestamp),
            ip_address,
            username,
            nas_ip_address,
            nas_port_id,
            failure_reason,
            network_device_name,
        ]
    }
}

/// Fields shared by the `pwa` and `pla` tables.
///
/// The two passed-authentication schemas differ only in the wireless tail
/// columns (`calledstationid`, `radiusflowtype`) and the wired `nasportid`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassedCommon {
    pub timestamp: String,
    pub source_ip: String,
    pub nas_ip_address: Option<String>,
    pub network_device_name: Option<String>,
    pub request_latency: Option<String>,
    pub ciscoavpair_method: Option<String>,
    pub username: Option<String>,
    pub authentication_method: Option<String>,
    pub authentication_identity_store: Option<String>,
    pub selected_access_service: Option<String>,
    pub selected_authorization_profiles: Option<String>,
    pub identity_group: Option<String>,
    pub selected_authentication_identity_stores: Option<String>,
    pub authentication_status: Option<String>,
    pub nd_location: Option<String>,
    pub nd_device: Option<String>,
    pub nd_rollout: Option<String>,
    pub nd_reauth: Option<String>,
    pub nd_closed: Option<String>,
    pub identity_policy_matched_rule: Option<String>,
    pub authorization_policy_matched_rule: Option<String>,
    pub subject_common_name: Option<String>,
    pub endpoint_mac_address: Option<String>,
    pub ise_policy_set_name: Option<String>,
    pub ad_host_resolved_dns: Option<String>,
    pub days_to_expiry: Option<String>,
    pub session_timeout: Option<String>,
    pub ciscoavpair_acs: Option<String>,
    pub device_ip: Option<String>,
}

impl PassedCommon {
    /// Column-ordered values with `nas_port_id` spliced in after
    /// `nasipaddress` when present (the `pla` layout).
    fn into_values(self, nas_port_id: Option<Option<String>>) -> Vec<Option<String>> {
        let PassedCommon {
            timestamp,
            source_ip,
            nas_ip_address,
            network_device_name,
            request_latency,
            ciscoavpair_method,
            username,
            authentication_method,
            authentication_identity_store,
            selected_access_service,
            selected_authorization_profiles,
            identity_group,
            selected_authentication_identity_stores,
            authentication_status,
            nd_location,
            nd_device,
            nd_rollout,
            nd_reauth,
            nd_closed,
            identity_policy_matched_rule,
            authorization_policy_matched_rule,
            subject_common_name,
            endpoint_mac_address,
            ise_policy_set_name,
            ad_host_resolved_dns,
            days_to_expiry,
            session_timeout,
            ciscoavpair_acs,
            device_ip,
        } = self;
        let mut values = vec![Some(timestamp), Some(source_ip), nas_ip_address];
        if let Some(port) = nas_port_id {
            values.push(port);
        }
        values.extend([
            network_device_name,
            request_latency,
            ciscoavpair_method,
            username,
            authentication_method,
            authentication_identity_store,
            selected_access_service,
            selected_authorization_profiles,
            identity_group,
            selected_authentication_identity_stores,
            authentication_status,
            nd_location,
            nd_device,
            nd_rollout,
            nd_reauth,
            nd_closed,
            identity_policy_matched_rule,
            authorization_policy_matched_rule,
            subject_common_name,
            endpoint_mac_address,
            ise_policy_set_name,
            ad_host_resolved_dns,
            days_to_expiry,
            session_timeout,
            ciscoavpair_acs,
            device_ip,
        ]);
        values
    }
}

/// A row destined for the `pwa` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PwaRow {
    pub common: PassedCommon,
    pub called_station_id: Option<String>,
    pub radius_flow_type: Option<String>,
}

impl PwaRow {
    pub fn into_values(self) -> Vec<Option<String>> {
        let mut values = self.common.into_values(None);
        values.push(self.called_station_id);
        values.push(self.radius_flow_type);
        values
    }
}

/// A row destined for the `pla` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaRow {
    pub nas_port_id: Option<String>,
    pub common: PassedCommon,
}

impl PlaRow {
    pub fn into_values(self) -> Vec<Option<String>> {
        self.common.into_values(Some(self.nas_port_id))
    }
}

/// A row destined for the `tca` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TcaRow {
    pub timestamp: String,
    pub username: Option<String>,
    pub network_device_name: Option<String>,
    pub network_device_ip: Option<String>,
    pub remote_device: Option<String>,
    pub cmd_set: Option<String>,
    pub ip_address: Option<String>,
}

impl TcaRow {
    pub fn into_values(self) -> Vec<Option<String>> {
        let TcaRow {
            timestamp,
            username,
            network_device_name,
            network_device_ip,
            remote_device,
            cmd_set,
            ip_address,
        } = self;
        vec![
            Some(timestamp),
            username,
            network_device_name,
            network_device_ip,
            remote_device,
            cmd_set,
            ip_address,
        ]
    }
}

/// A classified message shaped for its target table.
///
/// The tagged variants keep the classifier output typed so the sink cannot
/// mis-shape a row: each record knows its own column order.
#[derive(Debug, Clone, PartialEq)]
pub enum IseRow {
    Fta(FtaRow),
    Fwa(FwaRow),
    Fla(FlaRow),
    Pwa(Box<PwaRow>),
    Pla(Box<PlaRow>),
    Tca(TcaRow),
}

impl IseRow {
    pub fn family(&self) -> Family {
        match self {
            IseRow::Fta(_) => Family::Fta,
            IseRow::Fwa(_) => Family::Fwa,
            IseRow::Fla(_) => Family::Fla,
            IseRow::Pwa(_) => Family::Pwa,
            IseRow::Pla(_) => Family::Pla,
            IseRow::Tca(_) => Family::Tca,
        }
    }

    /// Values in the column order of the target table.
    pub fn into_values(self) -> Vec<Option<String>> {
        match self {
            IseRow::Fta(row) => row.into_values(),
            IseRow::Fwa(row) => row.into_values(),
            IseRow::Fla(row) => row.into_values(),
            IseRow::Pwa(row) => row.into_values(),
            IseRow::Pla(row) => row.into_values(),
            IseRow::Tca(row) => row.into_values(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pwa_values_keep_wireless_tail_order() {
        let row = PwaRow {
            common: PassedCommon {
                timestamp: "2024-01-01 00:00:00".to_string(),
                source_ip: "10.23.18.218".to_string(),
                ..Default::default()
            },
            called_station_id: Some("AA-BB-CC-DD".to_string()),
            radius_flow_type: Some("Wireless802_1x".to_string()),
        };
        let values = row.into_values();
        assert_eq!(values.len(), 31);
        assert_eq!(values[0].as_deref(), Some("2024-01-01 00:00:00"));
        assert_eq!(values[29].as_deref(), Some("AA-BB-CC-DD"));
        assert_eq!(values[30].as_deref(), Some("Wireless802_1x"));
    }

    #[test]
    fn pla_values_splice_nas_port_id_after_nas_ip() {
        let row = PlaRow {
            nas_port_id: Some("GigabitEthernet1/0/14".to_string()),
            common: PassedCommon {
                timestamp: "2024-01-01 00:00:00".to_string(),
                source_ip: "10.23.18.218".to_string(),
                nas_ip_address: Some("10.1.1.1".to_string()),
                network_device_name: Some("sw01-floor2".to_string()),
                ..Default::default()
            },
        };
        let values = row.into_values();
        assert_eq!(values.len(), 30);
        assert_eq!(values[2].as_deref(), Some("10.1.1.1"));
        assert_eq!(values[3].as_deref(), Some("GigabitEthernet1/0/14"));
        assert_eq!(values[4].as_deref(), Some("sw01-floor2"));
    }

    #[test]
    fn family_table_names() {
        let names: Vec<&str> = Family::ALL.iter().map(|f| f.table_name()).collect();
        assert_eq!(names, ["fta", "fwa", "fla", "pwa", "pla", "tca"]);
    }
}
