//! Routing of whole messages to their target tables.
//!
//! Rules are checked in priority order and the first match wins. Messages
//! that match no rule are reported with their `CISE_<type>` token so an
//! operator can see what the service is receiving without persisting it.

use kingfisher_core::{
    FlaRow, FtaRow, FwaRow, IseRow, PassedCommon, PlaRow, PwaRow, TcaRow, WholeMessage,
};

use crate::extract::{extract, message_timestamp};
use crate::patterns;

/// Outcome of routing one whole message.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Matched a rule; the row is shaped for `row.family()`.
    Row(IseRow),
    /// Deliberately not persisted (rejected accounting, filtered commands).
    Ignored,
    /// No rule matched; carries the `CISE_<type>` token when present.
    Unhandled(Option<String>),
}

pub fn classify(message: &WholeMessage) -> Disposition {
    let text = message.text.as_str();

    // Rejected accounting requests short-circuit every rule, including
    // messages that otherwise look like command accounting.
    if text.contains("TACACS+ Accounting request rejected") {
        return Disposition::Ignored;
    }

    if text.contains("CISE_Failed_Attempts") {
        return classify_failed(message);
    }
    if text.contains("CISE_TACACS_Accounting") {
        return classify_accounting(message);
    }
    if text.contains("CISE_Passed_Authentications")
        && !text.contains("Command Auth")
        && !text.contains("Protocol=Tacacs")
    {
        return classify_passed(message);
    }

    Disposition::Unhandled(message_token(text))
}

fn classify_failed(message: &WholeMessage) -> Disposition {
    let text = message.text.as_str();
    let mut fields = extract(&patterns::FAILED_FIELDS, text);
    let timestamp = message_timestamp(text, message.received_at);
    let device_name = fields
        .get("NetworkDeviceName")
        .map(String::as_str)
        .unwrap_or("");

    if text.contains("Failed-Attempt: Authentication failed") && text.contains("Protocol=Tacacs") {
        // Failed TACACS logins carry the device address in `Device IP
        // Address`; the RADIUS attributes are absent.
        return Disposition::Row(IseRow::Fta(FtaRow {
            timestamp,
            ip_address: Some(message.source.to_string()),
            username: fields.remove("UserName"),
            nas_ip_address: fields.remove("Device IP Address"),
            remote_address: fields.remove("Remote-Address"),
            failure_reason: fields.remove("FailureReason"),
            network_device_name: fields.remove("NetworkDeviceName"),
            request_latency: fields.remove("RequestLatency"),
        }));
    }

    // The predicate looks at the whole attribute (the SSID rides after the
    // MAC, separated by a colon); the stored value keeps only the MAC.
    let called_station = patterns::CALLED_STATION_FULL
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");
    if device_name.contains("WLC") && called_station.contains("HO") {
        return Disposition::Row(IseRow::Fwa(FwaRow {
            timestamp,
            ip_address: Some(message.source.to_string()),
            username: fields.remove("UserName"),
            nas_ip_address: fields.remove("NAS-IP-Address"),
            called_station_id: fields.remove("Called-Station-ID"),
            failure_reason: fields.remove("FailureReason"),
            network_device_name: fields.remove("NetworkDeviceName"),
        }));
    }

    if device_name.contains('-') {
        return Disposition::Row(IseRow::Fla(FlaRow {
            timestamp,
            ip_address: Some(message.source.to_string()),
            username: fields.remove("UserName"),
            nas_ip_address: fields.remove("NAS-IP-Address"),
            nas_port_id: fields.remove("NAS-Port-Id"),
            failure_reason: fields.remove("FailureReason"),
            network_device_name: fields.remove("NetworkDeviceName"),
        }));
    }

    Disposition::Unhandled(message_token(text))
}

fn classify_accounting(message: &WholeMessage) -> Disposition {
    let text = message.text.as_str();

    // Only explicit command accounting is persisted; periodic EEM applet
    // noise is not.
    if !text.contains("TACACS+ Accounting with Command") || text.contains("EEM:") {
        return Disposition::Unhandled(message_token(text));
    }

    let mut fields = extract(&patterns::TCA_FIELDS, text);
    let cmd_set = fields
        .remove("CmdSet")
        .map(|command| command.replace("CmdArgAV=", ""));
    if cmd_set.as_deref().unwrap_or("").contains("terminal pager 0") {
        // ASA session preamble, not an operator command.
        return Disposition::Ignored;
    }

    Disposition::Row(IseRow::Tca(TcaRow {
        timestamp: message_timestamp(text, message.received_at),
        username: fields.remove("User"),
        network_device_name: fields.remove("NetworkDeviceName"),
        network_device_ip: fields.remove("Device IP Address"),
        remote_device: fields.remove("Remote-Address"),
        cmd_set,
        ip_address: Some(message.source.to_string()),
    }))
}

fn classify_passed(message: &WholeMessage) -> Disposition {
    let text = message.text.as_str();
    let mut fields = extract(&patterns::PASSED_FIELDS, text);
    let device_name = fields
        .get("NetworkDeviceName")
        .cloned()
        .unwrap_or_default();
    let device_type = fields
        .get("NetworkDeviceGroups=Device Type#")
        .cloned()
        .unwrap_or_default();
    let nas_port_id = fields.remove("NAS-Port-Id");

    let common = PassedCommon {
        timestamp: message_timestamp(text, message.received_at),
        source_ip: message.source.to_string(),
        nas_ip_address: fields.remove("NAS-IP-Address"),
        network_device_name: fields.remove("NetworkDeviceName"),
        request_latency: fields.remove("RequestLatency"),
        ciscoavpair_method: fields.remove("cisco-av-pair=method"),
        username: fields.remove("UserName"),
        authentication_method: fields.remove("AuthenticationMethod"),
        authentication_identity_store: fields.remove("AuthenticationIdentityStore"),
        selected_access_service: fields.remove("SelectedAccessService"),
        selected_authorization_profiles: fields.remove("SelectedAuthorizationProfiles"),
        identity_group: fields.remove("IdentityGroup"),
        selected_authentication_identity_stores: fields
            .remove("SelectedAuthenticationIdentityStores"),
        authentication_status: fields.remove("AuthenticationStatus"),
        nd_location: fields.remove("NetworkDeviceGroups=Location#"),
        nd_device: fields.remove("NetworkDeviceGroups=Device Type#"),
        nd_rollout: fields.remove("NetworkDeviceGroups=Rollout Stage#"),
        nd_reauth: fields.remove("NetworkDeviceGroups=Reauth Controller#"),
        nd_closed: fields.remove("NetworkDeviceGroups=Closed Mode#"),
        identity_policy_matched_rule: fields.remove("IdentityPolicyMatchedRule"),
        authorization_policy_matched_rule: fields.remove("AuthorizationPolicyMatchedRule"),
        subject_common_name: fields.remove("Subject - Common Name"),
        endpoint_mac_address: fields.remove("EndPointMACAddress"),
        ise_policy_set_name: fields.remove("ISEPolicySetName"),
        ad_host_resolved_dns: fields.remove("AD-Host-Resolved-DNs"),
        days_to_expiry: fields.remove("Days to Expiry"),
        session_timeout: fields.remove("Session-Timeout"),
        ciscoavpair_acs: fields.remove("cisco-av-pair=ACS"),
        device_ip: fields.remove("Device IP Address"),
    };

    if device_name.contains("WLC") {
        let wlc_fields = extract(&patterns::PASSED_WLC_FIELDS, text);
        return Disposition::Row(IseRow::Pwa(Box::new(PwaRow {
            common,
            called_station_id: wlc_fields.get("Called-Station-ID").cloned(),
            radius_flow_type: wlc_fields.get("RadiusFlowType").cloned(),
        })));
    }

    if device_type.contains("switch") {
        return Disposition::Row(IseRow::Pla(Box::new(PlaRow { nas_port_id, common })));
    }

    Disposition::Unhandled(message_token(text))
}

fn message_token(text: &str) -> Option<String> {
    patterns::MESSAGE_TOKEN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kingfisher_core::Family;
    use std::net::IpAddr;

    fn message(source: &str, text: &str) -> WholeMessage {
        WholeMessage {
            source: source.parse::<IpAddr>().expect("test address"),
            text: text.to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn rejected_accounting_short_circuits() {
        let msg = message(
            "10.23.18.218",
            "CISE_TACACS_Accounting 9 1 1 TACACS+ Accounting with Command \
             TACACS+ Accounting request rejected CmdSet=[ CmdAV=show version ] ",
        );
        assert_eq!(classify(&msg), Disposition::Ignored);
    }

    #[test]
    fn failed_tacacs_routes_to_fta() {
        let msg = message(
            "1.2.3.4",
            "CISE_Failed_Attempts 1 1 1 Failed-Attempt: Authentication failed, \
             Protocol=Tacacs, UserName=alice, Device IP Address=10.0.0.5, \
             Remote-Address=10.0.0.9, FailureReason=22056 Subject not found, \
             NetworkDeviceName=rtr1-core, RequestLatency=12, end",
        );
        match classify(&msg) {
            Disposition::Row(IseRow::Fta(row)) => {
                assert_eq!(row.ip_address.as_deref(), Some("1.2.3.4"));
                assert_eq!(row.username.as_deref(), Some("alice"));
                assert_eq!(row.nas_ip_address.as_deref(), Some("10.0.0.5"));
                assert_eq!(row.remote_address.as_deref(), Some("10.0.0.9"));
                assert_eq!(row.failure_reason.as_deref(), Some("22056 Subject not found"));
                assert_eq!(row.network_device_name.as_deref(), Some("rtr1-core"));
                assert_eq!(row.request_latency.as_deref(), Some("12"));
            }
            other => panic!("expected fta row, got {:?}", other),
        }
    }

    #[test]
    fn failed_wlc_ho_routes_to_fwa() {
        let msg = message(
            "10.23.18.219",
            "CISE_Failed_Attempts 2 1 1 UserName=bob, NAS-IP-Address=10.1.1.1, \
             Called-Station-ID=AA-BB-CC-DD:HO-SSID, FailureReason=X, \
             NetworkDeviceName=WLC-CAMPUS, end",
        );
        match classify(&msg) {
            Disposition::Row(IseRow::Fwa(row)) => {
                assert_eq!(row.username.as_deref(), Some("bob"));
                assert_eq!(row.nas_ip_address.as_deref(), Some("10.1.1.1"));
                // The capture stops at the `:` separating SSID from MAC.
                assert_eq!(row.called_station_id.as_deref(), Some("AA-BB-CC-DD"));
                assert_eq!(row.network_device_name.as_deref(), Some("WLC-CAMPUS"));
            }
            other => panic!("expected fwa row, got {:?}", other),
        }
    }

    #[test]
    fn failed_wired_routes_to_fla() {
        let msg = message(
            "10.23.18.219",
            "CISE_Failed_Attempts 3 1 1 UserName=carol, NAS-IP-Address=10.2.2.2, \
             NAS-Port-Id=GigabitEthernet1/0/3, FailureReason=Y, \
             NetworkDeviceName=sw02-floor1, end",
        );
        match classify(&msg) {
            Disposition::Row(IseRow::Fla(row)) => {
                assert_eq!(row.nas_port_id.as_deref(), Some("GigabitEthernet1/0/3"));
                assert_eq!(row.network_device_name.as_deref(), Some("sw02-floor1"));
            }
            other => panic!("expected fla row, got {:?}", other),
        }
    }

    #[test]
    fn failed_without_subfamily_is_unhandled() {
        let msg = message(
            "10.23.18.219",
            "CISE_Failed_Attempts 4 1 1 UserName=dave, NetworkDeviceName=corehub, end",
        );
        assert_eq!(
            classify(&msg),
            Disposition::Unhandled(Some("CISE_Failed_Attempts".to_string()))
        );
    }

    #[test]
    fn terminal_pager_commands_are_filtered() {
        let base = "CISE_TACACS_Accounting 5 1 1 TACACS+ Accounting with Command, \
                    User=eve, NetworkDeviceName=fw01-dc, Device IP Address=10.3.3.3, \
                    Remote-Address=10.3.3.9, ";
        let pager = format!("{base}CmdSet=[ CmdAV=terminal pager 0 ] end");
        let show = format!("{base}CmdSet=[ CmdAV=show version ] end");

        assert_eq!(classify(&message("10.23.252.3", &pager)), Disposition::Ignored);
        match classify(&message("10.23.252.3", &show)) {
            Disposition::Row(IseRow::Tca(row)) => {
                assert_eq!(row.username.as_deref(), Some("eve"));
                assert_eq!(row.cmd_set.as_deref(), Some("show version"));
                assert_eq!(row.ip_address.as_deref(), Some("10.23.252.3"));
            }
            other => panic!("expected tca row, got {:?}", other),
        }
    }

    #[test]
    fn eem_accounting_is_unhandled() {
        let msg = message(
            "10.23.252.3",
            "CISE_TACACS_Accounting 6 1 1 TACACS+ Accounting with Command EEM: applet, \
             CmdSet=[ CmdAV=show clock ] end",
        );
        assert!(matches!(classify(&msg), Disposition::Unhandled(_)));
    }

    #[test]
    fn passed_wlc_routes_to_pwa() {
        let msg = message(
            "10.24.18.220",
            "CISE_Passed_Authentications 7 1 1 UserName=frank, \
             NAS-IP-Address=10.4.4.4, NetworkDeviceName=WLC-1, RequestLatency=9, \
             Called-Station-ID=AA-BB-CC-DD:CORP, RadiusFlowType=Wireless802_1x, end",
        );
        match classify(&msg) {
            Disposition::Row(IseRow::Pwa(row)) => {
                assert_eq!(row.common.source_ip, "10.24.18.220");
                assert_eq!(row.common.network_device_name.as_deref(), Some("WLC-1"));
                assert_eq!(row.called_station_id.as_deref(), Some("AA-BB-CC-DD"));
                assert_eq!(row.radius_flow_type.as_deref(), Some("Wireless802_1x"));
            }
            other => panic!("expected pwa row, got {:?}", other),
        }
    }

    #[test]
    fn passed_switch_routes_to_pla() {
        let msg = message(
            "10.24.18.220",
            "CISE_Passed_Authentications 8 1 1 UserName=grace, \
             NAS-IP-Address=10.5.5.5, NAS-Port-Id=GigabitEthernet1/0/7, \
             NetworkDeviceName=sw03-lab, \
             NetworkDeviceGroups=Device Type#All Device Types#switch, end",
        );
        match classify(&msg) {
            Disposition::Row(IseRow::Pla(row)) => {
                assert_eq!(row.nas_port_id.as_deref(), Some("GigabitEthernet1/0/7"));
                assert_eq!(
                    row.common.nd_device.as_deref(),
                    Some("All Device Types#switch")
                );
            }
            other => panic!("expected pla row, got {:?}", other),
        }
    }

    #[test]
    fn passed_command_auth_is_unhandled() {
        let msg = message(
            "10.24.18.220",
            "CISE_Passed_Authentications 9 1 1 Command Auth UserName=henry, \
             NetworkDeviceName=WLC-2, end",
        );
        assert!(matches!(classify(&msg), Disposition::Unhandled(_)));
    }

    #[test]
    fn unknown_message_reports_token() {
        let msg = message(
            "10.23.18.218",
            "CISE_RADIUS_Accounting 10 1 1 something else entirely",
        );
        assert_eq!(
            classify(&msg),
            Disposition::Unhandled(Some("CISE_RADIUS_Accounting".to_string()))
        );
    }

    // Rules are mutually exclusive under the priority order: a message routed
    // to one family must not satisfy any earlier rule's predicates.
    #[test]
    fn classified_rows_target_exactly_one_family() {
        let samples = [
            "CISE_Failed_Attempts 1 1 1 Failed-Attempt: Authentication failed, \
             Protocol=Tacacs, UserName=a, NetworkDeviceName=rtr-1, end",
            "CISE_Failed_Attempts 2 1 1 UserName=b, NetworkDeviceName=WLC-X, \
             Called-Station-ID=AA:HO, end",
            "CISE_Failed_Attempts 3 1 1 UserName=c, NetworkDeviceName=sw-1, end",
            "CISE_TACACS_Accounting 4 1 1 TACACS+ Accounting with Command, User=d, \
             NetworkDeviceName=fw-1, Device IP Address=10.0.0.1, \
             CmdSet=[ CmdAV=show run ] end",
            "CISE_Passed_Authentications 5 1 1 UserName=e, NetworkDeviceName=WLC-Y, end",
            "CISE_Passed_Authentications 6 1 1 UserName=f, NetworkDeviceName=sw-2, \
             NetworkDeviceGroups=Device Type#All#switch, end",
        ];
        let expected = [
            Family::Fta,
            Family::Fwa,
            Family::Fla,
            Family::Tca,
            Family::Pwa,
            Family::Pla,
        ];
        for (text, family) in samples.iter().zip(expected) {
            match classify(&message("10.23.18.218", text)) {
                Disposition::Row(row) => assert_eq!(row.family(), family, "{text}"),
                other => panic!("expected a row for {text}, got {other:?}"),
            }
        }
    }
}
