//! Regex library for the Cisco ISE message families.
//!
//! ISE writes its attributes as `Name=value` pairs terminated by a comma
//! followed by whitespace or the `<` of the next syslog tag, so most
//! patterns capture lazily up to `,[\s<]`. A few attributes (failure
//! reasons, device names) legitimately contain spaces and are captured up
//! to the next comma instead.

use regex::Regex;
use std::sync::LazyLock;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("hard-coded pattern compiles")
}

/// Fragment header: `CISE_<type> <uid> <total> <index>`.
pub static CHUNK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"CISE_\w+ (\d+) (\d+) (\d+)"));

/// Timestamp embedded in the ISE header, e.g.
/// `... 0123456789 1 2024-05-06 11:22:33.456 +02:00 ...`.
pub static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\d+ \d+ (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d+ [+-]\d{2}:\d{2})")
});

/// The `CISE_<type>` token, used to label unhandled messages.
pub static MESSAGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| pattern(r"(CISE\S+)\s"));

/// Whole `Called-Station-ID` value including the `:SSID` suffix. Used only
/// by the wireless-failure predicate; the stored column keeps the `[^,:]`
/// capture, which stops at the MAC.
pub static CALLED_STATION_FULL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"Called-Station-ID=([^,]+)"));

/// Fields for the failed-attempt families (fta/fwa/fla).
pub static FAILED_FIELDS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("UserName", pattern(r"UserName=(.+?),[\s<]")),
        ("NAS-IP-Address", pattern(r"NAS-IP-Address=(.+?),[\s<]")),
        ("NAS-Port-Id", pattern(r"NAS-Port-Id=(.+?),[\s<]")),
        ("Called-Station-ID", pattern(r"Called-Station-ID=([^,:]+)")),
        ("FailureReason", pattern(r"FailureReason=([^,]+)")),
        ("NetworkDeviceName", pattern(r"NetworkDeviceName=([^,]+)")),
        ("Remote-Address", pattern(r"Remote-Address=([^,]+)")),
        ("RequestLatency", pattern(r"RequestLatency=([^,]+)")),
        ("Device IP Address", pattern(r"Device IP Address=([^,]+)")),
    ]
});

/// Fields shared by the passed-authentication families (pwa/pla).
///
/// `AuthenticationIdentityStore` carries a leading `[^=]` so the pattern
/// skips the `...=` inside `SelectedAuthenticationIdentityStores=`; the
/// regex crate has no look-behind, and the character class does the job.
pub static PASSED_FIELDS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("NAS-IP-Address", pattern(r"NAS-IP-Address=(.+?),[\s<]")),
        ("NAS-Port-Id", pattern(r"NAS-Port-Id=(.+?),[\s<]")),
        ("NetworkDeviceName", pattern(r"NetworkDeviceName=(.+?),[\s<]")),
        ("Device IP Address", pattern(r"Device IP Address=(.+?),[\s<]")),
        ("RequestLatency", pattern(r"RequestLatency=(.+?),[\s<]")),
        ("cisco-av-pair=method", pattern(r"cisco-av-pair=method=(.+?),[\s<]")),
        ("UserName", pattern(r"UserName=(.+?),[\s<]")),
        ("AuthenticationMethod", pattern(r"AuthenticationMethod=(.+?),[\s<]")),
        (
            "AuthenticationIdentityStore",
            pattern(r"[^=]AuthenticationIdentityStore=(.+?),[\s<]"),
        ),
        ("SelectedAccessService", pattern(r"SelectedAccessService=(.+?),[\s<]")),
        (
            "SelectedAuthorizationProfiles",
            pattern(r"SelectedAuthorizationProfiles=(.+?),[\s<]"),
        ),
        (
            "IdentityGroup",
            pattern(r"IdentityGroup=Endpoint Identity Groups:(.+?),[\s<]"),
        ),
        (
            "SelectedAuthenticationIdentityStores",
            pattern(r"SelectedAuthenticationIdentityStores=(.+?),[\s<]"),
        ),
        ("AuthenticationStatus", pattern(r"AuthenticationStatus=(.+?),[\s<]")),
        (
            "NetworkDeviceGroups=Location#",
            pattern(r"NetworkDeviceGroups=Location#(.+?),[\s<]"),
        ),
        (
            "NetworkDeviceGroups=Device Type#",
            pattern(r"NetworkDeviceGroups=Device Type#(.+?),[\s<]"),
        ),
        (
            "NetworkDeviceGroups=Rollout Stage#",
            pattern(r"NetworkDeviceGroups=Rollout Stage#(.+?),[\s<]"),
        ),
        (
            "NetworkDeviceGroups=Reauth Controller#",
            pattern(r"NetworkDeviceGroups=Reauth Controller#(.+?),[\s<]"),
        ),
        (
            "NetworkDeviceGroups=Closed Mode#",
            pattern(r"NetworkDeviceGroups=Closed Mode#(.+?),[\s<]"),
        ),
        (
            "IdentityPolicyMatchedRule",
            pattern(r"IdentityPolicyMatchedRule=(.+?),[\s<]"),
        ),
        (
            "AuthorizationPolicyMatchedRule",
            pattern(r"AuthorizationPolicyMatchedRule=(.+?),[\s<]"),
        ),
        ("Subject - Common Name", pattern(r"Subject - Common Name=(.+?),[\s<]")),
        ("EndPointMACAddress", pattern(r"EndPointMACAddress=(.+?),[\s<]")),
        ("ISEPolicySetName", pattern(r"ISEPolicySetName=(.+?),[\s<]")),
        ("AD-Host-Resolved-DNs", pattern(r"AD-Host-Resolved-DNs=(.+?),[\s<]")),
        ("Days to Expiry", pattern(r"Days to Expiry=(.+?),[\s<]")),
        ("Session-Timeout", pattern(r"Session-Timeout=(.+?);[\s<]")),
        ("cisco-av-pair=ACS", pattern(r"cisco-av-pair=ACS:(.+?);[\s<]")),
    ]
});

/// Extra fields extracted when a passed authentication came from a WLC.
pub static PASSED_WLC_FIELDS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("Called-Station-ID", pattern(r"Called-Station-ID=([^,:]+)")),
        ("RadiusFlowType", pattern(r"RadiusFlowType=(.+?),[\s<]")),
    ]
});

/// Fields for TACACS command accounting (tca).
pub static TCA_FIELDS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("User", pattern(r"User=([^,]+)")),
        ("NetworkDeviceName", pattern(r"NetworkDeviceName=([^,]+)")),
        ("Device IP Address", pattern(r"Device IP Address=([^,]+)")),
        ("Remote-Address", pattern(r"Remote-Address=([^,]+)")),
        ("CmdSet", pattern(r"CmdSet=\[ CmdAV=([^,]+) ]")),
    ]
});
