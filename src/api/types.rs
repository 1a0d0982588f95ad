//! Wire types of the registration API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Autonomous system details of a client address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsnInfo {
    pub asn: String,
    pub name: String,
    pub domain: String,
    pub route: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Geo and network details of a client address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpInfo {
    pub hostname: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub org: String,
    pub asn: Option<AsnInfo>,
}

/// Response of `GET /clientinfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: IpAddr,
    #[serde(default)]
    pub port: u16,
    #[serde(rename = "unixtime", default)]
    pub unix_time: i64,
    #[serde(rename = "isIPv4", default)]
    pub is_ipv4: bool,
    #[serde(rename = "ipInfo", default)]
    pub ip_info: IpInfo,
}

/// Speed test session, both the registration body and the server's view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestSession {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    #[serde(rename = "CreatedAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    #[serde(rename = "ipv4Addr")]
    pub ipv4_addr: String,
    #[serde(rename = "ipv6Addr")]
    pub ipv6_addr: String,
    #[serde(rename = "infoIPv4Org")]
    pub info_ipv4_org: Option<String>,
    #[serde(rename = "infoIPv4AS")]
    pub info_ipv4_as: Option<String>,
    #[serde(rename = "infoIPv4Country")]
    pub info_ipv4_country: Option<String>,
    #[serde(rename = "infoIPv4City")]
    pub info_ipv4_city: Option<String>,
    #[serde(rename = "infoIPv4Route")]
    pub info_ipv4_route: Option<String>,
    #[serde(rename = "infoIPv6Org")]
    pub info_ipv6_org: Option<String>,
    #[serde(rename = "infoIPv6AS")]
    pub info_ipv6_as: Option<String>,
    #[serde(rename = "infoIPv6Country")]
    pub info_ipv6_country: Option<String>,
    #[serde(rename = "infoIPv6City")]
    pub info_ipv6_city: Option<String>,
    #[serde(rename = "infoIPv6Route")]
    pub info_ipv6_route: Option<String>,
    #[serde(rename = "speedIPv4Id")]
    pub speed_ipv4_id: Option<String>,
    #[serde(rename = "speedIPv6Id")]
    pub speed_ipv6_id: Option<String>,
    pub finished: bool,
    #[serde(rename = "preferIPv6")]
    pub prefer_ipv6: bool,
    #[serde(rename = "orgId")]
    pub org_id: Option<String>,
    #[serde(rename = "freeTag")]
    pub free_tag: Option<String>,
}

/// Placeholder address for a family without connectivity
pub const NO_ADDRESS: &str = "None";

impl SpeedtestSession {
    /// Registration body for a device and the families it can reach
    pub fn registration(
        device_id: &str,
        user_agent: &str,
        org_tag: Option<&str>,
        free_tag: Option<&str>,
        ipv4: Option<&ClientInfo>,
        ipv6: Option<&ClientInfo>,
    ) -> Self {
        let mut session = Self {
            device_id: device_id.to_string(),
            user_agent: user_agent.to_string(),
            org_id: org_tag.map(str::to_string),
            free_tag: free_tag.map(str::to_string),
            ipv4_addr: NO_ADDRESS.to_string(),
            ipv6_addr: NO_ADDRESS.to_string(),
            ..Default::default()
        };

        if let Some(info) = ipv4 {
            let asn = info.ip_info.asn.as_ref();
            session.ipv4_addr = info.ip.to_string();
            session.info_ipv4_org = Some(info.ip_info.org.clone());
            session.info_ipv4_country = Some(info.ip_info.country.clone());
            session.info_ipv4_city = Some(info.ip_info.city.clone());
            session.info_ipv4_as = asn.map(|a| a.asn.clone());
            session.info_ipv4_route = asn.map(|a| a.route.clone());
        }
        if let Some(info) = ipv6 {
            let asn = info.ip_info.asn.as_ref();
            session.ipv6_addr = info.ip.to_string();
            session.info_ipv6_org = Some(info.ip_info.org.clone());
            session.info_ipv6_country = Some(info.ip_info.country.clone());
            session.info_ipv6_city = Some(info.ip_info.city.clone());
            session.info_ipv6_as = asn.map(|a| a.asn.clone());
            session.info_ipv6_route = asn.map(|a| a.route.clone());
        }
        session
    }
}

/// Response of `GET /mss`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MssResponse {
    /// MSS without TCP options
    #[serde(rename = "actualMss")]
    pub actual_mss: i32,
    pub mss: i32,
    #[serde(rename = "isIPv4")]
    pub is_ipv4: bool,
    #[serde(rename = "estimatedMtu")]
    pub estimated_mtu: i32,
}

/// Access type registration linking MSS readings to a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessTypeSession {
    #[serde(rename = "speedTestSessionUUID")]
    pub speedtest_session_uuid: String,
    #[serde(rename = "ipv4Mss", skip_serializing_if = "Option::is_none")]
    pub ipv4_mss: Option<i32>,
    #[serde(rename = "ipv6Mss", skip_serializing_if = "Option::is_none")]
    pub ipv6_mss: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flets: Option<String>,
}

/// One librespeed-compatible server entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrespeedServer {
    #[serde(rename = "typeName")]
    pub type_name: String,
    pub name: String,
    pub server: String,
    #[serde(rename = "dlURL")]
    pub dl_url: String,
    #[serde(rename = "ulURL")]
    pub ul_url: String,
    #[serde(rename = "pingURL")]
    pub ping_url: String,
    #[serde(rename = "getIpURL")]
    pub get_ip_url: String,
}

/// Single-shot probe endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneshotServer {
    #[serde(rename = "typeName")]
    pub type_name: String,
    #[serde(rename = "httpEndpoint")]
    pub http_endpoint: String,
}

/// Response of `GET /servers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestServersList {
    pub librespeed: Vec<LibrespeedServer>,
    pub oneshot: Vec<OneshotServer>,
}

/// Body of `POST /session/finish`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishSessionRequest {
    pub uuid: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "speedIPv4Id")]
    pub speed_ipv4_id: Option<String>,
    #[serde(rename = "speedIPv6Id")]
    pub speed_ipv6_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_info_from_api() {
        let json = r#"{
            "ip": "2001:db8::10",
            "port": 51234,
            "unixtime": 1700000000,
            "isIPv4": false,
            "ipInfo": {"org": "AS64500 Example", "city": "Tokyo", "country": "JP",
                       "asn": {"asn": "AS64500", "route": "2001:db8::/32"}}
        }"#;
        let info: ClientInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.ip, "2001:db8::10".parse::<IpAddr>().unwrap());
        assert!(!info.is_ipv4);
        assert_eq!(info.ip_info.org, "AS64500 Example");
        assert_eq!(info.ip_info.asn.unwrap().route, "2001:db8::/32");
    }

    #[test]
    fn test_registration_body() {
        let v4 = ClientInfo {
            ip: "192.0.2.4".parse().unwrap(),
            port: 40000,
            unix_time: 0,
            is_ipv4: true,
            ip_info: IpInfo {
                org: "Example Net".to_string(),
                ..Default::default()
            },
        };
        let session = SpeedtestSession::registration("dev-1", "ua", Some("org"), None, Some(&v4), None);
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["deviceId"], "dev-1");
        assert_eq!(json["ipv4Addr"], "192.0.2.4");
        assert_eq!(json["ipv6Addr"], "None");
        assert_eq!(json["infoIPv4Org"], "Example Net");
        assert!(json["infoIPv4AS"].is_null());
        assert!(json["infoIPv6Org"].is_null());
        assert_eq!(json["orgId"], "org");
        assert!(json.get("uuid").is_none());
    }

    #[test]
    fn test_access_type_omits_missing_mss() {
        let ats = AccessTypeSession {
            speedtest_session_uuid: "u-1".to_string(),
            ipv6_mss: Some(1220),
            ..Default::default()
        };
        let json = serde_json::to_value(&ats).unwrap();
        assert_eq!(json, serde_json::json!({"speedTestSessionUUID": "u-1", "ipv6Mss": 1220}));
    }

    #[test]
    fn test_server_list_without_oneshot() {
        let json = r#"{"librespeed": [{"typeName": "ipv4", "name": "Tokyo", "server": "//tokyo.example.net/",
            "dlURL": "garbage.php", "ulURL": "empty.php", "pingURL": "empty.php", "getIpURL": "getIP.php"}]}"#;
        let list: TestServersList = serde_json::from_str(json).unwrap();
        assert_eq!(list.librespeed.len(), 1);
        assert_eq!(list.librespeed[0].dl_url, "garbage.php");
        assert!(list.oneshot.is_empty());
    }
}
