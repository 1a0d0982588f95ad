//! Registration API client
//!
//! Session bookkeeping around a dual-stack run: client info and MSS per
//! family, session and access type registration, the server list and the
//! final session close-out.

pub mod types;

pub use types::{
    AccessTypeSession, ClientInfo, FinishSessionRequest, IpInfo, LibrespeedServer, MssResponse, SpeedtestSession,
    TestServersList,
};

use crate::{
    client::ClientFactory,
    error::{AppError, Result},
    models::{server::join_path, Config, ServerDescriptor},
    types::NetworkFamily,
};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Base addresses of the registration API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiEndpoints {
    /// Reachable over either family
    pub general: String,
    pub ipv4: String,
    pub ipv6: String,
}

impl ApiEndpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            general: config.endpoint.clone(),
            ipv4: config.ipv4_endpoint.clone(),
            ipv6: config.ipv6_endpoint.clone(),
        }
    }

    /// Endpoint pinned to `family`, or the general one
    pub fn for_family(&self, family: Option<NetworkFamily>) -> &str {
        match family {
            Some(NetworkFamily::V4) => &self.ipv4,
            Some(NetworkFamily::V6) => &self.ipv6,
            None => &self.general,
        }
    }
}

/// JSON client for the registration API
pub struct ApiClient {
    factory: Arc<ClientFactory>,
    endpoints: ApiEndpoints,
}

impl ApiClient {
    pub fn new(factory: Arc<ClientFactory>, endpoints: ApiEndpoints) -> Self {
        Self { factory, endpoints }
    }

    /// Public address and network details as seen over `family`
    pub async fn client_info(&self, family: NetworkFamily) -> Result<ClientInfo> {
        self.call::<(), _>(Method::GET, Some(family), "/clientinfo", None).await
    }

    /// Register a new session and return the server's view of it
    pub async fn register_session(&self, session: &SpeedtestSession) -> Result<SpeedtestSession> {
        let registered: SpeedtestSession = self
            .call(Method::POST, None, "/session/new", Some(session))
            .await?;
        if registered.uuid.is_empty() {
            return Err(AppError::api("Session registration returned no session id"));
        }
        Ok(registered)
    }

    /// Maximum segment size observed over `family`
    pub async fn mss(&self, family: NetworkFamily) -> Result<MssResponse> {
        self.call::<(), _>(Method::GET, Some(family), "/mss", None).await
    }

    pub async fn register_access_type(&self, access: &AccessTypeSession) -> Result<AccessTypeSession> {
        self.call(Method::POST, None, "/accesstype/new", Some(access)).await
    }

    pub async fn servers(&self) -> Result<TestServersList> {
        self.call::<(), _>(Method::GET, None, "/servers", None).await
    }

    /// Close the session with the telemetry ids of both families
    pub async fn finish_session(&self, request: &FinishSessionRequest) -> Result<SpeedtestSession> {
        let session: SpeedtestSession = self
            .call(Method::POST, None, "/session/finish", Some(request))
            .await?;
        if !session.finished {
            return Err(AppError::api(format!("Session {} is not finished", request.uuid)));
        }
        Ok(session)
    }

    async fn call<B, R>(&self, method: Method, family: Option<NetworkFamily>, path: &str, body: Option<&B>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = endpoint_url(self.endpoints.for_family(family), path)?;
        let client = self.factory.api_client(family)?;

        let mut request = client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api(format!("{} {} returned {}", method, url, status)));
        }
        Ok(response.json::<R>().await?)
    }
}

/// `path` below the API base address
pub fn endpoint_url(base: &str, path: &str) -> Result<Url> {
    if base.trim().is_empty() {
        return Err(AppError::config("API endpoint is not set"));
    }
    let mut url = Url::parse(base.trim())?;
    let joined = join_path(url.path(), path);
    url.set_path(&joined);
    Ok(url)
}

/// Convert the librespeed list into IPv4 and IPv6 candidates.
///
/// Ids are 1-based positions in the full list; entries of any other type are
/// dropped.
pub fn split_servers(servers: &[LibrespeedServer]) -> (Vec<ServerDescriptor>, Vec<ServerDescriptor>) {
    let mut ipv4 = Vec::new();
    let mut ipv6 = Vec::new();

    for (i, entry) in servers.iter().enumerate() {
        let descriptor = ServerDescriptor {
            id: i as u32 + 1,
            name: entry.name.clone(),
            server: entry.server.clone(),
            download_path: entry.dl_url.clone(),
            upload_path: entry.ul_url.clone(),
            ping_path: entry.ping_url.clone(),
            get_ip_path: entry.get_ip_url.clone(),
        };
        if entry.type_name == NetworkFamily::V4.type_name() {
            ipv4.push(descriptor);
        } else if entry.type_name == NetworkFamily::V6.type_name() {
            ipv6.push(descriptor);
        }
    }
    (ipv4, ipv6)
}

/// Device id for this host, unless configured explicitly
pub fn device_id(configured: Option<&str>) -> String {
    match configured.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => device_id_for_host(hostname().as_deref()),
    }
}

/// Name-based (MD5, DNS namespace) UUID of a host name
pub fn device_id_for_host(hostname: Option<&str>) -> String {
    match hostname {
        Some(name) if !name.is_empty() => Uuid::new_v3(&Uuid::NAMESPACE_DNS, name.as_bytes()).to_string(),
        _ => crate::defaults::FALLBACK_DEVICE_ID.to_string(),
    }
}

fn hostname() -> Option<String> {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .or_else(|| {
            ["HOSTNAME", "COMPUTERNAME"]
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .map(|name| name.trim().to_string())
                .find(|name| !name.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{api_user_agent, HttpSettings};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> ApiClient {
        let factory = Arc::new(ClientFactory::new(HttpSettings::default()).unwrap());
        let base = server.uri();
        ApiClient::new(
            factory,
            ApiEndpoints {
                general: base.clone(),
                ipv4: format!("{}/v4", base),
                ipv6: format!("{}/v6", base),
            },
        )
    }

    #[test]
    fn test_split_servers() {
        let entry = |kind: &str, name: &str| LibrespeedServer {
            type_name: kind.to_string(),
            name: name.to_string(),
            server: format!("//{}.example.net/", name),
            dl_url: "garbage.php".to_string(),
            ul_url: "empty.php".to_string(),
            ping_url: "empty.php".to_string(),
            get_ip_url: "getIP.php".to_string(),
        };
        let list = vec![entry("ipv4", "a"), entry("ipv6", "b"), entry("quic", "c"), entry("ipv4", "d")];

        let (v4, v6) = split_servers(&list);
        assert_eq!(v4.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(v6.len(), 1);
        assert_eq!(v6[0].id, 2);
        assert_eq!(v6[0].download_path, "garbage.php");
    }

    #[test]
    fn test_device_id() {
        let a = device_id_for_host(Some("host-a"));
        assert_eq!(a, device_id_for_host(Some("host-a")));
        assert_ne!(a, device_id_for_host(Some("host-b")));
        assert_eq!(Uuid::parse_str(&a).unwrap().get_version_num(), 3);

        assert_eq!(device_id_for_host(None), crate::defaults::FALLBACK_DEVICE_ID);
        assert_eq!(device_id(Some(" fixed-id ")), "fixed-id");
        assert!(!device_id(None).is_empty());
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("https://api.example.net/v3", "/servers").unwrap().as_str(),
            "https://api.example.net/v3/servers"
        );
        assert!(matches!(endpoint_url("", "/servers"), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_client_info_uses_family_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/clientinfo"))
            .and(header("user-agent", api_user_agent().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ip": "127.0.0.1", "port": 1, "unixtime": 5, "isIPv4": true, "ipInfo": {"org": "Loopback"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = api(&server).client_info(NetworkFamily::V4).await.unwrap();
        assert!(info.is_ipv4);
        assert_eq!(info.ip_info.org, "Loopback");
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uuid": "s-1", "deviceId": "dev", "preferIPv6": true, "finished": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/finish"))
            .and(body_json(json!({
                "uuid": "s-1", "deviceId": "dev", "speedIPv4Id": null, "speedIPv6Id": "t-6"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uuid": "s-1", "finished": true})))
            .mount(&server)
            .await;

        let api = api(&server);
        let session = api
            .register_session(&SpeedtestSession::registration("dev", "ua", None, None, None, None))
            .await
            .unwrap();
        assert_eq!(session.uuid, "s-1");
        assert!(session.prefer_ipv6);

        let finished = api
            .finish_session(&FinishSessionRequest {
                uuid: session.uuid.clone(),
                device_id: "dev".to_string(),
                speed_ipv4_id: None,
                speed_ipv6_id: Some("t-6".to_string()),
            })
            .await
            .unwrap();
        assert!(finished.finished);
    }

    #[tokio::test]
    async fn test_unfinished_session_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session/finish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uuid": "s-1", "finished": false})))
            .mount(&server)
            .await;

        let err = api(&server)
            .finish_session(&FinishSessionRequest {
                uuid: "s-1".to_string(),
                device_id: "dev".to_string(),
                speed_ipv4_id: None,
                speed_ipv6_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
    }

    #[tokio::test]
    async fn test_mss_and_servers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/mss"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "actualMss": 1448, "mss": 1460, "isIPv4": true, "estimatedMtu": 1500
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"librespeed": [], "oneshot": []})))
            .mount(&server)
            .await;

        let api = api(&server);
        let mss = api.mss(NetworkFamily::V4).await.unwrap();
        assert_eq!(mss.mss, 1460);
        assert_eq!(mss.estimated_mtu, 1500);
        assert!(api.servers().await.unwrap().librespeed.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = api(&server).servers().await.unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
    }

    #[tokio::test]
    async fn test_access_type_registration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accesstype/new"))
            .and(body_json(json!({"speedTestSessionUUID": "s-1", "ipv4Mss": 1460})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "speedTestSessionUUID": "s-1", "ipv4Mss": 1460
            })))
            .expect(1)
            .mount(&server)
            .await;

        let access = AccessTypeSession {
            speedtest_session_uuid: "s-1".to_string(),
            ipv4_mss: Some(1460),
            ..Default::default()
        };
        let registered = api(&server).register_access_type(&access).await.unwrap();
        assert_eq!(registered.ipv4_mss, Some(1460));
    }
}
