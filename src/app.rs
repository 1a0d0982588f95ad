//! Main application orchestration and execution

use crate::{
    api::{self, AccessTypeSession, ApiClient, ApiEndpoints, ClientInfo, FinishSessionRequest, SpeedtestSession},
    client::{api_user_agent, ClientFactory, HttpSettings},
    error::{AppError, Result},
    logging::{Logger, LoggerFactory, MeasurementLogger},
    models::{Config, FamilyInfo, RunReport, ServerDescriptor},
    speedtest::{Cooldown, DualStackOrchestrator, FamilyPlan, FamilyRunner, FixedCooldown, SpeedtestRunner},
    types::{FamilyRestriction, NetworkFamily},
};
use chrono::Utc;
use std::sync::Arc;

/// Runs one complete dual-stack session against the registration API
pub struct App {
    config: Config,
    api: ApiClient,
    runner: Arc<dyn FamilyRunner>,
    cooldown: Arc<dyn Cooldown>,
    logger: Logger,
    measurement_logger: MeasurementLogger,
}

impl App {
    /// Wire the HTTP stack, API client and speed test runner from config
    pub async fn new(config: Config) -> Result<Self> {
        let loggers = LoggerFactory::new(config.clone());
        let logger = loggers.create_logger("APP").await;
        let measurement_logger = loggers.create_measurement_logger().await;

        let factory = Arc::new(ClientFactory::new(HttpSettings::from_config(&config)?)?);
        let api = ApiClient::new(factory.clone(), ApiEndpoints::from_config(&config));
        let runner = SpeedtestRunner::from_factory(&factory, config.measurement_settings()?)
            .with_logger(measurement_logger.clone());

        Ok(Self {
            cooldown: Arc::new(FixedCooldown(config.cooldown())),
            config,
            api,
            runner: Arc::new(runner),
            logger,
            measurement_logger,
        })
    }

    /// Replace the per-family runner
    pub fn with_runner(mut self, runner: Arc<dyn FamilyRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the inter-family cooldown
    pub fn with_cooldown(mut self, cooldown: Arc<dyn Cooldown>) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.logger.info("Starting dual-stack speed test").log().await;

        let restriction = self.config.family_restriction()?;
        let ipv4 = self.client_info(NetworkFamily::V4, restriction).await;
        let ipv6 = self.client_info(NetworkFamily::V6, restriction).await;
        if ipv4.is_none() && ipv6.is_none() {
            return Err(AppError::network(
                "cannot reach the API endpoint over either IPv4 or IPv6",
            ));
        }

        let device_id = api::device_id(self.config.device_id.as_deref());
        let registration = SpeedtestSession::registration(
            &device_id,
            &api_user_agent(),
            self.config.org_tag.as_deref(),
            self.config.free_tag.as_deref(),
            ipv4.as_ref(),
            ipv6.as_ref(),
        );
        let session = self.api.register_session(&registration).await?;
        self.logger
            .debug("Session registered")
            .field("uuid", &session.uuid)
            .field("prefer_ipv6", session.prefer_ipv6)
            .log()
            .await;

        let ipv4 = self.with_mss(NetworkFamily::V4, ipv4).await?;
        let ipv6 = self.with_mss(NetworkFamily::V6, ipv6).await?;
        self.api
            .register_access_type(&AccessTypeSession {
                speedtest_session_uuid: session.uuid.clone(),
                ipv4_mss: ipv4.as_ref().and_then(|i| i.mss),
                ipv6_mss: ipv6.as_ref().and_then(|i| i.mss),
                flets: None,
            })
            .await?;

        let list = self.api.servers().await?;
        let (ipv4_servers, ipv6_servers) = api::split_servers(&list.librespeed);
        let plans = [
            plan(NetworkFamily::V4, &ipv4, ipv4_servers),
            plan(NetworkFamily::V6, &ipv6, ipv6_servers),
        ];

        let orchestrator = DualStackOrchestrator::new(self.runner.clone(), self.cooldown.clone())
            .with_logger(self.measurement_logger.clone());
        let results = orchestrator.run(session.prefer_ipv6, &plans).await;

        let finished = match self
            .api
            .finish_session(&FinishSessionRequest {
                uuid: session.uuid.clone(),
                device_id,
                speed_ipv4_id: results.telemetry_id(NetworkFamily::V4),
                speed_ipv6_id: results.telemetry_id(NetworkFamily::V6),
            })
            .await
        {
            Ok(_) => true,
            Err(e) => {
                self.logger
                    .error("Failed to finish session")
                    .error_info(&e)
                    .log()
                    .await;
                false
            }
        };

        self.logger
            .info("Speed test complete")
            .field("uuid", &session.uuid)
            .log()
            .await;

        Ok(RunReport {
            created_at: session.created_at.unwrap_or_else(Utc::now),
            session_uuid: session.uuid,
            prefer_ipv6: session.prefer_ipv6,
            ipv4,
            ipv6,
            results,
            finished,
        })
    }

    /// Client info over `family`, or None when it is unreachable or excluded
    async fn client_info(
        &self,
        family: NetworkFamily,
        restriction: FamilyRestriction,
    ) -> Option<ClientInfo> {
        if let FamilyRestriction::Only(only) = restriction {
            if only != family {
                self.logger
                    .debug("Connectivity check skipped")
                    .family(family)
                    .log()
                    .await;
                return None;
            }
        }

        match self.api.client_info(family).await {
            Ok(info) => {
                self.logger
                    .info(&format!("{} connectivity available", family))
                    .field("ip", info.ip.to_string())
                    .log()
                    .await;
                Some(info)
            }
            Err(e) => {
                self.logger
                    .info(&format!("{} connectivity not available", family))
                    .log()
                    .await;
                self.logger
                    .debug("Client info request failed")
                    .family(family)
                    .error_info(&e)
                    .log()
                    .await;
                None
            }
        }
    }

    /// Attach the MSS reading to a reachable family
    async fn with_mss(
        &self,
        family: NetworkFamily,
        client: Option<ClientInfo>,
    ) -> Result<Option<FamilyInfo>> {
        let Some(client) = client else {
            return Ok(None);
        };
        let mss = self.api.mss(family).await?;
        self.logger
            .debug("MSS measured")
            .family(family)
            .field("mss", mss.mss)
            .field("estimated_mtu", mss.estimated_mtu)
            .log()
            .await;
        Ok(Some(FamilyInfo {
            client,
            mss: Some(mss.mss),
        }))
    }
}

fn plan(family: NetworkFamily, info: &Option<FamilyInfo>, servers: Vec<ServerDescriptor>) -> FamilyPlan {
    if info.is_some() {
        FamilyPlan::available(family, servers)
    } else {
        FamilyPlan::unavailable(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeasurementRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records which families ran and with how many candidates
    #[derive(Default)]
    struct RecordingRunner {
        runs: Mutex<Vec<(NetworkFamily, usize)>>,
        failing: Option<NetworkFamily>,
    }

    #[async_trait]
    impl FamilyRunner for RecordingRunner {
        async fn run_family(&self, family: NetworkFamily, servers: &[ServerDescriptor]) -> Result<MeasurementRecord> {
            self.runs.lock().unwrap().push((family, servers.len()));
            if self.failing == Some(family) {
                return Err(AppError::measurement("simulated"));
            }
            Ok(MeasurementRecord {
                timestamp: Utc::now(),
                family,
                server_name: servers[0].name.clone(),
                server_url: servers[0].server.clone(),
                ping: 10.0,
                jitter: 1.0,
                download: 100.0,
                upload: 50.0,
                bytes_received: 1,
                bytes_sent: 1,
                telemetry_id: Some(format!("{}-telemetry", family.type_name())),
            })
        }
    }

    struct NoCooldown;

    #[async_trait]
    impl Cooldown for NoCooldown {
        async fn wait(&self) {}
    }

    fn client_info(ip: &str, is_ipv4: bool) -> serde_json::Value {
        json!({"ip": ip, "port": 40000, "unixtime": 1700000000, "isIPv4": is_ipv4,
               "ipInfo": {"org": "Example Net"}})
    }

    fn servers() -> serde_json::Value {
        json!({"librespeed": [
            {"typeName": "ipv4", "name": "v4-a", "server": "http://192.0.2.1/"},
            {"typeName": "ipv6", "name": "v6-a", "server": "http://[2001:db8::1]/"},
            {"typeName": "ipv4", "name": "v4-b", "server": "http://192.0.2.2/"}
        ]})
    }

    async fn api_server(v4_reachable: bool, v6_reachable: bool, finish_ok: bool) -> MockServer {
        let server = MockServer::start().await;
        let reachable = |ok: bool, body: serde_json::Value| {
            if ok {
                ResponseTemplate::new(200).set_body_json(body)
            } else {
                ResponseTemplate::new(503)
            }
        };

        Mock::given(method("GET"))
            .and(path("/v4/clientinfo"))
            .respond_with(reachable(v4_reachable, client_info("192.0.2.50", true)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v6/clientinfo"))
            .respond_with(reachable(v6_reachable, client_info("2001:db8::50", false)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uuid": "sess-1", "CreatedAt": "2024-05-01T10:00:00Z", "preferIPv6": true,
                "deviceId": "dev", "userAgent": "", "ipv4Addr": "", "ipv6Addr": "", "finished": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v4/mss"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mss": 1460, "isIPv4": true})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v6/mss"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mss": 1440, "isIPv4": false})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/accesstype/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"speedTestSessionUUID": "sess-1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(servers()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/finish"))
            .respond_with(if finish_ok {
                ResponseTemplate::new(200).set_body_json(json!({"uuid": "sess-1", "finished": true}))
            } else {
                ResponseTemplate::new(500)
            })
            .mount(&server)
            .await;

        server
    }

    fn config(server: &MockServer) -> Config {
        Config {
            endpoint: server.uri(),
            ipv4_endpoint: format!("{}/v4", server.uri()),
            ipv6_endpoint: format!("{}/v6", server.uri()),
            device_id: Some("dev-test".to_string()),
            quiet: true,
            ..Default::default()
        }
    }

    async fn app(config: Config, runner: Arc<RecordingRunner>) -> App {
        App::new(config)
            .await
            .unwrap()
            .with_runner(runner)
            .with_cooldown(Arc::new(NoCooldown))
    }

    #[tokio::test]
    async fn test_full_flow_prefers_ipv6_from_session() {
        let server = api_server(true, true, true).await;
        let runner = Arc::new(RecordingRunner::default());
        let report = app(config(&server), runner.clone()).await.run().await.unwrap();

        assert_eq!(
            *runner.runs.lock().unwrap(),
            vec![(NetworkFamily::V6, 1), (NetworkFamily::V4, 2)]
        );
        assert_eq!(report.session_uuid, "sess-1");
        assert!(report.prefer_ipv6);
        assert_eq!(report.created_at.timestamp(), 1_714_557_600);
        assert_eq!(report.ipv4.as_ref().unwrap().mss, Some(1460));
        assert_eq!(report.ipv6.as_ref().unwrap().mss, Some(1440));
        assert!(report.finished);

        let requests = server.received_requests().await.unwrap();
        let finish = requests
            .iter()
            .find(|r| r.url.path() == "/session/finish")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&finish.body).unwrap();
        assert_eq!(body["speedIPv4Id"], "ipv4-telemetry");
        assert_eq!(body["speedIPv6Id"], "ipv6-telemetry");
        assert_eq!(body["deviceId"], "dev-test");
    }

    #[tokio::test]
    async fn test_unreachable_family_is_not_measured() {
        let server = api_server(true, false, true).await;
        let runner = Arc::new(RecordingRunner::default());
        let report = app(config(&server), runner.clone()).await.run().await.unwrap();

        assert_eq!(*runner.runs.lock().unwrap(), vec![(NetworkFamily::V4, 2)]);
        assert!(report.ipv6.is_none());
        assert!(report.results.ipv6.is_none());

        let requests = server.received_requests().await.unwrap();
        assert!(!requests.iter().any(|r| r.url.path() == "/v6/mss"));
        let registration = requests
            .iter()
            .find(|r| r.url.path() == "/session/new")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&registration.body).unwrap();
        assert_eq!(body["ipv6Addr"], "None");
    }

    #[tokio::test]
    async fn test_forced_family_skips_other_client_info() {
        let server = api_server(true, true, true).await;
        let runner = Arc::new(RecordingRunner::default());
        let config = Config {
            force_ipv4: true,
            ..config(&server)
        };
        let report = app(config, runner.clone()).await.run().await.unwrap();

        assert!(report.ipv6.is_none());
        let requests = server.received_requests().await.unwrap();
        assert!(!requests.iter().any(|r| r.url.path() == "/v6/clientinfo"));
    }

    #[tokio::test]
    async fn test_no_connectivity_aborts() {
        let server = api_server(false, false, true).await;
        let runner = Arc::new(RecordingRunner::default());
        let err = app(config(&server), runner.clone()).await.run().await.unwrap_err();

        assert!(matches!(err, AppError::Network(_)));
        assert!(runner.runs.lock().unwrap().is_empty());
        let requests = server.received_requests().await.unwrap();
        assert!(!requests.iter().any(|r| r.url.path() == "/session/new"));
    }

    #[tokio::test]
    async fn test_failed_family_and_failed_finish_are_not_fatal() {
        let server = api_server(true, true, false).await;
        let runner = Arc::new(RecordingRunner {
            failing: Some(NetworkFamily::V6),
            ..Default::default()
        });
        let report = app(config(&server), runner).await.run().await.unwrap();

        assert!(report.results.ipv6.is_none());
        assert!(report.results.ipv4.is_some());
        assert!(!report.finished);
    }
}
