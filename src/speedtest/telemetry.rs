//! Result submission to a server's telemetry endpoint

use crate::{
    client::telemetry_user_agent,
    error::{AppError, Result},
    models::ServerDescriptor,
};
use async_trait::async_trait;
use reqwest::{header::USER_AGENT, multipart::Form, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Structured metadata sent in the `extra` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryExtra {
    pub server: String,
}

/// Numeric results of one session plus its activity log
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReport {
    pub download: f64,
    pub upload: f64,
    pub ping: f64,
    pub jitter: f64,
    pub log: String,
    pub extra: TelemetryExtra,
}

impl TelemetryReport {
    /// Multipart fields in submission order
    pub fn fields(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("ispinfo", String::new()),
            ("dl", format!("{:.2}", self.download)),
            ("ul", format!("{:.2}", self.upload)),
            ("ping", format!("{:.2}", self.ping)),
            ("jitter", format!("{:.2}", self.jitter)),
            ("log", self.log.clone()),
            ("extra", serde_json::to_string(&self.extra)?),
        ])
    }
}

/// Destination for session results
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Submit `report` for `server` and return the report identifier
    async fn submit(&self, server: &ServerDescriptor, report: &TelemetryReport) -> Result<String>;
}

/// Posts reports as multipart forms to `<server>/results/telemetry.php`.
///
/// The measurement client carries no whole-request timeout, so each
/// submission is bounded by its own.
pub struct TelemetryReporter {
    client: Client,
    timeout: Duration,
}

impl TelemetryReporter {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl TelemetrySink for TelemetryReporter {
    async fn submit(&self, server: &ServerDescriptor, report: &TelemetryReport) -> Result<String> {
        let url = server.telemetry_url()?;
        let form = report
            .fields()?
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let body = self
            .client
            .post(url)
            .header(USER_AGENT, telemetry_user_agent())
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_report_id(&body)
    }
}

/// Extract the identifier from a `<status> <id>` response body
pub fn parse_report_id(body: &str) -> Result<String> {
    let tokens: Vec<&str> = body.trim_end().split(' ').collect();
    match tokens.as_slice() {
        [_, id] if !id.is_empty() => Ok((*id).to_string()),
        _ => Err(AppError::protocol(format!("invalid telemetry response: {:?}", body))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockSpeedServer;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn report() -> TelemetryReport {
        TelemetryReport {
            download: 123.456,
            upload: 45.6,
            ping: 20.0,
            jitter: 1.234,
            log: "10:00:00.000 download stream 0 started".to_string(),
            extra: TelemetryExtra {
                server: "Tokyo".to_string(),
            },
        }
    }

    #[test]
    fn test_parse_report_id() {
        assert_eq!(parse_report_id("OK abc123").unwrap(), "abc123");
        assert_eq!(parse_report_id("id 42\n").unwrap(), "42");
        assert!(matches!(parse_report_id("malformed"), Err(AppError::Protocol(_))));
        assert!(parse_report_id("OK a b").is_err());
        assert!(parse_report_id("OK ").is_err());
        assert!(parse_report_id("").is_err());
    }

    #[test]
    fn test_report_fields() {
        let fields = report().fields().unwrap();
        let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["ispinfo", "dl", "ul", "ping", "jitter", "log", "extra"]);
        assert_eq!(fields[0].1, "");
        assert_eq!(fields[1].1, "123.46");
        assert_eq!(fields[2].1, "45.60");
        assert_eq!(fields[3].1, "20.00");
        assert_eq!(fields[4].1, "1.23");
        assert_eq!(fields[6].1, r#"{"server":"Tokyo"}"#);
    }

    #[tokio::test]
    async fn test_submit_returns_identifier() {
        let mock = MockSpeedServer::start().await;
        Mock::given(method("POST"))
            .and(path("/results/telemetry.php"))
            .and(header("user-agent", telemetry_user_agent().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK abc123"))
            .expect(1)
            .mount(mock.inner())
            .await;

        let reporter = TelemetryReporter::new(Client::new(), Duration::from_secs(5));
        let id = reporter.submit(&mock.descriptor(1, "Tokyo"), &report()).await.unwrap();
        assert_eq!(id, "abc123");

        let received = mock.inner().received_requests().await.unwrap();
        let content_type = received[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&received[0].body);
        assert!(body.contains("name=\"dl\""));
        assert!(body.contains("123.46"));
        assert!(body.contains("name=\"ispinfo\""));
    }

    #[tokio::test]
    async fn test_malformed_response_is_protocol_error() {
        let mock = MockSpeedServer::start().await;
        mock.mount_telemetry("malformed").await;

        let reporter = TelemetryReporter::new(Client::new(), Duration::from_secs(5));
        let err = reporter.submit(&mock.descriptor(1, "Tokyo"), &report()).await.unwrap_err();
        assert!(matches!(err, AppError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        let mock = MockSpeedServer::start().await;
        Mock::given(method("POST"))
            .and(path("/results/telemetry.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("OK late")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(mock.inner())
            .await;

        let reporter = TelemetryReporter::new(Client::new(), Duration::from_millis(200));
        let start = std::time::Instant::now();
        let err = reporter.submit(&mock.descriptor(1, "Tokyo"), &report()).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout(_)), "unexpected error: {:?}", err);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_http_error_aborts_submission() {
        let mock = MockSpeedServer::start().await;
        mock.mount_status("POST", "/results/telemetry.php", 500).await;

        let reporter = TelemetryReporter::new(Client::new(), Duration::from_secs(5));
        assert!(reporter.submit(&mock.descriptor(1, "Tokyo"), &report()).await.is_err());
    }
}
