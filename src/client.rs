//! HTTP client construction
//!
//! Every client is built from an explicit [`HttpSettings`] value; TLS trust
//! overrides and source binding are applied per client and no process-wide
//! default is touched.

use crate::{
    dns::FamilyResolver,
    error::{AppError, Result},
    models::Config,
    types::{NetworkFamily, SourceBinding},
};
use reqwest::{Certificate, Client, ClientBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// User agent sent to the registration API
pub fn api_user_agent() -> String {
    format!("{}_{}_{}", crate::PKG_NAME, crate::VERSION, std::env::consts::ARCH)
}

/// User agent sent with telemetry reports
pub fn telemetry_user_agent() -> String {
    format!("{}_{}", crate::PKG_NAME, std::env::consts::ARCH)
}

/// Transport settings shared by every client of a run
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// Whole-request bound for API calls
    pub api_timeout: Duration,
    /// TCP connect bound for every client
    pub connect_timeout: Duration,
    /// Per-request bound for liveness checks and HTTP pings
    pub probe_timeout: Duration,
    pub accept_invalid_certs: bool,
    /// Extra PEM root certificate
    pub ca_cert: Option<PathBuf>,
    pub source: Option<SourceBinding>,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_timeout: crate::defaults::DEFAULT_API_TIMEOUT,
            connect_timeout: crate::defaults::DEFAULT_CONNECT_TIMEOUT,
            probe_timeout: crate::defaults::DEFAULT_API_TIMEOUT,
            accept_invalid_certs: false,
            ca_cert: None,
            source: None,
            user_agent: api_user_agent(),
        }
    }
}

impl HttpSettings {
    /// Derive the transport settings from the application config
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            api_timeout: config.timeout(),
            probe_timeout: config.timeout(),
            accept_invalid_certs: config.ignore_tls_errors,
            ca_cert: config.ca_cert.as_ref().map(PathBuf::from),
            source: config.source_binding()?,
            ..Default::default()
        })
    }
}

/// Builds reqwest clients for API calls and per-family measurements
pub struct ClientFactory {
    settings: HttpSettings,
    root_cert: Option<Certificate>,
}

impl ClientFactory {
    /// Create a factory, loading the CA certificate once if configured
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let root_cert = match &settings.ca_cert {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    AppError::config(format!("Failed to read CA certificate {}: {}", path.display(), e))
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    AppError::config(format!("Invalid CA certificate {}: {}", path.display(), e))
                })?;
                Some(cert)
            }
            None => None,
        };

        Ok(Self { settings, root_cert })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    /// Client for registration API calls; pinned to `family` when given
    pub fn api_client(&self, family: Option<NetworkFamily>) -> Result<Client> {
        let builder = self
            .base_builder(family)?
            .timeout(self.settings.api_timeout);
        build(builder)
    }

    /// Client for one family's measurements. No whole-request timeout is
    /// set because throughput phases stream for the configured duration.
    pub fn measurement_client(&self, family: NetworkFamily) -> Result<Client> {
        build(self.base_builder(Some(family))?)
    }

    fn base_builder(&self, family: Option<NetworkFamily>) -> Result<ClientBuilder> {
        let mut builder = Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .user_agent(self.settings.user_agent.clone())
            .danger_accept_invalid_certs(self.settings.accept_invalid_certs);

        if let Some(cert) = &self.root_cert {
            builder = builder.add_root_certificate(cert.clone());
        }

        if let Some(family) = family {
            builder = builder.dns_resolver(Arc::new(FamilyResolver::new(family)));
        }

        if let Some(source) = &self.settings.source {
            builder = bind_source(builder, source, family)?;
        }

        Ok(builder)
    }
}

fn bind_source(
    builder: ClientBuilder,
    source: &SourceBinding,
    family: Option<NetworkFamily>,
) -> Result<ClientBuilder> {
    match source {
        SourceBinding::Address(addr) => {
            if let Some(family) = family {
                if !family.matches(addr) {
                    return Err(AppError::config(format!(
                        "Source address {} cannot be used for {}",
                        addr,
                        family.name()
                    )));
                }
            }
            Ok(builder.local_address(*addr))
        }
        SourceBinding::Interface(name) => bind_interface(builder, name),
    }
}

#[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
fn bind_interface(builder: ClientBuilder, name: &str) -> Result<ClientBuilder> {
    Ok(builder.interface(name))
}

#[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
fn bind_interface(_builder: ClientBuilder, name: &str) -> Result<ClientBuilder> {
    Err(AppError::config(format!(
        "Cannot bind to interface {} on this platform",
        name
    )))
}

fn build(builder: ClientBuilder) -> Result<Client> {
    builder
        .build()
        .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agents() {
        assert!(api_user_agent().starts_with("dualstack-speedtest_"));
        assert!(api_user_agent().ends_with(std::env::consts::ARCH));
        assert_eq!(
            telemetry_user_agent(),
            format!("dualstack-speedtest_{}", std::env::consts::ARCH)
        );
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            ignore_tls_errors: true,
            timeout_seconds: 9,
            interface: Some("eth0".to_string()),
            ..Default::default()
        };
        let settings = HttpSettings::from_config(&config).unwrap();
        assert!(settings.accept_invalid_certs);
        assert_eq!(settings.api_timeout, Duration::from_secs(9));
        assert_eq!(settings.source, Some(SourceBinding::Interface("eth0".to_string())));
    }

    #[tokio::test]
    async fn test_factory_builds_clients() {
        let factory = ClientFactory::new(HttpSettings::default()).unwrap();
        assert!(factory.api_client(None).is_ok());
        assert!(factory.api_client(Some(NetworkFamily::V4)).is_ok());
        assert!(factory.measurement_client(NetworkFamily::V6).is_ok());
    }

    #[tokio::test]
    async fn test_source_address_of_other_family_rejected() {
        let settings = HttpSettings {
            source: Some(SourceBinding::Address("127.0.0.1".parse().unwrap())),
            ..Default::default()
        };
        let factory = ClientFactory::new(settings).unwrap();
        assert!(factory.measurement_client(NetworkFamily::V4).is_ok());
        let err = factory.measurement_client(NetworkFamily::V6).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_ca_file() {
        let settings = HttpSettings {
            ca_cert: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        };
        assert!(matches!(ClientFactory::new(settings), Err(AppError::Config(_))));
    }
}
