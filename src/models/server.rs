//! Candidate server descriptors

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Static connection facts for one candidate measurement server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// 1-based position in the server list it was loaded from
    pub id: u32,
    pub name: String,
    /// Base address; may be protocol-relative (`//host/`)
    pub server: String,
    pub download_path: String,
    pub upload_path: String,
    pub ping_path: String,
    pub get_ip_path: String,
}

impl ServerDescriptor {
    /// Parsed base address of the server
    pub fn base_url(&self) -> Result<Url> {
        let raw = self.server.trim();
        if raw.is_empty() {
            return Err(AppError::parse(format!("Server '{}' has no address", self.name)));
        }

        let absolute = if raw.starts_with("//") {
            format!("https:{}", raw)
        } else {
            raw.to_string()
        };

        let url = Url::parse(&absolute)?;
        if url.host_str().is_none() {
            return Err(AppError::parse(format!("Server address has no host: {}", raw)));
        }
        Ok(url)
    }

    /// Host name of the server, for log lines
    pub fn host(&self) -> String {
        self.base_url()
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.server.clone())
    }

    /// URL for a path below the base address
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        let joined = join_path(url.path(), path);
        url.set_path(&joined);
        Ok(url)
    }

    pub fn ping_url(&self) -> Result<Url> {
        self.endpoint_url(&self.ping_path)
    }

    /// Download URL asking for `chunks` chunks per request
    pub fn download_url(&self, chunks: u32) -> Result<Url> {
        let mut url = self.endpoint_url(&self.download_path)?;
        url.query_pairs_mut().append_pair("ckSize", &chunks.to_string());
        Ok(url)
    }

    pub fn upload_url(&self) -> Result<Url> {
        self.endpoint_url(&self.upload_path)
    }

    pub fn get_ip_url(&self) -> Result<Url> {
        self.endpoint_url(&self.get_ip_path)
    }

    pub fn telemetry_url(&self) -> Result<Url> {
        self.endpoint_url(crate::defaults::TELEMETRY_PATH)
    }
}

/// Join two URL path fragments with exactly one separator
pub(crate) fn join_path(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    match (base.is_empty(), rel.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => base.to_string(),
        (true, false) => format!("/{}", rel),
        (false, false) => format!("{}/{}", base, rel),
    }
}
