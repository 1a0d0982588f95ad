//! Mock librespeed-style server for tests

use crate::models::ServerDescriptor;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Mock measurement server exposing ping, download, upload and telemetry
pub struct MockSpeedServer {
    server: MockServer,
}

impl MockSpeedServer {
    /// Start an empty mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start a mock server with every endpoint a session needs
    pub async fn librespeed(telemetry_body: &str) -> Self {
        let mock = Self::start().await;
        mock.mount_ping(None).await;
        mock.mount_download(64 * 1024).await;
        mock.mount_upload().await;
        mock.mount_telemetry(telemetry_body).await;
        mock
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Descriptor pointing at this server
    pub fn descriptor(&self, id: u32, name: &str) -> ServerDescriptor {
        ServerDescriptor {
            id,
            name: name.to_string(),
            server: format!("{}/", self.uri()),
            download_path: "garbage.php".to_string(),
            upload_path: "empty.php".to_string(),
            ping_path: "empty.php".to_string(),
            get_ip_path: "getIP.php".to_string(),
        }
    }

    /// Empty 200 on the ping path, optionally delayed
    pub async fn mount_ping(&self, delay: Option<Duration>) {
        let mut template = ResponseTemplate::new(200);
        if let Some(delay) = delay {
            template = template.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path("/empty.php"))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Non-empty body on the ping path, which marks the server as down
    pub async fn mount_ping_with_body(&self, body: &str) {
        Mock::given(method("GET"))
            .and(path("/empty.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_download(&self, body_bytes: usize) {
        Mock::given(method("GET"))
            .and(path("/garbage.php"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; body_bytes]))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_upload(&self) {
        Mock::given(method("POST"))
            .and(path("/empty.php"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_telemetry(&self, body: &str) {
        Mock::given(method("POST"))
            .and(path(crate::defaults::TELEMETRY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Respond with a bare `status` on one path
    pub async fn mount_status(&self, http_method: &str, request_path: &str, status: u16) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}
