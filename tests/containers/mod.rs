//! Docker-backed rqlite nodes for tests that need a real server.

use std::time::Duration;

use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, GenericImage, ImageExt};

const RQLITE_IMAGE: &str = "rqlite/rqlite";
const RQLITE_TAG: &str = "8.36.3";
const HTTP_PORT: u16 = 4001;

/// A single-node rqlite cluster running in Docker.
pub struct RqliteContainer {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    /// The host port mapped to the container's HTTP API port.
    pub host_port: u16,
}

impl RqliteContainer {
    pub async fn start() -> anyhow::Result<Self> {
        let image = GenericImage::new(RQLITE_IMAGE, RQLITE_TAG)
            .with_exposed_port(HTTP_PORT.tcp())
            .with_startup_timeout(Duration::from_secs(60));

        let container = image.start().await?;
        let host_port = container.get_host_port_ipv4(HTTP_PORT).await?;
        let node = Self { container, host_port };

        node.wait_for_ready().await?;
        Ok(node)
    }

    /// Polls `/readyz` until the node accepts statements.
    async fn wait_for_ready(&self) -> anyhow::Result<()> {
        let client = reqwest::Client::new();
        let url = format!("http://127.0.0.1:{}/readyz", self.host_port);

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(30);

        while start.elapsed() < timeout {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(_) | Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        anyhow::bail!("rqlite did not become ready within timeout on port {}", self.host_port);
    }

    /// Connection string for this node with extra query parameters.
    pub fn dsn(&self, params: &str) -> String {
        format!("127.0.0.1:{}{}", self.host_port, params)
    }
}
