use anyhow::Context;
use log::debug;
use reqwest::{header::CONTENT_TYPE, Client};
use tokio::runtime::Runtime;

use super::{Attachment, SnapshotSource, SNAPSHOT_FILENAME};
use crate::Seconds;

/// Content type assumed when the webcam does not report an image type
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Fetches webcam stills over HTTP
pub struct HttpSnapshot {
    timeout: Seconds,
}

impl HttpSnapshot {
    /// The runtime and client are only built once a snapshot is actually requested
    pub fn new(timeout: Seconds) -> Self {
        Self { timeout }
    }

    async fn do_fetch(client: Client, url: &str) -> anyhow::Result<Attachment> {
        let response = client
            .get(url)
            .send()
            .await
            .context("Request failed")?
            .error_for_status()
            .context("Webcam returned an error status")?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = response
            .bytes()
            .await
            .context("Failed to read snapshot body")?
            .to_vec();
        debug!("Fetched {} byte snapshot ({content_type})", data.len());

        Ok(Attachment {
            filename: SNAPSHOT_FILENAME.to_string(),
            content_type,
            data,
        })
    }
}

impl SnapshotSource for HttpSnapshot {
    fn fetch(&self, url: &str) -> anyhow::Result<Attachment> {
        let rt = Runtime::new().context("Failed to create async runtime")?;
        let client = Client::builder()
            .timeout(self.timeout.into())
            .build()
            .context("Failed to build HTTP client")?;
        rt.block_on(Self::do_fetch(client, url))
            .with_context(|| format!("Failed to fetch snapshot from {url:?}"))
    }
}
