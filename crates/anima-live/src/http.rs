//! HTTP polling fallback for the live feed

use std::time::Duration;

use anima_core::{AnimaError, AnimaResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;

use crate::{FeedConfig, FeedPoller, LiveContext};

/// Polls a JSON endpoint returning one [`LiveContext`] per request
#[derive(Debug, Clone)]
pub struct HttpPoller {
    client: Client,
    url: String,
}

impl HttpPoller {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AnimaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnimaError::PollFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Poller for `cfg.poll_url`, if one is configured
    pub fn from_config(cfg: &FeedConfig) -> AnimaResult<Option<Self>> {
        match &cfg.poll_url {
            Some(url) if cfg.poll => Self::new(url.clone(), cfg.poll_timeout()).map(Some),
            _ => Ok(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedPoller for HttpPoller {
    async fn poll(&self) -> AnimaResult<LiveContext> {
        trace!(url = %self.url, "polling live context");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AnimaError::PollFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AnimaError::PollFailed(e.to_string()))?;

        response
            .json::<LiveContext>()
            .await
            .map_err(|e| AnimaError::PollFailed(format!("bad live context body: {e}")))
    }
}
