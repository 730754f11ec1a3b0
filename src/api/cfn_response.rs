use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{InitError, IsRetryable};
use crate::types::CfnResponse;

/// Delivers a lifecycle response to the pre-signed URL of the request.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send(&self, url: &Url, response: &CfnResponse) -> Result<(), InitError>;
}

pub struct HttpResponseSender {
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
}

impl HttpResponseSender {
    pub fn new(cfg: &Config) -> Result<Self, InitError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cortex-dbinit/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.response_connect_timeout())
            .timeout(cfg.response_timeout())
            .build()?;
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3))
            .with_max_times(cfg.response_max_retries)
            .with_jitter();
        Ok(Self {
            client,
            retry_policy,
        })
    }

    async fn put_once(&self, url: &Url, body: &[u8]) -> Result<(), InitError> {
        // The pre-signed S3 URL is signed for an empty content type.
        let resp = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(""))
            .body(body.to_vec())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(InitError::ResponseStatus(status));
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseSender for HttpResponseSender {
    async fn send(&self, url: &Url, response: &CfnResponse) -> Result<(), InitError> {
        let body = serde_json::to_vec(response)?;
        (|| async { self.put_once(url, &body).await })
            .retry(self.retry_policy)
            .when(|e: &InitError| e.is_retryable())
            .notify(|err: &InitError, dur: Duration| {
                warn!("lifecycle response retrying after error {}, sleeping {:?}", err, dur);
            })
            .await?;
        info!(
            status = ?response.status,
            physical_resource_id = %response.physical_resource_id,
            "lifecycle response sent"
        );
        Ok(())
    }
}
