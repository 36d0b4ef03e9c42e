use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::{MessageNotification, Notifier};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs each notification as JSON to the notification service, which owns
/// in-app storage and push delivery.
pub struct HttpNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: String) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building notification http client")?;

        Ok(HttpNotifier { http_client, url })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, notification: &MessageNotification) -> anyhow::Result<()> {
        self.http_client
            .post(&self.url)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
