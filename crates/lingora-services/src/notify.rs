//! Profile change events
//!
//! Pushes the full updated profile view to a configured webhook endpoint.
//! Delivery is fire-and-forget: callers never await it, a slow or broken
//! endpoint cannot slow down a profile write, and failures are logged at
//! warn level without retry.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use lingora_core::models::ProfileView;

/// Per-request delivery timeout.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ChangeNotifier {
    http_client: Client,
    webhook_url: Option<String>,
}

impl ChangeNotifier {
    /// Builds a notifier. When `webhook_url` is `None` the notifier is
    /// disabled and every event is silently dropped.
    pub fn new(webhook_url: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()
            .context("Failed to create HTTP client for profile change events")?;

        Ok(Self {
            http_client,
            webhook_url,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Sends a profile-changed event carrying the full updated view. Spawns
    /// the delivery and returns immediately.
    pub fn notify_profile_changed(&self, view: &ProfileView) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let payload = match serde_json::to_value(view) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    owner_id = %view.owner_id,
                    "Failed to serialize profile change event"
                );
                return;
            }
        };

        let client = self.http_client.clone();
        let owner_id = view.owner_id.clone();
        tokio::spawn(async move {
            match client
                .post(&url)
                .header("User-Agent", "Lingora-Webhook/1.0")
                .json(&payload)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(
                        owner_id = %owner_id,
                        status = response.status().as_u16(),
                        "Profile change event delivered"
                    );
                }
                Ok(response) => {
                    tracing::warn!(
                        owner_id = %owner_id,
                        status = response.status().as_u16(),
                        "Profile change endpoint answered non-2xx"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        owner_id = %owner_id,
                        "Failed to deliver profile change event"
                    );
                }
            }
        });
    }
}
