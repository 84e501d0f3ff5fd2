//! HTTP snapshot source
//!
//! Fetches full state for a feed's scope from the server's REST surface.
//! Used by the feed to heal event gaps after a resync notice: a staff feed
//! refetches every active order, a customer feed refetches its one order.

use async_trait::async_trait;

use shared::error::ApiResponse;
use shared::message::SubscriptionScope;
use shared::models::Order;

use crate::error::FeedError;
use crate::feed::SnapshotSource;

#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSnapshotSource {
    /// `base_url` without a trailing slash, e.g. "http://127.0.0.1:8080"
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_active(&self, scope: SubscriptionScope) -> Result<Vec<Order>, FeedError> {
        match scope {
            SubscriptionScope::Staff => {
                let url = format!("{}/api/orders/active", self.base_url);
                let response = self.client.get(&url).send().await?;
                let envelope: ApiResponse<Vec<Order>> = response.json().await?;
                match envelope.data {
                    Some(orders) => Ok(orders),
                    None => Err(FeedError::Snapshot(format!(
                        "Snapshot request failed: {}",
                        envelope.message
                    ))),
                }
            }
            SubscriptionScope::Customer { order_id } => {
                let url = format!("{}/api/orders/{}", self.base_url, order_id);
                let response = self.client.get(&url).send().await?;
                let envelope: ApiResponse<Order> = response.json().await?;
                match envelope.data {
                    Some(order) => Ok(vec![order]),
                    None => Err(FeedError::Snapshot(format!(
                        "Snapshot request failed: {}",
                        envelope.message
                    ))),
                }
            }
        }
    }
}
