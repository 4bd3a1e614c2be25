//! Subscription service

use std::sync::Arc;

use crate::data::{
    Database, OwnerSummary, Relation, Subscription, SubscriptionRelation, Toggled, toggle,
};
use crate::error::AppError;
use crate::metrics::TOGGLES_TOTAL;

/// Subscription service
pub struct SubscriptionService {
    db: Arc<Database>,
}

impl SubscriptionService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Subscribe to a channel, or unsubscribe if already subscribed
    ///
    /// # Errors
    /// - `Validation` when subscribing to yourself
    /// - `NotFound` if the channel does not exist
    pub async fn toggle(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<Toggled<Subscription>, AppError> {
        if subscriber_id == channel_id {
            return Err(AppError::validation(
                "You cannot subscribe to your own channel",
            ));
        }

        if self.db.get_user(channel_id).await?.is_none() {
            return Err(AppError::not_found("channel not found"));
        }

        let toggled = toggle(
            &self.db,
            &SubscriptionRelation {
                subscriber_id,
                channel_id,
            },
        )
        .await?;

        TOGGLES_TOTAL
            .with_label_values(&[SubscriptionRelation::NAME, toggled.outcome()])
            .inc();
        tracing::info!(
            subscriber_id = %subscriber_id,
            channel_id = %channel_id,
            outcome = toggled.outcome(),
            "Subscription toggled"
        );

        Ok(toggled)
    }

    /// Everyone subscribed to a channel; may be empty
    pub async fn subscribers(&self, channel_id: &str) -> Result<Vec<OwnerSummary>, AppError> {
        self.db.get_channel_subscribers(channel_id).await
    }

    /// Channels a user subscribes to; 404 when there are none
    pub async fn subscribed_channels(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<OwnerSummary>, AppError> {
        let channels = self.db.get_subscribed_channels(subscriber_id).await?;
        if channels.is_empty() {
            return Err(AppError::not_found("No channels found"));
        }
        Ok(channels)
    }
}
