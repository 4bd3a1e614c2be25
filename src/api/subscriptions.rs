//! Subscription endpoints

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;

use super::response::ApiResponse;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{EntityId, OwnerSummary, Subscription, Toggled};
use crate::error::AppError;
use crate::service::SubscriptionService;

pub fn subscriptions_router() -> Router<AppState> {
    Router::new()
        .route(
            "/c/:channelId",
            get(channel_subscribers).post(toggle_subscription),
        )
        .route("/u/:subscriberId", get(subscribed_channels))
}

fn build_subscription_service(state: &AppState) -> SubscriptionService {
    SubscriptionService::new(state.db.clone())
}

/// Created subscription, or `{}` once it is gone
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ToggleResponse {
    Subscribed(Subscription),
    Unsubscribed {},
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribersResponse {
    subscribers: Vec<OwnerSummary>,
    subscribers_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelsResponse {
    channels: Vec<OwnerSummary>,
    channels_count: usize,
}

/// POST /subscriptions/c/:channelId
async fn toggle_subscription(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<ToggleResponse>, AppError> {
    let channel_id = EntityId::parse(&channel_id, "channel")?;
    let toggled = build_subscription_service(&state)
        .toggle(&user.id, &channel_id.0)
        .await?;

    Ok(match toggled {
        Toggled::Added(subscription) => ApiResponse::created(
            ToggleResponse::Subscribed(subscription),
            "Channel Subscribed",
        ),
        Toggled::Removed(_) => ApiResponse::ok(ToggleResponse::Unsubscribed {}, "Channel Unsubscribed"),
    })
}

/// GET /subscriptions/c/:channelId
async fn channel_subscribers(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<SubscribersResponse>, AppError> {
    let channel_id = EntityId::parse(&channel_id, "channel")?;
    let subscribers = build_subscription_service(&state)
        .subscribers(&channel_id.0)
        .await?;

    Ok(ApiResponse::ok(
        SubscribersResponse {
            subscribers_count: subscribers.len(),
            subscribers,
        },
        "Subscribers fetched successfully",
    ))
}

/// GET /subscriptions/u/:subscriberId
async fn subscribed_channels(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(subscriber_id): Path<String>,
) -> Result<ApiResponse<ChannelsResponse>, AppError> {
    let subscriber_id = EntityId::parse(&subscriber_id, "subscriber")?;
    let channels = build_subscription_service(&state)
        .subscribed_channels(&subscriber_id.0)
        .await?;

    Ok(ApiResponse::ok(
        ChannelsResponse {
            channels_count: channels.len(),
            channels,
        },
        "Subscribed channels fetched successfully",
    ))
}
