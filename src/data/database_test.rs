//! Database tests

use super::*;
use crate::error::AppError;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

async fn create_user(db: &Database, user_name: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: EntityId::new().0,
        user_name: user_name.to_string(),
        email: format!("{}@example.com", user_name),
        full_name: format!("{} Example", user_name),
        password_hash: "hash".to_string(),
        avatar_url: format!("https://media.example.com/avatars/{}.png", user_name),
        avatar_key: format!("avatars/{}.png", user_name),
        cover_image_url: None,
        cover_image_key: None,
        refresh_token: None,
        created_at: now,
        updated_at: now,
    };
    db.insert_user(&user).await.unwrap();
    user
}

async fn create_video(db: &Database, owner: &User, title: &str, published: bool) -> Video {
    let now = Utc::now();
    let id = EntityId::new().0;
    let video = Video {
        id: id.clone(),
        owner_id: owner.id.clone(),
        title: title.to_string(),
        description: format!("about {}", title),
        video_url: format!("https://media.example.com/videos/{}.mp4", id),
        video_key: format!("videos/{}.mp4", id),
        thumbnail_url: format!("https://media.example.com/thumbnails/{}.png", id),
        thumbnail_key: format!("thumbnails/{}.png", id),
        duration: 12.5,
        views: 0,
        is_published: published,
        created_at: now,
        updated_at: now,
    };
    db.insert_video(&video).await.unwrap();
    video
}

async fn create_comment(db: &Database, owner: &User, video: &Video, content: &str) -> Comment {
    let now = Utc::now();
    let comment = Comment {
        id: EntityId::new().0,
        owner_id: owner.id.clone(),
        video_id: video.id.clone(),
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    };
    db.insert_comment(&comment).await.unwrap();
    comment
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_user_insert_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    let by_id = db.get_user(&alice.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, "alice@example.com");

    let by_name = db.get_user_by_user_name("ALICE").await.unwrap();
    assert!(by_name.is_some());

    let by_email = db
        .find_user_by_login(None, Some("alice@example.com"))
        .await
        .unwrap();
    assert_eq!(by_email.unwrap().id, alice.id);

    let missing = db.find_user_by_login(Some("bob"), None).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_duplicate_user_is_conflict() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    let mut duplicate = alice.clone();
    duplicate.id = EntityId::new().0;
    duplicate.user_name = "alice2".to_string();

    let error = db.insert_user(&duplicate).await.unwrap_err();
    assert!(matches!(error, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_refresh_token_rotation_is_single_use() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    db.set_refresh_token(&alice.id, Some("first")).await.unwrap();

    assert!(db.rotate_refresh_token(&alice.id, "first", "second").await.unwrap());
    assert!(!db.rotate_refresh_token(&alice.id, "first", "third").await.unwrap());

    let stored = db.get_user(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("second"));

    db.set_refresh_token(&alice.id, None).await.unwrap();
    let stored = db.get_user(&alice.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_like_toggle_adds_then_removes() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let video = create_video(&db, &alice, "first", true).await;
    let target = LikeTarget::Video(video.id.clone());
    let relation = LikeRelation {
        liked_by: &alice.id,
        target: &target,
    };

    let first = toggle(&db, &relation).await.unwrap();
    assert!(first.is_added());
    assert_eq!(db.count_likes(&alice.id, &target).await.unwrap(), 1);

    let second = toggle(&db, &relation).await.unwrap();
    assert!(!second.is_added());
    assert_eq!(second.into_inner().target, target);
    assert_eq!(db.count_likes(&alice.id, &target).await.unwrap(), 0);
}

#[tokio::test]
async fn test_like_targets_of_different_kinds_are_independent() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let video = create_video(&db, &alice, "first", true).await;

    // Same raw ID, different kind
    let as_video = LikeTarget::Video(video.id.clone());
    let as_comment = LikeTarget::Comment(video.id.clone());

    toggle(&db, &LikeRelation { liked_by: &alice.id, target: &as_video })
        .await
        .unwrap();
    toggle(&db, &LikeRelation { liked_by: &alice.id, target: &as_comment })
        .await
        .unwrap();

    assert_eq!(db.count_likes(&alice.id, &as_video).await.unwrap(), 1);
    assert_eq!(db.count_likes(&alice.id, &as_comment).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_like_toggles_never_duplicate() {
    let (db, _temp_dir) = create_test_db().await;
    let db = Arc::new(db);
    let alice = create_user(&db, "alice").await;
    let video = create_video(&db, &alice, "racy", true).await;
    let target = LikeTarget::Video(video.id.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = Arc::clone(&db);
        let liked_by = alice.id.clone();
        let target = target.clone();
        handles.push(tokio::spawn(async move {
            toggle(
                &db,
                &LikeRelation {
                    liked_by: &liked_by,
                    target: &target,
                },
            )
            .await
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected toggle error: {other:?}"),
        }
    }

    assert!(db.count_likes(&alice.id, &target).await.unwrap() <= 1);
}

#[tokio::test]
async fn test_subscription_toggle_and_lists() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let relation = SubscriptionRelation {
        subscriber_id: &alice.id,
        channel_id: &bob.id,
    };

    assert!(toggle(&db, &relation).await.unwrap().is_added());
    assert_eq!(db.count_subscriptions(&alice.id, &bob.id).await.unwrap(), 1);

    let subscribers = db.get_channel_subscribers(&bob.id).await.unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0].user_name, "alice");

    let channels = db.get_subscribed_channels(&alice.id).await.unwrap();
    assert_eq!(channels[0].id, bob.id);

    assert!(!toggle(&db, &relation).await.unwrap().is_added());
    assert!(db.get_channel_subscribers(&bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_video_listing_visibility_and_search() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    create_video(&db, &alice, "Rust intro", true).await;
    create_video(&db, &alice, "Rust draft", false).await;
    create_video(&db, &bob, "Cooking 100%", true).await;

    let anonymous = VideoListQuery::default().execute(&db).await.unwrap();
    assert_eq!(anonymous.total, 2);
    assert!(anonymous.items.iter().all(|v| v.is_published));

    let as_alice = VideoListQuery {
        viewer_id: Some(alice.id.clone()),
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();
    assert_eq!(as_alice.total, 3);

    let as_bob_on_alice = VideoListQuery {
        viewer_id: Some(bob.id.clone()),
        owner_id: Some(alice.id.clone()),
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();
    assert_eq!(as_bob_on_alice.total, 1);

    let search = VideoListQuery {
        search: Some("rust".to_string()),
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.items[0].title, "Rust intro");

    let literal_percent = VideoListQuery {
        search: Some("0%".to_string()),
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();
    assert_eq!(literal_percent.total, 1);
    assert_eq!(literal_percent.items[0].title, "Cooking 100%");
}

#[tokio::test]
async fn test_video_listing_sort_and_pagination() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    for title in ["c", "a", "e", "b", "d"] {
        create_video(&db, &alice, title, true).await;
    }

    let first_page = VideoListQuery {
        page: PageRequest { page: 1, limit: 2 },
        sort_by: VideoSortField::Title,
        sort_direction: SortDirection::Asc,
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();

    let titles: Vec<_> = first_page.items.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b"]);
    assert_eq!(first_page.total, 5);
    assert_eq!(first_page.total_pages(), 3);

    let last_page = VideoListQuery {
        page: PageRequest { page: 3, limit: 2 },
        sort_by: VideoSortField::Title,
        sort_direction: SortDirection::Asc,
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();
    assert_eq!(last_page.items.len(), 1);
    assert_eq!(last_page.items[0].title, "e");

    let past_end = VideoListQuery {
        page: PageRequest { page: 9, limit: 2 },
        ..Default::default()
    }
    .execute(&db)
    .await
    .unwrap();
    assert!(past_end.is_empty());
    assert_eq!(past_end.total, 5);
}

#[tokio::test]
async fn test_toggle_publish_flips_state() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let video = create_video(&db, &alice, "flip", true).await;

    let flipped = db.toggle_video_published(&video.id).await.unwrap().unwrap();
    assert!(!flipped.is_published);
    let flipped = db.toggle_video_published(&video.id).await.unwrap().unwrap();
    assert!(flipped.is_published);

    assert!(db.toggle_video_published("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_comment_page_is_oldest_first_and_paged_after_join() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let video = create_video(&db, &alice, "talk", true).await;

    let base = Utc::now();
    for (offset, (owner, content)) in [(&bob, "first"), (&alice, "second"), (&bob, "third")]
        .into_iter()
        .enumerate()
    {
        let created_at = base + Duration::seconds(offset as i64);
        db.insert_comment(&Comment {
            id: EntityId::new().0,
            owner_id: owner.id.clone(),
            video_id: video.id.clone(),
            content: content.to_string(),
            created_at,
            updated_at: created_at,
        })
        .await
        .unwrap();
    }

    let page = CommentPageQuery {
        video_id: video.id.clone(),
        page: PageRequest { page: 1, limit: 2 },
    }
    .execute(&db)
    .await
    .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages(), 2);
    let contents: Vec<_> = page.items.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert_eq!(page.items[0].owner.user_name, "bob");

    let second = CommentPageQuery {
        video_id: video.id.clone(),
        page: PageRequest { page: 2, limit: 2 },
    }
    .execute(&db)
    .await
    .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].content, "third");
}

#[tokio::test]
async fn test_delete_video_cascades_dependents() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let video = create_video(&db, &alice, "doomed", true).await;
    let comment = create_comment(&db, &bob, &video, "nice").await;

    let video_target = LikeTarget::Video(video.id.clone());
    let comment_target = LikeTarget::Comment(comment.id.clone());
    toggle(&db, &LikeRelation { liked_by: &bob.id, target: &video_target })
        .await
        .unwrap();
    toggle(&db, &LikeRelation { liked_by: &alice.id, target: &comment_target })
        .await
        .unwrap();

    let playlist = Playlist {
        id: EntityId::new().0,
        owner_id: bob.id.clone(),
        name: "later".to_string(),
        description: "watch later".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db.insert_playlist(&playlist).await.unwrap();
    db.add_video_to_playlist(&playlist.id, &video.id).await.unwrap();
    db.record_view(&video.id, Some(&bob.id)).await.unwrap();

    let deleted = db.delete_video(&video.id).await.unwrap();
    assert_eq!(deleted.unwrap().id, video.id);

    assert!(db.get_video(&video.id).await.unwrap().is_none());
    assert!(db.get_comment(&comment.id).await.unwrap().is_none());
    assert_eq!(db.count_likes(&bob.id, &video_target).await.unwrap(), 0);
    assert_eq!(db.count_likes(&alice.id, &comment_target).await.unwrap(), 0);
    assert!(db.get_playlist_videos(&playlist.id).await.unwrap().is_empty());

    let history = WatchHistoryQuery { user_id: bob.id.clone() }
        .execute(&db)
        .await
        .unwrap();
    assert!(history.is_empty());

    assert!(db.delete_video(&video.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_view_moves_video_to_end_of_history() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let first = create_video(&db, &alice, "first", true).await;
    let second = create_video(&db, &alice, "second", true).await;

    db.record_view(&first.id, Some(&bob.id)).await.unwrap();
    db.record_view(&second.id, Some(&bob.id)).await.unwrap();
    db.record_view(&first.id, Some(&bob.id)).await.unwrap();
    db.record_view(&first.id, None).await.unwrap();

    let history = WatchHistoryQuery { user_id: bob.id.clone() }
        .execute(&db)
        .await
        .unwrap();
    let ids: Vec<_> = history.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    assert_eq!(history[0].owner.user_name, "alice");

    let viewed = db.get_video(&first.id).await.unwrap().unwrap();
    assert_eq!(viewed.views, 3);
}

#[tokio::test]
async fn test_playlist_membership_is_a_set() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let video = create_video(&db, &alice, "song", true).await;
    let playlist = Playlist {
        id: EntityId::new().0,
        owner_id: alice.id.clone(),
        name: "mix".to_string(),
        description: "songs".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db.insert_playlist(&playlist).await.unwrap();

    assert!(db.add_video_to_playlist(&playlist.id, &video.id).await.unwrap());
    assert!(!db.add_video_to_playlist(&playlist.id, &video.id).await.unwrap());

    let summaries = db
        .get_playlists_by_owner(&alice.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(summaries.total, 1);
    assert_eq!(summaries.items[0].videos, vec![video.id.clone()]);

    assert!(db.remove_video_from_playlist(&playlist.id, &video.id).await.unwrap());
    assert!(!db.remove_video_from_playlist(&playlist.id, &video.id).await.unwrap());
    assert!(db.get_playlist_videos(&playlist.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_channel_profile_counts() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;

    for subscriber in [&bob, &carol] {
        toggle(
            &db,
            &SubscriptionRelation {
                subscriber_id: &subscriber.id,
                channel_id: &alice.id,
            },
        )
        .await
        .unwrap();
    }

    let profile = ChannelProfileQuery {
        user_name: "alice".to_string(),
        viewer_id: Some(bob.id.clone()),
    }
    .execute(&db)
    .await
    .unwrap()
    .unwrap();
    assert_eq!(profile.subscribers_count, 2);
    assert_eq!(profile.channels_subscribed_to_count, 0);
    assert!(profile.is_subscribed);

    let anonymous = ChannelProfileQuery {
        user_name: "alice".to_string(),
        viewer_id: None,
    }
    .execute(&db)
    .await
    .unwrap()
    .unwrap();
    assert!(!anonymous.is_subscribed);

    let missing = ChannelProfileQuery {
        user_name: "nobody".to_string(),
        viewer_id: None,
    }
    .execute(&db)
    .await
    .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_channel_stats_counts_each_like_kind() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let empty = ChannelStatsQuery { channel_id: alice.id.clone() }
        .execute(&db)
        .await
        .unwrap();
    assert_eq!(empty, ChannelStats::default());

    let video = create_video(&db, &alice, "stats", true).await;
    let comment = create_comment(&db, &alice, &video, "mine").await;
    let post = CommunityPost {
        id: EntityId::new().0,
        owner_id: alice.id.clone(),
        content: "hello".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    db.insert_community_post(&post).await.unwrap();

    for target in [
        LikeTarget::Video(video.id.clone()),
        LikeTarget::Comment(comment.id.clone()),
        LikeTarget::CommunityPost(post.id.clone()),
    ] {
        toggle(&db, &LikeRelation { liked_by: &bob.id, target: &target })
            .await
            .unwrap();
    }
    toggle(
        &db,
        &SubscriptionRelation {
            subscriber_id: &bob.id,
            channel_id: &alice.id,
        },
    )
    .await
    .unwrap();
    db.record_view(&video.id, Some(&bob.id)).await.unwrap();
    db.record_view(&video.id, None).await.unwrap();

    let stats = ChannelStatsQuery { channel_id: alice.id.clone() }
        .execute(&db)
        .await
        .unwrap();
    assert_eq!(
        stats,
        ChannelStats {
            total_videos: 1,
            total_subscribers: 1,
            total_video_likes: 1,
            total_comment_likes: 1,
            total_post_likes: 1,
            total_views: 2,
        }
    );
}

#[tokio::test]
async fn test_liked_videos_hide_unpublished_from_others() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let public = create_video(&db, &alice, "public", true).await;
    let hidden = create_video(&db, &alice, "hidden", true).await;

    for video in [&public, &hidden] {
        let target = LikeTarget::Video(video.id.clone());
        toggle(&db, &LikeRelation { liked_by: &bob.id, target: &target })
            .await
            .unwrap();
    }
    db.toggle_video_published(&hidden.id).await.unwrap();

    let liked = db.get_liked_videos(&bob.id).await.unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].id, public.id);
}

#[tokio::test]
async fn test_concurrent_subscription_toggles_never_duplicate() {
    let (db, _temp_dir) = create_test_db().await;
    let db = Arc::new(db);
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = Arc::clone(&db);
        let subscriber_id = alice.id.clone();
        let channel_id = bob.id.clone();
        handles.push(tokio::spawn(async move {
            toggle(
                &db,
                &SubscriptionRelation {
                    subscriber_id: &subscriber_id,
                    channel_id: &channel_id,
                },
            )
            .await
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected toggle error: {other:?}"),
        }
    }

    assert!(db.count_subscriptions(&alice.id, &bob.id).await.unwrap() <= 1);
}

#[tokio::test]
async fn test_toggle_result_is_visible_to_the_next_read() {
    let (db, _temp_dir) = create_test_db().await;
    let db = Arc::new(db);
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let relation = SubscriptionRelation {
        subscriber_id: &alice.id,
        channel_id: &bob.id,
    };

    // Parallel readers keep the other pooled connections busy
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            let channel_id = bob.id.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    db.get_channel_subscribers(&channel_id).await.unwrap();
                }
            })
        })
        .collect();

    for _ in 0..50 {
        assert!(toggle(&db, &relation).await.unwrap().is_added());
        assert_eq!(db.count_subscriptions(&alice.id, &bob.id).await.unwrap(), 1);

        assert!(!toggle(&db, &relation).await.unwrap().is_added());
        assert_eq!(db.count_subscriptions(&alice.id, &bob.id).await.unwrap(), 0);
    }

    for reader in readers {
        reader.await.unwrap();
    }
}
