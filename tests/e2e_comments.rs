//! E2E tests for comments

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_comment_lifecycle() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let video = server.publish_video(&alice, "Talk").await;
    let video_path = format!("/comments/{}", video["_id"].as_str().unwrap());

    for content in ["first", "second", "third"] {
        let response = server
            .client
            .post(server.api(&video_path))
            .bearer_auth(&bob.access_token)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let response = server
        .client
        .get(server.api(&format!("{}?page=1&limit=2", video_path)))
        .bearer_auth(&alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let comments = body["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "first");
    assert_eq!(comments[0]["owner"]["userName"], "bob");
    assert_eq!(body["data"]["pagination"]["totalComments"], 3);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);

    let comment_id = comments[0]["_id"].as_str().unwrap().to_string();
    let comment_path = format!("/comments/c/{}", comment_id);

    let response = server
        .client
        .patch(server.api(&comment_path))
        .bearer_auth(&alice.access_token)
        .json(&serde_json::json!({ "content": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .patch(server.api(&comment_path))
        .bearer_auth(&bob.access_token)
        .json(&serde_json::json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["content"], "edited");

    let response = server
        .client
        .delete(server.api(&comment_path))
        .bearer_auth(&bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.api(&video_path))
        .bearer_auth(&alice.access_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["pagination"]["totalComments"], 2);
}

#[tokio::test]
async fn test_comment_validation() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let video = server.publish_video(&alice, "Quiet").await;
    let video_path = format!("/comments/{}", video["_id"].as_str().unwrap());

    let response = server
        .client
        .post(server.api(&video_path))
        .bearer_auth(&alice.access_token)
        .json(&serde_json::json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .get(server.api(&video_path))
        .bearer_auth(&alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No comments found");

    let response = server
        .client
        .get(server.api(&format!("/comments/{}", tubehub::data::EntityId::new())))
        .bearer_auth(&alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Video not found");
}
