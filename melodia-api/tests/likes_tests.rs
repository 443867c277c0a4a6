//! Like endpoints

mod helpers;

use axum::http::StatusCode;
use helpers::{error_code, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_like_twice_conflicts() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;
    let song = app.create_song(&alice, "Song", "Artist").await;

    let (status, body) = app.post(&format!("/likes/{}", song), Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], song);
    assert_eq!(body["liked"], true);

    let (status, body) = app.post(&format!("/likes/{}", song), Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

#[tokio::test]
async fn test_like_missing_song() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;

    let (status, _) = app.post("/likes/999", Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_requires_auth() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;
    let song = app.create_song(&alice, "Song", "Artist").await;

    let (status, _) = app.post(&format!("/likes/{}", song), None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unlike() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;
    let song = app.create_song(&alice, "Song", "Artist").await;

    let (status, _) = app.delete(&format!("/likes/{}", song), Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post(&format!("/likes/{}", song), Some(&alice), json!({})).await;
    let (status, body) = app.delete(&format!("/likes/{}", song), Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _) = app.delete(&format!("/likes/{}", song), Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Can like again after unliking
    let (status, _) = app.post(&format!("/likes/{}", song), Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_mine_most_recent_first() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;
    let bob = app.user_token("bob").await;
    let first = app.create_song(&alice, "First", "Artist").await;
    let second = app.create_song(&alice, "Second", "Artist").await;
    let third = app.create_song(&alice, "Third", "Artist").await;

    for song in [first, second] {
        app.post(&format!("/likes/{}", song), Some(&alice), json!({})).await;
    }
    app.post(&format!("/likes/{}", third), Some(&bob), json!({})).await;

    let (status, likes) = app.get("/likes", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = likes
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Second", "First"]);
    assert!(likes.as_array().unwrap().iter().all(|s| s["liked"] == true));

    let (_, page) = app.get("/likes?limit=1", Some(&alice)).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["title"], "Second");
}

#[tokio::test]
async fn test_like_with_data_creates_or_reuses() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;
    let bob = app.user_token("bob").await;

    let payload = json!({
        "title": "Found Elsewhere",
        "artist": "Somebody",
        "duration": 180,
        "url": "https://example.com/found",
    });

    let (status, created) = app.post("/likes/with-data", Some(&alice), payload.clone()).await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert_eq!(created["liked"], true);
    let song_id = created["id"].as_i64().unwrap();

    // Same title and artist: the existing song is liked, not duplicated
    let (status, reused) = app.post("/likes/with-data", Some(&bob), payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reused["id"], song_id);

    let (status, _) = app.post("/likes/with-data", Some(&alice), payload).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, songs) = app.get("/songs", None).await;
    assert_eq!(songs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_like_with_data_validates_new_song() {
    let app = TestApp::new().await;
    let alice = app.user_token("alice").await;

    let (status, _) = app
        .post("/likes/with-data", Some(&alice), json!({"title": "", "artist": "X", "duration": 1, "url": "http://x"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
