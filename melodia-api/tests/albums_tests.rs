//! Album endpoints

mod helpers;

use axum::http::StatusCode;
use helpers::TestApp;
use serde_json::json;

async fn create_album(app: &TestApp, token: &str, title: &str) -> i64 {
    let (status, body) = app
        .post(
            "/albums",
            Some(token),
            json!({"title": title, "artist": "The Band", "description": "debut"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_album_crud() {
    let app = TestApp::new().await;
    let token = app.user_token("alice").await;

    let (status, _) = app
        .post("/albums", None, json!({"title": "X", "artist": "Y"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let id = create_album(&app, &token, "First Album").await;

    let (status, album) = app.get(&format!("/albums/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(album["title"], "First Album");
    assert_eq!(album["description"], "debut");
    assert_eq!(album["songs"].as_array().unwrap().len(), 0);

    let (status, updated) = app
        .put(&format!("/albums/{}", id), Some(&token), json!({"title": "Renamed"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["artist"], "The Band");

    let (status, list) = app.get("/albums", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.put("/albums/999", Some(&token), json!({"title": "x"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/albums", Some(&token), json!({"title": "", "artist": "Y"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["field"], "title");
}

#[tokio::test]
async fn test_attach_song_copies_title() {
    let app = TestApp::new().await;
    let token = app.user_token("alice").await;
    let album = create_album(&app, &token, "Collected").await;
    let song = app.create_song(&token, "Track", "The Band").await;

    let (status, attached) = app
        .post(&format!("/albums/{}/songs/{}", album, song), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attached["album_id"], album);
    assert_eq!(attached["album"], "Collected");

    let (_, detail) = app.get(&format!("/albums/{}", album), None).await;
    assert_eq!(detail["songs"][0]["id"], song);

    let (status, _) = app
        .post(&format!("/albums/{}/songs/999", album), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(&format!("/albums/999/songs/{}", song), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_album_nulls_song_album_id() {
    let app = TestApp::new().await;
    let token = app.user_token("alice").await;
    let album = create_album(&app, &token, "Doomed").await;

    let (status, song) = app
        .post(
            "/songs",
            Some(&token),
            json!({"title": "Survivor", "artist": "The Band", "duration": 100, "url": "http://x", "album_id": album}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(song["album_id"], album);
    let song_id = song["id"].as_i64().unwrap();

    let (status, _) = app.delete(&format!("/albums/{}", album), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, song) = app.get(&format!("/songs/{}", song_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(song["album_id"].is_null());

    let (status, _) = app.get(&format!("/albums/{}", album), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/albums/{}", album), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_song_detached_by_null_album_id() {
    let app = TestApp::new().await;
    let token = app.user_token("alice").await;
    let album = create_album(&app, &token, "Attached").await;
    let song = app.create_song(&token, "Track", "The Band").await;

    let (status, _) = app
        .post(&format!("/albums/{}/songs/{}", album, song), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) = app
        .put(&format!("/songs/{}", song), Some(&token), json!({"album_id": null, "genre": null}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert!(updated["album_id"].is_null());
    assert!(updated["genre"].is_null());
    assert_eq!(updated["title"], "Track");

    let (_, detail) = app.get(&format!("/albums/{}", album), None).await;
    assert_eq!(detail["songs"].as_array().unwrap().len(), 0);

    // Absent fields are left alone
    let (_, again) = app
        .put(&format!("/songs/{}", song), Some(&token), json!({"genre": "Pop"}))
        .await;
    let (_, unchanged) = app
        .put(&format!("/albums/{}", album), Some(&token), json!({"title": "Attached II"}))
        .await;
    assert_eq!(again["genre"], "Pop");
    assert_eq!(unchanged["description"], "debut");

    let (_, cleared) = app
        .put(&format!("/albums/{}", album), Some(&token), json!({"description": null}))
        .await;
    assert!(cleared["description"].is_null());
    assert_eq!(cleared["title"], "Attached II");
}
