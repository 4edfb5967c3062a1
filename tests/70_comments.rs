mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn create_validates_fields() {
    let app = TestApp::new();
    let user = app.signup("critic@example.com").await;

    let res = app.post("/comment/create", &user.token, json!({ "screenId": "s1", "comment": "hi", "type": "epk" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide appId");

    let res = app
        .post("/comment/create", &user.token, json!({ "appId": "a1", "screenId": "s1", "comment": "hi", "type": "poster" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid comment type");

    let res = app.get("/comments/s1?appId=a1", &user.token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide type");

    let res = app.get("/comments/s1?type=epk", &user.token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide appId");
}

#[tokio::test]
async fn replies_are_threaded_under_parents() {
    let app = TestApp::new();
    let alice = app.signup("alice@example.com").await;
    let bob = app.signup("bob@example.com").await;
    let screen = json!({ "appId": "epk-app", "screenId": "poster-1", "type": "epk" });

    let mut body = screen.clone();
    body["comment"] = json!("Title is too small");
    let res = app.post("/comment/create", &alice.token, body).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Comment created successfully");
    let root = res.data()["_id"].as_str().unwrap().to_string();

    let mut body = screen.clone();
    body["comment"] = json!("Bumped to 48pt");
    body["parentId"] = json!(root);
    let res = app.post("/comment/create", &bob.token, body).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["parentId"], root.as_str());

    let mut body = screen.clone();
    body["comment"] = json!("Second thread");
    app.post("/comment/create", &bob.token, body).await;

    // Same screen id under another type is a separate thread
    app.post(
        "/comment/create",
        &alice.token,
        json!({ "appId": "epk-app", "screenId": "poster-1", "type": "props", "comment": "elsewhere" }),
    )
    .await;

    let res = app.get("/comments/poster-1?type=epk&appId=epk-app", &alice.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Comments fetched successfully");
    let threads = res.data().as_array().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0]["comment"], "Title is too small");
    assert_eq!(threads[0]["author"]["email"], "alice@example.com");
    assert_eq!(threads[0]["replies"][0]["comment"], "Bumped to 48pt");
    assert_eq!(threads[0]["replies"][0]["author"]["email"], "bob@example.com");
    assert_eq!(threads[1]["comment"], "Second thread");
    assert!(threads[1]["replies"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn parent_must_belong_to_the_same_screen() {
    let app = TestApp::new();
    let user = app.signup("critic@example.com").await;

    let res = app
        .post("/comment/create", &user.token, json!({ "appId": "a", "screenId": "s1", "type": "media", "comment": "root" }))
        .await;
    let root = res.data()["_id"].as_str().unwrap().to_string();

    let res = app
        .post(
            "/comment/create",
            &user.token,
            json!({ "appId": "a", "screenId": "s2", "type": "media", "comment": "reply", "parentId": root }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "Parent comment not found");

    let res = app
        .post(
            "/comment/create",
            &user.token,
            json!({ "appId": "a", "screenId": "s1", "type": "media", "comment": "reply", "parentId": "nope" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
