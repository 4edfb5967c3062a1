mod common;

use axum::http::StatusCode;
use common::{TestApp, TestUser};
use serde_json::json;

/// Adds `member` to an EPK owned by `owner`; each call notifies the member once
async fn share_epk(app: &TestApp, owner: &TestUser, member: &TestUser, name: &str) {
    let project = app.create_project(&owner.token, &format!("{} project", name)).await;
    let res = app
        .post("/epk/create", &owner.token, json!({ "epkName": name, "width": 10, "height": 10, "projectId": project }))
        .await;
    let epk = res.data()["_id"].as_str().unwrap().to_string();
    app.post(
        "/epk/create-team",
        &owner.token,
        json!({ "epkId": epk, "addMembers": [{ "name": "Member", "email": member.email }] }),
    )
    .await;
}

#[tokio::test]
async fn list_count_mark_seen_and_delete() {
    let app = TestApp::new();
    let owner = app.signup("owner@example.com").await;
    let member = app.signup("member@example.com").await;

    let res = app.get("/notification/count", &member.token).await;
    assert_eq!(res.message(), "Notification count");
    assert_eq!(res.data()["count"], 0);

    share_epk(&app, &owner, &member, "First kit").await;
    share_epk(&app, &owner, &member, "Second kit").await;

    let res = app.get("/notification/listAllNotifications", &member.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Notifications listed");
    assert_eq!(res.data()["total"], 2);
    assert_eq!(res.data()["unseen"], 2);
    assert_eq!(res.data()["items"][0]["notificationType"], "epk");
    assert_eq!(res.data()["items"][0]["isSeen"], false);

    let res = app.get("/notification/listAllNotifications?limit=1&page=2", &member.token).await;
    assert_eq!(res.data()["items"].as_array().unwrap().len(), 1);

    let res = app.get("/notification/update", &member.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["updated"], 2);
    let res = app.get("/notification/count", &member.token).await;
    assert_eq!(res.data()["count"], 0);

    let res = app.get("/notification/listAllNotifications", &member.token).await;
    let id = res.data()["items"][0]["_id"].as_str().unwrap().to_string();

    // Other users cannot touch it
    let res = app.delete(&format!("/notification/{}", id), &owner.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.delete(&format!("/notification/{}", id), &member.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Notification deleted successfully");
    assert_eq!(res.data()["isDeleted"], true);

    let res = app.get("/notification/listAllNotifications", &member.token).await;
    assert_eq!(res.data()["total"], 1);

    let res = app.delete(&format!("/notification/{}", id), &member.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn far_pages_come_back_empty() {
    let app = TestApp::new();
    let owner = app.signup("owner@example.com").await;
    let member = app.signup("member@example.com").await;
    share_epk(&app, &owner, &member, "Kit").await;

    let res = app
        .get("/notification/listAllNotifications?page=2147483647&limit=20", &member.token)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["page"], 2147483647);
    assert_eq!(res.data()["total"], 1);
    assert!(res.data()["items"].as_array().unwrap().is_empty());
}
