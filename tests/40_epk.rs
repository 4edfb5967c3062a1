mod common;

use axum::http::StatusCode;
use common::{TestApp, TestUser};
use serde_json::json;

async fn create_epk(app: &TestApp, owner: &TestUser, name: &str) -> String {
    let project = app.create_project(&owner.token, &format!("{} project", name)).await;
    let res = app
        .post(
            "/epk/create",
            &owner.token,
            json!({ "epkName": name, "width": 1080, "height": 1350, "projectId": project }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.data()["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_validates_dimensions_and_project() {
    let app = TestApp::new();
    let owner = app.signup("publicist@example.com").await;
    let project = app.create_project(&owner.token, "Doc").await;

    let res = app.post("/epk/create", &owner.token, json!({ "width": 10, "height": 10, "projectId": project })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide epkName");

    let res = app
        .post("/epk/create", &owner.token, json!({ "epkName": "Kit", "width": 0, "height": 10, "projectId": project }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/epk/create",
            &owner.token,
            json!({ "epkName": "Kit", "width": 10, "height": 10, "projectId": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Project does not exist");

    let res = app
        .post("/epk/create", &owner.token, json!({ "epkName": "Kit", "width": 1080, "height": 1350, "projectId": project }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.message(), "Epk created successfully");
    assert_eq!(res.data()["epkName"], "Kit");
}

#[tokio::test]
async fn owner_manages_the_epk() {
    let app = TestApp::new();
    let owner = app.signup("publicist@example.com").await;
    let epk = create_epk(&app, &owner, "Festival kit").await;

    let res = app.get(&format!("/epk/single/{}", epk), &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["epkName"], "Festival kit");
    assert_eq!(res.data()["templateCount"], 0);
    assert!(res.data()["members"].as_array().unwrap().is_empty());

    let res = app.put(&format!("/epk/{}", epk), &owner.token, json!({ "epkName": "Press kit", "width": 1920 })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Epk updated successfully");
    assert_eq!(res.data()["epkName"], "Press kit");
    assert_eq!(res.data()["width"], 1920.0);
    assert_eq!(res.data()["height"], 1350.0);

    let res = app.put(&format!("/epk/{}", epk), &owner.token, json!({ "epkName": "  " })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/epk", &owner.token).await;
    assert_eq!(res.message(), "Epk listed");
    assert_eq!(res.data().as_array().unwrap().len(), 1);

    let res = app.delete(&format!("/epk/{}", epk), &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["deleted"], 1);

    let res = app.get(&format!("/epk/single/{}", epk), &owner.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_members_can_read_but_not_change() {
    let app = TestApp::new();
    let owner = app.signup("publicist@example.com").await;
    let member = app.signup("editor@example.com").await;
    let stranger = app.signup("stranger@example.com").await;
    let epk = create_epk(&app, &owner, "Festival kit").await;

    let res = app.get(&format!("/epk/single/{}", epk), &member.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .post(
            "/epk/create-team",
            &owner.token,
            json!({ "epkId": epk, "addMembers": [{ "name": "Self", "email": "PUBLICIST@example.com" }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "You can't add yourself as a member");

    let res = app
        .post(
            "/epk/create-team",
            &owner.token,
            json!({ "epkId": epk, "addMembers": [
                { "name": "Editor", "email": "editor@example.com" },
                { "name": "Guest", "email": "guest@example.com" },
            ]}),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.message(), "Epk team updated successfully");
    assert_eq!(res.data().as_array().unwrap().len(), 2);

    let res = app
        .post("/epk/create-team", &owner.token, json!({ "epkId": epk, "addMembers": [{ "name": "Ed", "email": "editor@example.com" }] }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Ed already added to the epk");

    // Only registered members get an in-app notification
    let res = app.get("/notification/count", &member.token).await;
    assert_eq!(res.data()["count"], 1);

    let res = app.get("/epk", &member.token).await;
    assert_eq!(res.data().as_array().unwrap().len(), 1);
    let res = app.get(&format!("/epk/single/{}", epk), &member.token).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&format!("/epk/members/{}", epk), &member.token).await;
    assert_eq!(res.message(), "Members listed");
    assert_eq!(res.data().as_array().unwrap().len(), 2);

    let res = app.put(&format!("/epk/{}", epk), &member.token, json!({ "epkName": "Mine" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&format!("/epk/{}", epk), &member.token).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get(&format!("/epk/members/{}", epk), &stranger.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // Removal is immediate
    let res = app
        .post("/epk/create-team", &owner.token, json!({ "epkId": epk, "removeMembers": [{ "email": "editor@example.com" }] }))
        .await;
    assert_eq!(res.data().as_array().unwrap().len(), 1);
    let res = app.get(&format!("/epk/single/{}", epk), &member.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn email_notification_reaches_new_members_once() {
    let app = TestApp::new();
    let owner = app.signup("publicist@example.com").await;
    let epk = create_epk(&app, &owner, "Festival kit").await;
    app.post(
        "/epk/create-team",
        &owner.token,
        json!({ "epkId": epk, "addMembers": [{ "name": "Guest", "email": "guest@example.com" }] }),
    )
    .await;

    let res = app.post("/epk/email-notification", &owner.token, json!({ "epkId": epk })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Email Notification Sent");
    assert_eq!(res.data()["sent"], json!(["guest@example.com"]));

    let mail = app.mailer.messages_to("guest@example.com");
    assert_eq!(mail.len(), 1);
    assert!(mail[0].subject.contains("Festival kit"));
    assert!(mail[0].html.contains(&format!("/app/epk/{}", epk)));

    let res = app.post("/epk/email-notification", &owner.token, json!({ "epkId": epk, "emailSub": "Again" })).await;
    assert!(res.data()["sent"].as_array().unwrap().is_empty());
    assert_eq!(app.mailer.messages_to("guest@example.com").len(), 1);
}
