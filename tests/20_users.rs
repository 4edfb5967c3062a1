mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD};
use serde_json::json;

use cinea_api::database::models::User;
use cinea_api::database::Repository;

#[tokio::test]
async fn signup_issues_a_session_without_the_password_hash() {
    let app = TestApp::new();
    let res = app
        .request(
            Method::POST,
            "/users/signup",
            None,
            Some(json!({
                "firstName": "Ana",
                "lastName": "Reyes",
                "email": "  Ana.Reyes@Example.com ",
                "password": PASSWORD,
                "password2": PASSWORD,
                "company": "Reyes Films",
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.message(), "User registered successfully");
    assert!(res.data()["token"].as_str().is_some());
    assert_eq!(res.data()["user"]["email"], "ana.reyes@example.com");
    assert_eq!(res.data()["user"]["plan"], "free");
    assert!(res.data()["user"].get("password").is_none());
}

#[tokio::test]
async fn signup_validates_input_and_rejects_taken_emails() {
    let app = TestApp::new();
    app.signup("taken@example.com").await;

    let cases = [
        (json!({ "lastName": "X", "email": "a@example.com", "password": "p", "password2": "p" }), "Please provide firstName"),
        (json!({ "firstName": "A", "lastName": "X", "email": "nope", "password": "p", "password2": "p" }), "Please provide a valid email"),
        (json!({ "firstName": "A", "lastName": "X", "email": "a@example.com", "password": "p", "password2": "q" }), "Passwords do not match"),
        (json!({ "firstName": "A", "lastName": "X", "email": "TAKEN@example.com", "password": "p", "password2": "p" }), "Email already exists"),
    ];
    for (body, message) in cases {
        let res = app.request(Method::POST, "/users/signup", None, Some(body)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", message);
        assert_eq!(res.message(), message);
    }
}

#[tokio::test]
async fn login_and_signin_accept_case_insensitive_email() {
    let app = TestApp::new();
    app.signup("crew@example.com").await;

    for path in ["/users/login", "/users/signin"] {
        let res = app
            .request(Method::POST, path, None, Some(json!({ "email": "CREW@example.com", "password": PASSWORD })))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.message(), "Logged in successfully");
        assert!(res.data()["user"]["lastLoggedIn"].is_string());
    }
}

#[tokio::test]
async fn repeated_failed_logins_lock_the_account() {
    let app = TestApp::new();
    app.signup("locked@example.com").await;
    let wrong = json!({ "email": "locked@example.com", "password": "wrong" });

    for _ in 0..4 {
        let res = app.request(Method::POST, "/users/login", None, Some(wrong.clone())).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.message(), "Invalid email or password");
    }
    let res = app.request(Method::POST, "/users/login", None, Some(wrong)).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);

    // Correct password is refused while locked
    let res = app
        .request(Method::POST, "/users/login", None, Some(json!({ "email": "locked@example.com", "password": PASSWORD })))
        .await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.message(), "Account is temporarily locked. Please try again later");
}

#[tokio::test]
async fn unknown_email_answers_like_a_wrong_password() {
    let app = TestApp::new();
    let res = app
        .request(Method::POST, "/users/login", None, Some(json!({ "email": "ghost@example.com", "password": "x" })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid email or password");
}

#[tokio::test]
async fn profile_can_be_read_updated_and_session_extended() {
    let app = TestApp::new();
    let user = app.signup("profile@example.com").await;

    let res = app.get("/users/profile", &user.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "User profile");
    assert_eq!(res.data()["email"], "profile@example.com");

    let res = app.put("/users/profile", &user.token, json!({ "firstName": "Dana", "company": "North Unit" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["firstName"], "Dana");
    assert_eq!(res.data()["company"], "North Unit");

    let res = app.put("/users/profile", &user.token, json!({ "lastName": "  " })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/users/extend-session", &user.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Login session extended successfully");
    let fresh = res.data()["authKey"].as_str().unwrap().to_string();
    assert_eq!(app.get("/users/profile", &fresh).await.status, StatusCode::OK);
}

#[tokio::test]
async fn premium_list_is_admin_only_and_consumed_at_signup() {
    let app = TestApp::new();
    let admin = app.signup("admin@example.com").await;
    let regular = app.signup("regular@example.com").await;
    Repository::<User>::new(app.state.store.clone())
        .update_one(json!({ "email": "admin@example.com" }), json!({ "role": "admin" }))
        .await
        .unwrap();

    let res = app.post("/users/add-premium-user", &regular.token, json!({ "email": "vip@example.com" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.post("/users/add-premium-user", &admin.token, json!({ "email": "VIP@example.com" })).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.message(), "Premium user added successfully");

    let res = app.post("/users/add-premium-user", &admin.token, json!({ "email": "vip@example.com" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "User already exists. Please check with the admin");

    let res = app.post("/users/add-premium-user", &admin.token, json!({ "email": "regular@example.com" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let vip = app.signup("vip@example.com").await;
    let res = app.get("/users/profile", &vip.token).await;
    assert_eq!(res.data()["plan"], "premium");

    // Signup consumed the entry
    let entries = cinea_api::services::UserService::new(&app.state).list_premium_users().await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn projects_are_scoped_to_their_owner() {
    let app = TestApp::new();
    let owner = app.signup("owner@example.com").await;
    let other = app.signup("other@example.com").await;

    let res = app.post("/users/projects", &owner.token, json!({ "projName": "  " })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide projName");

    let first = app.create_project(&owner.token, "Night Shoot").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.create_project(&owner.token, "Day Shoot").await;

    let res = app.post("/users/projects", &owner.token, json!({ "projName": "Night Shoot" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Project with this name already exists");

    // Same name is fine for another user
    app.create_project(&other.token, "Night Shoot").await;

    let res = app.get("/users/projects", &owner.token).await;
    assert_eq!(res.message(), "User Projects");
    let names: Vec<&str> = res.data().as_array().unwrap().iter().map(|p| p["projName"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Day Shoot", "Night Shoot"]);

    let res = app.get(&format!("/users/projects/{}", first), &other.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.put(&format!("/users/projects/{}", first), &owner.token, json!({ "projName": "Night Exteriors" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["projName"], "Night Exteriors");

    let res = app.delete(&format!("/users/projects/{}", second), &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Project removed successfully");
    let res = app.get(&format!("/users/projects/{}", second), &owner.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/users/projects/not-a-uuid", &owner.token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid projectId");
}
