#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinea_api::database::MemoryStore;
use cinea_api::mail::{MailError, MailMessage, Mailer};
use cinea_api::routes;
use cinea_api::state::{AppState, RequestPolicy, SharedState};
use cinea_api::storage::MediaStorage;

pub const PASSWORD: &str = "correct-horse-battery";
const BOUNDARY: &str = "cinea-test-boundary";

/// Keeps every message instead of delivering it; can be told to fail for one address
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
    pub reject: Mutex<Option<String>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.reject.lock().unwrap().as_deref() == Some(message.to.as_str()) {
            return Err(MailError::Rejected(550));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

impl RecordingMailer {
    pub fn messages_to(&self, email: &str) -> Vec<MailMessage> {
        self.sent.lock().unwrap().iter().filter(|m| m.to == email).cloned().collect()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// Response kept as raw bytes, for endpoints that do not answer in JSON
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// In-process app over a memory store, in-memory object storage and a recording mailer
pub struct TestApp {
    pub state: SharedState,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(RequestPolicy::from_config())
    }

    /// App with its own upload limit and webhook secret
    pub fn with_policy(policy: RequestPolicy) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::with_policy(Arc::new(MemoryStore::new()), mailer.clone(), MediaStorage::in_memory(), policy);
        let router = routes::app(state.clone());
        Self { state, mailer, router }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, body }
    }

    pub async fn get_raw(&self, uri: &str) -> RawResponse {
        let request = Request::builder().method(Method::GET).uri(uri).body(Body::empty()).expect("request");
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body").to_vec();
        RawResponse { status, content_type, bytes }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.expect("request")).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// multipart/form-data with text fields and `(name, mime type, bytes)` files under `file`
    pub async fn upload(&self, uri: &str, token: &str, fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> TestResponse {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        for (file_name, mime, bytes) in files {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n", file_name).as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    pub async fn signup(&self, email: &str) -> TestUser {
        let res = self
            .request(
                Method::POST,
                "/users/signup",
                None,
                Some(json!({
                    "firstName": "Test",
                    "lastName": email.split('@').next().unwrap_or("user"),
                    "email": email,
                    "password": PASSWORD,
                    "password2": PASSWORD,
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {}", res.body);
        TestUser {
            id: res.data()["user"]["_id"].as_str().expect("user id").to_string(),
            email: res.data()["user"]["email"].as_str().expect("email").to_string(),
            token: res.data()["token"].as_str().expect("token").to_string(),
        }
    }

    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let res = self.post("/users/projects", token, json!({ "projName": name })).await;
        assert_eq!(res.status, StatusCode::CREATED, "project create failed: {}", res.body);
        res.data()["_id"].as_str().expect("project id").to_string()
    }

    pub async fn create_contract(&self, token: &str, project_id: &str) -> String {
        let res = self
            .post(&format!("/contract/create?projectId={}&name=Crew%20agreement", project_id), token, json!({}))
            .await;
        assert_eq!(res.status, StatusCode::OK, "contract create failed: {}", res.body);
        res.data()["_id"].as_str().expect("contract id").to_string()
    }
}

/// The base64 token carried by a signing link in an invitation email
pub fn link_token(message: &MailMessage) -> String {
    let start = message.html.find("sign?token=").expect("signing link") + "sign?token=".len();
    message.html[start..]
        .chars()
        .take_while(|c| *c != '"' && *c != '<' && !c.is_whitespace())
        .collect()
}
