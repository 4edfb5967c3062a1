// Boots the real binary on a free port and talks to it over HTTP

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Empty values win over a developer .env: memory store, memory storage, logged mail
        let child = Command::new(env!("CARGO_BIN_EXE_cinea-api"))
            .env("CINEA_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("DATABASE_URL", "")
            .env("STORAGE_BACKEND", "memory")
            .env("MAIL_BACKEND", "log")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[tokio::test]
async fn binary_serves_health_and_sessions() -> Result<()> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    let client = reqwest::Client::new();

    let health: Value = client.get(format!("{}/health", server.base_url)).send().await?.json().await?;
    assert_eq!(health["data"]["status"], "ok");

    let resp = client
        .post(format!("{}/users/signup", server.base_url))
        .json(&json!({
            "firstName": "Smoke",
            "lastName": "Test",
            "email": "smoke@example.com",
            "password": "correct-horse-battery",
            "password2": "correct-horse-battery",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await?;
    let token = body["data"]["token"].as_str().context("token")?.to_string();

    let resp = client
        .get(format!("{}/users/profile", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = resp.json().await?;
    assert_eq!(profile["data"]["email"], "smoke@example.com");

    let resp = client.get(format!("{}/users/profile", server.base_url)).send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
