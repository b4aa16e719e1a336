#![allow(dead_code)]

use std::sync::Once;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use mindlog_api::config::AppConfig;
use mindlog_api::database::Stores;
use mindlog_api::{router, AppState};

static TRACING: Once = Once::new();

/// API server running in-process on a free port with in-memory storage.
///
/// Each test gets its own server: it lives on the test's tokio runtime.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

/// A registered account and its bearer token
pub struct Session {
    pub token: String,
    pub user_id: String,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("mindlog_api=debug")
                .with_test_writer()
                .try_init();
        });

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.port = port;
        let state = AppState::new(config, Stores::memory())?;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/api/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, email: &str) -> Result<Session> {
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": "hunter22", "username": "tester" }))
            .send()
            .await?;
        anyhow::ensure!(
            res.status() == StatusCode::CREATED,
            "register failed: {}",
            res.status()
        );

        let body = res.json::<Value>().await?;
        Ok(Session {
            token: body["data"]["token"]
                .as_str()
                .context("token missing")?
                .to_string(),
            user_id: body["data"]["user"]["id"]
                .as_str()
                .context("user id missing")?
                .to_string(),
        })
    }

    pub async fn create_log(&self, session: &Session, log: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/logs"))
            .bearer_auth(&session.token)
            .json(&log)
            .send()
            .await?;
        anyhow::ensure!(
            res.status() == StatusCode::CREATED,
            "create log failed: {}",
            res.status()
        );
        Ok(res.json::<Value>().await?["data"].clone())
    }

    pub async fn get_json(&self, session: &Session, path: &str) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json::<Value>().await?))
    }

    /// Poll `/api/passphrase/status` until the latest job is terminal
    pub async fn wait_for_job(&self, session: &Session) -> Result<Value> {
        let deadline = Instant::now() + Duration::from_secs(30);
        while Instant::now() < deadline {
            let (_, body) = self.get_json(session, "/api/passphrase/status").await?;
            let job = &body["job"];
            if matches!(job["state"].as_str(), Some("completed") | Some("failed")) {
                return Ok(job.clone());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("passphrase job did not finish in time")
    }
}
