mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn change_passcode(
    server: &common::TestServer,
    session: &common::Session,
    body: Value,
) -> Result<(StatusCode, Value)> {
    let res = server
        .client
        .put(server.url("/api/passphrase"))
        .bearer_auth(&session.token)
        .json(&body)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn status_is_null_before_any_change() -> Result<()> {
    let server = common::TestServer::start().await?;
    let session = server.register("fresh@example.com").await?;

    let (status, body) = server.get_json(&session, "/api/passphrase/status").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "job": null }));
    Ok(())
}

#[tokio::test]
async fn passcode_change_encrypts_existing_logs() -> Result<()> {
    let server = common::TestServer::start().await?;
    let session = server.register("crypt@example.com").await?;

    for emotion in ["Sad", "Hopeful", "Tired"] {
        server
            .create_log(&session, json!({ "emotion": emotion, "moodScore": 4 }))
            .await?;
    }

    let (status, body) = change_passcode(&server, &session, json!({ "passcode": "1234" })).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    assert_eq!(body["started"], true);
    let job_id = body["jobId"].as_str().unwrap_or_default().to_string();

    let job = server.wait_for_job(&session).await?;
    assert_eq!(job["id"], job_id.as_str());
    assert_eq!(job["state"], "completed");
    assert_eq!(job["total"], 3);
    assert_eq!(job["processed"], 3);
    assert_eq!(job["skipped"], 0);
    assert_eq!(job["errors"], 0);

    // reads still return plaintext, now served from the envelopes
    let (_, list) = server.get_json(&session, "/api/logs").await?;
    let logs = list["data"].as_array().expect("logs");
    assert_eq!(logs.len(), 3);
    for log in logs {
        assert_eq!(log["encrypted"], true);
        assert!(["Sad", "Hopeful", "Tired"].contains(&log["emotion"].as_str().unwrap_or("")));
    }

    // new logs are encrypted at rest straight away
    let created = server.create_log(&session, json!({ "emotion": "Fine" })).await?;
    assert_eq!(created["encrypted"], true);
    assert_eq!(created["emotion"], "Fine");

    // mood series is unaffected
    let (_, mood) = server.get_json(&session, "/api/logs/mood").await?;
    assert_eq!(mood["data"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn same_passcode_twice_skips_everything() -> Result<()> {
    let server = common::TestServer::start().await?;
    let session = server.register("twice@example.com").await?;
    server.create_log(&session, json!({ "emotion": "A" })).await?;
    server.create_log(&session, json!({ "emotion": "B" })).await?;

    change_passcode(&server, &session, json!({ "passcode": 4321 })).await?;
    server.wait_for_job(&session).await?;

    let (status, _) = change_passcode(&server, &session, json!({ "passcode": "4321" })).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job = server.wait_for_job(&session).await?;
    assert_eq!(job["state"], "completed");
    assert_eq!(job["processed"], 0);
    assert_eq!(job["skipped"], 2);
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_rejected() -> Result<()> {
    let server = common::TestServer::start().await?;
    let session = server.register("bad@example.com").await?;

    for body in [
        json!({ "passcode": "12a4" }),
        json!({ "passcode": "12345" }),
        json!({}),
        json!({ "passcode": "1234", "clientSalt": "%%%" }),
        json!({ "passcode": "1234", "clientSalt": 5 }),
    ] {
        let (status, res) = change_passcode(&server, &session, body.clone()).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(res["success"], false);
        assert!(res["message"].is_string(), "body {}", body);
    }

    let (_, status) = server.get_json(&session, "/api/passphrase/status").await?;
    assert!(status["job"].is_null());
    Ok(())
}
