mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn register_login_and_me() -> Result<()> {
    let server = common::TestServer::start().await?;
    let session = server.register("ana@example.com").await?;

    let res = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "ANA@example.com", "password": "hunter22" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert!(body["data"]["token"].as_str().is_some());

    let (status, me) = server.get_json(&session, "/api/auth/me").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["id"], session.user_id.as_str());
    assert_eq!(me["data"]["email"], "ana@example.com");
    assert!(me["data"]["avatarColor"].as_str().unwrap_or("").starts_with('#'));

    // secrets never leave the server
    for field in ["passwordHash", "encSalt", "encKey"] {
        assert!(me["data"].get(field).is_none(), "{} leaked", field);
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_email_conflicts() -> Result<()> {
    let server = common::TestServer::start().await?;
    server.register("dup@example.com").await?;

    let res = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "email": "dup@example.com", "password": "x", "username": "y" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn register_requires_fields() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "email": "someone@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"]["password"].is_string());
    assert!(body["field_errors"]["username"].is_string());
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected_uniformly() -> Result<()> {
    let server = common::TestServer::start().await?;
    server.register("bo@example.com").await?;

    for payload in [
        json!({ "email": "bo@example.com", "password": "wrong" }),
        json!({ "email": "nobody@example.com", "password": "hunter22" }),
        json!({ "email": "bo@example.com" }),
    ] {
        let res = server
            .client
            .post(server.url("/api/auth/login"))
            .json(&payload)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "payload {}", payload);
        let body = res.json::<Value>().await?;
        assert_eq!(body["message"], "Invalid credentials");
    }
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_bad_tokens() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.client.get(server.url("/api/logs")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/api/logs"))
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["code"], "UNAUTHORIZED");
    Ok(())
}
