// handlers/public/root.rs - GET / handler

use axum::response::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "MindLog API",
            "version": version,
            "description": "Journaling backend with passcode-encrypted emotion logs",
            "endpoints": {
                "home": "/ (public)",
                "health": "/api/health (public)",
                "auth": "/api/auth/register, /api/auth/login (public), /api/auth/me (protected)",
                "logs": "/api/logs[/:id], /api/logs/mood (protected)",
                "passphrase": "/api/passphrase, /api/passphrase/status (protected)",
                "factors": "/api/factors (protected)",
                "anchors": "/api/anchors[/:id[/toggle-favorite]] (protected)",
                "user": "/api/user/avatar (protected)",
            }
        }
    }))
}
