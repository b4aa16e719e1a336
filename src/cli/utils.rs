use serde_json::{json, Value};
use url::Url;

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Join an API path onto the server base URL
pub fn api_url(server: &str, path: &str) -> anyhow::Result<Url> {
    let base = Url::parse(server)
        .map_err(|e| anyhow::anyhow!("invalid server URL '{}': {}", server, e))?;
    Ok(base.join(path)?)
}

/// Pull the server's error message out of a failed API response body
pub fn api_error_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string()
}
