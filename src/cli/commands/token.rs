use serde_json::json;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(user_id: Uuid, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let tokens = TokenService::new(
        &config.security.jwt_secret,
        config.security.jwt_expiry_hours,
    )?;
    let token = tokens.issue(user_id)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "success": true,
                "token": token,
                "user_id": user_id,
                "expires_in_hours": tokens.expiry_hours()
            }))?
        ),
        // bare token so it can be captured by scripts
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
