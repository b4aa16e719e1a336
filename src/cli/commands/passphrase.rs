use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use dialoguer::Password;
use serde_json::{json, Value};
use std::io::{self, BufRead, IsTerminal};
use std::time::Duration;

use crate::cli::utils::{api_error_message, api_url, output_success};
use crate::cli::OutputFormat;

#[derive(Args, Debug)]
pub struct Connection {
    #[arg(long, env = "MINDLOG_URL", default_value = "http://127.0.0.1:5000", help = "API base URL")]
    pub server: String,

    #[arg(long, env = "MINDLOG_TOKEN", help = "Bearer token (see `mindlog token`)")]
    pub token: String,
}

#[derive(Subcommand, Debug)]
pub enum PassphraseCommands {
    #[command(about = "Show the latest re-encryption job")]
    Status {
        #[command(flatten)]
        conn: Connection,
    },

    #[command(about = "Change the passcode and start re-encryption")]
    Change {
        #[arg(
            long,
            env = "MINDLOG_PASSCODE",
            hide_env_values = true,
            help = "New 4-digit passcode"
        )]
        passcode: Option<String>,

        #[arg(long, help = "Salt the client used for its own encryption")]
        client_salt: Option<String>,

        #[arg(long, help = "Poll until the job finishes")]
        wait: bool,

        #[command(flatten)]
        conn: Connection,
    },
}

pub async fn handle(cmd: PassphraseCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    match cmd {
        PassphraseCommands::Status { conn } => {
            let job = fetch_status(&client, &conn).await?;
            print_job(&output_format, &job)
        }
        PassphraseCommands::Change {
            passcode,
            client_salt,
            wait,
            conn,
        } => {
            let passcode = resolve_passcode(passcode)?;
            let res = client
                .put(api_url(&conn.server, "/api/passphrase")?)
                .bearer_auth(&conn.token)
                .json(&json!({ "passcode": passcode, "clientSalt": client_salt }))
                .send()
                .await?;
            let status = res.status();
            let body: Value = res.json().await?;
            if !status.is_success() {
                bail!("{} ({})", api_error_message(&body), status);
            }

            output_success(
                &output_format,
                &format!(
                    "Re-encryption started (job {})",
                    body["jobId"].as_str().unwrap_or("-")
                ),
                Some(json!({ "jobId": body["jobId"] })),
            )?;

            if wait {
                let job = wait_for_job(&client, &conn).await?;
                print_job(&output_format, &job)?;
            }
            Ok(())
        }
    }
}

/// Passcode from the flag or env var, else a hidden prompt on a TTY, else
/// the first line of stdin.
fn resolve_passcode(given: Option<String>) -> anyhow::Result<String> {
    if let Some(value) = given.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }

    if io::stdin().is_terminal() {
        return Password::new()
            .with_prompt("New passcode")
            .interact()
            .context("failed to read passcode");
    }

    first_line(io::stdin().lock())
}

fn first_line(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read stdin")?;
    let passcode = line.trim().to_string();
    if passcode.is_empty() {
        bail!("no passcode given; pass --passcode, set MINDLOG_PASSCODE or pipe it on stdin");
    }
    Ok(passcode)
}

async fn fetch_status(client: &reqwest::Client, conn: &Connection) -> anyhow::Result<Value> {
    let res = client
        .get(api_url(&conn.server, "/api/passphrase/status")?)
        .bearer_auth(&conn.token)
        .timeout(Duration::from_secs(10))
        .send()
        .await?;
    let status = res.status();
    let body: Value = res.json().await?;
    if !status.is_success() {
        bail!("{} ({})", api_error_message(&body), status);
    }
    Ok(body["job"].clone())
}

async fn wait_for_job(client: &reqwest::Client, conn: &Connection) -> anyhow::Result<Value> {
    loop {
        let job = fetch_status(client, conn).await?;
        if matches!(job["state"].as_str(), Some("completed") | Some("failed")) {
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

fn print_job(output_format: &OutputFormat, job: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "job": job }))?);
        }
        OutputFormat::Text if job.is_null() => println!("No passcode change on record"),
        OutputFormat::Text => {
            println!("Job:       {}", job["id"].as_str().unwrap_or("-"));
            println!("State:     {}", job["state"].as_str().unwrap_or("-"));
            println!(
                "Progress:  {} processed, {} skipped, {} errors of {}",
                job["processed"], job["skipped"], job["errors"], job["total"]
            );
            if let Some(err) = job["lastError"].as_str() {
                println!("Last error: {}", err);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_passcode_wins() {
        assert_eq!(resolve_passcode(Some("0420".into())).unwrap(), "0420");
    }

    #[test]
    fn stdin_passcode_is_the_trimmed_first_line() {
        assert_eq!(first_line(&b"1234\nignored\n"[..]).unwrap(), "1234");
        assert_eq!(first_line(&b"  9876\r\n"[..]).unwrap(), "9876");
    }

    #[test]
    fn empty_stdin_is_an_error() {
        assert!(first_line(&b""[..]).is_err());
        assert!(first_line(&b"   \n"[..]).is_err());
    }
}
