//! toot-post - Post a status to a Mastodon instance

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use libtootcast::{logging, ClientOptions, NewStatus, StatusId, TootClient, TootcastError, Visibility};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "toot-post")]
#[command(version, about = "Post a status to a Mastodon instance")]
#[command(long_about = r#"Post a status to a Mastodon instance.

The status text comes from the argument, or from stdin when no argument is
given. Run toot-setup first to register and log in.

EXAMPLES:
    toot-post "Hello fediverse"
    echo "Hello from a pipe" | toot-post --visibility unlisted
    toot-post --reply-to 109876543210 --spoiler "spoilers" "It was the butler"
    toot-post --format json "Hello" | jq -r .id

EXIT CODES:
    0 - Posted
    1 - Configuration, rejection or network error
    2 - Authentication problem (run toot-setup)
    3 - Invalid input (empty text, bad visibility)
"#)]
struct Cli {
    /// Status text (reads from stdin if not provided)
    text: Option<String>,

    /// Visibility: public, unlisted, private or direct
    #[arg(long, value_name = "VISIBILITY")]
    visibility: Option<String>,

    /// Id of the status to reply to
    #[arg(long, value_name = "ID")]
    reply_to: Option<String>,

    /// ISO 639 language code
    #[arg(short, long, value_name = "LANG")]
    language: Option<String>,

    /// Content warning shown before the text
    #[arg(long, value_name = "TEXT")]
    spoiler: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Directory holding config.toml
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    logging::from_env(cli.verbose).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<TootcastError>()
            .map(TootcastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let text = match cli.text.clone() {
        Some(text) => text,
        None => read_stdin()?,
    };
    let status = build_status(&cli, text)?;

    let mut options = ClientOptions::new();
    if let Some(dir) = cli.config_dir.clone() {
        options = options.config_dir(dir);
    }
    let client = TootClient::connect(options)?;

    let id = client.post(&status)?;
    debug!(%id, "Status posted");

    match cli.format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "id": id,
                "instance": client.session().base_url().as_str(),
            });
            println!("{}", serde_json::to_string(&output)?);
        }
        _ => println!("{}", id),
    }

    Ok(())
}

fn read_stdin() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(TootcastError::InvalidInput(
            "no status text given; pass it as an argument or pipe it on stdin".to_string(),
        )
        .into());
    }

    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("Failed to read status text from stdin")?;
    Ok(text)
}

fn build_status(cli: &Cli, text: String) -> Result<NewStatus, TootcastError> {
    let text = text.trim_end().to_string();
    if text.trim().is_empty() {
        return Err(TootcastError::InvalidInput(
            "status text cannot be empty".to_string(),
        ));
    }

    let mut status = NewStatus::new(text);
    if let Some(visibility) = cli.visibility.as_deref() {
        let visibility: Visibility = visibility.parse().map_err(TootcastError::InvalidInput)?;
        status = status.visibility(visibility);
    }
    if let Some(id) = cli.reply_to.as_deref() {
        status = status.in_reply_to(StatusId(id.trim().to_string()));
    }
    if let Some(language) = cli.language.as_deref() {
        status = status.language(language.trim());
    }
    if let Some(spoiler) = cli.spoiler.as_deref() {
        status = status.spoiler_text(spoiler);
    }
    Ok(status)
}
