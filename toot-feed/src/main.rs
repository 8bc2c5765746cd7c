//! toot-feed - Show recent statuses of the authenticated account

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use libtootcast::{logging, ClientOptions, Status, StatusFilter, TootClient, TootcastError};

#[derive(Parser, Debug)]
#[command(name = "toot-feed")]
#[command(version, about = "Show recent statuses of the authenticated account")]
#[command(long_about = r#"Show recent statuses of the authenticated account.

EXAMPLES:
    # Last 20 statuses, replies and boosts hidden (default)
    toot-feed

    # More statuses, including replies
    toot-feed --limit 40 --include-replies

    # Pinned statuses only
    toot-feed --pinned

    # JSON output for scripting
    toot-feed --format json | jq '.[] | .url'

    # JSONL output (one JSON object per line)
    toot-feed --format jsonl

OUTPUT FORMATS:
    text  - Timestamp, id and a plain-text preview (default)
    json  - JSON array
    jsonl - JSON lines, one status per line

EXIT CODES:
    0 - Success (including empty results)
    1 - Configuration or network error
    2 - Authentication problem (run toot-setup)
"#)]
struct Args {
    /// Maximum number of statuses (default: defaults.fetch_limit or 20)
    #[arg(short, long, value_name = "N")]
    limit: Option<u32>,

    /// Include replies
    #[arg(long)]
    include_replies: bool,

    /// Include boosts
    #[arg(long)]
    include_reblogs: bool,

    /// Only pinned statuses
    #[arg(long)]
    pinned: bool,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Directory holding config.toml
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

const PREVIEW_CHARS: usize = 60;

fn main() {
    let args = Args::parse();

    logging::from_env(args.verbose).init();

    tracing::debug!("toot-feed started with args: {:?}", args);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<TootcastError>()
            .map(TootcastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<()> {
    let mut options = ClientOptions::new();
    if let Some(dir) = args.config_dir.clone() {
        options = options.config_dir(dir);
    }
    let client = TootClient::connect(options)?;

    let default_limit = client
        .document()
        .defaults
        .fetch_limit
        .unwrap_or(StatusFilter::default().limit);
    let filter = StatusFilter {
        limit: args.limit.unwrap_or(default_limit),
        exclude_replies: !args.include_replies,
        exclude_reblogs: !args.include_reblogs,
        pinned: args.pinned,
    };

    let query = client.fetch_statuses(filter);

    match args.format.as_str() {
        "json" => {
            let statuses = query.fetch()?;
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        "jsonl" => {
            for status in &query {
                println!("{}", serde_json::to_string(&status?)?);
            }
        }
        _ => {
            for status in &query {
                print_text(&status?);
            }
        }
    }

    Ok(())
}

fn print_text(status: &Status) {
    let timestamp = status.created_at.format("%Y-%m-%d %H:%M:%S");
    let text = if status.spoiler_text.is_empty() {
        plain_text(&status.content)
    } else {
        format!("[CW: {}]", status.spoiler_text)
    };

    println!("{} | {} | {}", timestamp, status.id, preview(&text));
    if let Some(url) = status.url.as_deref() {
        println!("  {}", url);
    }
}

/// Strip HTML tags and decode the common entities
fn plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .trim()
        .to_string()
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(plain_text("<p>Hello &amp; welcome</p>"), "Hello & welcome");
        assert_eq!(plain_text("<p>one</p><p>two</p>"), "one two");
        assert_eq!(plain_text("no markup"), "no markup");
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        let long = "é".repeat(PREVIEW_CHARS + 5);
        let result = preview(&long);
        assert!(result.ends_with("..."));
        assert_eq!(result.chars().count(), PREVIEW_CHARS + 3);

        assert_eq!(preview("short"), "short");
    }
}
