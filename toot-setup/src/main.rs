//! toot-setup - Register with an instance and log in

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use libtootcast::config::APPLICATION_NAME;
use libtootcast::remote::mastodon::MastodonBackend;
use libtootcast::{
    logging, ConfigError, ConfigStore, CredentialState, LoginCredentials, SessionManager,
    TootcastError, Url,
};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "toot-setup")]
#[command(version, about = "Register Tootcast with a Mastodon instance and log in")]
#[command(long_about = r#"Register Tootcast with a Mastodon instance and log in.

Each step is saved as soon as it succeeds, so an interrupted setup resumes
where it stopped. Running it again once authenticated does nothing.

EXAMPLES:
    # First run against a new instance
    toot-setup --instance https://mastodon.social --username alice@example.com

    # Non-interactive, password from a secret manager
    pass show mastodon | toot-setup --username alice@example.com --password-stdin

    # Drop a token the instance no longer accepts and log in again
    toot-setup --relogin

EXIT CODES:
    0 - Authenticated
    1 - Configuration or network error
    2 - Authentication failed or credentials missing
    3 - Invalid input
"#)]
struct Cli {
    /// Directory holding config.toml (default: TOOTCAST_CONFIG_DIR or the user config dir)
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Instance base URL to record in a fresh config
    #[arg(long, value_name = "URL")]
    instance: Option<String>,

    /// Account to log in as (saved to the config for later runs)
    #[arg(short, long, value_name = "USER")]
    username: Option<String>,

    /// Read the password from the first line of stdin instead of prompting
    #[arg(long)]
    password_stdin: bool,

    /// Remove the stored access token before running
    #[arg(long)]
    relogin: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    logging::from_env(cli.verbose).init();

    if let Err(e) = run(cli) {
        error!("Setup failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        if matches!(
            e.downcast_ref::<TootcastError>(),
            Some(TootcastError::Config(ConfigError::Missing { .. }))
        ) {
            eprintln!("Start with: toot-setup --instance https://your.instance");
        }
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<TootcastError>()
        .map(TootcastError::exit_code)
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::open(cli.config_dir.as_deref()).map_err(TootcastError::from)?;
    debug!(path = %store.path().display(), "Using config file");

    if let Some(instance) = cli.instance.as_deref() {
        let url = parse_instance(instance)?;
        store.init_instance(&url).map_err(TootcastError::from)?;
        println!("Instance set to {}", url);
    }

    let mut document = store.load().map_err(TootcastError::from)?;
    let backend = MastodonBackend::with_user_agent(APPLICATION_NAME)
        .map_err(TootcastError::RemoteUnavailable)?;
    let manager = SessionManager::new(&store, &backend);

    if cli.relogin {
        document = manager.reset_login(document)?;
    }

    let username = cli_username(&cli);
    if let Some(username) = username {
        if document.user.username.as_deref() != Some(username) {
            document.user.username = Some(username.to_string());
            store.save(&document).map_err(TootcastError::from)?;
        }
    }

    let state = CredentialState::classify(&document);
    debug!(%state, "Starting setup");

    let login = match state {
        CredentialState::Unregistered | CredentialState::Registered => {
            Some(read_password(cli.password_stdin)?)
        }
        _ => None,
    };
    let login = login.map(|password| match username {
        Some(username) => LoginCredentials::new(username, password),
        None => LoginCredentials::password_only(password),
    });

    let (document, session) = manager.establish(document, login.as_ref())?;

    println!(
        "Authenticated with {} ({})",
        session.base_url(),
        CredentialState::classify(&document)
    );
    println!("Config saved at {}", store.path().display());
    Ok(())
}

/// `--username` with surrounding whitespace removed; blank counts as not given
fn cli_username(cli: &Cli) -> Option<&str> {
    cli.username
        .as_deref()
        .map(str::trim)
        .filter(|username| !username.is_empty())
}

fn parse_instance(instance: &str) -> Result<Url> {
    let url = Url::parse(instance.trim())
        .map_err(|e| TootcastError::InvalidInput(format!("invalid instance URL '{}': {}", instance, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(TootcastError::InvalidInput(format!(
            "invalid instance URL '{}': expected http(s)://host",
            instance
        ))
        .into());
    }
    Ok(url)
}

fn read_password(from_stdin: bool) -> Result<String> {
    let password = if from_stdin {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password("Password: ").context("Failed to read password")?
    };

    if password.is_empty() {
        return Err(TootcastError::CredentialsRequired.into());
    }
    Ok(password)
}
