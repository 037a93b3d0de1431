//! campus - terminal front end for the campus session core.
//!
//! Boots the session manager the way the mobile app does: hydrate from
//! secure storage first, sign in only if that fails, then show the home
//! view for the signed-in role.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use campus_core::{
    ApiClient, Config, SessionError, SessionManager, SessionSnapshot, SessionStatus,
    StorageBackend,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Sign-in prompts before giving up
const MAX_SIGN_IN_ATTEMPTS: usize = 3;

/// Daily-rolled log file name prefix in the cache directory
const LOG_FILE_PREFIX: &str = "campus.log";

const ENV_USERNAME: &str = "CAMPUS_USERNAME";
const ENV_PASSPHRASE: &str = "CAMPUS_STORAGE_PASSPHRASE";

const USAGE: &str = "\
Usage: campus [COMMAND] [--ephemeral]

Commands:
  (none)     Restore the session, signing in if needed, and show the home view
  sign-in    Sign in, replacing any current session
  sign-out   Sign out and remove stored credentials
  status     Show the current session state

Options:
  --ephemeral  Keep credentials in memory only for this run
  -h, --help   Show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Home,
    SignIn,
    SignOut,
    Status,
}

#[derive(Debug, PartialEq, Eq)]
struct Cli {
    command: Command,
    ephemeral: bool,
}

impl Cli {
    /// `None` means help was requested.
    fn parse(args: &[String]) -> Result<Option<Self>> {
        let mut command = Command::Home;
        let mut ephemeral = false;

        for arg in args {
            match arg.as_str() {
                "-h" | "--help" | "help" => return Ok(None),
                "--ephemeral" => ephemeral = true,
                "sign-in" | "login" => command = Command::SignIn,
                "sign-out" | "logout" => command = Command::SignOut,
                "status" => command = Command::Status,
                other => anyhow::bail!("Unknown argument: {}\n\n{}", other, USAGE),
            }
        }

        Ok(Some(Self { command, ephemeral }))
    }
}

/// Initialize the tracing subscriber for logging.
/// Stderr gets everything the filter lets through; when a log directory is
/// available the same events also go to a daily file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cli) = Cli::parse(&args)? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let (mut config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_env();
    if cli.ephemeral {
        config.storage_backend = StorageBackend::Memory;
    }

    let log_dir = config.cache_dir().ok();
    let _log_guard = init_tracing(log_dir.as_deref());
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(api = %config.api_base_url, storage = ?config.storage_backend, "campus starting");

    let manager = build_manager(&config).await?;

    // Nothing gated renders until this resolves
    manager.hydrate().await;

    match cli.command {
        Command::Status => print_status(&manager.snapshot()),
        Command::SignOut => sign_out(&manager).await,
        Command::SignIn => {
            sign_in_interactive(&manager, &mut config).await?;
            print_home(&manager.snapshot());
        }
        Command::Home => {
            if !manager.snapshot().is_authenticated() {
                sign_in_interactive(&manager, &mut config).await?;
            }
            print_home(&manager.snapshot());
        }
    }

    info!("campus shutting down");
    Ok(())
}

async fn build_manager(config: &Config) -> Result<SessionManager> {
    let passphrase = std::env::var(ENV_PASSPHRASE).ok();
    let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));

    let store = config
        .storage_backend
        .open(&data_dir, passphrase.as_deref())
        .await
        .context("Failed to open secure storage")?;
    let remote = ApiClient::with_timeout(config.api_base_url.clone(), config.request_timeout())
        .context("Failed to create API client")?;

    Ok(SessionManager::new(store, Arc::new(remote))
        .with_policy(config.hydration_policy)
        .with_request_timeout(config.request_timeout()))
}

// ============================================================================
// Commands
// ============================================================================

async fn sign_in_interactive(manager: &SessionManager, config: &mut Config) -> Result<()> {
    println!("\n=== Campus Sign In ===\n");

    let default_identifier = std::env::var(ENV_USERNAME)
        .ok()
        .or_else(|| config.last_identifier.clone());

    for attempt in 1..=MAX_SIGN_IN_ATTEMPTS {
        let identifier = prompt_identifier(default_identifier.as_deref())?;
        let password = rpassword::prompt_password("Password: ")?;

        println!("\nSigning in...");

        match manager.sign_in(&identifier, &password).await {
            Ok(user) => {
                println!("Welcome, {}!\n", user.name);
                config.last_identifier = Some(identifier.trim().to_string());
                if let Err(e) = config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                return Ok(());
            }
            // Retrying won't fix a storage problem
            Err(e @ SessionError::Persistence(_)) => return Err(e.into()),
            Err(e) => {
                eprintln!("Sign-in failed: {}", e);
                if attempt < MAX_SIGN_IN_ATTEMPTS {
                    eprintln!("Please try again.\n");
                }
            }
        }
    }

    anyhow::bail!("Sign-in failed after {} attempts", MAX_SIGN_IN_ATTEMPTS)
}

fn prompt_identifier(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match default {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

async fn sign_out(manager: &SessionManager) {
    match manager.sign_out().await {
        Ok(()) => println!("Signed out."),
        Err(e) => eprintln!("Signed out, but stored credentials could not be removed: {}", e),
    }
}

// ============================================================================
// Output
// ============================================================================

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Uninitialized => "not started",
        SessionStatus::Hydrating => "restoring",
        SessionStatus::Authenticated => "signed in",
        SessionStatus::Unauthenticated => "signed out",
    }
}

fn print_status(snapshot: &SessionSnapshot) {
    println!("Status: {}", status_label(snapshot.status()));

    if let Some(session) = snapshot.session() {
        let user = session.user();
        println!("User:   {} <{}>", user.name, session.identifier());
        println!("Role:   {}", user.role);
        if let Some(ref id) = user.id {
            println!("ID:     {}", id);
        }
        println!(
            "Since:  {}",
            session.authenticated_at().format("%Y-%m-%d %H:%M UTC")
        );
        if session.is_offline() {
            println!("Mode:   offline (server unreachable at startup)");
        }
    }

    if let Some(error) = snapshot.error() {
        println!("Error:  {}", error);
    }
}

fn print_home(snapshot: &SessionSnapshot) {
    let (Some(view), Some(user)) = (snapshot.home_view(), snapshot.user()) else {
        println!("Not signed in.");
        return;
    };

    println!("{} - {}", view.title(), user.name);
    if snapshot.session().is_some_and(|s| s.is_offline()) {
        println!("(offline - showing your last known session)");
    }
    for capability in view.capabilities() {
        println!("  - {}", capability.label());
    }
}
