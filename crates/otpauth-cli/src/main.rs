//! otpauth — entry point.
//!
//! A TOTP credential manager for the terminal. Secrets live in a local JSON
//! vault; codes are generated on demand; and two otpauth instances on the
//! same LAN can hand a vault over via ad-hoc discovery and a one-time PIN.
//!
//! # Usage
//!
//! ```text
//! otpauth add <NAME> <SECRET>     Store a new secret
//! otpauth now <NAME>              Print the current code
//! otpauth list                    List accounts with masked secrets
//! otpauth rename <OLD> <NEW>      Rename an account
//! otpauth delete <NAME>           Delete an account
//! otpauth export [--format]       Dump the vault (plain or json)
//! otpauth sync send               Announce and serve the vault to a peer
//! otpauth sync receive            Scan, enter the PIN, receive a vault
//! ```
//!
//! The sync commands are interactive: `send` prints a freshly generated
//! 6-digit PIN and waits; `receive` lists discovered devices and prompts for
//! a selection and the PIN on stdin.

use std::io::Write;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use otpauth_cli::application::{sync_receive, sync_send};
use otpauth_cli::infrastructure::network::ServeOutcome;
use otpauth_cli::infrastructure::storage::{load_config, AppConfig, VaultStore};
use otpauth_core::TotpGenerator;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// TOTP credential manager with LAN sync.
#[derive(Debug, Parser)]
#[command(
    name = "otpauth",
    about = "TOTP credential manager with LAN sync",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a new secret under a name.
    Add {
        /// Account name, e.g. "github" or "work".
        name: String,
        /// Base32-encoded TOTP secret.
        secret: String,
    },
    /// Print the current code for a stored account.
    Now {
        /// Account name.
        name: String,
        /// Code length (6 to 8 digits).
        #[arg(long, default_value_t = 6)]
        digits: u32,
    },
    /// List stored accounts with masked secrets.
    List,
    /// Rename a stored account.
    Rename {
        /// Current account name.
        old: String,
        /// New account name.
        new: String,
    },
    /// Delete a stored account.
    Delete {
        /// Account name.
        name: String,
    },
    /// Export all stored secrets.
    Export {
        /// Output format.
        #[arg(long, value_enum, default_value = "plain")]
        format: ExportFormat,
    },
    /// Exchange secrets with another otpauth instance on the LAN.
    Sync {
        #[command(subcommand)]
        direction: SyncDirection,
    },
}

#[derive(Debug, Subcommand)]
enum SyncDirection {
    /// Announce this device and serve the vault to a peer that knows the PIN.
    Send {
        /// Override the TCP transfer port.
        #[arg(long, env = "OTPAUTH_TRANSFER_PORT")]
        port: Option<u16>,
        /// Override the advertised device name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Scan for a sending device and receive its vault.
    Receive {
        /// Override the scan window in seconds.
        #[arg(long)]
        window: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    /// One "name: secret" line per entry.
    Plain,
    /// The vault as a JSON object.
    Json,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config().context("failed to load configuration")?;

    // Level is overridden by `RUST_LOG`; otherwise the configured default.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.device.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("otpauth starting");

    match cli.command {
        Command::Add { name, secret } => run_add(&name, &secret),
        Command::Now { name, digits } => run_now(&name, digits),
        Command::List => run_list(),
        Command::Rename { old, new } => run_rename(&old, &new),
        Command::Delete { name } => run_delete(&name),
        Command::Export { format } => run_export(format),
        Command::Sync { direction } => match direction {
            SyncDirection::Send { port, name } => run_sync_send(&config, port, name).await,
            SyncDirection::Receive { window } => run_sync_receive(&config, window).await,
        },
    }
}

// ── Vault commands ────────────────────────────────────────────────────────────

fn run_add(name: &str, secret: &str) -> anyhow::Result<()> {
    // Generating one code up front catches bad secrets before they are
    // stored, the same check the interactive original performed.
    TotpGenerator::new(secret).with_context(|| format!("cannot add '{name}'"))?;

    let store = VaultStore::open_default()?;
    store.add(name, secret)?;
    println!("Added: {name}");
    Ok(())
}

fn run_now(name: &str, digits: u32) -> anyhow::Result<()> {
    let store = VaultStore::open_default()?;
    let secrets = store.load()?;
    let secret = secrets
        .get(name)
        .with_context(|| format!("no entry named '{name}'"))?;

    let generator = TotpGenerator::with_digits(secret, digits)?;
    println!("{}  (valid for {}s)", generator.code(), generator.remaining());
    Ok(())
}

fn run_list() -> anyhow::Result<()> {
    let store = VaultStore::open_default()?;
    let secrets = store.load()?;

    if secrets.is_empty() {
        println!("No stored secrets.");
        return Ok(());
    }

    for (name, secret) in secrets.iter() {
        println!("{name}  {}", mask_secret(secret));
    }
    println!("\nTotal: {} account(s)", secrets.len());
    Ok(())
}

fn run_rename(old: &str, new: &str) -> anyhow::Result<()> {
    let store = VaultStore::open_default()?;
    store.rename(old, new)?;
    println!("{old} -> {new}");
    Ok(())
}

fn run_delete(name: &str) -> anyhow::Result<()> {
    let store = VaultStore::open_default()?;
    store.delete(name)?;
    println!("Deleted: {name}");
    Ok(())
}

fn run_export(format: ExportFormat) -> anyhow::Result<()> {
    let store = VaultStore::open_default()?;
    let secrets = store.load()?;

    if secrets.is_empty() {
        println!("No stored secrets.");
        return Ok(());
    }

    match format {
        ExportFormat::Json => println!("{}", serde_json::to_string_pretty(&secrets)?),
        ExportFormat::Plain => {
            for (name, secret) in secrets.iter() {
                println!("{name}: {secret}");
            }
        }
    }
    Ok(())
}

// ── Sync commands ─────────────────────────────────────────────────────────────

async fn run_sync_send(
    config: &AppConfig,
    port: Option<u16>,
    name: Option<String>,
) -> anyhow::Result<()> {
    let mut sync = config.sync.clone();
    if let Some(p) = port {
        sync.transfer_port = p;
    }
    let device_name = name.unwrap_or_else(|| config.device.name.clone());

    let store = VaultStore::open_default()?;
    let secrets = store.load()?;
    if secrets.is_empty() {
        println!("The vault is empty; an empty secret set will be offered.");
    }

    let pin = sync_send::generate_pin();
    println!("PIN: {pin}");
    println!(
        "Waiting for a receiver to connect ({}s timeout)...",
        sync.accept_timeout_secs
    );

    match sync_send::run_sender(&sync, &device_name, &secrets, &pin).await? {
        ServeOutcome::Sent(n) => println!("Sent {n} {}.", plural(n, "entry", "entries")),
        ServeOutcome::Rejected => {
            println!("PIN mismatch; nothing was sent. Start a new sync to retry.")
        }
        ServeOutcome::TimedOut => println!("No receiver connected."),
    }
    Ok(())
}

async fn run_sync_receive(config: &AppConfig, window: Option<u64>) -> anyhow::Result<()> {
    let mut sync = config.sync.clone();
    if let Some(w) = window {
        sync.scan_window_secs = w;
    }

    println!("Scanning for devices ({}s)...", sync.scan_window_secs);
    let devices = sync_receive::discover(&sync)
        .await
        .context("device scan failed")?;

    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("Devices found:");
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {device}", i + 1);
    }

    let choice = prompt("Select device: ")?;
    let index: usize = choice.parse().context("selection must be a number")?;
    let descriptor = index
        .checked_sub(1)
        .and_then(|i| devices.get(i))
        .context("selection out of range")?;

    let pin = prompt("Enter PIN: ")?;

    let store = VaultStore::open_default()?;
    let merged = sync_receive::receive_from(&store, descriptor, &pin, &sync).await?;
    println!("Received and merged {merged} {}.", plural(merged, "entry", "entries"));
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Reads one trimmed line from stdin after printing `message`.
fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Masks a secret for display, keeping at most the first and last 4 chars.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}****{tail}")
    } else {
        "****".to_string()
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_add_command() {
        // Arrange / Act
        let cli = Cli::parse_from(["otpauth", "add", "github", "JBSWY3DPEHPK3PXP"]);

        // Assert
        match cli.command {
            Command::Add { name, secret } => {
                assert_eq!(name, "github");
                assert_eq!(secret, "JBSWY3DPEHPK3PXP");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_now_default_digits_is_six() {
        let cli = Cli::parse_from(["otpauth", "now", "github"]);
        match cli.command {
            Command::Now { digits, .. } => assert_eq!(digits, 6),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_now_digits_override() {
        let cli = Cli::parse_from(["otpauth", "now", "github", "--digits", "8"]);
        match cli.command {
            Command::Now { digits, .. } => assert_eq!(digits, 8),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_export_default_format_is_plain() {
        let cli = Cli::parse_from(["otpauth", "export"]);
        match cli.command {
            Command::Export { format } => assert_eq!(format, ExportFormat::Plain),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_sync_send_port_override() {
        let cli = Cli::parse_from(["otpauth", "sync", "send", "--port", "12000"]);
        match cli.command {
            Command::Sync {
                direction: SyncDirection::Send { port, .. },
            } => assert_eq!(port, Some(12000)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_sync_receive_window_override() {
        let cli = Cli::parse_from(["otpauth", "sync", "receive", "--window", "3"]);
        match cli.command {
            Command::Sync {
                direction: SyncDirection::Receive { window },
            } => assert_eq!(window, Some(3)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_mask_secret_keeps_only_edges_of_long_secrets() {
        assert_eq!(mask_secret("JBSWY3DPEHPK3PXP"), "JBSW****3PXP");
    }

    #[test]
    fn test_mask_secret_hides_short_secrets_entirely() {
        assert_eq!(mask_secret("ABCDEF"), "****");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn test_plural_helper() {
        assert_eq!(plural(1, "entry", "entries"), "entry");
        assert_eq!(plural(0, "entry", "entries"), "entries");
        assert_eq!(plural(2, "entry", "entries"), "entries");
    }
}
