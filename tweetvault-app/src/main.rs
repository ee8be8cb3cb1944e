use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tweetvault_common::observability::{LogConfig, LogFormat, init_logging};
use tweetvault_config::{VaultConfig, VaultConfigLoader, default_config_path};
use tether::Tether;
mod tether;

#[derive(Parser)]
#[command(name = "tweetvault", version, about = "Archive tweets and extract their media")]
struct Cli {
    /// YAML config file (defaults to the user config dir).
    #[arg(long, global = true, env = "TWEETVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Log encoding: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Mirror logs to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and archive a tweet with its media files.
    Archive { url: String },
    /// Extract video metadata and formats for a tweet.
    Extract { url: String },
}

fn load_config(explicit: Option<PathBuf>) -> Result<VaultConfig> {
    let loader = VaultConfigLoader::new();
    let loader = match explicit {
        Some(path) => loader.with_file(path),
        None => match default_config_path() {
            Some(path) => loader.with_optional_file(path),
            None => loader,
        },
    };
    Ok(loader.load()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Env wins over the file.
    let cfg = load_config(cli.config)?;

    let log_path = init_logging(LogConfig {
        emit_stderr: cli.verbose,
        format: LogFormat::parse(&cli.log_format),
        ..LogConfig::default()
    })?;
    tracing::debug!(log = %log_path.display(), "logging initialised");

    let tether = Tether::new(cfg);
    let output = match cli.command {
        Command::Archive { url } => {
            let session = tether.session().await?;
            match session.download(&url).await? {
                Some(archived) => serde_json::to_string_pretty(&archived)?,
                None => {
                    tracing::warn!(%url, "not a tweet url, nothing archived");
                    return Ok(());
                }
            }
        }
        Command::Extract { url } => {
            let extractor = tether.extractor()?;
            match extractor.extract(&url).await {
                Ok(extraction) => serde_json::to_string_pretty(&extraction)?,
                Err(e) if e.is_expected() => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    };
    println!("{output}");
    Ok(())
}
