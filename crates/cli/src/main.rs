use clap::{Parser, Subcommand};
use ppom_core::config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
use commands::{
    digest_file, handle_config_command, sync_data_dir, utils::load_config, verify_data_dir,
    ConfigCommands, SyncOptions,
};

#[derive(Parser)]
#[command(name = "ppom-cli")]
#[command(about = "PPOM CLI - Sync and verify PPOM data directories")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(long, global = true, env = "PPOM_CONFIG", default_value = "config/config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the manifest and any missing data files into a directory
    Sync {
        /// Data directory (defaults to storage.data_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Chain to fetch (can be specified multiple times; all chains when omitted)
        #[arg(short, long)]
        chain_id: Vec<String>,
    },

    /// Re-verify every stored file in a directory
    Verify {
        /// Data directory (defaults to storage.data_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Print the SHA-256 digest of a file
    Digest {
        file: PathBuf,

        /// Hex Ed25519 signature over the digest to check
        #[arg(long)]
        signature: Option<String>,

        /// Hex Ed25519 public key for --signature
        #[arg(long)]
        public_key: Option<String>,
    },

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,ppom_core={0},ppom_cli={0}", config.logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let logging_config = AppConfig::from_file(&cli.config).unwrap_or_default();
    init_logging(&logging_config);

    match cli.command {
        Commands::Sync { data_dir, chain_id } => {
            let config = load_config(&cli.config)?;
            sync_data_dir(&config, SyncOptions { data_dir, chain_ids: chain_id }).await?;
        }

        Commands::Verify { data_dir } => {
            let config = load_config(&cli.config)?;
            verify_data_dir(&config, data_dir).await?;
        }

        Commands::Digest { file, signature, public_key } => {
            digest_file(&file, signature.as_deref(), public_key.as_deref()).await?;
        }

        Commands::Config(config_command) => {
            handle_config_command(config_command)?;
        }
    }

    Ok(())
}
