use clap::Subcommand;
use ppom_core::config::AppConfig;
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the current configuration
    Validate {
        /// Path to config file (defaults to config/config.toml)
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },

    /// Show current configuration
    Show {
        /// Path to config file (defaults to config/config.toml)
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,

        /// Show sensitive values (like the RPC URL)
        #[arg(long)]
        show_sensitive: bool,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = "config/config.toml")]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::Show { file, show_sensitive } => show_config(&file, show_sensitive),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  CDN: {}", config.cdn.base_url);
    println!(
        "  Security alerts: {}",
        if config.session.security_alerts_enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  Storage: {}",
        config
            .storage
            .data_dir
            .as_ref()
            .map_or_else(|| "in-memory".to_string(), |dir| dir.display().to_string())
    );

    Ok(())
}

fn show_config(file: &str, show_sensitive: bool) -> CliResult<()> {
    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;

    println!("Configuration from {file}:");

    println!("\n[CDN]");
    println!("  Base URL: {}", config.cdn.base_url);
    println!("  Public Key: {}", config.cdn.public_key);
    println!("  Fetch Timeout: {}s", config.cdn.fetch_timeout_seconds);

    println!("\n[Sync]");
    println!("  Data Update Interval: {}s", config.sync.data_update_interval_seconds);
    println!("  File Fetch Window: {}s", config.sync.file_fetch_window_seconds);
    println!("  File Fetch Tick: {}s", config.sync.file_fetch_tick_seconds);

    println!("\n[Chains]");
    println!("  Tracked: {}..={}", config.chains.min_tracked, config.chains.max_tracked);
    println!("  Retention: {}s", config.chains.retention_seconds);

    println!("\n[Session]");
    println!("  Security Alerts Enabled: {}", config.session.security_alerts_enabled);
    println!("  Provider Request Limit: {}", config.session.provider_request_limit);
    match &config.session.rpc_url {
        Some(url) if show_sensitive => println!("  RPC URL: {url}"),
        Some(_) => println!("  RPC URL: [hidden - use --show-sensitive to reveal]"),
        None => println!("  RPC URL: (not set)"),
    }

    println!("\n[Storage]");
    match &config.storage.data_dir {
        Some(dir) => println!("  Data Directory: {}", dir.display()),
        None => println!("  Data Directory: (in-memory)"),
    }

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# PPOM data sync configuration

[cdn]
base_url = "https://static.cx.metamask.io/api/v1/confirmations/ppom"
# Hex-encoded Ed25519 key the data files are signed with
public_key = "YOUR_PUBLIC_KEY"
fetch_timeout_seconds = 10

[sync]
data_update_interval_seconds = 3600
file_fetch_window_seconds = 3600
file_fetch_tick_seconds = 300

[chains]
max_tracked = 5
min_tracked = 2
retention_seconds = 604800

[session]
security_alerts_enabled = false
provider_request_limit = 300
# rpc_url = "https://mainnet.infura.io/v3/YOUR_API_KEY"

[storage]
data_dir = "data/ppom"

[logging]
level = "info"
format = "pretty"
"#;

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "File {output} already exists. Use --force to overwrite."
        )));
    }

    if let Some(parent) = Path::new(output).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration generated: {output}"));
    print_info("Remember to replace YOUR_PUBLIC_KEY with the CDN signing key");

    Ok(())
}
