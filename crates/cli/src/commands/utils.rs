use ppom_core::{
    config::AppConfig,
    state::{ControllerState, StateStore},
    storage::{FileSystemStorage, VerifiedStorage},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Name of the persisted controller state inside a data directory.
pub const STATE_FILE_NAME: &str = "controller_state.json";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Error: {0}")]
    General(String),
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::General(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

pub fn print_warning(message: &str) {
    println!("[WARNING] {message}");
}

/// Loads and validates the configuration, falling back to defaults plus
/// environment overrides when the file does not exist.
pub fn load_config(file: &str) -> CliResult<AppConfig> {
    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;
    config.validate().map_err(CliError::Config)?;
    Ok(config)
}

/// Picks the data directory from the command line or the configuration.
pub fn resolve_data_dir(explicit: Option<PathBuf>, config: &AppConfig) -> CliResult<PathBuf> {
    explicit.or_else(|| config.storage.data_dir.clone()).ok_or_else(|| {
        CliError::Config("no data directory: pass --data-dir or set storage.data_dir".to_string())
    })
}

/// Reads the persisted state of `data_dir`, or an empty state if none exists.
pub async fn load_state(data_dir: &Path) -> CliResult<ControllerState> {
    match tokio::fs::read(data_dir.join(STATE_FILE_NAME)).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ControllerState::default()),
        Err(e) => Err(e.into()),
    }
}

pub async fn save_state(data_dir: &Path, state: &ControllerState) -> CliResult<()> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = data_dir.join(STATE_FILE_NAME);
    let tmp = path.with_extension("json.partial");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

/// Verified storage over `data_dir` whose metadata lives in `state`.
pub fn open_storage(data_dir: &Path, state: &Arc<StateStore>) -> Arc<VerifiedStorage> {
    let (read_metadata, write_metadata) = state.metadata_callbacks();
    Arc::new(VerifiedStorage::new(
        Arc::new(FileSystemStorage::new(data_dir)),
        read_metadata,
        write_metadata,
    ))
}
