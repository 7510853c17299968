pub mod config;
pub mod digest;
pub mod sync;
pub mod utils;
pub mod verify;

pub use config::{handle_config_command, ConfigCommands};
pub use digest::digest_file;
pub use sync::{sync_data_dir, SyncOptions};
pub use verify::verify_data_dir;
