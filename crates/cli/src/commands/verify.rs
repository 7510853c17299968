use ppom_core::{config::AppConfig, integrity, state::StateStore};
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

use super::utils::{
    load_state, open_storage, print_error, print_info, print_success, resolve_data_dir, CliError,
    CliResult,
};

/// Re-checks every stored file against its recorded checksum and, when the
/// persisted manifest lists it, against its signature.
pub async fn verify_data_dir(config: &AppConfig, data_dir: Option<PathBuf>) -> CliResult<()> {
    let data_dir = resolve_data_dir(data_dir, config)?;
    let state = Arc::new(StateStore::with_state(load_state(&data_dir).await?));
    let storage = open_storage(&data_dir, &state);

    let snapshot = state.snapshot();
    if snapshot.storage_metadata.is_empty() {
        print_info(&format!("No stored files recorded in {}", data_dir.display()));
        return Ok(());
    }

    let mut failures = 0usize;
    for entry in &snapshot.storage_metadata {
        let key = entry.key();
        let data = match storage.read_file(&entry.name, &entry.chain_id).await {
            Ok(data) => data,
            Err(e) => {
                print_error(&format!("{key}: {e}"));
                failures += 1;
                continue;
            }
        };

        let descriptor = snapshot.version_info.iter().find(|descriptor| descriptor.matches(entry));
        if let Some(descriptor) = descriptor {
            if let Err(e) = integrity::verify_signature(
                &data,
                &descriptor.signature,
                &config.cdn.public_key,
                &descriptor.file_path,
            ) {
                print_error(&format!("{key}: {e}"));
                failures += 1;
                continue;
            }
        } else {
            debug!(file = %key, "no manifest entry, checksum only");
        }
        println!("  {key} ok ({} bytes)", data.len());
    }

    if failures > 0 {
        return Err(CliError::Verification(format!("{failures} file(s) failed")));
    }
    print_success(&format!("{} file(s) verified", snapshot.storage_metadata.len()));
    Ok(())
}
