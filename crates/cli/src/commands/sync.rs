use ppom_core::{
    chain::ChainActivityCache,
    config::AppConfig,
    manifest::{HttpFetcher, HttpFetcherConfig, ManifestSync, SyncOutcome},
    metrics::FetchMode,
    state::StateStore,
};
use std::{collections::BTreeSet, path::PathBuf, sync::Arc};
use tracing::{info, warn};

use super::utils::{
    load_state, open_storage, print_info, print_success, print_warning, resolve_data_dir,
    save_state, CliError, CliResult,
};

/// Options for a one-shot data directory sync.
pub struct SyncOptions {
    pub data_dir: Option<PathBuf>,
    /// Chains to fetch; every chain in the manifest when empty.
    pub chain_ids: Vec<String>,
}

pub async fn sync_data_dir(config: &AppConfig, options: SyncOptions) -> CliResult<()> {
    let data_dir = resolve_data_dir(options.data_dir, config)?;
    print_info(&format!("Syncing {} against {}", data_dir.display(), config.cdn.base_url));

    let state = Arc::new(StateStore::with_state(load_state(&data_dir).await?));
    let storage = open_storage(&data_dir, &state);
    let chains = ChainActivityCache::new(state.clone(), config.chain_policy().map_err(CliError::Config)?);
    for chain_id in &options.chain_ids {
        chains.touch(chain_id);
    }

    let fetcher = HttpFetcher::with_config(HttpFetcherConfig {
        timeout: config.fetch_timeout(),
        ..HttpFetcherConfig::default()
    })
    .map_err(|e| CliError::Sync(e.to_string()))?;

    let sync = ManifestSync::new(
        Arc::new(fetcher),
        storage.clone(),
        chains.clone(),
        state.clone(),
        config.cdn.base_url.clone(),
        config.cdn.public_key.clone(),
    );

    match sync.update_all().await.map_err(|e| CliError::Sync(e.to_string()))? {
        SyncOutcome::Unchanged => print_info("Manifest unchanged"),
        SyncOutcome::Updated { .. } => print_info("Manifest updated"),
    }

    let manifest = sync.manifest();
    let targets: BTreeSet<String> = if options.chain_ids.is_empty() {
        manifest.iter().map(|descriptor| descriptor.chain_id.clone()).collect()
    } else {
        options.chain_ids.into_iter().collect()
    };

    let mut stored = 0usize;
    let mut failed = 0usize;
    for chain_id in &targets {
        let mut chain_failed = false;
        for descriptor in storage.missing_files(&manifest, chain_id) {
            match sync.fetch_and_store(&descriptor, FetchMode::Eager).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    warn!(file = %descriptor.key(), error = %e, "data file fetch failed");
                    print_warning(&format!("{}: {e}", descriptor.key()));
                    chain_failed = true;
                    failed += 1;
                }
            }
        }
        if !chain_failed {
            chains.mark_fetched(chain_id);
        }
    }

    save_state(&data_dir, &state.snapshot()).await?;
    info!(chains = targets.len(), stored, failed, "data directory sync finished");

    if failed > 0 {
        return Err(CliError::Sync(format!("{failed} file(s) could not be fetched")));
    }
    print_success(&format!(
        "{stored} file(s) stored, {} file(s) tracked",
        state.snapshot().storage_metadata.len()
    ));
    Ok(())
}
