//! Test helpers for signing fixtures and building controllers.

use ed25519_dalek::{Signer, SigningKey};
use futures::FutureExt;
use ppom_core::{
    config::AppConfig,
    controller::{PpomController, UseCallback},
    integrity,
    session::SessionError,
    storage::StorageBackend,
    types::FileDescriptor,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::RelayingEngineFactory;

/// Key the mocked CDN signs with.
#[must_use]
pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

#[must_use]
pub fn public_key_hex() -> String {
    hex::encode(signing_key().verifying_key().to_bytes())
}

/// Signs the hex digest of `data`, as the CDN does.
#[must_use]
pub fn sign(data: &[u8]) -> String {
    hex::encode(signing_key().sign(integrity::digest(data).as_bytes()).to_bytes())
}

/// Manifest entry for `data` stored at `<chain_id>/<name>.bin`.
#[must_use]
pub fn signed_descriptor(name: &str, chain_id: &str, data: &[u8]) -> FileDescriptor {
    FileDescriptor {
        name: name.to_string(),
        chain_id: chain_id.to_string(),
        version: "1.0.0".to_string(),
        checksum: integrity::digest(data),
        file_path: format!("{chain_id}/{name}.bin"),
        signature: sign(data),
    }
}

/// Configuration pointing at the mocked CDN and provider.
#[must_use]
pub fn test_config(cdn_url: &str, rpc_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.cdn.base_url = cdn_url.to_string();
    config.cdn.public_key = public_key_hex();
    config.session.rpc_url = Some(rpc_url.to_string());
    config
}

/// Builds a controller over HTTP with the feature enabled but no periodic
/// sync, so request counts stay deterministic.
///
/// # Panics
///
/// Panics if the controller fails to build.
#[must_use]
pub fn build_controller(
    config: AppConfig,
    factory: Arc<RelayingEngineFactory>,
    backend: Option<Arc<dyn StorageBackend>>,
    chain_id: &str,
) -> PpomController {
    let mut builder = PpomController::builder()
        .with_config(config)
        .with_engine_factory(factory)
        .with_initial_chain(chain_id);
    if let Some(backend) = backend {
        builder = builder.with_storage_backend(backend);
    }
    let controller = builder.build().expect("controller builds");
    controller.session().set_enabled(true);
    controller
}

/// Callback relaying `method` once and returning its result.
#[must_use]
pub fn relay_once(method: &'static str) -> UseCallback {
    Box::new(move |engine| {
        async move {
            let result = engine.validate(json!({ "method": method, "params": [] })).await?;
            Ok::<Value, SessionError>(result)
        }
        .boxed()
    })
}
