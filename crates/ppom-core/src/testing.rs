//! Fixtures shared by unit tests.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{
    chain::{ChainActivityCache, ChainActivityPolicy},
    integrity,
    manifest::{FetchError, FetchResponse, Fetcher, ManifestSync},
    session::{Engine, EngineError, EngineFactory, EngineFile, RelayError, RelayGovernor, RpcProvider},
    state::StateStore,
    storage::{InMemoryStorage, VerifiedStorage},
    types::{FileDescriptor, MANIFEST_FILE_NAME},
};

pub(crate) const CDN: &str = "https://cdn.test";

pub(crate) fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

pub(crate) fn public_key_hex() -> String {
    hex::encode(signing_key().verifying_key().to_bytes())
}

/// Signs `data` the way the CDN does: over the hex digest string.
pub(crate) fn sign(data: &[u8]) -> String {
    hex::encode(signing_key().sign(integrity::digest(data).as_bytes()).to_bytes())
}

pub(crate) fn descriptor(name: &str, chain_id: &str, data: &[u8]) -> FileDescriptor {
    FileDescriptor {
        name: name.to_string(),
        chain_id: chain_id.to_string(),
        version: "1.0.0".to_string(),
        checksum: integrity::digest(data),
        file_path: format!("{chain_id}/{name}.bin"),
        signature: sign(data),
    }
}

/// In-process [`Fetcher`] serving canned responses keyed by CDN path.
///
/// Unknown paths answer 404. No sockets are involved, so it is safe under
/// paused tokio time.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    responses: Mutex<HashMap<String, FetchResponse>>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl StaticFetcher {
    pub(crate) fn serve(&self, path: &str, status: u16, etag: Option<&str>, body: Vec<u8>) {
        self.responses.lock().insert(
            format!("{CDN}/{path}"),
            FetchResponse { status, etag: etag.map(str::to_string), body },
        );
    }

    pub(crate) fn serve_manifest(&self, manifest: &[FileDescriptor], etag: Option<&str>) {
        let body = serde_json::to_vec(manifest).unwrap();
        self.serve(MANIFEST_FILE_NAME, 200, etag, body);
    }

    pub(crate) fn serve_file(&self, descriptor: &FileDescriptor, data: Vec<u8>) {
        self.serve(&descriptor.file_path, 200, None, data);
    }

    pub(crate) fn calls(&self, method: &str, path: &str) -> usize {
        let url = format!("{CDN}/{path}");
        self.calls.lock().iter().filter(|(m, u)| *m == method && *u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn respond(&self, method: &'static str, url: &str) -> FetchResponse {
        self.calls.lock().push((method, url.to_string()));
        self.responses
            .lock()
            .get(url)
            .cloned()
            .unwrap_or(FetchResponse { status: 404, etag: None, body: Vec::new() })
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn head(&self, url: &str, _headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        let mut response = self.respond("HEAD", url);
        response.body.clear();
        Ok(response)
    }

    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        Ok(self.respond("GET", url))
    }
}

pub(crate) struct Harness {
    pub state: Arc<StateStore>,
    pub backend: Arc<InMemoryStorage>,
    pub storage: Arc<VerifiedStorage>,
    pub chains: ChainActivityCache,
    pub fetcher: Arc<StaticFetcher>,
    pub sync: Arc<ManifestSync>,
}

pub(crate) fn harness() -> Harness {
    let state = Arc::new(StateStore::new());
    let backend = Arc::new(InMemoryStorage::new());
    let (read, write) = state.metadata_callbacks();
    let storage = Arc::new(VerifiedStorage::new(backend.clone(), read, write));
    let chains = ChainActivityCache::new(state.clone(), ChainActivityPolicy::default());
    let fetcher = Arc::new(StaticFetcher::default());
    let sync = Arc::new(ManifestSync::new(
        fetcher.clone(),
        storage.clone(),
        chains.clone(),
        state.clone(),
        CDN,
        public_key_hex(),
    ));
    Harness { state, backend, storage, chains, fetcher, sync }
}

/// Provider answering `"0x1"` to everything and recording the methods it saw.
#[derive(Default)]
pub(crate) struct RecordingProvider {
    pub methods: Mutex<Vec<String>>,
}

#[async_trait]
impl RpcProvider for RecordingProvider {
    async fn send(&self, method: &str, _params: Value) -> Result<Value, RelayError> {
        self.methods.lock().push(method.to_string());
        Ok(json!("0x1"))
    }
}

/// Engine whose `validate` relays `{"method", "params"}` to the provider.
struct FakeEngine {
    relay: Arc<RelayGovernor>,
    freed: Arc<AtomicUsize>,
}

#[async_trait]
impl Engine for FakeEngine {
    async fn validate(&self, request: Value) -> Result<Value, EngineError> {
        let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        Ok(self.relay.relay(method, params).await?)
    }

    fn free(self: Box<Self>) {
        self.freed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct FakeEngineFactory {
    pub created: Mutex<Vec<Vec<EngineFile>>>,
    freed: Arc<AtomicUsize>,
}

impl FakeEngineFactory {
    pub(crate) fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create(
        &self,
        relay: Arc<RelayGovernor>,
        files: Vec<EngineFile>,
    ) -> Result<Box<dyn Engine>, EngineError> {
        self.created.lock().push(files);
        Ok(Box::new(FakeEngine { relay, freed: self.freed.clone() }))
    }
}
