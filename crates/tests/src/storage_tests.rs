//! Manifest reconciliation against the file-system backend.

use ppom_core::{
    controller::ControllerError,
    manifest::ManifestError,
    session::SessionError,
    storage::{FileSystemStorage, StorageBackend},
};
use serde_json::json;
use std::sync::Arc;

use crate::mock_infrastructure::{
    build_controller, relay_once, signed_descriptor, test_config, CdnMockBuilder,
    RelayingEngineFactory, RpcMockBuilder,
};

#[tokio::test]
async fn test_files_dropped_from_manifest_are_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> = Arc::new(FileSystemStorage::new(dir.path()));
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let _block_number = rpc.mock_block_number(1, 1).await;

    let blocklist = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let v1 = cdn.mock_manifest(std::slice::from_ref(&blocklist), "\"v1\"").await;
    let _file = cdn.mock_file(&blocklist, b"rules-v1").await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller = build_controller(
        test_config(&cdn.url(), &rpc.url()),
        factory,
        Some(backend.clone()),
        "0x1",
    );

    controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap();
    assert_eq!(std::fs::read(dir.path().join("0x1").join("blocklist")).unwrap(), b"rules-v1");

    v1.remove().await;
    let other = signed_descriptor("stale", "0x38", b"other");
    let _v2 = cdn.mock_manifest(std::slice::from_ref(&other), "\"v2\"").await;

    controller.update_ppom().await.unwrap();

    assert!(!dir.path().join("0x1").join("blocklist").exists());
    assert!(backend.dir().await.unwrap().is_empty());
    assert!(controller.storage().metadata().is_empty());
    assert_eq!(controller.state().snapshot().version_file_etag.as_deref(), Some("\"v2\""));
    controller.shutdown().await;
}

#[tokio::test]
async fn test_restart_reuses_verified_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let block_number = rpc.mock_block_number(2, 2).await;

    let blocklist = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let manifest = cdn.mock_manifest(std::slice::from_ref(&blocklist), "\"v1\"").await;
    let file = cdn.mock_file(&blocklist, b"rules-v1").await;

    let first = build_controller(
        test_config(&cdn.url(), &rpc.url()),
        Arc::new(RelayingEngineFactory::default()),
        Some(Arc::new(FileSystemStorage::new(dir.path()))),
        "0x1",
    );
    first.use_ppom(relay_once("eth_blockNumber")).await.unwrap();
    let persisted = (*first.state().snapshot()).clone();
    first.shutdown().await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let mut config = test_config(&cdn.url(), &rpc.url());
    config.storage.data_dir = Some(dir.path().to_path_buf());
    let second = ppom_core::controller::PpomController::builder()
        .with_config(config)
        .with_engine_factory(factory.clone())
        .with_initial_state(persisted)
        .build()
        .unwrap();
    second.session().set_enabled(true);

    let result = second.use_ppom(relay_once("eth_blockNumber")).await.unwrap();

    assert_eq!(result, json!("0x2"));
    manifest.get.assert_async().await;
    file.assert_async().await;
    block_number.assert_async().await;
    assert_eq!(factory.created()[0][0].data, b"rules-v1".to_vec());
    second.shutdown().await;
}

#[tokio::test]
async fn test_failed_manifest_download_keeps_verified_data() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> = Arc::new(FileSystemStorage::new(dir.path()));
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let block_number = rpc.mock_block_number(7, 2).await;

    let blocklist = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let v1 = cdn.mock_manifest(std::slice::from_ref(&blocklist), "\"v1\"").await;
    let _file = cdn.mock_file(&blocklist, b"rules-v1").await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller = build_controller(
        test_config(&cdn.url(), &rpc.url()),
        factory.clone(),
        Some(backend.clone()),
        "0x1",
    );
    controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap();

    let before = controller.state().snapshot();
    let keys_before = backend.dir().await.unwrap();
    assert_eq!(before.storage_metadata.len(), 1);
    assert_eq!(keys_before.len(), 1);

    v1.remove().await;
    let v2 = cdn.mock_manifest_download_failure("\"v2\"", 500).await;
    let err = controller.update_ppom().await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Session(SessionError::Manifest(ManifestError::ManifestFetchFailed {
            status: Some(500),
            ..
        }))
    ));
    v2.get.assert_async().await;

    v2.remove().await;
    let _down = cdn.mock_manifest_status(500).await;
    assert!(controller.update_ppom().await.is_err());

    let after = controller.state().snapshot();
    assert_eq!(after.storage_metadata, before.storage_metadata);
    assert_eq!(after.version_info, before.version_info);
    assert_eq!(after.version_file_etag.as_deref(), Some("\"v1\""));
    assert_eq!(backend.dir().await.unwrap(), keys_before);
    assert_eq!(std::fs::read(dir.path().join("0x1").join("blocklist")).unwrap(), b"rules-v1");

    let result = controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap();
    assert_eq!(result, json!("0x7"));
    block_number.assert_async().await;
    assert_eq!(factory.created()[1][0].data, b"rules-v1".to_vec());
    controller.shutdown().await;
}
