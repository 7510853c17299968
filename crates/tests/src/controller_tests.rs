//! Controller scenarios over real HTTP against mocked CDN and provider.

use futures::FutureExt;
use ppom_core::{
    controller::{ControllerError, UseCallback},
    integrity::IntegrityError,
    manifest::ManifestError,
    session::{EngineError, EngineFile, RelayError, SessionError, DEFAULT_PROVIDER_REQUEST_LIMIT},
};
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

use crate::mock_infrastructure::{
    build_controller, relay_once, signed_descriptor, test_config, CdnMockBuilder,
    RelayingEngineFactory, RpcMockBuilder,
};

#[tokio::test]
async fn test_use_builds_engine_from_cdn_files() {
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let descriptor = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let manifest = cdn.mock_manifest(std::slice::from_ref(&descriptor), "\"v1\"").await;
    let file = cdn.mock_file(&descriptor, b"rules-v1").await;
    let block_number = rpc.mock_block_number(16, 1).await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller =
        build_controller(test_config(&cdn.url(), &rpc.url()), factory.clone(), None, "0x1");

    let result = controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap();

    assert_eq!(result, json!("0x10"));
    manifest.get.assert_async().await;
    file.assert_async().await;
    block_number.assert_async().await;
    assert_eq!(
        factory.created(),
        vec![vec![EngineFile { name: "blocklist".to_string(), data: b"rules-v1".to_vec() }]]
    );

    let state = controller.state().snapshot();
    assert_eq!(state.version_file_etag.as_deref(), Some("\"v1\""));
    assert_eq!(state.storage_metadata.len(), 1);
    assert!(!controller.sync().chains().needs_data("0x1"));

    controller.shutdown().await;
    assert_eq!(factory.freed(), 1);
}

#[tokio::test]
async fn test_unchanged_etag_skips_manifest_download() {
    let mut cdn = CdnMockBuilder::new().await;
    let rpc = RpcMockBuilder::new().await;
    let descriptor = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let manifest = cdn.mock_manifest(std::slice::from_ref(&descriptor), "\"v1\"").await;
    let _file = cdn.mock_file(&descriptor, b"rules-v1").await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller = build_controller(test_config(&cdn.url(), &rpc.url()), factory, None, "0x1");

    controller.update_ppom().await.unwrap();
    let version = controller.state().snapshot().version;
    controller.update_ppom().await.unwrap();

    manifest.get.assert_async().await;
    assert_eq!(controller.state().snapshot().version, version);
    controller.shutdown().await;
}

#[tokio::test]
async fn test_manifest_failure_leaves_state_untouched() {
    let mut cdn = CdnMockBuilder::new().await;
    let rpc = RpcMockBuilder::new().await;
    let _manifest = cdn.mock_manifest_status(500).await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller =
        build_controller(test_config(&cdn.url(), &rpc.url()), factory.clone(), None, "0x1");
    let before = controller.state().snapshot();

    let err = controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Session(SessionError::CurrentChainFetch { ref chain_id, .. })
            if chain_id == "0x1"
    ));

    let err = controller.update_ppom().await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Session(SessionError::Manifest(ManifestError::ManifestFetchFailed {
            status: Some(500),
            ..
        }))
    ));

    let after = controller.state().snapshot();
    assert_eq!(after.version_info, before.version_info);
    assert_eq!(after.version_file_etag, before.version_file_etag);
    assert!(after.storage_metadata.is_empty());
    assert!(factory.created().is_empty());
    assert!(controller.sync().chains().needs_data("0x1"));
}

#[tokio::test]
async fn test_tampered_file_is_never_stored() {
    let mut cdn = CdnMockBuilder::new().await;
    let rpc = RpcMockBuilder::new().await;
    let descriptor = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let _manifest = cdn.mock_manifest(std::slice::from_ref(&descriptor), "\"v1\"").await;
    let _file = cdn.mock_file(&descriptor, b"rules-evil").await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller =
        build_controller(test_config(&cdn.url(), &rpc.url()), factory.clone(), None, "0x1");

    let err = controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Session(SessionError::CurrentChainFetch {
            source: ManifestError::Integrity(IntegrityError::SignatureInvalid { .. }),
            ..
        })
    ));
    assert!(controller.storage().metadata().is_empty());
    assert!(factory.created().is_empty());
}

#[tokio::test]
#[serial]
async fn test_relay_limit_resets_between_sessions() {
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let descriptor = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let _manifest = cdn.mock_manifest(std::slice::from_ref(&descriptor), "\"v1\"").await;
    let _file = cdn.mock_file(&descriptor, b"rules-v1").await;
    let block_number = rpc.mock_block_number(1, DEFAULT_PROVIDER_REQUEST_LIMIT + 1).await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller =
        build_controller(test_config(&cdn.url(), &rpc.url()), factory.clone(), None, "0x1");

    let exhaust: UseCallback = Box::new(|engine| {
        async move {
            let request = json!({ "method": "eth_blockNumber", "params": [] });
            for _ in 0..DEFAULT_PROVIDER_REQUEST_LIMIT {
                engine.validate(request.clone()).await?;
            }
            match engine.validate(request).await {
                Err(EngineError::Relay(rejection)) => Ok(rejection.to_json_rpc()),
                other => panic!("expected a relay rejection, got {other:?}"),
            }
        }
        .boxed()
    });

    let rejection = controller.use_ppom(exhaust).await.unwrap();
    assert_eq!(rejection, json!({ "code": -32005, "message": "Limit exceeded" }));

    let result = controller.use_ppom(relay_once("eth_blockNumber")).await.unwrap();
    assert_eq!(result, json!("0x1"));

    block_number.assert_async().await;
    assert_eq!(factory.created().len(), 2);
    assert_eq!(factory.freed(), 1);
    controller.shutdown().await;
}

#[tokio::test]
async fn test_disallowed_method_never_reaches_provider() {
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let descriptor = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let _manifest = cdn.mock_manifest(std::slice::from_ref(&descriptor), "\"v1\"").await;
    let _file = cdn.mock_file(&descriptor, b"rules-v1").await;
    let send = rpc.mock_method("eth_sendRawTransaction", &json!("0xhash"), 0).await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller = build_controller(test_config(&cdn.url(), &rpc.url()), factory, None, "0x1");

    let err = controller.use_ppom(relay_once("eth_sendRawTransaction")).await.unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Session(SessionError::Engine(EngineError::Relay(
            RelayError::MethodNotAllowed { .. }
        )))
    ));
    send.assert_async().await;
    assert_eq!(controller.session().relay().calls(), 1);
    controller.shutdown().await;
}

#[tokio::test]
async fn test_provider_error_is_passed_to_engine() {
    let mut cdn = CdnMockBuilder::new().await;
    let mut rpc = RpcMockBuilder::new().await;
    let descriptor = signed_descriptor("blocklist", "0x1", b"rules-v1");
    let _manifest = cdn.mock_manifest(std::slice::from_ref(&descriptor), "\"v1\"").await;
    let _file = cdn.mock_file(&descriptor, b"rules-v1").await;
    let _call = rpc.mock_error("eth_call", 3, "execution reverted").await;

    let factory = Arc::new(RelayingEngineFactory::default());
    let controller = build_controller(test_config(&cdn.url(), &rpc.url()), factory, None, "0x1");

    let err = controller.use_ppom(relay_once("eth_call")).await.unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Session(SessionError::Engine(EngineError::Relay(RelayError::Rpc {
            code: 3,
            ..
        })))
    ));
    controller.shutdown().await;
}
