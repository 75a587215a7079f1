//! Integration tests for the bridge gateway against an in-process fake bridge.

mod common;

use common::{BridgeState, FakeBridge, GROUP_ID, KNOWN_LINK};
use countdown_notifier::daemon::config::GatewayConfig;
use countdown_notifier::gateway::bridge::BridgeGateway;
use countdown_notifier::gateway::{ChatGateway, GroupId, OutboundMessage};

#[tokio::test]
async fn connect_with_existing_session() {
    let bridge = FakeBridge::paired().await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();

    assert!(!gw.is_connected().await);
    gw.connect().await.unwrap();
    assert!(gw.is_connected().await);
    assert_eq!(bridge.state.lock().unwrap().connect_calls, 1);
}

#[tokio::test]
async fn connect_waits_for_pairing() {
    let bridge = FakeBridge::start(BridgeState {
        pair_after_connects: 2,
        ..Default::default()
    })
    .await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();

    gw.connect().await.unwrap();

    let state = bridge.state.lock().unwrap();
    assert!(state.logged_in);
    assert!(state.connected);
    assert_eq!(state.connect_calls, 3);
}

#[tokio::test]
async fn disconnect_drops_session() {
    let bridge = FakeBridge::paired().await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();
    gw.connect().await.unwrap();

    gw.disconnect().await;

    assert!(!gw.is_connected().await);
    assert_eq!(bridge.state.lock().unwrap().disconnect_calls, 1);
}

#[tokio::test]
async fn resolve_known_and_unknown_links() {
    let bridge = FakeBridge::paired().await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();

    let group = gw.resolve_group_by_invite_link(KNOWN_LINK).await.unwrap();
    assert_eq!(group, GroupId(GROUP_ID.into()));

    let err = gw
        .resolve_group_by_invite_link("https://chat.whatsapp.com/revoked")
        .await
        .unwrap_err();
    assert!(err.reason.contains("404"), "got: {err}");
    assert!(err.reason.contains("invite link not found"), "got: {err}");
}

#[tokio::test]
async fn send_text_reaches_bridge() {
    let bridge = FakeBridge::paired().await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();
    gw.connect().await.unwrap();

    let msg = OutboundMessage {
        group: GroupId(GROUP_ID.into()),
        text: "Tersisa *3* hari lagi,\nhalo".into(),
    };
    gw.send_text(&msg).await.unwrap();

    assert_eq!(
        bridge.sent(),
        vec![(GROUP_ID.to_owned(), "Tersisa *3* hari lagi,\nhalo".to_owned())]
    );
}

#[tokio::test]
async fn send_text_failure_carries_bridge_error() {
    let bridge = FakeBridge::paired().await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();
    // Never connected: the bridge refuses to send.

    let msg = OutboundMessage {
        group: GroupId(GROUP_ID.into()),
        text: "x".into(),
    };
    let err = gw.send_text(&msg).await.unwrap_err();
    assert_eq!(err.group, GroupId(GROUP_ID.into()));
    assert!(err.reason.contains("websocket not connected"), "got: {err}");
}

#[tokio::test]
async fn send_text_accepts_empty_success_body() {
    let bridge = FakeBridge::start(BridgeState {
        logged_in: true,
        empty_send_reply: true,
        ..Default::default()
    })
    .await;
    let gw = BridgeGateway::new(&bridge.gateway_config()).unwrap();
    gw.connect().await.unwrap();

    let msg = OutboundMessage {
        group: GroupId(GROUP_ID.into()),
        text: "Tersisa *1* hari lagi,\nhalo".into(),
    };
    gw.send_text(&msg).await.unwrap();
    assert_eq!(bridge.sent().len(), 1);
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let bridge = FakeBridge::start(BridgeState {
        logged_in: true,
        token: Some("s3cret".into()),
        ..Default::default()
    })
    .await;

    let anonymous = BridgeGateway::new(&bridge.gateway_config()).unwrap();
    assert!(anonymous.connect().await.is_err());

    let config = GatewayConfig {
        token: Some("s3cret".into()),
        ..bridge.gateway_config()
    };
    let gw = BridgeGateway::new(&config).unwrap();
    gw.connect().await.unwrap();
    assert!(gw.is_connected().await);
}

#[tokio::test]
async fn unreachable_bridge_reports_disconnected() {
    let config = GatewayConfig {
        base_url: "http://127.0.0.1:9".into(),
        token: None,
        pairing_poll_secs: 1,
        request_timeout_secs: 2,
    };
    let gw = BridgeGateway::new(&config).unwrap();

    assert!(!gw.is_connected().await);
    assert!(gw.connect().await.is_err());
}
