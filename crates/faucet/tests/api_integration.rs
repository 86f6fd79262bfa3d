//! End-to-end tests of the HTTP surface with a stubbed transfer service

use ae_faucet::api::{self, AppState, PageContext};
use ae_faucet::metrics::MetricsCollector;
use ae_faucet::notify::NoopNotifier;
use ae_faucet::{
    AccountId, Clock, FaucetService, Graylist, GraylistConfig, ManualClock, NodeError, SpendReceipt, TopUpSettings,
    TransferService,
};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const HOUR: Duration = Duration::from_secs(3600);
const AMOUNT: u128 = 5_000_000_000_000_000_000;

enum Behaviour {
    Succeed,
    Reject,
    Unreachable,
}

struct StubTransfer {
    behaviour: Behaviour,
    spends: AtomicUsize,
}

impl StubTransfer {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            spends: AtomicUsize::new(0),
        })
    }

    fn spends(&self) -> usize {
        self.spends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferService for StubTransfer {
    async fn spend(&self, amount: u128, _recipient: &AccountId, _memo: &str) -> Result<SpendReceipt, NodeError> {
        self.spends.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Succeed => Ok(SpendReceipt {
                tx_hash: format!("th_stub{}", amount),
            }),
            Behaviour::Reject => Err(NodeError::Rejected {
                status: 400,
                reason: "account_nonce_too_high internal detail".to_string(),
            }),
            Behaviour::Unreachable => Err(NodeError::Unavailable("connection refused".to_string())),
        }
    }

    async fn balance(&self, _account: &AccountId) -> Result<u128, NodeError> {
        Ok(AMOUNT)
    }
}

struct Harness {
    app: Router,
    graylist: Arc<Graylist>,
    clock: Arc<ManualClock>,
    transfer: Arc<StubTransfer>,
}

fn harness(behaviour: Behaviour) -> Harness {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()));
    let graylist = Arc::new(Graylist::new(
        &GraylistConfig {
            max_size: 6000,
            ttl: 4 * HOUR,
            sweep_interval: Duration::from_secs(60),
        },
        clock.clone(),
    ));
    let transfer = StubTransfer::new(behaviour);
    let settings = TopUpSettings {
        amount: AMOUNT,
        display_amount: "5 AE".to_string(),
        memo: "Faucet Tx".to_string(),
        node_host: "testnet.aeternity.io".to_string(),
    };
    let service = FaucetService::new(
        settings,
        graylist.clone(),
        transfer.clone(),
        Arc::new(NoopNotifier),
        clock.clone(),
    );
    let state = Arc::new(AppState {
        service,
        page: PageContext {
            amount: "5 AE".to_string(),
            node_url: "https://testnet.aeternity.io".to_string(),
            explorer_url: "https://explorer.testnet.aeternity.io".to_string(),
        },
        support_email: "support@example.com".to_string(),
        metrics: MetricsCollector::new().unwrap(),
    });

    Harness {
        app: api::router(state, "assets".into()),
        graylist,
        clock,
        transfer,
    }
}

async fn post(app: &Router, address: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/account/{}", address))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn address(byte: u8) -> String {
    AccountId([byte; 32]).to_string()
}

#[tokio::test]
async fn test_top_up_success() {
    let h = harness(Behaviour::Succeed);
    let addr = address(1);

    let (status, body) = post(&h.app, &addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tx_hash"], format!("th_stub{}", AMOUNT));
    assert_eq!(body["balance"].as_u64(), Some(AMOUNT as u64));
    assert_eq!(h.graylist.is_graylisted(&addr), Some(h.clock.now()));
}

#[tokio::test]
async fn test_invalid_address_is_400() {
    let h = harness(Behaviour::Succeed);

    let (status, body) = post(&h.app, "not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "The provided address is not valid: not-an-address"
    );
    assert!(h.graylist.is_empty());
    assert_eq!(h.transfer.spends(), 0);
}

#[tokio::test]
async fn test_graylisted_address_is_425() {
    let h = harness(Behaviour::Succeed);
    let addr = address(2);

    let (status, _) = post(&h.app, &addr).await;
    assert_eq!(status, StatusCode::OK);

    h.clock.advance(HOUR);
    let (status, body) = post(&h.app, &addr).await;
    assert_eq!(status.as_u16(), 425);
    assert_eq!(
        body["message"],
        format!("The address {} is graylisted for another 3h 00m 00s", addr)
    );
    assert_eq!(h.transfer.spends(), 1);

    h.clock.advance(3 * HOUR + Duration::from_secs(1));
    let (status, _) = post(&h.app, &addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.transfer.spends(), 2);
}

#[tokio::test]
async fn test_transfer_failure_hides_details_and_keeps_graylist() {
    let h = harness(Behaviour::Reject);
    let addr = address(3);

    let (status, body) = post(&h.app, &addr).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("support@example.com"));
    assert!(!message.contains("nonce"));
    assert!(h.graylist.is_graylisted(&addr).is_some());

    let (status, _) = post(&h.app, &addr).await;
    assert_eq!(status.as_u16(), 425);
    assert_eq!(h.transfer.spends(), 1);
}

#[tokio::test]
async fn test_unreachable_node_is_503() {
    let h = harness(Behaviour::Unreachable);

    let (status, body) = post(&h.app, &address(4)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["message"],
        "The node is temporarily unavailable, please try again later"
    );
}

#[tokio::test]
async fn test_concurrent_requests_for_same_address() {
    let h = harness(Behaviour::Succeed);
    let addr = address(5);

    let (a, b) = tokio::join!(post(&h.app, &addr), post(&h.app, &addr));
    let mut statuses = vec![a.0.as_u16(), b.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 425]);
    assert_eq!(h.transfer.spends(), 1);
}

#[tokio::test]
async fn test_landing_page_and_health() {
    let h = harness(Behaviour::Succeed);

    let response = h
        .app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(html.to_vec()).unwrap();
    assert!(html.contains("5 AE"));
    assert!(html.contains("https://explorer.testnet.aeternity.io"));

    let response = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_and_metrics() {
    let h = harness(Behaviour::Succeed);
    post(&h.app, &address(6)).await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::get("/metrics")
                .header("origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("faucet_topup_total"));
}

#[tokio::test]
async fn test_client_script_renders_errors_as_text() {
    let h = harness(Behaviour::Succeed);

    let response = h
        .app
        .clone()
        .oneshot(Request::get("/assets/scripts/main.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let script = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let script = String::from_utf8(script.to_vec()).unwrap();
    assert!(script.contains("message.textContent = data.message"));
    assert!(!script.contains("${data.message}"));
}
