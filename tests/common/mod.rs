// Test helpers are intentionally partially used
#![allow(dead_code)]

use axum::{extract::State, routing::post, Json, Router};
use geo_attendance::{build_router, create_router, AppConfig};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;

macro_rules! set_env_if_unset {
    // ---
    ($key:expr, $val:expr) => {
        if std::env::var($key).is_err() {
            std::env::set_var($key, $val);
        }
    };
}

static INIT: Once = Once::new();

/// The reference point the test geofence is centred on.
pub const CAMPUS: (f64, f64) = (30.00850268544767, 77.76385663463411);

pub const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

// ============================================================================
// Test Setup
// ============================================================================

/// Initialize the environment variables the router needs, once.
pub async fn setup_test_env() {
    // ---
    INIT.call_once(|| {
        // ---
        set_env_if_unset!("ATTEND_GEOFENCE_LAT", CAMPUS.0.to_string());
        set_env_if_unset!("ATTEND_GEOFENCE_LON", CAMPUS.1.to_string());
        set_env_if_unset!("AXUM_METRICS_TYPE", "noop");
        std::env::remove_var("ATTEND_STORE");
        std::env::remove_var("ATTEND_WALLET_RPC_URL");
        std::env::remove_var("ATTEND_GEO_PROVIDER_URL");
        std::env::remove_var("ATTEND_SUBMIT_DELAY_MS");
    });
}

/// Configuration from the test environment, for tests that tweak one field.
pub async fn test_config() -> AppConfig {
    // ---
    setup_test_env().await;
    AppConfig::from_env().expect("test environment should produce a valid config")
}

pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
}

impl TestServer {
    // ---
    pub async fn new() -> Self {
        // ---
        setup_test_env().await;
        let app = create_router().await.expect("Should be able to create router");
        Self::serve(app).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        // ---
        let app = build_router(config).await.expect("Should be able to create router");
        Self::serve(app).await
    }

    async fn serve(app: Router) -> Self {
        // ---
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start
        sleep(Duration::from_millis(100)).await;

        let client = Client::new();

        Self { addr, client }
    }

    pub fn url(&self, path: &str) -> String {
        // ---
        format!("http://{}{}", self.addr, path)
    }

    /// The daily key currently in force.
    pub async fn current_key(&self) -> String {
        // ---
        let body: Value = self
            .client
            .get(self.url("/key"))
            .send()
            .await
            .expect("Failed to fetch key")
            .json()
            .await
            .expect("Key response should be JSON");
        body["data"]["value"]
            .as_str()
            .expect("Key response should carry a value")
            .to_string()
    }
}

/// A check-in body that passes every check with `key`.
pub fn on_campus_submission(key: &str) -> Value {
    json!({
        "subject": "cs-101",
        "key": key,
        "walletAddress": WALLET,
        "location": { "latitude": CAMPUS.0, "longitude": CAMPUS.1 }
    })
}

// ============================================================================
// Mock wallet node
// ============================================================================

/// Accounts the mock node hands out; set to empty to simulate a locked wallet.
pub type MockAccounts = Arc<Mutex<Vec<String>>>;

async fn mock_rpc(State(accounts): State<MockAccounts>, Json(req): Json<Value>) -> Json<Value> {
    // ---
    let id = req["id"].clone();
    let result = match req["method"].as_str().unwrap_or_default() {
        "eth_requestAccounts" | "eth_accounts" => json!(*accounts.lock().unwrap()),
        "eth_chainId" => json!("0x1"),
        // 1.5 ether
        "eth_getBalance" => json!("0x14d1120d7b160000"),
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "method not found"}
            }))
        }
    };
    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

/// Starts a JSON-RPC wallet node on a random port and returns its URL.
pub async fn spawn_wallet_node(accounts: MockAccounts) -> String {
    // ---
    let app = Router::new().route("/", post(mock_rpc)).with_state(accounts);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}
