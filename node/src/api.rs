//! # JSON-RPC + REST API
//!
//! Builds the axum router that exposes the node's HTTP interface. All
//! handlers share [`AppState`] through axum's `State` extractor and call the
//! synchronous [`TxService`] directly; each call is short and bounded.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                    |
//! |--------|-------------------------------|--------------------------------|
//! | GET    | `/health`                     | Liveness check                 |
//! | GET    | `/status`                     | Height, pool size, index flag  |
//! | POST   | `/rpc`                        | JSON-RPC 2.0 gateway           |
//! | GET    | `/transactions/:txid`         | Transaction detail             |
//! | GET    | `/transactions/:txid/effects` | Address-level balance effects  |
//!
//! ## JSON-RPC Methods
//!
//! | Method                      | Params                                 |
//! |-----------------------------|----------------------------------------|
//! | `txgate_submitTransfer`     | `{from, to, amount, fee?, memo?}`      |
//! | `txgate_getTxDetail`        | `[txid]`                               |
//! | `txgate_getTxAddressDetail` | `[txid]`                               |
//! | `txgate_blockHeight`        | none                                   |
//! | `txgate_version`            | none                                   |

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use txgate_protocol::config::COIN;
use txgate_protocol::crypto::keys::KeyPair;
use txgate_protocol::error::{LocateError, SubmitError};
use txgate_protocol::identity::{IdentityResolver, RegId};
use txgate_protocol::mempool::Mempool;
use txgate_protocol::service::{ResolvedTransaction, TxService};
use txgate_protocol::storage::{Account, Block, Chain, LedgerDb};
use txgate_protocol::transaction::types::{TxBody, TxId};
use txgate_protocol::transaction::TransactionBuilder;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub service: Arc<TxService<Chain>>,
    /// The pending pool, for size reporting.
    pub pool: Arc<Mempool>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/transactions/:txid", get(transaction_handler))
        .route("/transactions/:txid/effects", get(effects_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// A submission was refused; `data.kind` says why.
pub const SUBMIT_REJECTED: i32 = -32001;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn with_kind(code: i32, message: impl Into<String>, kind: &str) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(json!({ "kind": kind })),
        }
    }
}

impl From<SubmitError> for JsonRpcError {
    fn from(e: SubmitError) -> Self {
        JsonRpcError::with_kind(SUBMIT_REJECTED, e.to_string(), e.kind())
    }
}

impl From<LocateError> for JsonRpcError {
    fn from(e: LocateError) -> Self {
        JsonRpcError::with_kind(INTERNAL_ERROR, e.to_string(), e.kind())
    }
}

/// Parameters of `txgate_submitTransfer`. Amounts and fees are in smallest
/// units; a zero or missing fee is filled in from the fee schedule.
#[derive(Debug, Deserialize)]
pub struct SubmitTransferParams {
    /// Sender: registered id (`"h-i"`) or address.
    pub from: String,
    /// Recipient: registered id or address.
    pub to: String,
    pub amount: u64,
    #[serde(default)]
    pub fee: u64,
    /// UTF-8 memo, stored as bytes.
    #[serde(default)]
    pub memo: String,
    /// Defaults to the current tip height.
    #[serde(default)]
    pub valid_height: Option<u64>,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub block_height: u64,
    pub pending_pool_size: usize,
    pub tx_index: bool,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Instrumented service calls
// ---------------------------------------------------------------------------

/// Resolve `txid`, recording latency and the answering tier or error kind.
fn locate(state: &AppState, txid: &TxId) -> Result<Option<ResolvedTransaction>, LocateError> {
    let timer = state.metrics.lookup_latency_seconds.start_timer();
    let result = state.service.locate(txid);
    timer.observe_duration();

    match &result {
        Ok(Some(resolved)) => state
            .metrics
            .lookups_total
            .with_label_values(&[resolved.provenance().tier()])
            .inc(),
        Ok(None) => state.metrics.lookup_misses_total.inc(),
        Err(e) => state
            .metrics
            .lookup_errors_total
            .with_label_values(&[e.kind()])
            .inc(),
    }
    result
}

fn submit_transfer(state: &AppState, params: SubmitTransferParams) -> Result<Value, JsonRpcError> {
    let from = IdentityResolver::parse_user_id(&params.from)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: from: {}", e)))?;
    let to = IdentityResolver::parse_user_id(&params.to)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: to: {}", e)))?;

    let valid_height = params
        .valid_height
        .unwrap_or_else(|| state.service.current_height());
    let tx = TransactionBuilder::new(
        from,
        TxBody::CoinTransfer {
            to_uid: to,
            amount: params.amount,
            memo: params.memo.into_bytes(),
        },
    )
    .fee(params.fee)
    .valid_height(valid_height)
    .build();

    let result = state.service.submit_tx(tx);
    state.metrics.pending_pool_size.set(state.pool.size() as i64);
    match result {
        Ok(txid) => {
            state.metrics.submissions_total.inc();
            Ok(json!({ "txid": txid }))
        }
        Err(e) => {
            state
                .metrics
                .submission_failures_total
                .with_label_values(&[e.kind()])
                .inc();
            Err(e.into())
        }
    }
}

/// First positional parameter as a txid.
fn txid_param(params: Option<&Value>) -> Result<TxId, JsonRpcError> {
    params
        .and_then(|p| p.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<TxId>().ok())
        .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Invalid params: expected [txid]"))
}

/// `txgate_submitTransfer` accepts either a bare object or `[object]`.
fn transfer_params(params: Option<Value>) -> Result<SubmitTransferParams, JsonRpcError> {
    let value = match params {
        Some(Value::Array(mut arr)) if arr.len() == 1 => arr.remove(0),
        Some(other) => other,
        None => Value::Null,
    };
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn dispatch(state: &AppState, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
    match method {
        "txgate_submitTransfer" => submit_transfer(state, transfer_params(params)?),
        "txgate_getTxDetail" => {
            let txid = txid_param(params.as_ref())?;
            let detail = locate(state, &txid)?.map(|r| state.service.describe(&r));
            serde_json::to_value(detail)
                .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {}", e)))
        }
        "txgate_getTxAddressDetail" => {
            let txid = txid_param(params.as_ref())?;
            let effects = locate(state, &txid)?
                .map(|r| state.service.project(&r))
                .unwrap_or_default();
            serde_json::to_value(effects)
                .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {}", e)))
        }
        "txgate_blockHeight" => Ok(json!(state.service.current_height())),
        "txgate_version" => Ok(json!(state.version)),
        _ => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status`: tip height, pool size, and whether the index is on.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let pending = state.pool.size();
    state.metrics.pending_pool_size.set(pending as i64);
    Json(StatusResponse {
        version: state.version.clone(),
        block_height: state.service.current_height(),
        pending_pool_size: pending,
        tx_index: state.service.tx_index_enabled(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /rpc`: JSON-RPC 2.0 gateway. Unknown methods return -32601.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

fn rest_error(status: StatusCode, body: ErrorResponse) -> axum::response::Response {
    (status, Json(body)).into_response()
}

fn rest_locate(
    state: &AppState,
    txid: &str,
) -> Result<Option<ResolvedTransaction>, axum::response::Response> {
    let txid: TxId = txid.parse().map_err(|_| {
        rest_error(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!("Invalid transaction id: {}", txid)),
        )
    })?;
    locate(state, &txid).map_err(|e| {
        rest_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                error: e.to_string(),
                kind: Some(e.kind().to_string()),
            },
        )
    })
}

/// `GET /transactions/:txid`: display record, or 404.
async fn transaction_handler(
    Path(txid): Path<String>,
    State(state): State<AppState>,
) -> axum::response::Response {
    match rest_locate(&state, &txid) {
        Ok(Some(resolved)) => (StatusCode::OK, Json(state.service.describe(&resolved))).into_response(),
        Ok(None) => rest_error(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Transaction not found: {}", txid)),
        ),
        Err(resp) => resp,
    }
}

/// `GET /transactions/:txid/effects`: effect list, empty for unknown ids.
async fn effects_handler(
    Path(txid): Path<String>,
    State(state): State<AppState>,
) -> axum::response::Response {
    match rest_locate(&state, &txid) {
        Ok(resolved) => {
            let effects = resolved
                .map(|r| state.service.project(&r))
                .unwrap_or_default();
            (StatusCode::OK, Json(effects)).into_response()
        }
        Err(resp) => resp,
    }
}

// ---------------------------------------------------------------------------
// Genesis Initialization
// ---------------------------------------------------------------------------

/// Reward paid to the wallet key in a freshly created genesis block.
pub const DEVNET_GENESIS_REWARD: u64 = 1_000 * COIN;

/// Registered id given to the genesis wallet account.
pub const GENESIS_REG_ID: RegId = RegId {
    height: 0,
    index: 0,
};

/// Loads the persisted genesis block, or creates one on first start.
///
/// A loaded genesis must pass its integrity check. A new one pays
/// [`DEVNET_GENESIS_REWARD`] to `wallet_key` (when given) and records that
/// key as a registered, funded account so the node can submit right away.
pub fn initialize_genesis(db: &LedgerDb, wallet_key: Option<&KeyPair>) -> anyhow::Result<Block> {
    if let Some(genesis) = db.get_genesis().context("failed to read genesis block")? {
        genesis
            .verify_genesis()
            .context("stored genesis block failed its integrity check")?;
        tracing::info!(hash = %genesis.hash_hex(), "genesis block loaded");
        return Ok(genesis);
    }

    let mut transactions = Vec::new();
    if let Some(key) = wallet_key {
        transactions.push(
            TransactionBuilder::new(
                key.public_key().into(),
                TxBody::BlockReward {
                    reward: DEVNET_GENESIS_REWARD,
                },
            )
            .build(),
        );
        db.put_account(&Account::registered(
            key.public_key(),
            GENESIS_REG_ID,
            DEVNET_GENESIS_REWARD,
        ))
        .context("failed to record genesis account")?;
    }

    let time = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    let genesis = Block::genesis(transactions, time);
    db.put_genesis(&genesis)
        .context("failed to persist genesis block")?;
    tracing::info!(
        hash = %genesis.hash_hex(),
        tx_count = genesis.transactions.len(),
        "genesis block created"
    );
    Ok(genesis)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use parking_lot::RwLock;
    use tower::ServiceExt;

    use txgate_protocol::config::ServiceConfig;
    use txgate_protocol::service::ServicePorts;
    use txgate_protocol::storage::{
        BlockFiles, IndexedBlockStore, OutputAccount, VmOperate,
    };
    use txgate_protocol::transaction::sign_transaction;
    use txgate_protocol::transaction::Transaction;
    use txgate_protocol::wallet::Keystore;

    const ALICE: RegId = RegId {
        height: 1,
        index: 0,
    };
    const BOB: RegId = RegId {
        height: 1,
        index: 1,
    };

    struct TestNode {
        dir: tempfile::TempDir,
        state: AppState,
        db: Arc<LedgerDb>,
        blocks: Arc<IndexedBlockStore>,
        chain: Arc<RwLock<Chain>>,
        alice: KeyPair,
        bob: KeyPair,
    }

    /// Full node state over temporary storage. Alice holds 10 coins and her
    /// key is in the unlocked wallet; Bob is registered with nothing.
    fn test_node() -> TestNode {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Arc::new(LedgerDb::open_temporary().expect("temp db"));
        let blocks = Arc::new(IndexedBlockStore::new(
            Arc::clone(&db),
            BlockFiles::open(dir.path()).expect("block files"),
        ));
        let pool = Arc::new(Mempool::default());
        let keystore = Arc::new(Keystore::new(Arc::clone(&pool)));

        let alice = KeyPair::from_seed(&[0xa1; 32]);
        let bob = KeyPair::from_seed(&[0xb0; 32]);
        db.put_account(&Account::registered(alice.public_key(), ALICE, 10 * COIN))
            .unwrap();
        db.put_account(&Account::registered(bob.public_key(), BOB, 0))
            .unwrap();
        keystore.import(alice.clone());
        keystore.unlock();

        let genesis = initialize_genesis(&db, None).unwrap();
        let chain = Arc::new(RwLock::new(Chain::new(genesis, true).unwrap()));
        let service = TxService::new(
            ServiceConfig::default(),
            ServicePorts {
                chain: Arc::clone(&chain),
                accounts: db.clone(),
                blocks: blocks.clone(),
                pool: pool.clone(),
                outputs: db.clone(),
                wallet: keystore,
            },
        );

        let state = AppState {
            version: "0.1.0-test".into(),
            service: Arc::new(service),
            pool,
            metrics: Arc::new(crate::metrics::NodeMetrics::new().unwrap()),
        };

        TestNode {
            dir,
            state,
            db,
            blocks,
            chain,
            alice,
            bob,
        }
    }

    /// Writes `txs` as the next block and moves the tip.
    fn mine(node: &TestNode, txs: Vec<Transaction>) -> Block {
        let parent = node.chain.read().tip().clone();
        let block = Block::new(&parent, txs, parent.time + 1);
        node.blocks.append_block(&block).unwrap();
        node.chain.write().set_tip(block.header.clone());
        block
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
        let req = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn transfer_json(node: &TestNode, fee: u64) -> Value {
        json!({
            "from": ALICE.to_string(),
            "to": node.bob.address_hash().to_address(),
            "amount": 150_000_000u64,
            "fee": fee,
            "memo": "hi",
        })
    }

    // -- Health & status -----------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let node = test_node();
        let (status, json) = get(&create_router(node.state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_tip_and_pool() {
        let node = test_node();
        mine(&node, vec![]);
        let (status, json) = get(&create_router(node.state.clone()), "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_value(json).unwrap();
        assert_eq!(resp.block_height, 1);
        assert_eq!(resp.pending_pool_size, 0);
        assert!(resp.tx_index);
    }

    // -- Submission ----------------------------------------------------------

    #[tokio::test]
    async fn submit_then_resolve_as_pending() {
        let node = test_node();
        let router = create_router(node.state.clone());

        let resp = rpc(&router, "txgate_submitTransfer", transfer_json(&node, 0)).await;
        assert!(resp.error.is_none(), "{:?}", resp.error);
        let txid = resp.result.unwrap()["txid"].as_str().unwrap().to_string();
        assert_eq!(node.state.pool.size(), 1);

        let detail = rpc(&router, "txgate_getTxDetail", json!([txid])).await;
        let detail = detail.result.unwrap();
        assert_eq!(detail["txid"], txid);
        assert_eq!(detail["tx_type"], "BCOIN_TRANSFER_TX");
        assert_eq!(detail["tx_uid"], "1-0");
        assert_eq!(detail["fee"], 0.0001);
        assert!(detail.get("confirmed_height").is_none());

        let effects = rpc(&router, "txgate_getTxAddressDetail", json!([txid])).await;
        let effects = effects.result.unwrap();
        assert_eq!(effects.as_array().unwrap().len(), 1);
        assert_eq!(effects[0]["amount"], 1.5);
        assert_eq!(effects[0]["address"], node.alice.address_hash().to_address());
        assert_eq!(effects[0]["counterparty"], node.bob.address_hash().to_address());
        assert_eq!(effects[0]["memo"], hex::encode("hi"));

        let metrics = node.state.metrics.encode().unwrap();
        assert!(metrics.contains("txgate_submissions_total 1"));
        assert!(metrics.contains("txgate_lookups_total{tier=\"pending\"} 2"));
    }

    #[tokio::test]
    async fn low_fee_is_a_submit_rejection() {
        let node = test_node();
        let router = create_router(node.state.clone());
        let resp = rpc(&router, "txgate_submitTransfer", json!([transfer_json(&node, 5)])).await;

        let err = resp.error.expect("error");
        assert_eq!(err.code, SUBMIT_REJECTED);
        assert_eq!(err.data.unwrap()["kind"], "fee_too_low");
        assert_eq!(err.message, "tx fee given is too small: 5 < 10000");
        assert!(node.state.pool.is_empty());
    }

    #[tokio::test]
    async fn unknown_sender_is_unregistered() {
        let node = test_node();
        let router = create_router(node.state.clone());
        let params = json!({ "from": "9-9", "to": BOB.to_string(), "amount": 1 });
        let err = rpc(&router, "txgate_submitTransfer", params).await.error.unwrap();
        assert_eq!(err.code, SUBMIT_REJECTED);
        assert_eq!(err.data.unwrap()["kind"], "account_unregistered");
    }

    #[tokio::test]
    async fn malformed_transfer_params_are_invalid() {
        let node = test_node();
        let router = create_router(node.state);
        let err = rpc(&router, "txgate_submitTransfer", json!({ "from": "nope", "to": "1-1", "amount": 1 }))
            .await
            .error
            .unwrap();
        assert_eq!(err.code, INVALID_PARAMS);

        let err = rpc(&router, "txgate_submitTransfer", json!({ "amount": 1 }))
            .await
            .error
            .unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
    }

    // -- Resolution ----------------------------------------------------------

    #[tokio::test]
    async fn unknown_txid_is_null_over_rpc_and_404_over_rest() {
        let node = test_node();
        let router = create_router(node.state.clone());
        let unknown = "ee".repeat(32);

        let resp = rpc(&router, "txgate_getTxDetail", json!([unknown])).await;
        assert!(resp.error.is_none());
        assert!(resp.result.unwrap_or(Value::Null).is_null());

        let resp = rpc(&router, "txgate_getTxAddressDetail", json!([unknown])).await;
        assert_eq!(resp.result, Some(json!([])));

        let (status, _) = get(&router, &format!("/transactions/{}", unknown)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = get(&router, &format!("/transactions/{}/effects", unknown)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        assert!(node
            .state
            .metrics
            .encode()
            .unwrap()
            .contains("txgate_lookup_misses_total 4"));
    }

    #[tokio::test]
    async fn malformed_txid_is_rejected() {
        let node = test_node();
        let router = create_router(node.state);
        let (status, body) = get(&router, "/transactions/deadbeef").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid transaction id"));

        let err = rpc(&router, "txgate_getTxDetail", json!(["xyz"])).await.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn indexed_invoke_over_rest() {
        let node = test_node();
        let mut invoke = TransactionBuilder::new(
            ALICE.into(),
            TxBody::ContractInvoke {
                app_uid: BOB.into(),
                amount: COIN,
                arguments: vec![0xca, 0xfe],
            },
        )
        .fee(1_000_000)
        .build();
        sign_transaction(&mut invoke, &node.alice);
        let block = mine(&node, vec![invoke.clone()]);
        node.db
            .put_contract_outputs(
                &invoke.txid(),
                &[
                    VmOperate::add(OutputAccount::RegId(ALICE), 200_000_000),
                    VmOperate::minus(OutputAccount::RegId(BOB), 50_000_000).frozen_until(100),
                ],
            )
            .unwrap();

        let router = create_router(node.state.clone());
        let (status, detail) = get(&router, &format!("/transactions/{}", invoke.txid())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["confirmed_height"], 1);
        assert_eq!(detail["block_hash"], block.hash_hex());
        assert_eq!(detail["list_output"].as_array().unwrap().len(), 2);
        assert_eq!(detail["rawtx"], hex::encode(invoke.raw_bytes()));

        let (status, effects) =
            get(&router, &format!("/transactions/{}/effects", invoke.txid())).await;
        assert_eq!(status, StatusCode::OK);
        let effects = effects.as_array().unwrap();
        assert_eq!(effects.len(), 3);
        assert_eq!(effects[1]["direction"], "credit");
        assert_eq!(effects[1]["amount"], 2.0);
        assert_eq!(effects[2]["direction"], "debit");
        assert_eq!(effects[2]["amount"], -0.5);
        assert_eq!(effects[2]["freeze_height"], 100);
    }

    #[tokio::test]
    async fn corrupt_block_file_is_an_internal_error() {
        let node = test_node();
        let mut tx = TransactionBuilder::new(
            ALICE.into(),
            TxBody::CoinTransfer {
                to_uid: BOB.into(),
                amount: 1,
                memo: vec![],
            },
        )
        .fee(10_000)
        .build();
        sign_transaction(&mut tx, &node.alice);
        mine(&node, vec![tx.clone()]);

        std::fs::OpenOptions::new()
            .write(true)
            .open(node.dir.path().join("blk00000.dat"))
            .unwrap()
            .set_len(3)
            .unwrap();

        let metrics = Arc::clone(&node.state.metrics);
        let router = create_router(node.state);
        let err = rpc(&router, "txgate_getTxDetail", json!([tx.txid().to_hex()]))
            .await
            .error
            .unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.data.unwrap()["kind"], "corrupt_index_or_store");

        let (status, body) = get(&router, &format!("/transactions/{}", tx.txid())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "corrupt_index_or_store");

        let text = metrics.encode().unwrap();
        assert!(text.contains("txgate_lookup_errors_total{kind=\"corrupt_index_or_store\"} 2"));
        assert!(!text.contains("txgate_lookup_misses_total 1"));
    }

    // -- Misc RPC ------------------------------------------------------------

    #[tokio::test]
    async fn rpc_height_and_version() {
        let node = test_node();
        mine(&node, vec![]);
        let router = create_router(node.state);
        assert_eq!(
            rpc(&router, "txgate_blockHeight", Value::Null).await.result,
            Some(json!(1))
        );
        assert_eq!(
            rpc(&router, "txgate_version", Value::Null).await.result,
            Some(json!("0.1.0-test"))
        );
    }

    #[tokio::test]
    async fn rpc_unknown_method_and_bad_version() {
        let node = test_node();
        let router = create_router(node.state);
        let err = rpc(&router, "txgate_nope", Value::Null).await.error.unwrap();
        assert_eq!(err.code, METHOD_NOT_FOUND);

        let body = json!({ "jsonrpc": "1.0", "method": "txgate_version", "id": 7 });
        let req = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let resp: JsonRpcResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(resp.id, json!(7));
    }

    // -- Genesis -------------------------------------------------------------

    #[test]
    fn initialize_genesis_funds_wallet_and_is_idempotent() {
        let db = LedgerDb::open_temporary().unwrap();
        let key = KeyPair::from_seed(&[9u8; 32]);

        let first = initialize_genesis(&db, Some(&key)).unwrap();
        assert_eq!(first.transactions.len(), 1);
        let account = db.get_account(&key.address_hash()).unwrap().unwrap();
        assert_eq!(account.reg_id, Some(GENESIS_REG_ID));
        assert_eq!(account.free_balance, DEVNET_GENESIS_REWARD);

        let second = initialize_genesis(&db, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn tampered_genesis_is_refused() {
        let db = LedgerDb::open_temporary().unwrap();
        let mut genesis = initialize_genesis(&db, None).unwrap();
        genesis.header.time += 1;
        db.put_genesis(&genesis).unwrap();
        assert!(initialize_genesis(&db, None).is_err());
    }
}
