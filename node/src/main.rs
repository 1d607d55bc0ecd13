// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TXGATE Node
//!
//! Entry point for the `txgate-node` binary. Parses CLI arguments, opens the
//! ledger storage, wires the transaction service to its reference adapters,
//! and serves the HTTP API and metrics endpoint.
//!
//! The binary supports three subcommands:
//!
//! - `run`: start the node
//! - `init`: initialize a data directory and generate a wallet key
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use txgate_protocol::config::ServiceConfig;
use txgate_protocol::crypto::keys::KeyPair;
use txgate_protocol::mempool::Mempool;
use txgate_protocol::service::{ServicePorts, TxService};
use txgate_protocol::storage::{BlockFiles, Chain, IndexedBlockStore, LedgerDb};
use txgate_protocol::wallet::Keystore;

use cli::{Commands, TxgateNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// How often the pending pool is swept for expired transactions.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// File name of the wallet key inside the data directory.
const WALLET_KEY_FILE: &str = "wallet.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TxgateNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Reads the wallet key from `--wallet-key`, falling back to the key file.
/// A node without either still resolves transactions but cannot sign.
fn load_wallet_key(flag: Option<&str>, data_dir: &Path) -> Result<Option<KeyPair>> {
    if let Some(hex_key) = flag {
        return KeyPair::from_hex(hex_key)
            .map(Some)
            .context("invalid --wallet-key");
    }

    let key_path = data_dir.join(WALLET_KEY_FILE);
    if !key_path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&key_path)
        .with_context(|| format!("failed to read wallet key at {}", key_path.display()))?;
    KeyPair::from_hex(&contents)
        .map(Some)
        .with_context(|| format!("malformed wallet key at {}", key_path.display()))
}

/// Starts the node: storage, transaction service, API and metrics servers.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        tx_index = args.tx_index,
        data_dir = %args.data_dir.display(),
        "starting txgate-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = Arc::new(
        LedgerDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    let blocks_path = args.data_dir.join("blocks");
    let files = BlockFiles::open(&blocks_path)
        .with_context(|| format!("failed to open block files at {}", blocks_path.display()))?;
    let blocks = Arc::new(IndexedBlockStore::new(Arc::clone(&db), files));

    // --- Pending pool and wallet ---
    let config = ServiceConfig {
        tx_index: args.tx_index,
        ..ServiceConfig::default()
    };
    let pool = Arc::new(Mempool::new(config.mempool.clone()));
    let keystore = Arc::new(Keystore::new(Arc::clone(&pool)));

    let wallet_key = load_wallet_key(args.wallet_key.as_deref(), &args.data_dir)?;
    match &wallet_key {
        Some(key) => {
            let address = keystore.import(key.clone());
            keystore.unlock();
            tracing::info!(address = %address, "wallet key loaded");
        }
        None => tracing::warn!("no wallet key configured; submissions will be rejected"),
    }

    // --- Chain ---
    let genesis = api::initialize_genesis(&db, wallet_key.as_ref())?;
    let mut chain = Chain::new(genesis, config.tx_index).context("invalid genesis block")?;
    if let Some(tip) = db.get_tip().context("failed to read chain tip")? {
        tracing::info!(height = tip.height, hash = %tip.hash_hex(), "resuming at stored tip");
        chain.set_tip(tip);
    }
    let chain = Arc::new(RwLock::new(chain));

    // --- Metrics ---
    let node_metrics =
        Arc::new(NodeMetrics::new().context("failed to register Prometheus metrics")?);

    // --- Transaction service ---
    let service = Arc::new(TxService::new(
        config,
        ServicePorts {
            chain,
            accounts: db.clone(),
            blocks,
            pool: pool.clone(),
            outputs: db.clone(),
            wallet: keystore,
        },
    ));
    node_metrics
        .block_height
        .set(i64::try_from(service.current_height()).unwrap_or(i64::MAX));

    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            txgate_protocol::config::PROTOCOL_VERSION,
        ),
        service: Arc::clone(&service),
        pool: Arc::clone(&pool),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Pool maintenance ---
    let pool_ref = Arc::clone(&pool);
    let service_ref = Arc::clone(&service);
    let metrics_ref = Arc::clone(&node_metrics);
    let maintenance = tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            let expired = pool_ref.expire_old();
            if expired > 0 {
                tracing::info!(expired, "expired stale pending transactions");
            }
            metrics_ref
                .pending_pool_size
                .set(i64::try_from(pool_ref.size()).unwrap_or(i64::MAX));
            metrics_ref
                .block_height
                .set(i64::try_from(service_ref.current_height()).unwrap_or(i64::MAX));
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    maintenance.abort();
    if let Err(e) = db.flush() {
        tracing::error!("failed to flush database: {}", e);
    }
    tracing::info!("txgate-node stopped");
    Ok(())
}

/// Initializes a new node data directory and generates a wallet key.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("txgate_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let key_path = data_dir.join(WALLET_KEY_FILE);
    if key_path.exists() {
        anyhow::bail!("wallet key already exists at {}", key_path.display());
    }

    let keypair = KeyPair::generate();
    std::fs::write(&key_path, hex::encode(keypair.secret_key_bytes()))
        .with_context(|| format!("failed to write wallet key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    let address = keypair.address_hash().to_address();
    tracing::info!(
        address = %address,
        key_path = %key_path.display(),
        "wallet key generated"
    );

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Wallet key     : {}", key_path.display());
    println!("  Address        : {}", address);
    println!("  Public key     : {}", keypair.public_key().to_hex());

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("txgate-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", txgate_protocol::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
