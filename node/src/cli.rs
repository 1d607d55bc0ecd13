//! # CLI Interface
//!
//! Defines the command-line argument structure for `txgate-node` using
//! `clap` derive. Three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use txgate_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

/// TXGATE transaction gateway node.
///
/// Signs and commits outgoing transactions, resolves transaction ids
/// against genesis, the block index, and the pending pool, and serves the
/// results over JSON-RPC and REST.
#[derive(Parser, Debug)]
#[command(
    name = "txgate-node",
    about = "TXGATE transaction submission and resolution node",
    version,
    propagate_version = true
)]
pub struct TxgateNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Initialize a data directory and generate a wallet key.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Data directory holding the ledger database, block files, and keys.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "TXGATE_DATA_DIR", default_value = ".txgate")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "TXGATE_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TXGATE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Consult the on-disk transaction index when resolving ids.
    #[arg(
        long,
        env = "TXGATE_TX_INDEX",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub tx_index: bool,

    /// Hex-encoded Ed25519 wallet secret key.
    ///
    /// If not provided, the node reads `wallet.key` from the data directory.
    /// **Never pass this flag in production.**
    #[arg(long, env = "TXGATE_WALLET_KEY")]
    pub wallet_key: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "TXGATE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "TXGATE_DATA_DIR", default_value = ".txgate")]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TxgateNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = TxgateNodeCli::try_parse_from(["txgate-node", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
        assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
        assert!(args.tx_index);
        assert_eq!(args.log_format, "pretty");
    }

    #[test]
    fn tx_index_can_be_disabled() {
        let cli =
            TxgateNodeCli::try_parse_from(["txgate-node", "run", "--tx-index", "false"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(!args.tx_index);
    }
}
