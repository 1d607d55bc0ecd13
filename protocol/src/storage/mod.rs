//! # Storage Module
//!
//! Reference implementations of the storage ports. Simple on purpose: they
//! persist and read back, and they never decide what a balance should be.
//!
//! ## Architecture
//!
//! ```text
//! block.rs       - Block/BlockHeader, genesis construction, integrity check
//! block_file.rs  - Append-only blk#####.dat files, DiskTxPos
//! block_store.rs - Block files + tx index behind the BlockStore port
//! db.rs          - sled trees: accounts, reg_ids, tx_index, contract_outputs
//! state.rs       - Account and VmOperate records
//! chain.rs       - Genesis + tip + index flag behind the ChainState port
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Bytes in files, keys in sled.** Block bodies are append-only and
//!    read by offset; lookups by txid, address, or regid go through sled.
//!
//! 2. **Bincode for everything on disk.** Compact, deterministic, and the
//!    same encoding transactions use for their ids.

pub mod block;
pub mod block_file;
pub mod block_store;
pub mod chain;
pub mod db;
pub mod state;

pub use block::{Block, BlockError, BlockHeader};
pub use block_file::{BlockFileError, BlockFiles, DiskTxPos};
pub use block_store::IndexedBlockStore;
pub use chain::Chain;
pub use db::{DbError, LedgerDb};
pub use state::{Account, OutputAccount, OutputOp, VmOperate};
