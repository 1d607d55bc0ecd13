//! # Transaction Service
//!
//! The façade the node calls. It wires the five components together:
//!
//! ```text
//!                  ┌──────────────────┐
//!  submit_tx ────> │ fees  -> submit  │ ──> Wallet::commit ──> pending pool
//!                  └──────────────────┘
//!                  ┌──────────────────┐     ┌───────────┐
//!  tx_detail ────> │     locator      │ ──> │  detail   │
//!  tx_address_     │ genesis/index/   │     │ projector │
//!    detail        │ pending          │     └───────────┘
//!                  └──────────────────┘
//! ```
//!
//! All operations are synchronous and request-scoped. The only shared
//! mutable state is the chain view, read under its lock by the locator and
//! for the current height by submission.

pub mod detail;
pub mod fees;
pub mod locator;
pub mod projector;
pub mod submit;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::ServiceConfig;
use crate::error::{LocateError, SubmitError};
use crate::identity::IdentityResolver;
use crate::ports::{AccountStore, BlockStore, ChainState, ContractOutputStore, PendingPool, Wallet};
use crate::transaction::types::TxId;
use crate::transaction::Transaction;

pub use detail::{OutputDetail, TxDetail};
pub use locator::{Provenance, ResolvedTransaction, TxLocator};
pub use projector::{Direction, EffectProjector, EffectRecord};

/// The external collaborators a [`TxService`] is built from.
pub struct ServicePorts<C> {
    pub chain: Arc<RwLock<C>>,
    pub accounts: Arc<dyn AccountStore>,
    pub blocks: Arc<dyn BlockStore>,
    pub pool: Arc<dyn PendingPool>,
    pub outputs: Arc<dyn ContractOutputStore>,
    pub wallet: Arc<dyn Wallet>,
}

pub struct TxService<C> {
    config: ServiceConfig,
    resolver: IdentityResolver,
    wallet: Arc<dyn Wallet>,
    locator: TxLocator<C>,
    projector: EffectProjector,
}

impl<C: ChainState> TxService<C> {
    pub fn new(config: ServiceConfig, ports: ServicePorts<C>) -> Self {
        let resolver = IdentityResolver::new(ports.accounts);
        Self {
            config,
            projector: EffectProjector::new(resolver.clone(), Arc::clone(&ports.outputs)),
            locator: TxLocator::new(ports.chain, ports.blocks, ports.pool, ports.outputs),
            resolver,
            wallet: ports.wallet,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn current_height(&self) -> u64 {
        self.locator.chain().read().current_height()
    }

    pub fn tx_index_enabled(&self) -> bool {
        self.locator.chain().read().tx_index_enabled()
    }

    /// Fee-check, balance-check, sign, and commit `tx`.
    pub fn submit_tx(&self, tx: Transaction) -> Result<TxId, SubmitError> {
        let height = self.current_height();
        submit::submit_tx(
            tx,
            height,
            &self.config.fee_schedule,
            &self.resolver,
            self.wallet.as_ref(),
        )
    }

    /// Find `txid` in genesis, the index, or the pending pool.
    pub fn locate(&self, txid: &TxId) -> Result<Option<ResolvedTransaction>, LocateError> {
        self.locator.locate(txid)
    }

    /// Display record for `txid`, or `None` when no tier knows it.
    pub fn tx_detail(&self, txid: &TxId) -> Result<Option<TxDetail>, LocateError> {
        Ok(self.locate(txid)?.map(|resolved| self.describe(&resolved)))
    }

    /// Address-level effects of `txid`. Empty when not found.
    pub fn tx_address_detail(&self, txid: &TxId) -> Result<Vec<EffectRecord>, LocateError> {
        Ok(self
            .locate(txid)?
            .map(|resolved| self.project(&resolved))
            .unwrap_or_default())
    }

    /// Display record for an already resolved transaction.
    pub fn describe(&self, resolved: &ResolvedTransaction) -> TxDetail {
        TxDetail::build(resolved, &self.resolver)
    }

    /// Effects of an already resolved transaction.
    pub fn project(&self, resolved: &ResolvedTransaction) -> Vec<EffectRecord> {
        self.projector.project(resolved)
    }
}
