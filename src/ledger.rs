// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ledger queries used for duplicate-claim detection.

use async_trait::async_trait;
use ethers::{
    core::types::{Address, BlockNumber, U256},
    providers::{Http, Middleware, Provider},
};
use thiserror::Error;

/// Ledger error types.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    #[error("Invalid provider URL: {0}")]
    InvalidProvider(String),

    #[error("Ledger query failed: {0}")]
    Rpc(String),

    #[error("Sequence number out of range: {0}")]
    OutOfRange(U256),
}

/// Source of per-account pending sequence numbers.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Next sequence number for `address`, counting transactions still in
    /// the mempool.
    async fn pending_nonce(&self, address: &str) -> Result<u64, LedgerError>;
}

/// JSON-RPC ledger client for EVM networks.
pub struct EthLedgerClient {
    provider: Provider<Http>,
}

impl EthLedgerClient {
    pub fn new(rpc_url: &str) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| LedgerError::InvalidProvider(e.to_string()))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl LedgerClient for EthLedgerClient {
    async fn pending_nonce(&self, address: &str) -> Result<u64, LedgerError> {
        let account: Address = address
            .parse()
            .map_err(|_| LedgerError::InvalidAddress(address.to_string()))?;

        let nonce = self
            .provider
            .get_transaction_count(account, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        if nonce > U256::from(u64::MAX) {
            return Err(LedgerError::OutOfRange(nonce));
        }
        Ok(nonce.as_u64())
    }
}
