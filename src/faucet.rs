// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Faucet payouts: sends a fixed amount from the funding account to each
//! admitted claimant.

use async_trait::async_trait;
use ethers::{
    core::types::{Address, TransactionRequest, U256},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    utils::parse_ether,
};
use thiserror::Error;
use tracing::info;

/// Payout error types.
#[derive(Debug, Error)]
pub enum FaucetError {
    #[error("Invalid funding key: {0}")]
    InvalidKey(String),

    #[error("Invalid payout amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),
}

/// Something that can pay a claimant.
#[async_trait]
pub trait Payout: Send + Sync {
    /// Funding account address, `0x`-prefixed.
    fn account(&self) -> String;

    /// Send the payout to `recipient`. Returns the transaction hash.
    async fn transfer(&self, recipient: &str) -> Result<String, FaucetError>;
}

/// Payout over an EVM JSON-RPC endpoint with a local signing key.
pub struct EthPayout {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    amount: U256,
}

impl EthPayout {
    /// Connect to `rpc_url` and bind the wallet to the node's chain id.
    pub async fn connect(rpc_url: &str, private_key: &str, payout: f64) -> Result<Self, FaucetError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| FaucetError::Provider(e.to_string()))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| FaucetError::Provider(e.to_string()))?;

        let wallet = private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| FaucetError::InvalidKey(e.to_string()))?
            .with_chain_id(chain_id.as_u64());

        let amount = payout_amount(payout)?;
        info!(
            account = %format!("{:#x}", wallet.address()),
            chain_id = chain_id.as_u64(),
            %amount,
            "Faucet wallet ready"
        );

        Ok(Self {
            client: SignerMiddleware::new(provider, wallet),
            amount,
        })
    }
}

#[async_trait]
impl Payout for EthPayout {
    fn account(&self) -> String {
        format!("{:#x}", self.client.address())
    }

    async fn transfer(&self, recipient: &str) -> Result<String, FaucetError> {
        let to: Address = recipient
            .parse()
            .map_err(|_| FaucetError::InvalidRecipient(recipient.to_string()))?;

        let tx = TransactionRequest::new().to(to).value(self.amount);
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| FaucetError::Transfer(e.to_string()))?;

        let hash = format!("{:#x}", pending.tx_hash());
        info!(recipient, tx_hash = %hash, "Payout sent");
        Ok(hash)
    }
}

/// Convert a whole-unit payout into wei.
pub fn payout_amount(payout: f64) -> Result<U256, FaucetError> {
    if !payout.is_finite() || payout <= 0.0 {
        return Err(FaucetError::InvalidAmount(payout.to_string()));
    }
    parse_ether(payout.to_string()).map_err(|e| FaucetError::InvalidAmount(e.to_string()))
}
