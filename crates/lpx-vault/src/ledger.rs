//! The `VaultLedger` trait and its in-memory implementation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use lpx_core::{AccountId, Amount, MarketId, TokenSymbol};

use crate::error::{VaultError, VaultResult};

/// One ledger mutation, journaled by the execution engines and applied
/// atomically at commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultOp {
    /// Move tokens from an account's free balance into the escrow pot.
    Escrow {
        account: AccountId,
        token: TokenSymbol,
        amount: Amount,
    },
    /// Return escrowed tokens to an account's free balance.
    ReleaseEscrow {
        account: AccountId,
        token: TokenSymbol,
        amount: Amount,
    },
    /// Move escrowed tokens into a market pool.
    EscrowToPool {
        market: MarketId,
        token: TokenSymbol,
        amount: Amount,
    },
    /// Pay tokens out of a market pool to an account.
    PoolToAccount {
        market: MarketId,
        token: TokenSymbol,
        amount: Amount,
        account: AccountId,
    },
    /// Mint market tokens to an account, increasing supply.
    MintMarketTokens {
        token: TokenSymbol,
        account: AccountId,
        amount: Amount,
    },
    /// Burn escrowed market tokens, decreasing supply.
    BurnEscrowedMarketTokens { token: TokenSymbol, amount: Amount },
    /// Increase a market's open interest.
    IncreaseOpenInterest { market: MarketId, amount: Amount },
    /// Decrease a market's open interest.
    DecreaseOpenInterest { market: MarketId, amount: Amount },
}

/// The ledger interface the pipeline depends on.
///
/// `escrow` and `release_escrow` serve the create/cancel paths directly;
/// everything the execution engines do goes through `apply`, which must
/// be all-or-nothing: validate every operation against current state,
/// then apply the whole batch, or change nothing.
pub trait VaultLedger: Send + Sync {
    fn balance(&self, account: &AccountId, token: &TokenSymbol) -> Amount;
    fn escrowed(&self, token: &TokenSymbol) -> Amount;
    fn pool_balance(&self, market: &MarketId, token: &TokenSymbol) -> Amount;
    fn market_token_supply(&self, token: &TokenSymbol) -> Amount;
    fn open_interest(&self, market: &MarketId) -> Amount;

    /// Escrow tokens from an account's free balance.
    fn escrow(&self, account: &AccountId, token: &TokenSymbol, amount: Amount) -> VaultResult<()>;

    /// Return escrowed tokens to an account.
    fn release_escrow(
        &self,
        account: &AccountId,
        token: &TokenSymbol,
        amount: Amount,
    ) -> VaultResult<()>;

    /// Apply a batch of operations atomically.
    fn apply(&self, ops: &[VaultOp]) -> VaultResult<()>;
}

#[derive(Debug, Clone, Default)]
struct VaultState {
    balances: HashMap<(AccountId, TokenSymbol), Amount>,
    escrow: HashMap<TokenSymbol, Amount>,
    pools: HashMap<(MarketId, TokenSymbol), Amount>,
    supply: HashMap<TokenSymbol, Amount>,
    open_interest: HashMap<MarketId, Amount>,
}

impl VaultState {
    fn debit_balance(
        &mut self,
        account: &AccountId,
        token: &TokenSymbol,
        amount: Amount,
    ) -> VaultResult<()> {
        let key = (account.clone(), token.clone());
        let have = self.balances.get(&key).copied().unwrap_or(Amount::ZERO);
        let left = have
            .checked_sub(amount)
            .ok_or_else(|| VaultError::InsufficientBalance {
                account: account.clone(),
                token: token.clone(),
                have,
                need: amount,
            })?;
        self.balances.insert(key, left);
        Ok(())
    }

    fn credit_balance(&mut self, account: &AccountId, token: &TokenSymbol, amount: Amount) {
        let key = (account.clone(), token.clone());
        let entry = self.balances.entry(key).or_insert(Amount::ZERO);
        *entry = entry.saturating_add(amount);
    }

    fn debit_escrow(&mut self, token: &TokenSymbol, amount: Amount) -> VaultResult<()> {
        let have = self.escrow.get(token).copied().unwrap_or(Amount::ZERO);
        let left = have
            .checked_sub(amount)
            .ok_or_else(|| VaultError::InsufficientEscrow {
                token: token.clone(),
                have,
                need: amount,
            })?;
        self.escrow.insert(token.clone(), left);
        Ok(())
    }

    fn credit_escrow(&mut self, token: &TokenSymbol, amount: Amount) {
        let entry = self.escrow.entry(token.clone()).or_insert(Amount::ZERO);
        *entry = entry.saturating_add(amount);
    }

    fn apply_op(&mut self, op: &VaultOp) -> VaultResult<()> {
        match op {
            VaultOp::Escrow {
                account,
                token,
                amount,
            } => {
                self.debit_balance(account, token, *amount)?;
                self.credit_escrow(token, *amount);
            }
            VaultOp::ReleaseEscrow {
                account,
                token,
                amount,
            } => {
                self.debit_escrow(token, *amount)?;
                self.credit_balance(account, token, *amount);
            }
            VaultOp::EscrowToPool {
                market,
                token,
                amount,
            } => {
                self.debit_escrow(token, *amount)?;
                let key = (market.clone(), token.clone());
                let entry = self.pools.entry(key).or_insert(Amount::ZERO);
                *entry = entry.saturating_add(*amount);
            }
            VaultOp::PoolToAccount {
                market,
                token,
                amount,
                account,
            } => {
                let key = (market.clone(), token.clone());
                let have = self.pools.get(&key).copied().unwrap_or(Amount::ZERO);
                let left =
                    have.checked_sub(*amount)
                        .ok_or_else(|| VaultError::InsufficientPool {
                            market: market.clone(),
                            token: token.clone(),
                            have,
                            need: *amount,
                        })?;
                self.pools.insert(key, left);
                self.credit_balance(account, token, *amount);
            }
            VaultOp::MintMarketTokens {
                token,
                account,
                amount,
            } => {
                let entry = self.supply.entry(token.clone()).or_insert(Amount::ZERO);
                *entry = entry.saturating_add(*amount);
                self.credit_balance(account, token, *amount);
            }
            VaultOp::BurnEscrowedMarketTokens { token, amount } => {
                self.debit_escrow(token, *amount)?;
                let have = self.supply.get(token).copied().unwrap_or(Amount::ZERO);
                let left =
                    have.checked_sub(*amount)
                        .ok_or_else(|| VaultError::InsufficientSupply {
                            token: token.clone(),
                            have,
                            need: *amount,
                        })?;
                self.supply.insert(token.clone(), left);
            }
            VaultOp::IncreaseOpenInterest { market, amount } => {
                let entry = self
                    .open_interest
                    .entry(market.clone())
                    .or_insert(Amount::ZERO);
                *entry = entry.saturating_add(*amount);
            }
            VaultOp::DecreaseOpenInterest { market, amount } => {
                let have = self
                    .open_interest
                    .get(market)
                    .copied()
                    .unwrap_or(Amount::ZERO);
                let left = have
                    .checked_sub(*amount)
                    .ok_or_else(|| VaultError::OpenInterestUnderflow {
                        market: market.clone(),
                    })?;
                self.open_interest.insert(market.clone(), left);
            }
        }
        Ok(())
    }
}

/// In-memory ledger.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    state: RwLock<VaultState>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account's free balance. Funding entry point for tests
    /// and embedding.
    pub fn credit(&self, account: &AccountId, token: &TokenSymbol, amount: Amount) {
        self.state.write().credit_balance(account, token, amount);
    }
}

impl VaultLedger for InMemoryVault {
    fn balance(&self, account: &AccountId, token: &TokenSymbol) -> Amount {
        self.state
            .read()
            .balances
            .get(&(account.clone(), token.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn escrowed(&self, token: &TokenSymbol) -> Amount {
        self.state
            .read()
            .escrow
            .get(token)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn pool_balance(&self, market: &MarketId, token: &TokenSymbol) -> Amount {
        self.state
            .read()
            .pools
            .get(&(market.clone(), token.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn market_token_supply(&self, token: &TokenSymbol) -> Amount {
        self.state
            .read()
            .supply
            .get(token)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn open_interest(&self, market: &MarketId) -> Amount {
        self.state
            .read()
            .open_interest
            .get(market)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn escrow(&self, account: &AccountId, token: &TokenSymbol, amount: Amount) -> VaultResult<()> {
        let mut state = self.state.write();
        state.debit_balance(account, token, amount)?;
        state.credit_escrow(token, amount);
        debug!(%account, %token, %amount, "Escrowed");
        Ok(())
    }

    fn release_escrow(
        &self,
        account: &AccountId,
        token: &TokenSymbol,
        amount: Amount,
    ) -> VaultResult<()> {
        let mut state = self.state.write();
        state.debit_escrow(token, amount)?;
        state.credit_balance(account, token, amount);
        debug!(%account, %token, %amount, "Escrow released");
        Ok(())
    }

    fn apply(&self, ops: &[VaultOp]) -> VaultResult<()> {
        let mut state = self.state.write();
        // Validate and apply against a working copy; swap in only when
        // the whole batch went through.
        let mut working = state.clone();
        for op in ops {
            working.apply_op(op)?;
        }
        *state = working;
        debug!(ops = ops.len(), "Vault batch applied");
        Ok(())
    }
}
