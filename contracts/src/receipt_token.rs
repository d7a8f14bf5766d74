//! Receipt token ledger.
//!
//! Every reserve pool has a fungible receipt token representing a
//! proportional claim on the pool's assets. Receipt tokens live inside the
//! safety module that owns the pool rather than in separately deployed
//! contracts, so a token is identified by `(safety_module, reserve_pool_id,
//! pool_type)`. That identity is known before the pool exists.
//!
//! ## Supply rules
//!
//! - Minted only by the safety module on deposit
//! - Burned on redeem, spending the caller's allowance when the caller is not
//!   the holder
//! - Freely transferable between holders

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::{SafetyModuleError, SafetyModuleResult};
use crate::math::{checked_add, checked_sub};
use crate::types::PoolType;

const RECEIPT_TOKEN_NAME: &str = "Safety Module Reserve Receipt Token";
const RECEIPT_TOKEN_SYMBOL: &str = "smRT";

/// Identity of a receipt token
#[odra::odra_type]
#[derive(Copy)]
pub struct ReceiptTokenId {
    /// Safety module that issues the token
    pub safety_module: Address,
    pub reserve_pool_id: u32,
    pub pool_type: PoolType,
}

/// Receipt token metadata
#[odra::odra_type]
pub struct ReceiptTokenMetadata {
    pub name: String,
    pub symbol: String,
    /// Mirrors the reserve asset's decimals
    pub decimals: u8,
}

/// Derive the receipt token identity for a pool.
///
/// Deterministic, so off-chain callers can compute it before the pool is
/// created by `finalize_update_configs`.
pub fn compute_receipt_token_id(
    safety_module: Address,
    reserve_pool_id: u32,
    pool_type: PoolType,
) -> ReceiptTokenId {
    ReceiptTokenId {
        safety_module,
        reserve_pool_id,
        pool_type,
    }
}

/// Receipt token ledgers for all reserve pools of one safety module
#[odra::module]
pub struct ReceiptTokens {
    /// Metadata per reserve pool id
    metadata: Mapping<u32, ReceiptTokenMetadata>,
    /// Total supply per reserve pool id
    total_supply: Mapping<u32, U256>,
    /// (pool id, holder) -> balance
    balances: Mapping<(u32, Address), U256>,
    /// (pool id, owner, spender) -> allowance
    allowances: Mapping<(u32, Address, Address), U256>,
}

#[odra::module]
impl ReceiptTokens {
    /// Create the receipt token for a new reserve pool
    pub fn create(&mut self, reserve_pool_id: u32, decimals: u8) {
        if self.metadata.get(&reserve_pool_id).is_some() {
            self.env().revert(SafetyModuleError::AlreadyInitialized);
        }
        self.metadata.set(
            &reserve_pool_id,
            ReceiptTokenMetadata {
                name: String::from(RECEIPT_TOKEN_NAME),
                symbol: String::from(RECEIPT_TOKEN_SYMBOL),
                decimals,
            },
        );
        self.total_supply.set(&reserve_pool_id, U256::zero());
    }

    pub fn metadata(&self, reserve_pool_id: u32) -> Option<ReceiptTokenMetadata> {
        self.metadata.get(&reserve_pool_id)
    }

    pub fn total_supply(&self, reserve_pool_id: u32) -> U256 {
        self.total_supply.get(&reserve_pool_id).unwrap_or(U256::zero())
    }

    pub fn balance_of(&self, reserve_pool_id: u32, account: Address) -> U256 {
        self.balances.get(&(reserve_pool_id, account)).unwrap_or(U256::zero())
    }

    pub fn allowance(&self, reserve_pool_id: u32, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(reserve_pool_id, owner, spender))
            .unwrap_or(U256::zero())
    }

    pub fn approve(&mut self, reserve_pool_id: u32, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(reserve_pool_id, owner, spender), amount);
    }

    pub fn transfer(&mut self, reserve_pool_id: u32, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(reserve_pool_id, from);
        if from_balance < amount {
            self.env().revert(SafetyModuleError::InsufficientReceiptTokenBalance);
        }
        let from_balance = self.or_revert(checked_sub(from_balance, amount));
        self.balances.set(&(reserve_pool_id, from), from_balance);
        let to_balance = self.or_revert(checked_add(self.balance_of(reserve_pool_id, to), amount));
        self.balances.set(&(reserve_pool_id, to), to_balance);
    }

    pub fn mint(&mut self, reserve_pool_id: u32, to: Address, amount: U256) {
        let balance = self.or_revert(checked_add(self.balance_of(reserve_pool_id, to), amount));
        let supply = self.or_revert(checked_add(self.total_supply(reserve_pool_id), amount));
        self.balances.set(&(reserve_pool_id, to), balance);
        self.total_supply.set(&reserve_pool_id, supply);
    }

    /// Burn `amount` from `owner`. When `caller` is not the owner its
    /// allowance is spent first.
    pub fn burn(&mut self, reserve_pool_id: u32, caller: Address, owner: Address, amount: U256) {
        if caller != owner {
            let allowed = self.allowance(reserve_pool_id, owner, caller);
            if allowed < amount {
                self.env().revert(SafetyModuleError::InsufficientAllowance);
            }
            if allowed != U256::MAX {
                let remaining = self.or_revert(checked_sub(allowed, amount));
                self.allowances.set(&(reserve_pool_id, owner, caller), remaining);
            }
        }

        let balance = self.balance_of(reserve_pool_id, owner);
        if balance < amount {
            self.env().revert(SafetyModuleError::InsufficientReceiptTokenBalance);
        }
        let balance = self.or_revert(checked_sub(balance, amount));
        let supply = self.or_revert(checked_sub(self.total_supply(reserve_pool_id), amount));
        self.balances.set(&(reserve_pool_id, owner), balance);
        self.total_supply.set(&reserve_pool_id, supply);
    }
}

impl ReceiptTokens {
    fn or_revert(&self, result: SafetyModuleResult<U256>) -> U256 {
        match result {
            Ok(value) => value,
            Err(err) => self.env().revert(err),
        }
    }
}
