//! Events emitted by the safety module and its manager.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::SafetyModuleState;

// ========== Safety Module ==========

#[odra::event]
pub struct Deposited {
    pub caller: Address,
    pub receiver: Address,
    pub reserve_pool_id: u32,
    pub asset_amount: U256,
    pub receipt_token_amount: U256,
}

#[odra::event]
pub struct RedemptionPending {
    pub caller: Address,
    pub receiver: Address,
    pub owner: Address,
    pub reserve_pool_id: u32,
    pub receipt_token_amount: U256,
    pub asset_amount: U256,
    pub redemption_id: u64,
}

/// Emitted when assets leave the module for a redeemer, either on
/// completion of a queued redemption or instantly while paused.
#[odra::event]
pub struct Redeemed {
    pub caller: Address,
    pub receiver: Address,
    pub owner: Address,
    pub reserve_pool_id: u32,
    pub receipt_token_amount: U256,
    pub asset_amount: U256,
    pub redemption_id: u64,
}

#[odra::event]
pub struct Triggered {
    pub trigger: Address,
}

#[odra::event]
pub struct Slashed {
    pub payout_handler: Address,
    pub receiver: Address,
    pub reserve_pool_id: u32,
    pub amount: U256,
}

#[odra::event]
pub struct SafetyModuleStateUpdated {
    pub updated_to: SafetyModuleState,
}

#[odra::event]
pub struct ClaimedFees {
    pub reserve_pool_id: u32,
    pub asset: Address,
    pub fee_amount: U256,
    pub receiver: Address,
}

/// The payload itself is not emitted; callers keep it to finalize and match
/// it against `config_update_hash`.
#[odra::event]
pub struct ConfigUpdatesQueued {
    pub config_update_hash: U256,
    pub update_time: u64,
    pub update_deadline: u64,
}

#[odra::event]
pub struct ConfigUpdatesFinalized {
    pub config_update_hash: U256,
}

#[odra::event]
pub struct ReservePoolCreated {
    pub reserve_pool_id: u32,
    pub asset: Address,
}

#[odra::event]
pub struct TriggerConfigUpdated {
    pub trigger: Address,
    pub payout_handler: Address,
    pub exists: bool,
}

#[odra::event]
pub struct DelaysUpdated {
    pub config_update_delay: u64,
    pub config_update_grace_period: u64,
    pub withdraw_delay: u64,
}

// ========== Manager ==========

#[odra::event]
pub struct SafetyModuleRegistered {
    pub safety_module: Address,
}

#[odra::event]
pub struct OwnerUpdated {
    pub owner: Address,
}

#[odra::event]
pub struct PauserUpdated {
    pub pauser: Address,
}
