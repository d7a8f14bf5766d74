//! Common types used across the safety module.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::receipt_token::ReceiptTokenId;

/// Safety module lifecycle state
#[odra::odra_type]
#[derive(Copy)]
pub enum SafetyModuleState {
    /// Normal operation
    Active,
    /// At least one trigger fired and slashes are pending
    Triggered,
    /// Paused by the owner, pauser or manager
    Paused,
}

/// Role of the caller requesting a state transition
#[odra::odra_type]
#[derive(Copy)]
pub enum CallerRole {
    /// No privileged role (automatic transitions via `trigger` / `slash`)
    NoRole,
    Owner,
    Pauser,
    Manager,
}

/// State reported by an external trigger contract
#[odra::odra_type]
#[derive(Copy)]
pub enum TriggerState {
    Active,
    Triggered,
    Frozen,
}

/// Kind of pool a receipt token represents
#[odra::odra_type]
#[derive(Copy)]
pub enum PoolType {
    Reserve,
}

/// Per reserve pool ledger
#[odra::odra_type]
pub struct ReservePool {
    /// Underlying asset (CEP-18 contract)
    pub asset: Address,
    /// Assets backing receipt tokens and queued redemptions
    pub deposit_amount: U256,
    /// Assets earmarked for queued, not yet completed redemptions
    pub pending_withdrawals_amount: U256,
    /// Fees accrued to the protocol, not yet claimed
    pub fee_amount: U256,
    /// Max fraction (WAD) slashable in a single slash call
    pub max_slash_percentage: U256,
    /// Receipt token representing claims on this pool
    pub receipt_token: ReceiptTokenId,
    /// Last fee drip timestamp (seconds)
    pub last_fees_drip_time: u64,
}

/// Aggregate custody per underlying asset
#[odra::odra_type]
#[derive(Default)]
pub struct AssetPool {
    /// Total units of the asset held by the safety module
    pub amount: U256,
}

/// Delay parameters, all in seconds
#[odra::odra_type]
#[derive(Copy)]
pub struct Delays {
    /// Minimum wait between queueing and finalizing a config update
    pub config_update_delay: u64,
    /// Window after the delay during which the update may be finalized
    pub config_update_grace_period: u64,
    /// Wait between queueing and completing a redemption
    pub withdraw_delay: u64,
}

/// Trigger wiring for this safety module
#[odra::odra_type]
pub struct TriggerData {
    /// Payout handler allowed to slash once this trigger fires
    pub payout_handler: Address,
    /// Whether the trigger is wired into this safety module
    pub exists: bool,
    /// Whether the trigger already fired for this safety module
    pub triggered: bool,
}

/// Trigger wiring update
#[odra::odra_type]
pub struct TriggerConfig {
    pub trigger: Address,
    pub payout_handler: Address,
    /// `false` unwires the trigger
    pub exists: bool,
}

/// Configuration for a single reserve pool
#[odra::odra_type]
pub struct ReservePoolConfig {
    /// Max fraction (WAD) slashable in a single slash call
    pub max_slash_percentage: U256,
    /// Underlying asset (CEP-18 contract)
    pub asset: Address,
}

/// Full configuration payload for `update_configs` / `finalize_update_configs`
#[odra::odra_type]
pub struct UpdateConfigsParams {
    /// Complete reserve pool list (existing pools first, in order)
    pub reserve_pool_configs: Vec<ReservePoolConfig>,
    pub trigger_config_updates: Vec<TriggerConfig>,
    pub delays_config: Delays,
}

/// Pending two-phase config update
#[odra::odra_type]
#[derive(Default)]
pub struct ConfigUpdateMetadata {
    /// Hash of the queued payload, zero when nothing is queued
    pub queued_config_update_hash: U256,
    /// Earliest finalize time (seconds)
    pub config_update_time: u64,
    /// Latest finalize time (seconds)
    pub config_update_deadline: u64,
}

/// Single slash instruction
#[odra::odra_type]
#[derive(Copy)]
pub struct Slash {
    pub reserve_pool_id: u32,
    pub amount: U256,
}

/// Queued redemption
#[odra::odra_type]
pub struct Redemption {
    pub id: u64,
    pub reserve_pool_id: u32,
    /// Receipt tokens burned at queue time
    pub receipt_token_amount: U256,
    /// Assets owed at queue time, before any later slash
    pub asset_amount: U256,
    pub owner: Address,
    pub receiver: Address,
    /// Queue timestamp (seconds)
    pub queue_time: u64,
    /// Withdraw delay in force at queue time
    pub delay: u64,
    /// Length of the pool's accumulated ISF list at queue time
    pub queued_acc_isfs_length: u32,
    /// Last accumulated ISF of the pool at queue time
    pub queued_acc_isf: U256,
}

/// Projected outcome of a queued redemption
#[odra::odra_type]
pub struct RedemptionPreview {
    /// Seconds left before the redemption can complete
    pub delay_remaining: u64,
    pub receipt_token_amount: U256,
    /// Assets paid out if completed now
    pub reserve_asset_amount: U256,
    pub owner: Address,
    pub receiver: Address,
}
