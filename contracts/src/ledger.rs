//! Reserve pool ledger math.
//!
//! Pure functions over [`ReservePool`] records. The safety module loads a
//! pool, applies one of these, and stores it back; any `Err` aborts the call.
//!
//! ## Exchange rate
//!
//! Receipt tokens are priced against the pool's *available* assets:
//! `deposit_amount - pending_withdrawals_amount`. Queued redemptions stay in
//! `deposit_amount` (they remain slashable) but no longer back receipt tokens.
//! The raw token balance of the module is never consulted.

use odra::casper_types::U256;
use crate::errors::{SafetyModuleError, SafetyModuleResult};
use crate::math::{checked_add, checked_sub, div_wad_up, mul_div_down, mul_wad_down, mul_wad_up, wad};
use crate::types::ReservePool;

/// Assets currently backing receipt tokens.
pub fn available_assets(pool: &ReservePool) -> SafetyModuleResult<U256> {
    checked_sub(pool.deposit_amount, pool.pending_withdrawals_amount)
}

// ========== Conversions ==========

/// Receipt tokens minted for `asset_amount`. First depositor gets 1:1.
pub fn convert_to_receipt_token_amount(
    asset_amount: U256,
    receipt_token_supply: U256,
    pool_amount: U256,
) -> SafetyModuleResult<U256> {
    if receipt_token_supply.is_zero() {
        return Ok(asset_amount);
    }
    if pool_amount.is_zero() {
        return Ok(U256::zero());
    }
    mul_div_down(asset_amount, receipt_token_supply, pool_amount)
}

/// Assets owed for `receipt_token_amount`, rounded down.
pub fn convert_to_reserve_asset_amount(
    receipt_token_amount: U256,
    receipt_token_supply: U256,
    pool_amount: U256,
) -> SafetyModuleResult<U256> {
    if receipt_token_supply.is_zero() {
        return Ok(U256::zero());
    }
    mul_div_down(receipt_token_amount, pool_amount, receipt_token_supply)
}

// ========== Fees ==========

/// Fee dripped from `pool_amount` for a WAD-scaled `drip_factor`.
///
/// The fee is owed to the protocol and rounds up.
pub fn compute_drip_fee(pool_amount: U256, drip_factor: U256) -> SafetyModuleResult<U256> {
    if drip_factor > wad() {
        return Err(SafetyModuleError::InvalidDripFactor);
    }
    mul_wad_up(pool_amount, drip_factor)
}

/// Move the dripped fee from `deposit_amount` into `fee_amount`.
///
/// Returns the fee taken.
pub fn drip_fees(pool: &mut ReservePool, drip_factor: U256, now: u64) -> SafetyModuleResult<U256> {
    let fee = compute_drip_fee(available_assets(pool)?, drip_factor)?;
    pool.deposit_amount = checked_sub(pool.deposit_amount, fee)?;
    pool.fee_amount = checked_add(pool.fee_amount, fee)?;
    pool.last_fees_drip_time = now;
    Ok(fee)
}

// ========== Deposits / Redemptions ==========

pub fn record_deposit(pool: &mut ReservePool, asset_amount: U256) -> SafetyModuleResult<()> {
    pool.deposit_amount = checked_add(pool.deposit_amount, asset_amount)?;
    Ok(())
}

/// Earmark assets for a queued redemption.
pub fn record_queued_redemption(pool: &mut ReservePool, asset_amount: U256) -> SafetyModuleResult<()> {
    pool.pending_withdrawals_amount = checked_add(pool.pending_withdrawals_amount, asset_amount)?;
    Ok(())
}

/// Release a completed redemption. The payout is capped at the pending
/// amount so accumulated rounding can never underflow the ledger.
///
/// Returns the amount actually paid out.
pub fn record_completed_redemption(pool: &mut ReservePool, asset_amount: U256) -> SafetyModuleResult<U256> {
    let paid = asset_amount.min(pool.pending_withdrawals_amount);
    pool.pending_withdrawals_amount = checked_sub(pool.pending_withdrawals_amount, paid)?;
    pool.deposit_amount = checked_sub(pool.deposit_amount, paid)?;
    Ok(paid)
}

/// Instant redemption (paused module): assets leave the pool immediately.
pub fn record_instant_redemption(pool: &mut ReservePool, asset_amount: U256) -> SafetyModuleResult<()> {
    pool.deposit_amount = checked_sub(pool.deposit_amount, asset_amount)?;
    Ok(())
}

// ========== Slashing ==========

/// Max amount slashable from `pool` in a single slash call.
pub fn max_slash_amount(pool: &ReservePool) -> SafetyModuleResult<U256> {
    mul_wad_down(pool.deposit_amount, pool.max_slash_percentage)
}

/// Fraction (WAD) of `deposit_amount` that `amount` represents, rounded up.
pub fn slash_percentage(amount: U256, deposit_amount: U256) -> SafetyModuleResult<U256> {
    if amount.is_zero() {
        return Ok(U256::zero());
    }
    Ok(div_wad_up(amount, deposit_amount)?.min(wad()))
}

/// Slash `amount` from the pool.
///
/// Pending withdrawals shrink by the same fraction (rounded down), which
/// keeps `deposit_amount >= pending_withdrawals_amount`. Returns the slash
/// percentage applied, for scaling queued redemptions.
pub fn apply_slash(pool: &mut ReservePool, amount: U256) -> SafetyModuleResult<U256> {
    if amount > max_slash_amount(pool)? {
        return Err(SafetyModuleError::ExceedsMaxSlashPercentage);
    }
    let percentage = slash_percentage(amount, pool.deposit_amount)?;
    pool.pending_withdrawals_amount =
        mul_wad_down(pool.pending_withdrawals_amount, checked_sub(wad(), percentage)?)?;
    pool.deposit_amount = checked_sub(pool.deposit_amount, amount)?;
    Ok(percentage)
}
