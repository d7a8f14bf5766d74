//! Slash scaling for queued redemptions.
//!
//! Each reserve pool keeps a list of accumulated inverse scaling factors
//! (ISFs). The last entry belongs to the current epoch and starts at `WAD`.
//! A slash of fraction `p` multiplies it by `1 / (1 - p)`. A redemption
//! remembers the list length and the last ISF when it was queued; its payout
//! at completion is `asset_amount * queued_isf / current_isf`, carried across
//! any epochs that closed in between.
//!
//! An epoch closes when a slash takes the whole pool (the ISF becomes
//! infinite, stored as `U256::MAX`) or when the ISF grows past
//! [`MAX_SAFE_ACC_ISF`]. A fresh `WAD` entry is then pushed.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::{SafetyModuleError, SafetyModuleResult};
use crate::math::{checked_sub, mul_div_down, mul_div_up, wad};

/// Largest accumulated ISF kept in the current epoch (1e36)
pub const MAX_SAFE_ACC_ISF: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;

/// Accumulated ISF list for a freshly created pool.
pub fn initial_acc_isfs() -> Vec<U256> {
    let mut acc_isfs = Vec::new();
    acc_isfs.push(wad());
    acc_isfs
}

/// Fold a slash of `slash_percentage` (WAD) into the pool's ISF list.
pub fn update_acc_isfs_after_slash(acc_isfs: &mut Vec<U256>, slash_percentage: U256) -> SafetyModuleResult<()> {
    if slash_percentage.is_zero() {
        return Ok(());
    }
    let last = match acc_isfs.last_mut() {
        Some(last) => last,
        None => return Err(SafetyModuleError::InvalidState),
    };

    let scale = checked_sub(wad(), slash_percentage)?;
    if scale.is_zero() {
        *last = U256::MAX;
        acc_isfs.push(wad());
        return Ok(());
    }

    let updated = mul_div_up(*last, wad(), scale)?;
    *last = updated;
    if updated > U256::from(MAX_SAFE_ACC_ISF) {
        acc_isfs.push(wad());
    }
    Ok(())
}

/// Assets a queued redemption pays out given the pool's current ISF list.
///
/// Rounds down at every step.
pub fn compute_final_asset_amount(
    acc_isfs: &[U256],
    queued_acc_isfs_length: u32,
    queued_acc_isf: U256,
    asset_amount: U256,
) -> SafetyModuleResult<U256> {
    let queued_len = queued_acc_isfs_length as usize;
    if queued_len == 0 || queued_len > acc_isfs.len() {
        return Err(SafetyModuleError::InvalidState);
    }

    // Epoch the redemption was queued in
    let queued_epoch_isf = acc_isfs[queued_len - 1];
    if queued_epoch_isf == U256::MAX {
        return Ok(U256::zero());
    }
    let mut amount = mul_div_down(asset_amount, queued_acc_isf, queued_epoch_isf)?;

    // Epochs opened after it, each starting at WAD
    for isf in &acc_isfs[queued_len..] {
        if *isf == U256::MAX {
            return Ok(U256::zero());
        }
        amount = mul_div_down(amount, wad(), *isf)?;
    }
    Ok(amount)
}

/// Seconds left until a redemption queued at `queue_time` with `delay` may complete.
pub fn delay_remaining(queue_time: u64, delay: u64, now: u64) -> u64 {
    queue_time.saturating_add(delay).saturating_sub(now)
}
