//! Configuration validation for the two-phase config update.
//!
//! `update_configs` validates a full [`UpdateConfigsParams`] payload and
//! queues its hash; `finalize_update_configs` re-validates the same payload
//! inside `[config_update_time, config_update_deadline]` and applies it.
//!
//! Rules:
//! - reserve pool count never exceeds the module's cap
//! - existing pools keep their asset at the same index (append-only)
//! - `max_slash_percentage` is at most `WAD`
//! - every delay is nonzero and at most [`MAX_DELAY`]
//! - a trigger appears at most once per update and must not have fired,
//!   for this module or on its own contract

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::{SafetyModuleError, SafetyModuleResult};
use crate::math::wad;
use crate::types::{ConfigUpdateMetadata, Delays, ReservePoolConfig, TriggerConfig, UpdateConfigsParams};

/// Upper bound for any delay (365 days, in seconds)
pub const MAX_DELAY: u64 = 365 * 24 * 60 * 60;

/// Validate a config payload against the current pool list.
///
/// `trigger_has_fired` reports whether an update touches a trigger that
/// already fired. Such updates are rejected.
pub fn validate_configs<F>(
    params: &UpdateConfigsParams,
    existing_assets: &[Address],
    allowed_reserve_pools: u32,
    mut trigger_has_fired: F,
) -> SafetyModuleResult<()>
where
    F: FnMut(&TriggerConfig) -> bool,
{
    validate_reserve_pool_configs(&params.reserve_pool_configs, existing_assets, allowed_reserve_pools)?;
    validate_delays(&params.delays_config)?;

    for (i, update) in params.trigger_config_updates.iter().enumerate() {
        let duplicated = params.trigger_config_updates[..i]
            .iter()
            .any(|other| other.trigger == update.trigger);
        if duplicated || trigger_has_fired(update) {
            return Err(SafetyModuleError::InvalidTriggerUpdate);
        }
    }
    Ok(())
}

pub fn validate_reserve_pool_configs(
    configs: &[ReservePoolConfig],
    existing_assets: &[Address],
    allowed_reserve_pools: u32,
) -> SafetyModuleResult<()> {
    if configs.len() > allowed_reserve_pools as usize {
        return Err(SafetyModuleError::TooManyReservePools);
    }
    if configs.len() < existing_assets.len() {
        return Err(SafetyModuleError::ReservePoolAssetChanged);
    }
    for (config, asset) in configs.iter().zip(existing_assets) {
        if config.asset != *asset {
            return Err(SafetyModuleError::ReservePoolAssetChanged);
        }
    }
    if configs.iter().any(|c| c.max_slash_percentage > wad()) {
        return Err(SafetyModuleError::InvalidMaxSlashPercentage);
    }
    Ok(())
}

pub fn validate_delays(delays: &Delays) -> SafetyModuleResult<()> {
    let all = [
        delays.config_update_delay,
        delays.config_update_grace_period,
        delays.withdraw_delay,
    ];
    if all.iter().any(|d| *d == 0 || *d > MAX_DELAY) {
        return Err(SafetyModuleError::InvalidDelays);
    }
    Ok(())
}

/// Metadata for an update queued at `now` with payload hash `hash`.
pub fn queued_update_metadata(hash: U256, now: u64, delays: &Delays) -> SafetyModuleResult<ConfigUpdateMetadata> {
    let config_update_time = now
        .checked_add(delays.config_update_delay)
        .ok_or(SafetyModuleError::ArithmeticOverflow)?;
    let config_update_deadline = config_update_time
        .checked_add(delays.config_update_grace_period)
        .ok_or(SafetyModuleError::ArithmeticOverflow)?;
    Ok(ConfigUpdateMetadata {
        queued_config_update_hash: hash,
        config_update_time,
        config_update_deadline,
    })
}

/// Whether `now` falls inside the finalize window (both bounds inclusive).
pub fn is_within_finalize_window(metadata: &ConfigUpdateMetadata, now: u64) -> bool {
    metadata.config_update_time <= now && now <= metadata.config_update_deadline
}
