//! Safety module flows on the test VM.

use odra::casper_types::U256;
use odra::host::HostRef;
use odra::prelude::Addressable;
use pretty_assertions::assert_eq;
use safety_module_contracts::errors::SafetyModuleError;
use safety_module_contracts::math::wad;
use safety_module_contracts::types::{
    ReservePoolConfig, SafetyModuleState, Slash, TriggerConfig, TriggerState, UpdateConfigsParams,
};

use crate::fixture::{
    delays, units, Fixture, CONFIG_UPDATE_DELAY, CONFIG_UPDATE_GRACE_PERIOD, WITHDRAW_DELAY,
};
use crate::mocks::{MockAsset, MockAssetInitArgs, MockTrigger};
use odra::host::{Deployer, NoArgs};

fn slash(reserve_pool_id: u32, amount: u64) -> Slash {
    Slash {
        reserve_pool_id,
        amount: units(amount),
    }
}

// ===== Deposits =====

#[test]
fn test_first_deposit_mints_one_to_one() {
    let mut f = Fixture::new();
    let minted = f.deposit(f.alice, units(1_000));

    assert_eq!(minted, units(1_000));
    assert_eq!(f.safety_module.receipt_token_balance_of(0, f.alice), units(1_000));
    assert_eq!(f.safety_module.receipt_token_total_supply(0), units(1_000));
    assert_eq!(f.deposit_amount(), units(1_000));
    assert_eq!(f.safety_module.asset_pool(f.asset_address()).amount, units(1_000));
    f.assert_custody_matches_balance();
}

#[test]
fn test_second_deposit_priced_against_available_assets() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.drip_with_factor(wad() / 10);

    // 900 assets back 1_000 shares
    let minted = f.deposit(f.bob, units(90));
    assert_eq!(minted, units(100));
    assert_eq!(f.safety_module.preview_deposit(0, units(90)), units(100));
}

#[test]
fn test_zero_deposit_rounds_to_zero() {
    let mut f = Fixture::new();
    f.fund(f.alice, units(10));
    f.env.set_caller(f.alice);
    assert_eq!(
        f.safety_module.try_deposit_reserve_assets(0, U256::zero(), f.alice),
        Err(SafetyModuleError::RoundsToZero.into())
    );
}

#[test]
fn test_deposit_to_unknown_pool() {
    let mut f = Fixture::new();
    f.env.set_caller(f.alice);
    assert_eq!(
        f.safety_module.try_deposit_reserve_assets(3, units(10), f.alice),
        Err(SafetyModuleError::ReservePoolNotFound.into())
    );
}

#[test]
fn test_deposit_without_transfer_requires_surplus_balance() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));

    f.env.set_caller(f.bob);
    assert_eq!(
        f.safety_module.try_deposit_reserve_assets_without_transfer(0, units(50), f.bob),
        Err(SafetyModuleError::InvalidDeposit.into())
    );

    f.asset.mint(f.bob, units(50));
    f.env.set_caller(f.bob);
    let sm = f.sm_address();
    f.asset.transfer(sm, units(50));
    let minted = f.safety_module.deposit_reserve_assets_without_transfer(0, units(50), f.bob);

    assert_eq!(minted, units(50));
    assert_eq!(f.deposit_amount(), units(1_050));
    f.assert_custody_matches_balance();
}

// ===== Fees =====

#[test]
fn test_drip_moves_assets_to_fees_and_redeem_reflects_it() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.drip_with_factor(wad() / 10);

    let pool = f.safety_module.reserve_pools(0);
    assert_eq!(pool.fee_amount, units(100));
    assert_eq!(pool.deposit_amount, units(900));

    let id = f.redeem(f.alice, units(1_000));
    let redemption = f.safety_module.redemption(id).unwrap();
    assert_eq!(redemption.asset_amount, units(900));
}

#[test]
fn test_claim_fees_only_by_manager() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.drip_with_factor(wad() / 10);

    f.env.set_caller(f.owner);
    assert_eq!(
        f.safety_module.try_claim_fees(f.fee_receiver),
        Err(SafetyModuleError::Unauthorized.into())
    );
}

// ===== Redemptions =====

#[test]
fn test_redemption_waits_for_delay_and_pays_once() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    let id = f.redeem(f.alice, units(400));

    let pool = f.safety_module.reserve_pools(0);
    assert_eq!(pool.pending_withdrawals_amount, units(400));
    assert_eq!(pool.deposit_amount, units(1_000));
    assert_eq!(f.safety_module.receipt_token_total_supply(0), units(600));

    f.advance_seconds(WITHDRAW_DELAY - 1);
    assert_eq!(
        f.safety_module.try_complete_redemption(id),
        Err(SafetyModuleError::DelayNotElapsed.into())
    );
    assert_eq!(f.safety_module.preview_queued_redemption(id).delay_remaining, 1);

    f.advance_seconds(1);
    f.env.set_caller(f.bob);
    let paid = f.safety_module.complete_redemption(id);
    assert_eq!(paid, units(400));
    assert_eq!(f.asset.balance_of(f.alice), units(400));
    assert_eq!(f.deposit_amount(), units(600));
    assert_eq!(f.safety_module.reserve_pools(0).pending_withdrawals_amount, U256::zero());
    f.assert_custody_matches_balance();

    assert_eq!(
        f.safety_module.try_complete_redemption(id),
        Err(SafetyModuleError::RedemptionNotFound.into())
    );
}

#[test]
fn test_redeem_on_behalf_spends_allowance() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));

    f.env.set_caller(f.bob);
    assert_eq!(
        f.safety_module.try_redeem(0, units(100), f.bob, f.alice),
        Err(SafetyModuleError::InsufficientAllowance.into())
    );

    f.env.set_caller(f.alice);
    f.safety_module.approve_receipt_token(0, f.bob, units(150));
    f.env.set_caller(f.bob);
    f.safety_module.redeem(0, units(100), f.bob, f.alice);

    assert_eq!(f.safety_module.receipt_token_allowance(0, f.alice, f.bob), units(50));
    assert_eq!(f.safety_module.receipt_token_balance_of(0, f.alice), units(900));
}

#[test]
fn test_redeem_zero_rounds_to_zero() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.env.set_caller(f.alice);
    assert_eq!(
        f.safety_module.try_redeem(0, U256::zero(), f.alice, f.alice),
        Err(SafetyModuleError::RoundsToZero.into())
    );
}

#[test]
fn test_paused_redemption_is_instant() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));

    f.env.set_caller(f.pauser);
    f.safety_module.pause();
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Paused);

    let id = f.redeem(f.alice, units(250));
    assert_eq!(f.safety_module.redemption(id), None);
    assert_eq!(f.asset.balance_of(f.alice), units(250));
    assert_eq!(f.deposit_amount(), units(750));
    f.assert_custody_matches_balance();
}

#[test]
fn test_transfer_receipt_tokens() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));

    f.env.set_caller(f.alice);
    f.safety_module.transfer_receipt_token(0, f.bob, units(300));
    assert_eq!(f.safety_module.receipt_token_balance_of(0, f.bob), units(300));

    f.env.set_caller(f.bob);
    assert_eq!(
        f.safety_module.try_transfer_receipt_token(0, f.alice, units(301)),
        Err(SafetyModuleError::InsufficientReceiptTokenBalance.into())
    );
}

// ===== Triggers & Slashing =====

#[test]
fn test_trigger_then_slash_returns_to_active() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.drip_with_factor(wad() / 10);

    f.fire_trigger();
    assert_eq!(f.safety_module.num_pending_slashes(), 1);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.payout_handler), 1);
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Triggered);

    f.env.set_caller(f.payout_handler);
    f.safety_module.slash(vec![slash(0, 200)], f.bob);

    assert_eq!(f.deposit_amount(), units(700));
    assert_eq!(f.asset.balance_of(f.bob), units(200));
    assert_eq!(f.safety_module.num_pending_slashes(), 0);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.payout_handler), 0);
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Active);
    f.assert_custody_matches_balance();
    f.assert_ledger_sum();
}

#[test]
fn test_slash_scales_down_queued_redemption() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(900));
    let id = f.redeem(f.alice, units(100));
    assert_eq!(f.safety_module.redemption(id).unwrap().asset_amount, units(100));

    f.fire_trigger();
    f.env.set_caller(f.payout_handler);
    f.safety_module.slash(vec![slash(0, 200)], f.bob);
    assert_eq!(f.deposit_amount(), units(700));

    assert_eq!(f.safety_module.preview_queued_redemption(id).reserve_asset_amount, units(77));

    f.advance_seconds(WITHDRAW_DELAY);
    let paid = f.safety_module.complete_redemption(id);
    assert_eq!(paid, units(77));
    assert_eq!(f.asset.balance_of(f.alice), units(77));
    f.assert_custody_matches_balance();
    f.assert_ledger_sum();
}

#[test]
fn test_trigger_is_one_shot() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.fire_trigger();

    let trigger = f.trigger_address();
    assert_eq!(
        f.safety_module.try_trigger(trigger),
        Err(SafetyModuleError::TriggerAlreadyTriggered.into())
    );
    assert_eq!(f.safety_module.num_pending_slashes(), 1);
    assert!(f.safety_module.trigger_data(trigger).unwrap().triggered);
}

#[test]
fn test_trigger_requires_fired_registered_trigger() {
    let mut f = Fixture::new();
    let trigger = f.trigger_address();
    assert_eq!(
        f.safety_module.try_trigger(trigger),
        Err(SafetyModuleError::InvalidTrigger.into())
    );

    let unknown = f.bob;
    assert_eq!(
        f.safety_module.try_trigger(unknown),
        Err(SafetyModuleError::TriggerNotFound.into())
    );
}

#[test]
fn test_slash_guards() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));

    // Not triggered yet
    f.env.set_caller(f.payout_handler);
    assert_eq!(
        f.safety_module.try_slash(vec![slash(0, 10)], f.bob),
        Err(SafetyModuleError::InvalidState.into())
    );

    f.fire_trigger();

    f.env.set_caller(f.bob);
    assert_eq!(
        f.safety_module.try_slash(vec![slash(0, 10)], f.bob),
        Err(SafetyModuleError::Unauthorized.into())
    );

    f.env.set_caller(f.payout_handler);
    assert_eq!(
        f.safety_module.try_slash(vec![slash(0, 501)], f.bob),
        Err(SafetyModuleError::ExceedsMaxSlashPercentage.into())
    );
    assert_eq!(
        f.safety_module.try_slash(vec![slash(0, 10), slash(0, 10)], f.bob),
        Err(SafetyModuleError::AlreadySlashed.into())
    );

    // Failed attempts leave the pending slash intact
    assert_eq!(f.safety_module.num_pending_slashes(), 1);
    f.safety_module.slash(vec![slash(0, 500)], f.bob);
    assert_eq!(f.deposit_amount(), units(500));
}

#[test]
fn test_trigger_while_paused_stays_paused() {
    let mut f = Fixture::new();
    f.deposit(f.alice, units(1_000));
    f.env.set_caller(f.owner);
    f.safety_module.pause();

    f.fire_trigger();
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Paused);
    assert_eq!(f.safety_module.num_pending_slashes(), 1);

    f.env.set_caller(f.owner);
    f.safety_module.unpause();
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Triggered);
}

#[test]
fn test_two_triggers_across_two_pools() {
    let mut f = Fixture::new();
    let mut second_asset = MockAsset::deploy(&f.env, MockAssetInitArgs { decimals: 9 });
    let mut second_trigger = MockTrigger::deploy(&f.env, NoArgs);
    let configs = UpdateConfigsParams {
        reserve_pool_configs: vec![
            ReservePoolConfig {
                max_slash_percentage: wad() / 2,
                asset: f.asset_address(),
            },
            ReservePoolConfig {
                max_slash_percentage: wad(),
                asset: second_asset.address().clone(),
            },
        ],
        trigger_config_updates: vec![
            TriggerConfig {
                trigger: f.trigger_address(),
                payout_handler: f.payout_handler,
                exists: true,
            },
            TriggerConfig {
                trigger: second_trigger.address().clone(),
                payout_handler: f.bob,
                exists: true,
            },
        ],
        delays_config: delays(),
    };
    f.env.set_caller(f.owner);
    f.safety_module.update_configs(configs.clone());
    f.advance_seconds(CONFIG_UPDATE_DELAY);
    f.safety_module.finalize_update_configs(configs);

    f.deposit(f.alice, units(1_000));
    second_asset.mint(f.alice, units(400));
    f.env.set_caller(f.alice);
    second_asset.approve(f.sm_address(), units(400));
    f.safety_module.deposit_reserve_assets(1, units(400), f.alice);

    f.fire_trigger();
    second_trigger.set_state(TriggerState::Triggered);
    f.safety_module.trigger(second_trigger.address().clone());
    assert_eq!(f.safety_module.num_pending_slashes(), 2);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.payout_handler), 1);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.bob), 1);
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Triggered);

    // Pending slashes do not open slashing while paused
    f.env.set_caller(f.pauser);
    f.safety_module.pause();
    f.env.set_caller(f.payout_handler);
    assert_eq!(
        f.safety_module.try_slash(vec![slash(0, 200)], f.fee_receiver),
        Err(SafetyModuleError::InvalidState.into())
    );
    f.env.set_caller(f.owner);
    f.safety_module.unpause();
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Triggered);

    // One call across both pools spends a single credit
    f.env.set_caller(f.payout_handler);
    f.safety_module.slash(vec![slash(0, 200), slash(1, 100)], f.fee_receiver);
    assert_eq!(f.safety_module.num_pending_slashes(), 1);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.payout_handler), 0);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.bob), 1);
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Triggered);
    assert_eq!(
        f.safety_module.try_slash(vec![slash(0, 1)], f.fee_receiver),
        Err(SafetyModuleError::Unauthorized.into())
    );

    f.env.set_caller(f.bob);
    f.safety_module.slash(vec![slash(0, 100)], f.fee_receiver);
    assert_eq!(f.safety_module.num_pending_slashes(), 0);
    assert_eq!(f.safety_module.payout_handler_num_pending_slashes(f.bob), 0);
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Active);

    assert_eq!(f.deposit_amount(), units(700));
    assert_eq!(f.safety_module.reserve_pools(1).deposit_amount, units(300));
    assert_eq!(f.asset.balance_of(f.fee_receiver), units(300));
    assert_eq!(second_asset.balance_of(f.fee_receiver), units(100));

    f.assert_custody_matches_balance();
    f.assert_ledger_sum();
    let second = second_asset.address().clone();
    let pool = f.safety_module.reserve_pools(1);
    assert_eq!(second_asset.balance_of(f.sm_address()), f.safety_module.asset_pool(second).amount);
    assert_eq!(f.safety_module.asset_pool(second).amount, pool.deposit_amount + pool.fee_amount);
}

// ===== Pause =====

#[test]
fn test_pause_roles() {
    let mut f = Fixture::new();

    f.env.set_caller(f.bob);
    assert_eq!(f.safety_module.try_pause(), Err(SafetyModuleError::Unauthorized.into()));

    f.env.set_caller(f.pauser);
    f.safety_module.pause();
    assert_eq!(
        f.safety_module.try_pause(),
        Err(SafetyModuleError::InvalidStateTransition.into())
    );
    assert_eq!(
        f.safety_module.try_unpause(),
        Err(SafetyModuleError::InvalidStateTransition.into())
    );

    f.env.set_caller(f.owner);
    f.safety_module.unpause();
    assert_eq!(f.safety_module.safety_module_state(), SafetyModuleState::Active);
}

// ===== Config Updates =====

fn extended_configs(f: &Fixture, new_asset: odra::prelude::Address) -> UpdateConfigsParams {
    UpdateConfigsParams {
        reserve_pool_configs: vec![
            ReservePoolConfig {
                max_slash_percentage: wad() / 4,
                asset: f.asset_address(),
            },
            ReservePoolConfig {
                max_slash_percentage: wad(),
                asset: new_asset,
            },
        ],
        trigger_config_updates: vec![TriggerConfig {
            trigger: f.trigger_address(),
            payout_handler: f.bob,
            exists: true,
        }],
        delays_config: delays(),
    }
}

fn queue_and_wait(seconds: u64) -> (Fixture, UpdateConfigsParams) {
    let mut f = Fixture::new();
    let new_asset = MockAsset::deploy(&f.env, MockAssetInitArgs { decimals: 9 });
    let configs = extended_configs(&f, new_asset.address().clone());

    f.env.set_caller(f.owner);
    f.safety_module.update_configs(configs.clone());
    f.advance_seconds(seconds);
    (f, configs)
}

#[test]
fn test_finalize_too_early() {
    let (mut f, configs) = queue_and_wait(CONFIG_UPDATE_DELAY - 1);
    assert_eq!(
        f.safety_module.try_finalize_update_configs(configs),
        Err(SafetyModuleError::InvalidStateTransition.into())
    );
}

#[test]
fn test_finalize_inside_window() {
    for wait in [10, 12, 15] {
        let (mut f, configs) = queue_and_wait(wait);
        f.env.set_caller(f.alice);
        f.safety_module.finalize_update_configs(configs);

        assert_eq!(f.safety_module.number_of_reserve_pools(), 2);
        assert_eq!(f.safety_module.reserve_pools(0).max_slash_percentage, wad() / 4);
        assert_eq!(f.safety_module.receipt_token_metadata(1).unwrap().decimals, 9);
        let trigger = f.trigger_address();
        assert_eq!(f.safety_module.trigger_data(trigger).unwrap().payout_handler, f.bob);
        assert!(f.safety_module.config_update_metadata().queued_config_update_hash.is_zero());
    }
}

#[test]
fn test_finalize_too_late() {
    let (mut f, configs) = queue_and_wait(16);
    assert_eq!(
        f.safety_module.try_finalize_update_configs(configs),
        Err(SafetyModuleError::InvalidStateTransition.into())
    );
}

#[test]
fn test_finalize_rejects_other_payload_and_non_active_state() {
    let (mut f, configs) = queue_and_wait(CONFIG_UPDATE_DELAY);

    let mut other = configs.clone();
    other.reserve_pool_configs[0].max_slash_percentage = wad() / 3;
    assert_eq!(
        f.safety_module.try_finalize_update_configs(other),
        Err(SafetyModuleError::ConfigUpdateHashMismatch.into())
    );

    f.env.set_caller(f.pauser);
    f.safety_module.pause();
    assert_eq!(
        f.safety_module.try_finalize_update_configs(configs),
        Err(SafetyModuleError::InvalidState.into())
    );
}

#[test]
fn test_update_configs_owner_only_and_validated() {
    let mut f = Fixture::new();
    let configs = extended_configs(&f, f.bob);

    f.env.set_caller(f.alice);
    assert_eq!(
        f.safety_module.try_update_configs(configs.clone()),
        Err(SafetyModuleError::Unauthorized.into())
    );

    let mut swapped = configs;
    swapped.reserve_pool_configs.swap(0, 1);
    f.env.set_caller(f.owner);
    assert_eq!(
        f.safety_module.try_update_configs(swapped),
        Err(SafetyModuleError::ReservePoolAssetChanged.into())
    );
}

#[test]
fn test_fired_trigger_cannot_be_reconfigured() {
    let mut f = Fixture::new();
    f.trigger.set_state(TriggerState::Triggered);
    let configs = extended_configs(&f, f.bob);

    f.env.set_caller(f.owner);
    assert_eq!(
        f.safety_module.try_update_configs(configs),
        Err(SafetyModuleError::InvalidTriggerUpdate.into())
    );
}

#[test]
fn test_queued_update_records_hash_and_window() {
    let (f, _) = queue_and_wait(0);
    let metadata = f.safety_module.config_update_metadata();
    assert!(!metadata.queued_config_update_hash.is_zero());
    assert_eq!(
        metadata.config_update_deadline - metadata.config_update_time,
        CONFIG_UPDATE_GRACE_PERIOD
    );
    // Deployment applied its delays through the same path
    assert_eq!(f.safety_module.delays(), delays());
}

#[test]
fn test_externally_fired_trigger_can_be_unwired() {
    let mut f = Fixture::new();
    f.trigger.set_state(TriggerState::Triggered);
    let configs = UpdateConfigsParams {
        reserve_pool_configs: vec![ReservePoolConfig {
            max_slash_percentage: wad() / 2,
            asset: f.asset_address(),
        }],
        trigger_config_updates: vec![TriggerConfig {
            trigger: f.trigger_address(),
            payout_handler: f.payout_handler,
            exists: false,
        }],
        delays_config: delays(),
    };

    f.env.set_caller(f.owner);
    f.safety_module.update_configs(configs.clone());
    f.advance_seconds(CONFIG_UPDATE_DELAY);
    f.safety_module.finalize_update_configs(configs);

    let trigger = f.trigger_address();
    assert!(!f.safety_module.trigger_data(trigger).unwrap().exists);
    assert_eq!(
        f.safety_module.try_trigger(trigger),
        Err(SafetyModuleError::TriggerNotFound.into())
    );
}
