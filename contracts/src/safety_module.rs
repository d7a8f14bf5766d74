//! Safety Module Contract
//!
//! Pools capital in reserve pools that backstop a protocol against
//! insolvency events. Depositors receive receipt tokens; triggers wired into
//! the module let their payout handler slash a bounded fraction of each pool.
//!
//! ## Components
//!
//! - Pool ledger and receipt tokens (`ledger`, `receipt_token`)
//! - Two-phase config updates (`configurator`)
//! - Trigger handling and the state machine (`state_machine`)
//! - Slashing, with slash scaling of queued redemptions (`redemption`)
//! - Delayed redemption queue
//! - Fee drip through an external drip model
//!
//! ## Ordering
//!
//! Every entrypoint finishes all ledger writes before it calls out to a token
//! contract. A failed check reverts the whole call.

use odra::prelude::*;
use odra::casper_types::bytesrepr::ToBytes;
use odra::casper_types::U256;
use odra::ContractRef;

use crate::configurator;
use crate::errors::{SafetyModuleError, SafetyModuleResult};
use crate::events::{
    ClaimedFees, ConfigUpdatesFinalized, ConfigUpdatesQueued, DelaysUpdated, Deposited, Redeemed,
    RedemptionPending, ReservePoolCreated, SafetyModuleStateUpdated, Slashed, TriggerConfigUpdated,
    Triggered,
};
use crate::interfaces::{Cep18TokenContractRef, DripModelContractRef, TriggerContractRef};
use crate::ledger;
use crate::math::{checked_add, checked_sub};
use crate::receipt_token::{compute_receipt_token_id, ReceiptTokenId, ReceiptTokenMetadata, ReceiptTokens};
use crate::redemption::{compute_final_asset_amount, delay_remaining, initial_acc_isfs, update_acc_isfs_after_slash};
use crate::state_machine::{is_valid_state_transition, unpaused_state};
use crate::types::{
    AssetPool, CallerRole, ConfigUpdateMetadata, Delays, PoolType, Redemption, RedemptionPreview,
    ReservePool, SafetyModuleState, Slash, TriggerConfig, TriggerData, TriggerState,
    UpdateConfigsParams,
};

/// Safety Module Contract
#[odra::module(events = [
    Deposited,
    RedemptionPending,
    Redeemed,
    Triggered,
    Slashed,
    SafetyModuleStateUpdated,
    ClaimedFees,
    ConfigUpdatesQueued,
    ConfigUpdatesFinalized,
    ReservePoolCreated,
    TriggerConfigUpdated,
    DelaysUpdated
])]
pub struct SafetyModule {
    /// Set once by `init`
    initialized: Var<bool>,
    /// Manager that created this module
    manager: Var<Address>,
    owner: Var<Address>,
    pauser: Var<Address>,
    /// Fee drip model contract
    fee_drip_model: Var<Address>,
    /// Cap on the number of reserve pools
    allowed_reserve_pools: Var<u32>,
    safety_module_state: Var<SafetyModuleState>,

    // ===== Ledger =====
    /// Reserve pools by id
    reserve_pools: Mapping<u32, ReservePool>,
    reserve_pool_count: Var<u32>,
    /// Custody per asset
    asset_pools: Mapping<Address, AssetPool>,
    receipt_tokens: SubModule<ReceiptTokens>,

    // ===== Triggers / Slashing =====
    triggers: Mapping<Address, TriggerData>,
    num_pending_slashes: Var<u32>,
    payout_handler_num_pending_slashes: Mapping<Address, u32>,

    // ===== Config =====
    delays: Var<Delays>,
    config_update_metadata: Var<ConfigUpdateMetadata>,

    // ===== Redemptions =====
    /// Queued redemptions; `None` once completed
    redemptions: Mapping<u64, Option<Redemption>>,
    next_redemption_id: Var<u64>,
    /// Accumulated inverse scaling factors per reserve pool
    pending_redemption_acc_isfs: Mapping<u32, Vec<U256>>,
}

#[odra::module]
impl SafetyModule {
    /// Initialize the safety module. Callable exactly once.
    pub fn init(
        &mut self,
        manager: Address,
        owner: Address,
        pauser: Address,
        fee_drip_model: Address,
        allowed_reserve_pools: u32,
        configs: UpdateConfigsParams,
    ) {
        if self.initialized.get().unwrap_or(false) {
            self.env().revert(SafetyModuleError::AlreadyInitialized);
        }
        self.initialized.set(true);

        self.manager.set(manager);
        self.owner.set(owner);
        self.pauser.set(pauser);
        self.fee_drip_model.set(fee_drip_model);
        self.allowed_reserve_pools.set(allowed_reserve_pools);
        self.safety_module_state.set(SafetyModuleState::Active);
        self.reserve_pool_count.set(0);
        self.num_pending_slashes.set(0);
        self.next_redemption_id.set(1);
        self.config_update_metadata.set(ConfigUpdateMetadata::default());

        self.validate_configs(&configs);
        self.apply_configs(&configs);
    }

    // ========== Deposits ==========

    /// Deposit reserve assets pulled from the caller (requires CEP-18 approval).
    ///
    /// Returns the receipt tokens minted to `receiver`.
    pub fn deposit_reserve_assets(
        &mut self,
        reserve_pool_id: u32,
        reserve_asset_amount: U256,
        receiver: Address,
    ) -> U256 {
        let caller = self.env().caller();
        let (asset, minted) = self.record_deposit(reserve_pool_id, reserve_asset_amount, receiver);

        let mut token = Cep18TokenContractRef::new(self.env().clone(), asset);
        if !token.transfer_from(caller, self.env().self_address(), reserve_asset_amount) {
            self.env().revert(SafetyModuleError::TokenTransferFailed);
        }
        minted
    }

    /// Deposit reserve assets already transferred to the module.
    ///
    /// The module's token balance must cover every accounted asset plus
    /// `reserve_asset_amount`.
    pub fn deposit_reserve_assets_without_transfer(
        &mut self,
        reserve_pool_id: u32,
        reserve_asset_amount: U256,
        receiver: Address,
    ) -> U256 {
        let pool = self.load_pool(reserve_pool_id);
        let token = Cep18TokenContractRef::new(self.env().clone(), pool.asset);
        let balance = token.balance_of(self.env().self_address());
        let accounted = self.asset_pool(pool.asset).amount;
        let required = self.or_revert(checked_add(accounted, reserve_asset_amount));
        if balance < required {
            self.env().revert(SafetyModuleError::InvalidDeposit);
        }

        let (_, minted) = self.record_deposit(reserve_pool_id, reserve_asset_amount, receiver);
        minted
    }

    // ========== Redemptions ==========

    /// Burn receipt tokens of `owner` and redeem the underlying assets.
    ///
    /// While paused the assets are paid out immediately. Otherwise the
    /// redemption is queued for the current withdraw delay. Returns the
    /// redemption id either way.
    pub fn redeem(
        &mut self,
        reserve_pool_id: u32,
        receipt_token_amount: U256,
        receiver: Address,
        owner: Address,
    ) -> u64 {
        let caller = self.env().caller();
        let mut pool = self.load_pool(reserve_pool_id);
        self.drip_pool_fees(&mut pool);

        let supply = self.receipt_tokens.total_supply(reserve_pool_id);
        let available = self.or_revert(ledger::available_assets(&pool));
        let asset_amount = self.or_revert(ledger::convert_to_reserve_asset_amount(
            receipt_token_amount,
            supply,
            available,
        ));
        if asset_amount.is_zero() {
            self.env().revert(SafetyModuleError::RoundsToZero);
        }

        self.receipt_tokens.burn(reserve_pool_id, caller, owner, receipt_token_amount);

        let redemption_id = self.next_redemption_id.get().unwrap_or(1);
        self.next_redemption_id.set(redemption_id + 1);

        if self.safety_module_state() == SafetyModuleState::Paused {
            self.or_revert(ledger::record_instant_redemption(&mut pool, asset_amount));
            self.remove_from_asset_pool(pool.asset, asset_amount);
            self.reserve_pools.set(&reserve_pool_id, pool.clone());

            self.env().emit_event(Redeemed {
                caller,
                receiver,
                owner,
                reserve_pool_id,
                receipt_token_amount,
                asset_amount,
                redemption_id,
            });
            self.transfer_out(pool.asset, receiver, asset_amount);
            return redemption_id;
        }

        self.or_revert(ledger::record_queued_redemption(&mut pool, asset_amount));
        self.reserve_pools.set(&reserve_pool_id, pool);

        let acc_isfs = self.acc_isfs(reserve_pool_id);
        let queued_acc_isf = match acc_isfs.last() {
            Some(isf) => *isf,
            None => self.env().revert(SafetyModuleError::InvalidState),
        };
        let redemption = Redemption {
            id: redemption_id,
            reserve_pool_id,
            receipt_token_amount,
            asset_amount,
            owner,
            receiver,
            queue_time: self.now(),
            delay: self.delays().withdraw_delay,
            queued_acc_isfs_length: acc_isfs.len() as u32,
            queued_acc_isf,
        };
        self.redemptions.set(&redemption_id, Some(redemption));

        self.env().emit_event(RedemptionPending {
            caller,
            receiver,
            owner,
            reserve_pool_id,
            receipt_token_amount,
            asset_amount,
            redemption_id,
        });
        redemption_id
    }

    /// Complete a queued redemption once its delay elapsed. Callable by anyone.
    ///
    /// The payout reflects every slash since the redemption was queued.
    pub fn complete_redemption(&mut self, redemption_id: u64) -> U256 {
        let redemption = self.load_redemption(redemption_id);
        if self.now() < redemption.queue_time.saturating_add(redemption.delay) {
            self.env().revert(SafetyModuleError::DelayNotElapsed);
        }
        self.redemptions.set(&redemption_id, None);

        let mut pool = self.load_pool(redemption.reserve_pool_id);
        let final_amount = self.final_redemption_amount(&redemption);
        let paid = self.or_revert(ledger::record_completed_redemption(&mut pool, final_amount));
        self.remove_from_asset_pool(pool.asset, paid);
        self.reserve_pools.set(&redemption.reserve_pool_id, pool.clone());

        self.env().emit_event(Redeemed {
            caller: self.env().caller(),
            receiver: redemption.receiver,
            owner: redemption.owner,
            reserve_pool_id: redemption.reserve_pool_id,
            receipt_token_amount: redemption.receipt_token_amount,
            asset_amount: paid,
            redemption_id,
        });
        self.transfer_out(pool.asset, redemption.receiver, paid);
        paid
    }

    /// Projected payout and remaining delay of a queued redemption.
    pub fn preview_queued_redemption(&self, redemption_id: u64) -> RedemptionPreview {
        let redemption = self.load_redemption(redemption_id);
        let pool = self.load_pool(redemption.reserve_pool_id);
        let final_amount = self.final_redemption_amount(&redemption);
        RedemptionPreview {
            delay_remaining: delay_remaining(redemption.queue_time, redemption.delay, self.now()),
            receipt_token_amount: redemption.receipt_token_amount,
            reserve_asset_amount: final_amount.min(pool.pending_withdrawals_amount),
            owner: redemption.owner,
            receiver: redemption.receiver,
        }
    }

    // ========== Triggers & Slashing ==========

    /// Register a fired trigger and grant its payout handler one slash.
    pub fn trigger(&mut self, trigger: Address) {
        let mut data = match self.triggers.get(&trigger) {
            Some(data) if data.exists => data,
            _ => self.env().revert(SafetyModuleError::TriggerNotFound),
        };
        if data.triggered {
            self.env().revert(SafetyModuleError::TriggerAlreadyTriggered);
        }
        let trigger_ref = TriggerContractRef::new(self.env().clone(), trigger);
        if trigger_ref.state() != TriggerState::Triggered {
            self.env().revert(SafetyModuleError::InvalidTrigger);
        }

        self.drip_all_pools();

        data.triggered = true;
        let payout_handler = data.payout_handler;
        self.triggers.set(&trigger, data);

        let pending = self.num_pending_slashes() + 1;
        self.num_pending_slashes.set(pending);
        let handler_pending = self.payout_handler_num_pending_slashes(payout_handler) + 1;
        self.payout_handler_num_pending_slashes.set(&payout_handler, handler_pending);

        // A paused module stays paused; unpause lands it in Triggered
        if self.safety_module_state() == SafetyModuleState::Active {
            self.transition_to(CallerRole::NoRole, SafetyModuleState::Triggered);
        }

        self.env().emit_event(Triggered { trigger });
    }

    /// Slash reserve pools on behalf of a payout handler with a pending slash.
    ///
    /// Consumes one pending slash regardless of how many pools are touched.
    pub fn slash(&mut self, slashes: Vec<Slash>, receiver: Address) {
        if self.safety_module_state() != SafetyModuleState::Triggered {
            self.env().revert(SafetyModuleError::InvalidState);
        }
        let payout_handler = self.env().caller();
        let handler_pending = self.payout_handler_num_pending_slashes(payout_handler);
        if handler_pending == 0 {
            self.env().revert(SafetyModuleError::Unauthorized);
        }

        self.payout_handler_num_pending_slashes.set(&payout_handler, handler_pending - 1);
        let pending = self.num_pending_slashes() - 1;
        self.num_pending_slashes.set(pending);

        let mut slashed_pools: Vec<u32> = Vec::new();
        let mut payouts: Vec<(u32, Address, U256)> = Vec::new();
        for slash in slashes.iter() {
            if slashed_pools.contains(&slash.reserve_pool_id) {
                self.env().revert(SafetyModuleError::AlreadySlashed);
            }
            slashed_pools.push(slash.reserve_pool_id);

            let mut pool = self.load_pool(slash.reserve_pool_id);
            let slash_percentage = self.or_revert(ledger::apply_slash(&mut pool, slash.amount));

            let mut acc_isfs = self.acc_isfs(slash.reserve_pool_id);
            self.or_revert(update_acc_isfs_after_slash(&mut acc_isfs, slash_percentage));
            self.pending_redemption_acc_isfs.set(&slash.reserve_pool_id, acc_isfs);

            self.remove_from_asset_pool(pool.asset, slash.amount);
            payouts.push((slash.reserve_pool_id, pool.asset, slash.amount));
            self.reserve_pools.set(&slash.reserve_pool_id, pool);
        }

        if pending == 0 {
            self.transition_to(CallerRole::NoRole, SafetyModuleState::Active);
        }

        for (reserve_pool_id, asset, amount) in payouts {
            self.env().emit_event(Slashed {
                payout_handler,
                receiver,
                reserve_pool_id,
                amount,
            });
            self.transfer_out(asset, receiver, amount);
        }
    }

    // ========== State Changes ==========

    /// Pause the module (owner, pauser or manager).
    pub fn pause(&mut self) {
        let role = self.require_role();
        self.drip_all_pools();
        self.transition_to(role, SafetyModuleState::Paused);
    }

    /// Unpause the module (owner or manager). Lands in `Triggered` when
    /// slashes are pending, `Active` otherwise.
    pub fn unpause(&mut self) {
        let role = self.require_role();
        self.drip_all_pools();
        let target = unpaused_state(self.num_pending_slashes());
        self.transition_to(role, target);
    }

    // ========== Fees ==========

    /// Drip fees from every reserve pool.
    pub fn drip_fees(&mut self) {
        self.drip_all_pools();
    }

    pub fn drip_fees_from_reserve_pool(&mut self, reserve_pool_id: u32) {
        let mut pool = self.load_pool(reserve_pool_id);
        self.drip_pool_fees(&mut pool);
        self.reserve_pools.set(&reserve_pool_id, pool);
    }

    /// Transfer all accrued fees to `receiver` (manager only).
    pub fn claim_fees(&mut self, receiver: Address) {
        if self.env().caller() != self.manager() {
            self.env().revert(SafetyModuleError::Unauthorized);
        }
        self.drip_all_pools();

        let mut claims: Vec<(u32, Address, U256)> = Vec::new();
        for reserve_pool_id in 0..self.number_of_reserve_pools() {
            let mut pool = self.load_pool(reserve_pool_id);
            let fee_amount = pool.fee_amount;
            if fee_amount.is_zero() {
                continue;
            }
            pool.fee_amount = U256::zero();
            self.remove_from_asset_pool(pool.asset, fee_amount);
            claims.push((reserve_pool_id, pool.asset, fee_amount));
            self.reserve_pools.set(&reserve_pool_id, pool);
        }

        for (reserve_pool_id, asset, fee_amount) in claims {
            self.env().emit_event(ClaimedFees {
                reserve_pool_id,
                asset,
                fee_amount,
                receiver,
            });
            self.transfer_out(asset, receiver, fee_amount);
        }
    }

    // ========== Config Updates ==========

    /// Queue a config update (owner only).
    pub fn update_configs(&mut self, configs: UpdateConfigsParams) {
        if self.env().caller() != self.owner() {
            self.env().revert(SafetyModuleError::Unauthorized);
        }
        self.validate_configs(&configs);

        let hash = self.config_hash(&configs);
        let metadata = self.or_revert(configurator::queued_update_metadata(hash, self.now(), &self.delays()));
        self.config_update_metadata.set(metadata.clone());

        self.env().emit_event(ConfigUpdatesQueued {
            config_update_hash: hash,
            update_time: metadata.config_update_time,
            update_deadline: metadata.config_update_deadline,
        });
    }

    /// Apply the queued config update. Callable by anyone while `Active`,
    /// inside the update window, with the exact queued payload.
    pub fn finalize_update_configs(&mut self, configs: UpdateConfigsParams) {
        if self.safety_module_state() != SafetyModuleState::Active {
            self.env().revert(SafetyModuleError::InvalidState);
        }
        let metadata = self.config_update_metadata();
        if metadata.queued_config_update_hash.is_zero()
            || self.config_hash(&configs) != metadata.queued_config_update_hash
        {
            self.env().revert(SafetyModuleError::ConfigUpdateHashMismatch);
        }
        if !configurator::is_within_finalize_window(&metadata, self.now()) {
            self.env().revert(SafetyModuleError::InvalidStateTransition);
        }
        self.validate_configs(&configs);

        self.config_update_metadata.set(ConfigUpdateMetadata::default());
        self.apply_configs(&configs);

        self.env().emit_event(ConfigUpdatesFinalized {
            config_update_hash: metadata.queued_config_update_hash,
        });
    }

    // ========== Previews ==========

    pub fn convert_to_receipt_token_amount(&self, reserve_pool_id: u32, reserve_asset_amount: U256) -> U256 {
        let pool = self.dripped_pool(reserve_pool_id);
        let available = self.or_revert(ledger::available_assets(&pool));
        self.or_revert(ledger::convert_to_receipt_token_amount(
            reserve_asset_amount,
            self.receipt_tokens.total_supply(reserve_pool_id),
            available,
        ))
    }

    pub fn convert_to_reserve_asset_amount(&self, reserve_pool_id: u32, receipt_token_amount: U256) -> U256 {
        let pool = self.dripped_pool(reserve_pool_id);
        let available = self.or_revert(ledger::available_assets(&pool));
        self.or_revert(ledger::convert_to_reserve_asset_amount(
            receipt_token_amount,
            self.receipt_tokens.total_supply(reserve_pool_id),
            available,
        ))
    }

    /// Receipt tokens a deposit of `reserve_asset_amount` would mint now.
    pub fn preview_deposit(&self, reserve_pool_id: u32, reserve_asset_amount: U256) -> U256 {
        self.convert_to_receipt_token_amount(reserve_pool_id, reserve_asset_amount)
    }

    /// Assets a redemption of `receipt_token_amount` would queue now.
    pub fn preview_redemption(&self, reserve_pool_id: u32, receipt_token_amount: U256) -> U256 {
        self.convert_to_reserve_asset_amount(reserve_pool_id, receipt_token_amount)
    }

    // ========== Receipt Tokens ==========

    pub fn receipt_token(&self, reserve_pool_id: u32) -> ReceiptTokenId {
        self.load_pool(reserve_pool_id).receipt_token
    }

    pub fn receipt_token_metadata(&self, reserve_pool_id: u32) -> Option<ReceiptTokenMetadata> {
        self.receipt_tokens.metadata(reserve_pool_id)
    }

    pub fn receipt_token_total_supply(&self, reserve_pool_id: u32) -> U256 {
        self.receipt_tokens.total_supply(reserve_pool_id)
    }

    pub fn receipt_token_balance_of(&self, reserve_pool_id: u32, account: Address) -> U256 {
        self.receipt_tokens.balance_of(reserve_pool_id, account)
    }

    pub fn receipt_token_allowance(&self, reserve_pool_id: u32, owner: Address, spender: Address) -> U256 {
        self.receipt_tokens.allowance(reserve_pool_id, owner, spender)
    }

    pub fn approve_receipt_token(&mut self, reserve_pool_id: u32, spender: Address, amount: U256) {
        self.load_pool(reserve_pool_id);
        let owner = self.env().caller();
        self.receipt_tokens.approve(reserve_pool_id, owner, spender, amount);
    }

    pub fn transfer_receipt_token(&mut self, reserve_pool_id: u32, recipient: Address, amount: U256) {
        self.load_pool(reserve_pool_id);
        let from = self.env().caller();
        self.receipt_tokens.transfer(reserve_pool_id, from, recipient, amount);
    }

    // ========== View Functions ==========

    pub fn reserve_pools(&self, reserve_pool_id: u32) -> ReservePool {
        self.load_pool(reserve_pool_id)
    }

    pub fn number_of_reserve_pools(&self) -> u32 {
        self.reserve_pool_count.get().unwrap_or(0)
    }

    pub fn asset_pool(&self, asset: Address) -> AssetPool {
        self.asset_pools.get(&asset).unwrap_or_default()
    }

    pub fn safety_module_state(&self) -> SafetyModuleState {
        self.safety_module_state.get().unwrap_or(SafetyModuleState::Active)
    }

    pub fn trigger_data(&self, trigger: Address) -> Option<TriggerData> {
        self.triggers.get(&trigger)
    }

    pub fn num_pending_slashes(&self) -> u32 {
        self.num_pending_slashes.get().unwrap_or(0)
    }

    pub fn payout_handler_num_pending_slashes(&self, payout_handler: Address) -> u32 {
        self.payout_handler_num_pending_slashes.get(&payout_handler).unwrap_or(0)
    }

    pub fn delays(&self) -> Delays {
        self.load(self.delays.get(), SafetyModuleError::InvalidState)
    }

    pub fn config_update_metadata(&self) -> ConfigUpdateMetadata {
        self.config_update_metadata.get().unwrap_or_default()
    }

    pub fn redemption(&self, redemption_id: u64) -> Option<Redemption> {
        self.redemptions.get(&redemption_id).flatten()
    }

    pub fn acc_isfs(&self, reserve_pool_id: u32) -> Vec<U256> {
        self.pending_redemption_acc_isfs
            .get(&reserve_pool_id)
            .unwrap_or_else(initial_acc_isfs)
    }

    pub fn owner(&self) -> Address {
        self.load(self.owner.get(), SafetyModuleError::InvalidState)
    }

    pub fn pauser(&self) -> Address {
        self.load(self.pauser.get(), SafetyModuleError::InvalidState)
    }

    pub fn manager(&self) -> Address {
        self.load(self.manager.get(), SafetyModuleError::InvalidState)
    }

    pub fn fee_drip_model(&self) -> Address {
        self.load(self.fee_drip_model.get(), SafetyModuleError::InvalidState)
    }

    pub fn allowed_reserve_pools(&self) -> u32 {
        self.allowed_reserve_pools.get().unwrap_or(0)
    }
}

// ========== Internal Functions ==========

impl SafetyModule {
    /// Block time in seconds
    fn now(&self) -> u64 {
        self.env().get_block_time() / 1000
    }

    fn or_revert<T>(&self, result: SafetyModuleResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
        }
    }

    fn load<T>(&self, value: Option<T>, error: SafetyModuleError) -> T {
        match value {
            Some(value) => value,
            None => self.env().revert(error),
        }
    }

    fn load_pool(&self, reserve_pool_id: u32) -> ReservePool {
        self.load(self.reserve_pools.get(&reserve_pool_id), SafetyModuleError::ReservePoolNotFound)
    }

    fn load_redemption(&self, redemption_id: u64) -> Redemption {
        self.load(self.redemption(redemption_id), SafetyModuleError::RedemptionNotFound)
    }

    /// Role of the caller; reverts when it holds none.
    fn require_role(&self) -> CallerRole {
        let caller = self.env().caller();
        if caller == self.owner() {
            CallerRole::Owner
        } else if caller == self.pauser() {
            CallerRole::Pauser
        } else if caller == self.manager() {
            CallerRole::Manager
        } else {
            self.env().revert(SafetyModuleError::Unauthorized)
        }
    }

    fn transition_to(&mut self, role: CallerRole, to: SafetyModuleState) {
        let from = self.safety_module_state();
        if !is_valid_state_transition(role, from, to, self.num_pending_slashes()) {
            self.env().revert(SafetyModuleError::InvalidStateTransition);
        }
        self.safety_module_state.set(to);
        self.env().emit_event(SafetyModuleStateUpdated { updated_to: to });
    }

    // ===== Ledger =====

    /// Shared deposit bookkeeping. Returns the pool asset and receipt tokens minted.
    fn record_deposit(&mut self, reserve_pool_id: u32, reserve_asset_amount: U256, receiver: Address) -> (Address, U256) {
        let mut pool = self.load_pool(reserve_pool_id);
        self.drip_pool_fees(&mut pool);

        let supply = self.receipt_tokens.total_supply(reserve_pool_id);
        let available = self.or_revert(ledger::available_assets(&pool));
        let minted = self.or_revert(ledger::convert_to_receipt_token_amount(
            reserve_asset_amount,
            supply,
            available,
        ));
        if minted.is_zero() {
            self.env().revert(SafetyModuleError::RoundsToZero);
        }

        self.or_revert(ledger::record_deposit(&mut pool, reserve_asset_amount));
        self.add_to_asset_pool(pool.asset, reserve_asset_amount);
        let asset = pool.asset;
        self.reserve_pools.set(&reserve_pool_id, pool);
        self.receipt_tokens.mint(reserve_pool_id, receiver, minted);

        self.env().emit_event(Deposited {
            caller: self.env().caller(),
            receiver,
            reserve_pool_id,
            asset_amount: reserve_asset_amount,
            receipt_token_amount: minted,
        });
        (asset, minted)
    }

    fn add_to_asset_pool(&mut self, asset: Address, amount: U256) {
        let mut asset_pool = self.asset_pool(asset);
        asset_pool.amount = self.or_revert(checked_add(asset_pool.amount, amount));
        self.asset_pools.set(&asset, asset_pool);
    }

    fn remove_from_asset_pool(&mut self, asset: Address, amount: U256) {
        let mut asset_pool = self.asset_pool(asset);
        asset_pool.amount = self.or_revert(checked_sub(asset_pool.amount, amount));
        self.asset_pools.set(&asset, asset_pool);
    }

    fn final_redemption_amount(&self, redemption: &Redemption) -> U256 {
        let acc_isfs = self.acc_isfs(redemption.reserve_pool_id);
        self.or_revert(compute_final_asset_amount(
            &acc_isfs,
            redemption.queued_acc_isfs_length,
            redemption.queued_acc_isf,
            redemption.asset_amount,
        ))
    }

    // ===== Fees =====

    fn drip_pool_fees(&self, pool: &mut ReservePool) {
        let now = self.now();
        if now <= pool.last_fees_drip_time {
            return;
        }
        let available = self.or_revert(ledger::available_assets(pool));
        if available.is_zero() {
            pool.last_fees_drip_time = now;
            return;
        }
        let model = DripModelContractRef::new(self.env().clone(), self.fee_drip_model());
        let factor = model.drip_factor(pool.last_fees_drip_time, now - pool.last_fees_drip_time);
        self.or_revert(ledger::drip_fees(pool, factor, now));
    }

    fn drip_all_pools(&mut self) {
        for reserve_pool_id in 0..self.number_of_reserve_pools() {
            let mut pool = self.load_pool(reserve_pool_id);
            self.drip_pool_fees(&mut pool);
            self.reserve_pools.set(&reserve_pool_id, pool);
        }
    }

    /// Pool as it would look after dripping fees now, without storing it.
    fn dripped_pool(&self, reserve_pool_id: u32) -> ReservePool {
        let mut pool = self.load_pool(reserve_pool_id);
        self.drip_pool_fees(&mut pool);
        pool
    }

    // ===== Config =====

    fn config_hash(&self, configs: &UpdateConfigsParams) -> U256 {
        let bytes = match configs.to_bytes() {
            Ok(bytes) => bytes,
            Err(_) => self.env().revert(SafetyModuleError::InvalidConfiguration),
        };
        U256::from_big_endian(&self.env().hash(bytes))
    }

    fn validate_configs(&self, configs: &UpdateConfigsParams) {
        let existing_assets: Vec<Address> = (0..self.number_of_reserve_pools())
            .map(|id| self.load_pool(id).asset)
            .collect();
        let result = configurator::validate_configs(
            configs,
            &existing_assets,
            self.allowed_reserve_pools(),
            |update: &TriggerConfig| self.trigger_has_fired(update),
        );
        self.or_revert(result);
    }

    /// Whether `update` touches a trigger that already fired. The trigger's
    /// own state only matters when the update wires it in; a trigger that
    /// fired but was never reported here can still be unwired.
    fn trigger_has_fired(&self, update: &TriggerConfig) -> bool {
        if self.triggers.get(&update.trigger).map_or(false, |data| data.triggered) {
            return true;
        }
        update.exists
            && TriggerContractRef::new(self.env().clone(), update.trigger).state() == TriggerState::Triggered
    }

    fn apply_configs(&mut self, configs: &UpdateConfigsParams) {
        let existing = self.number_of_reserve_pools();
        let now = self.now();
        let self_address = self.env().self_address();

        for (index, config) in configs.reserve_pool_configs.iter().enumerate() {
            let reserve_pool_id = index as u32;
            if reserve_pool_id < existing {
                let mut pool = self.load_pool(reserve_pool_id);
                pool.max_slash_percentage = config.max_slash_percentage;
                self.reserve_pools.set(&reserve_pool_id, pool);
                continue;
            }

            let decimals = Cep18TokenContractRef::new(self.env().clone(), config.asset).decimals();
            self.receipt_tokens.create(reserve_pool_id, decimals);
            self.pending_redemption_acc_isfs.set(&reserve_pool_id, initial_acc_isfs());
            self.reserve_pools.set(
                &reserve_pool_id,
                ReservePool {
                    asset: config.asset,
                    deposit_amount: U256::zero(),
                    pending_withdrawals_amount: U256::zero(),
                    fee_amount: U256::zero(),
                    max_slash_percentage: config.max_slash_percentage,
                    receipt_token: compute_receipt_token_id(self_address, reserve_pool_id, PoolType::Reserve),
                    last_fees_drip_time: now,
                },
            );
            self.env().emit_event(ReservePoolCreated {
                reserve_pool_id,
                asset: config.asset,
            });
        }
        if configs.reserve_pool_configs.len() as u32 > existing {
            self.reserve_pool_count.set(configs.reserve_pool_configs.len() as u32);
        }

        for update in configs.trigger_config_updates.iter() {
            self.triggers.set(
                &update.trigger,
                TriggerData {
                    payout_handler: update.payout_handler,
                    exists: update.exists,
                    triggered: false,
                },
            );
            self.env().emit_event(TriggerConfigUpdated {
                trigger: update.trigger,
                payout_handler: update.payout_handler,
                exists: update.exists,
            });
        }

        let delays = configs.delays_config;
        self.delays.set(delays);
        self.env().emit_event(DelaysUpdated {
            config_update_delay: delays.config_update_delay,
            config_update_grace_period: delays.config_update_grace_period,
            withdraw_delay: delays.withdraw_delay,
        });
    }

    // ===== Interactions =====

    fn transfer_out(&self, asset: Address, to: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        let mut token = Cep18TokenContractRef::new(self.env().clone(), asset);
        if !token.transfer(to, amount) {
            self.env().revert(SafetyModuleError::TokenTransferFailed);
        }
    }
}
