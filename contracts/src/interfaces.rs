//! External contract interfaces the safety module calls out to.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::TriggerState;

/// CEP-18 token interface for reserve assets
#[odra::external_contract]
pub trait Cep18Token {
    fn transfer(&mut self, recipient: Address, amount: U256) -> bool;
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool;
    fn balance_of(&self, account: Address) -> U256;
    fn decimals(&self) -> u8;
}

/// Trigger contract: only its current state is consumed
#[odra::external_contract]
pub trait Trigger {
    fn state(&self) -> TriggerState;
}

/// Fee drip model. Returns the WAD-scaled fraction of the pool to drip.
#[odra::external_contract]
pub trait DripModel {
    fn drip_factor(&self, last_drip_time: u64, time_since_last_drip: u64) -> U256;
}

/// Entry points the manager forwards to a safety module
#[odra::external_contract]
pub trait ManagedSafetyModule {
    fn pause(&mut self);
    fn unpause(&mut self);
    fn claim_fees(&mut self, receiver: Address);
}
