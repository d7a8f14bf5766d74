//! Safety module manager contract.
//!
//! Keeps the set of safety modules it governs and forwards owner/pauser
//! actions to them. Each managed module stores this contract as its manager,
//! so forwarded calls pass the module's manager checks.

use odra::prelude::*;
use odra::ContractRef;
use crate::errors::SafetyModuleError;
use crate::events::{OwnerUpdated, PauserUpdated, SafetyModuleRegistered};
use crate::interfaces::ManagedSafetyModuleContractRef;

/// Manager for a set of safety modules
#[odra::module(events = [SafetyModuleRegistered, OwnerUpdated, PauserUpdated])]
pub struct SafetyModuleManager {
    /// Protocol owner
    owner: Var<Address>,
    /// Protocol pauser
    pauser: Var<Address>,
    /// Registered safety modules
    safety_modules: Mapping<Address, bool>,
    safety_module_count: Var<u32>,
}

#[odra::module]
impl SafetyModuleManager {
    pub fn init(&mut self, owner: Address, pauser: Address) {
        self.owner.set(owner);
        self.pauser.set(pauser);
        self.safety_module_count.set(0);
    }

    /// Register a safety module deployed with this manager (owner only)
    pub fn register_safety_module(&mut self, safety_module: Address) {
        self.require_owner();
        if self.is_safety_module(safety_module) {
            self.env().revert(SafetyModuleError::AlreadyInitialized);
        }
        self.safety_modules.set(&safety_module, true);
        self.safety_module_count.set(self.safety_module_count() + 1);
        self.env().emit_event(SafetyModuleRegistered { safety_module });
    }

    /// Transfer ownership (owner only)
    pub fn update_owner(&mut self, owner: Address) {
        self.require_owner();
        self.owner.set(owner);
        self.env().emit_event(OwnerUpdated { owner });
    }

    /// Replace the pauser (owner only)
    pub fn update_pauser(&mut self, pauser: Address) {
        self.require_owner();
        self.pauser.set(pauser);
        self.env().emit_event(PauserUpdated { pauser });
    }

    // ===== Forwarded Actions =====

    /// Pause a managed safety module (owner or pauser)
    pub fn pause(&mut self, safety_module: Address) {
        let caller = self.env().caller();
        if caller != self.owner() && caller != self.pauser() {
            self.env().revert(SafetyModuleError::Unauthorized);
        }
        self.require_safety_module(safety_module);
        ManagedSafetyModuleContractRef::new(self.env().clone(), safety_module).pause();
    }

    /// Unpause a managed safety module (owner only)
    pub fn unpause(&mut self, safety_module: Address) {
        self.require_owner();
        self.require_safety_module(safety_module);
        ManagedSafetyModuleContractRef::new(self.env().clone(), safety_module).unpause();
    }

    /// Claim accrued fees of several safety modules to `receiver` (owner only)
    pub fn claim_fees(&mut self, safety_modules: Vec<Address>, receiver: Address) {
        self.require_owner();
        for safety_module in safety_modules.iter() {
            self.require_safety_module(*safety_module);
        }
        for safety_module in safety_modules {
            ManagedSafetyModuleContractRef::new(self.env().clone(), safety_module).claim_fees(receiver);
        }
    }

    // ===== View Functions =====

    pub fn is_safety_module(&self, safety_module: Address) -> bool {
        self.safety_modules.get(&safety_module).unwrap_or(false)
    }

    pub fn safety_module_count(&self) -> u32 {
        self.safety_module_count.get().unwrap_or(0)
    }

    pub fn owner(&self) -> Address {
        match self.owner.get() {
            Some(owner) => owner,
            None => self.env().revert(SafetyModuleError::InvalidState),
        }
    }

    pub fn pauser(&self) -> Address {
        match self.pauser.get() {
            Some(pauser) => pauser,
            None => self.env().revert(SafetyModuleError::InvalidState),
        }
    }
}

impl SafetyModuleManager {
    fn require_owner(&self) {
        if self.env().caller() != self.owner() {
            self.env().revert(SafetyModuleError::Unauthorized);
        }
    }

    fn require_safety_module(&self, safety_module: Address) {
        if !self.is_safety_module(safety_module) {
            self.env().revert(SafetyModuleError::SafetyModuleNotFound);
        }
    }
}
