//! Safety Module Contracts
//!
//! Casper-native safety module: reserve pools that backstop a protocol and
//! can be slashed when a trigger fires.
//!
//! ## Architecture
//!
//! - **SafetyModule**: Reserve pools, receipt tokens, redemptions and slashing
//! - **SafetyModuleManager**: Owner/pauser governance over registered modules
//! - **LinearDripModel**: Fee drip rate consulted by every module
//!
//! ## States
//!
//! - Active: deposits, queued redemptions and config finalization
//! - Triggered: a trigger fired and slashes are pending; redemptions stay queued
//! - Paused: redemptions pay out instantly; no slashing
//!
//! Pure accounting (`ledger`, `redemption`, `configurator`, `state_machine`)
//! is kept apart from the contracts so it can be tested without a VM.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod events;
pub mod interfaces;
pub mod math;

// Accounting
pub mod ledger;
pub mod redemption;
pub mod configurator;
pub mod state_machine;

// Contract modules
pub mod receipt_token;
pub mod safety_module;
pub mod manager;
pub mod drip_model;
