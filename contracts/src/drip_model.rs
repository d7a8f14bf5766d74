//! Linear fee drip model.
//!
//! Drips a fixed annual fraction of a pool, linearly in elapsed time:
//! - rate expressed in ZOC (10_000 = 100% per year)
//! - factor = rate * elapsed / (ZOC * SECONDS_PER_YEAR), WAD-scaled
//! - factor capped at 1 (a pool can never pay more than it holds)

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::SafetyModuleError;
use crate::math::{wad, zoc};

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Drip factor (WAD) for `annual_rate_zoc` over `elapsed_seconds`.
pub fn linear_drip_factor(annual_rate_zoc: u32, elapsed_seconds: u64) -> U256 {
    if annual_rate_zoc == 0 || elapsed_seconds == 0 {
        return U256::zero();
    }
    // u32 * u64 * 1e18 stays far below 2^256
    let factor = U256::from(annual_rate_zoc) * U256::from(elapsed_seconds) * wad()
        / (zoc() * U256::from(SECONDS_PER_YEAR));
    factor.min(wad())
}

/// Linear drip model contract
#[odra::module]
pub struct LinearDripModel {
    /// Annual drip rate in ZOC
    annual_rate_zoc: Var<u32>,
}

#[odra::module]
impl LinearDripModel {
    pub fn init(&mut self, annual_rate_zoc: u32) {
        if U256::from(annual_rate_zoc) > zoc() {
            self.env().revert(SafetyModuleError::InvalidConfiguration);
        }
        self.annual_rate_zoc.set(annual_rate_zoc);
    }

    /// Fraction (WAD) of the pool to drip for the elapsed period.
    #[allow(unused_variables)]
    pub fn drip_factor(&self, last_drip_time: u64, time_since_last_drip: u64) -> U256 {
        linear_drip_factor(self.annual_rate(), time_since_last_drip)
    }

    pub fn annual_rate(&self) -> u32 {
        self.annual_rate_zoc.get().unwrap_or(0)
    }
}
