//! Protocol error definitions.

use odra::prelude::*;

/// Safety module errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SafetyModuleError {
    // State errors (1xx)
    InvalidState = 100,
    InvalidStateTransition = 101,
    AlreadyInitialized = 102,

    // Configuration errors (2xx)
    InvalidConfiguration = 200,
    TooManyReservePools = 201,
    ReservePoolAssetChanged = 202,
    InvalidMaxSlashPercentage = 203,
    InvalidDelays = 204,
    InvalidTriggerUpdate = 205,
    ConfigUpdateHashMismatch = 206,
    InvalidDripFactor = 207,

    // Access control errors (3xx)
    Unauthorized = 300,

    // Not-found errors (4xx)
    ReservePoolNotFound = 400,
    RedemptionNotFound = 401,
    TriggerNotFound = 402,
    SafetyModuleNotFound = 403,

    // Deposit / redemption errors (5xx)
    RoundsToZero = 500,
    InvalidDeposit = 501,
    DelayNotElapsed = 502,

    // Slash errors (6xx)
    ExceedsMaxSlashPercentage = 600,
    AlreadySlashed = 601,

    // Token errors (7xx)
    TokenTransferFailed = 700,
    InsufficientReceiptTokenBalance = 701,
    InsufficientAllowance = 702,

    // Arithmetic errors (8xx)
    ArithmeticOverflow = 800,
    ArithmeticUnderflow = 801,
    DivisionByZero = 802,

    // Trigger errors (9xx)
    InvalidTrigger = 900,
    TriggerAlreadyTriggered = 901,
}

impl SafetyModuleError {
    pub const fn message(&self) -> &'static str {
        match self {
            // State
            SafetyModuleError::InvalidState => "Operation not allowed in the current safety module state",
            SafetyModuleError::InvalidStateTransition => "Invalid state transition",
            SafetyModuleError::AlreadyInitialized => "Safety module already initialized",

            // Config
            SafetyModuleError::InvalidConfiguration => "Invalid configuration",
            SafetyModuleError::TooManyReservePools => "Config: reserve pool count exceeds cap",
            SafetyModuleError::ReservePoolAssetChanged => "Config: existing reserve pools cannot be removed or reordered",
            SafetyModuleError::InvalidMaxSlashPercentage => "Config: max slash percentage out of bounds",
            SafetyModuleError::InvalidDelays => "Config: invalid delays",
            SafetyModuleError::InvalidTriggerUpdate => "Config: invalid trigger update",
            SafetyModuleError::ConfigUpdateHashMismatch => "Config: update does not match the queued update",
            SafetyModuleError::InvalidDripFactor => "Drip model returned a factor above 1",

            // Access control
            SafetyModuleError::Unauthorized => "Unauthorized caller",

            // Not found
            SafetyModuleError::ReservePoolNotFound => "Reserve pool not found",
            SafetyModuleError::RedemptionNotFound => "Redemption not found or already completed",
            SafetyModuleError::TriggerNotFound => "Trigger not configured for this safety module",
            SafetyModuleError::SafetyModuleNotFound => "Safety module not registered",

            // Deposit / redemption
            SafetyModuleError::RoundsToZero => "Amount rounds to zero",
            SafetyModuleError::InvalidDeposit => "Deposit not backed by an unaccounted asset balance",
            SafetyModuleError::DelayNotElapsed => "Redemption delay has not elapsed",

            // Slash
            SafetyModuleError::ExceedsMaxSlashPercentage => "Slash exceeds the pool's max slash percentage",
            SafetyModuleError::AlreadySlashed => "Reserve pool listed twice in one slash",

            // Token
            SafetyModuleError::TokenTransferFailed => "Token transfer failed",
            SafetyModuleError::InsufficientReceiptTokenBalance => "Receipt token: insufficient balance",
            SafetyModuleError::InsufficientAllowance => "Receipt token: insufficient allowance",

            // Arithmetic
            SafetyModuleError::ArithmeticOverflow => "Arithmetic overflow",
            SafetyModuleError::ArithmeticUnderflow => "Arithmetic underflow",
            SafetyModuleError::DivisionByZero => "Division by zero",

            // Triggers
            SafetyModuleError::InvalidTrigger => "Trigger is not in the triggered state",
            SafetyModuleError::TriggerAlreadyTriggered => "Trigger already fired for this safety module",
        }
    }
}

impl core::fmt::Display for SafetyModuleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<SafetyModuleError> for OdraError {
    fn from(error: SafetyModuleError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}

/// Result alias for the pure accounting components.
pub type SafetyModuleResult<T> = Result<T, SafetyModuleError>;
