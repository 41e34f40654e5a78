use alloy::primitives::Address;

use super::health::HealthFactor;
use super::wad_ray::Wad;

/// Result of a repayment. `refund` is the part of the offered amount that
/// exceeded the outstanding debt and was not taken from the payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepayOutcome {
    pub applied: Wad,
    pub refund: Wad,
    pub remaining_debt: Wad,
}

/// Where the seized collateral went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationPayout {
    /// Transferred out of the pool to the liquidator.
    Transferred,
    /// Credited to the liquidator's own position as collateral.
    Supplied,
}

/// Result of a liquidation, returned for caller bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationResult {
    pub borrower: Address,
    pub liquidator: Address,
    /// Debt actually repaid, after the close-factor cap.
    pub repay_applied: Wad,
    pub collateral_seized: Wad,
    pub payout: LiquidationPayout,
    pub health_factor_before: HealthFactor,
    pub health_factor_after: HealthFactor,
}
