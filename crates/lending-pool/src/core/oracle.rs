//! Price oracle adapter.
//!
//! Wraps a Chainlink AggregatorV3-shaped feed: reads the latest round once,
//! checks it for freshness and sanity, and rescales the answer from the
//! feed's decimals to WAD. No retries; a failed read aborts the calling
//! operation.

use std::sync::RwLock;

use alloy::primitives::U256;
use tracing::{debug, error, warn};

use crate::config::OracleConfig;
use crate::constants::{MAX_FEED_DECIMALS, WAD_DECIMALS};
use crate::errors::OracleError;
use crate::types::Wad;

/// One `latestRoundData()` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: u64,
    /// Signed, as Chainlink reports it.
    pub answer: i128,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

/// External price feed, quoting the pool asset in base units.
pub trait PriceFeed: Send + Sync {
    fn decimals(&self) -> u8;

    fn latest_round(&self) -> Result<RoundData, OracleError>;
}

impl<T: PriceFeed + ?Sized> PriceFeed for std::sync::Arc<T> {
    fn decimals(&self) -> u8 {
        (**self).decimals()
    }

    fn latest_round(&self) -> Result<RoundData, OracleError> {
        (**self).latest_round()
    }
}

/// Validating adapter over a [`PriceFeed`].
pub struct PriceOracleAdapter<F> {
    feed: F,
    max_staleness_seconds: u64,
}

impl<F: PriceFeed> PriceOracleAdapter<F> {
    pub fn new(feed: F, max_staleness_seconds: u64) -> Self {
        Self {
            feed,
            max_staleness_seconds,
        }
    }

    pub fn from_config(feed: F, config: &OracleConfig) -> Self {
        Self::new(feed, config.max_staleness_seconds)
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Latest price in WAD, checked against `now`.
    pub fn get_price(&self, now: u64) -> Result<Wad, OracleError> {
        let round = self.feed.latest_round()?;

        if round.answer <= 0 {
            error!(answer = round.answer, round_id = round.round_id, "oracle returned non-positive price");
            return Err(OracleError::InvalidPrice {
                answer: round.answer,
            });
        }

        let age = now.saturating_sub(round.updated_at);
        if age > self.max_staleness_seconds {
            error!(
                age,
                max_staleness_seconds = self.max_staleness_seconds,
                "oracle data stale"
            );
            return Err(OracleError::StalePrice {
                age_seconds: age,
                max_age_seconds: self.max_staleness_seconds,
            });
        }

        if round.answered_in_round < round.round_id {
            warn!(
                answered_in_round = round.answered_in_round,
                round_id = round.round_id,
                "oracle round incomplete"
            );
        }

        let price = rescale_to_wad(round.answer.unsigned_abs(), self.feed.decimals())?;
        debug!(price = %price, round_id = round.round_id, age, "oracle price");
        Ok(price)
    }
}

/// Rescale a positive feed answer with `decimals` fractional digits to WAD.
/// Digits finer than 1e-18 are truncated.
fn rescale_to_wad(answer: u128, decimals: u8) -> Result<Wad, OracleError> {
    if decimals > MAX_FEED_DECIMALS {
        return Err(OracleError::Unavailable {
            reason: format!("feed decimals {decimals} exceed {MAX_FEED_DECIMALS}"),
        });
    }
    let raw = U256::from(answer);
    let ten = U256::from(10u8);
    let scaled = if decimals <= WAD_DECIMALS {
        raw.checked_mul(ten.pow(U256::from(WAD_DECIMALS - decimals)))
    } else {
        Some(raw / ten.pow(U256::from(decimals - WAD_DECIMALS)))
    };
    match scaled {
        Some(v) if !v.is_zero() => Ok(Wad::from_raw(v)),
        // A sub-wei answer is as unusable as a zero one.
        Some(_) => Err(OracleError::InvalidPrice {
            answer: answer.try_into().unwrap_or(i128::MAX),
        }),
        None => Err(OracleError::Unavailable {
            reason: "price overflows WAD".into(),
        }),
    }
}

// ---------------------------------------------------------------------------
// In-process feed
// ---------------------------------------------------------------------------

/// Settable aggregator, the in-process stand-in for a deployed test feed.
/// Each `set_answer` opens a new, fully answered round.
#[derive(Debug)]
pub struct MockAggregator {
    decimals: u8,
    round: RwLock<RoundData>,
}

impl MockAggregator {
    pub fn new(decimals: u8, answer: i128, updated_at: u64) -> Self {
        Self {
            decimals,
            round: RwLock::new(RoundData {
                round_id: 1,
                answer,
                updated_at,
                answered_in_round: 1,
            }),
        }
    }

    pub fn set_answer(&self, answer: i128, updated_at: u64) {
        if let Ok(mut round) = self.round.write() {
            let next = round.round_id + 1;
            *round = RoundData {
                round_id: next,
                answer,
                updated_at,
                answered_in_round: next,
            };
        }
    }

    /// Replace the whole round, e.g. to simulate an incomplete one.
    pub fn set_round(&self, data: RoundData) {
        if let Ok(mut round) = self.round.write() {
            *round = data;
        }
    }
}

impl PriceFeed for MockAggregator {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn latest_round(&self) -> Result<RoundData, OracleError> {
        self.round
            .read()
            .map(|round| *round)
            .map_err(|_| OracleError::Unavailable {
                reason: "aggregator lock poisoned".into(),
            })
    }
}
