pub mod health;
pub mod outcome;
pub mod pool;
pub mod position;
pub mod wad_ray;

pub use health::{AccountSnapshot, HealthFactor};
pub use outcome::{LiquidationPayout, LiquidationResult, RepayOutcome};
pub use pool::{PoolState, RiskParameters};
pub use position::Position;
pub use wad_ray::{compound_interest, Ray, Wad};
