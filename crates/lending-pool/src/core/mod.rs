pub mod clock;
pub mod interest_rate;
pub mod ledger;
pub mod lending_pool;
pub mod oracle;
pub mod pool_account;
pub mod risk_engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use interest_rate::{Accrual, InterestRateModel};
pub use ledger::PositionLedger;
pub use lending_pool::LendingPool;
pub use oracle::{MockAggregator, PriceFeed, PriceOracleAdapter, RoundData};
pub use pool_account::PoolAccount;
