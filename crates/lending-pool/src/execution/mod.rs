pub mod custody;

pub use custody::{AssetCustody, InMemoryVault};
