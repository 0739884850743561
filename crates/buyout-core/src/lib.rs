pub mod error;
pub mod solver;
pub mod types;

#[cfg(feature = "lbo")]
pub mod lbo;

pub use error::BuyoutError;
pub use types::*;

/// Standard result type for all buyout operations
pub type BuyoutResult<T> = Result<T, BuyoutError>;
