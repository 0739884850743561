use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuyoutError {
    #[error("Invalid assumption: {field}: {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Liquidity shortfall in year {year}: cash shortfall of {shortfall} exceeds revolver headroom of {headroom}")]
    LiquidityShortfall {
        year: u32,
        shortfall: Decimal,
        headroom: Decimal,
    },

    #[error("Non-convergence: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    NonConvergence {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Domain undefined: {0}")]
    DomainUndefined(String),
}

impl BuyoutError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        BuyoutError::InvalidAssumption {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// A checked operation left the `Decimal` range while computing `quantity`.
    pub(crate) fn overflow(field: &str, quantity: &str) -> Self {
        Self::invalid(field, format!("{quantity} overflows the decimal range"))
    }
}

/// Unwrap a checked `Decimal` operation, naming the field that drove it out of range.
pub(crate) fn in_range(
    value: Option<Decimal>,
    field: &str,
    quantity: &str,
) -> Result<Decimal, BuyoutError> {
    value.ok_or_else(|| BuyoutError::overflow(field, quantity))
}
