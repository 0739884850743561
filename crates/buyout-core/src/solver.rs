use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BuyoutError;
use crate::BuyoutResult;

const DEFAULT_TOLERANCE: Decimal = dec!(0.000001);
const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Stopping rules for a bisection search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BisectionConfig {
    /// Accept a midpoint once |f(mid) - target| is strictly below this
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
    /// Hard bound on the number of midpoint evaluations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_tolerance() -> Decimal {
    DEFAULT_TOLERANCE
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// A fitted point from [`bisect`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BisectionRoot {
    /// Argument at which the function met the target
    pub x: Decimal,
    /// Function value at `x`
    pub value: Decimal,
    /// Midpoint evaluations performed (0 if an endpoint already matched)
    pub iterations: u32,
}

/// Find `x` in `[lo, hi]` with `f(x) ≈ target` for a monotone `f`.
///
/// Works for increasing and decreasing functions: the bracket is accepted when
/// `f(lo) - target` and `f(hi) - target` do not share a strict sign. A target
/// outside the bracket fails immediately with `NonConvergence`, as does running
/// out of iterations before the tolerance is met. Errors raised by `f` are
/// propagated unchanged.
pub fn bisect<F>(
    mut f: F,
    lo: Decimal,
    hi: Decimal,
    target: Decimal,
    config: &BisectionConfig,
) -> BuyoutResult<BisectionRoot>
where
    F: FnMut(Decimal) -> BuyoutResult<Decimal>,
{
    if lo >= hi {
        return Err(BuyoutError::invalid(
            "bracket",
            format!("Lower bound {lo} must be below upper bound {hi}"),
        ));
    }
    if config.tolerance <= Decimal::ZERO {
        return Err(BuyoutError::invalid(
            "tolerance",
            "Bisection tolerance must be positive",
        ));
    }
    if config.max_iterations == 0 {
        return Err(BuyoutError::invalid(
            "max_iterations",
            "Bisection needs at least one iteration",
        ));
    }

    let f_lo = f(lo)?;
    let f_hi = f(hi)?;
    let delta_lo = f_lo - target;
    let delta_hi = f_hi - target;

    if delta_lo.abs() < config.tolerance {
        return Ok(BisectionRoot {
            x: lo,
            value: f_lo,
            iterations: 0,
        });
    }
    if delta_hi.abs() < config.tolerance {
        return Ok(BisectionRoot {
            x: hi,
            value: f_hi,
            iterations: 0,
        });
    }
    if delta_lo.is_sign_positive() == delta_hi.is_sign_positive() {
        return Err(BuyoutError::NonConvergence {
            function: format!("Bisection (target {target} not bracketed by [{f_lo}, {f_hi}])"),
            iterations: 0,
            last_delta: delta_lo.abs().min(delta_hi.abs()),
        });
    }

    let lo_above = delta_lo.is_sign_positive();
    let (mut lo, mut hi) = (lo, hi);
    let mut last_delta = delta_lo.abs();

    for i in 1..=config.max_iterations {
        let mid = (lo + hi) / dec!(2);
        let value = f(mid)?;
        let delta = value - target;
        last_delta = delta.abs();
        debug!(iteration = i, %mid, %value, %delta, "bisection step");

        if last_delta < config.tolerance {
            return Ok(BisectionRoot {
                x: mid,
                value,
                iterations: i,
            });
        }

        // Keep the half whose endpoints still straddle the target.
        if delta.is_sign_positive() == lo_above {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Err(BuyoutError::NonConvergence {
        function: "Bisection".into(),
        iterations: config.max_iterations,
        last_delta,
    })
}
