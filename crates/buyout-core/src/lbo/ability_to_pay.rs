use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BuyoutError;
use crate::lbo::assumptions::LboAssumptions;
use crate::lbo::model::{self, LboResult};
use crate::solver::{self, BisectionConfig};
use crate::types::*;
use crate::BuyoutResult;

const DEFAULT_MIN_MULTIPLE: Multiple = dec!(0.1);
const DEFAULT_MAX_MULTIPLE: Multiple = dec!(50.0);
const DEFAULT_MIN_EQUITY_TURNS: Multiple = dec!(0.01);

/// Input for the maximum-price search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityToPayInput {
    /// Deal assumptions; `entry_multiple` is ignored and solved for
    pub assumptions: LboAssumptions,
    /// Sponsor hurdle IRR (decimal)
    pub target_irr: Rate,
    /// Lowest entry multiple considered
    #[serde(default = "default_min_multiple")]
    pub min_multiple: Multiple,
    /// Highest entry multiple considered
    #[serde(default = "default_max_multiple")]
    pub max_multiple: Multiple,
    /// Smallest equity cheque, in turns of EBITDA, at the bottom of the bracket
    #[serde(default = "default_min_equity_turns")]
    pub min_equity_turns: Multiple,
    #[serde(default)]
    pub solver: BisectionConfig,
}

fn default_min_multiple() -> Multiple {
    DEFAULT_MIN_MULTIPLE
}

fn default_max_multiple() -> Multiple {
    DEFAULT_MAX_MULTIPLE
}

fn default_min_equity_turns() -> Multiple {
    DEFAULT_MIN_EQUITY_TURNS
}

impl AbilityToPayInput {
    pub fn new(assumptions: LboAssumptions, target_irr: Rate) -> Self {
        Self {
            assumptions,
            target_irr,
            min_multiple: DEFAULT_MIN_MULTIPLE,
            max_multiple: DEFAULT_MAX_MULTIPLE,
            min_equity_turns: DEFAULT_MIN_EQUITY_TURNS,
            solver: BisectionConfig::default(),
        }
    }
}

/// Highest entry price consistent with the target return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityToPayOutput {
    /// Fitted maximum entry EV/EBITDA
    pub max_entry_multiple: Multiple,
    /// Entry EBITDA × fitted multiple
    pub max_purchase_price: Money,
    pub target_irr: Rate,
    pub achieved_irr: Rate,
    /// |achieved - target| at the fitted multiple
    pub irr_error: Rate,
    pub iterations: u32,
    /// Bracket actually searched, after the equity floor is applied
    pub bracket: (Multiple, Multiple),
    /// The model evaluated at the fitted multiple
    pub lbo: LboResult,
}

/// IRR the sponsor earns when paying `entry_multiple`, all else held fixed.
pub fn achieved_irr(assumptions: &LboAssumptions, entry_multiple: Multiple) -> BuyoutResult<Rate> {
    let priced = assumptions.with_entry_multiple(entry_multiple);
    Ok(model::run_lbo(&priced)?.irr)
}

/// Solve for the highest entry multiple whose IRR meets `target_irr`.
///
/// Achieved IRR falls as the entry multiple rises (a larger equity cheque for
/// the same exit proceeds), so the search bisects the bracket
/// `[max(min_multiple, leverage_turns + min_equity_turns), max_multiple]`.
/// A target outside the IRR range of that bracket is `NonConvergence`.
pub fn solve_ability_to_pay(
    input: &AbilityToPayInput,
) -> BuyoutResult<ComputationOutput<AbilityToPayOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.min_equity_turns <= Decimal::ZERO {
        return Err(BuyoutError::invalid(
            "min_equity_turns",
            "Minimum equity cushion must be positive",
        ));
    }

    let equity_floor = input.assumptions.leverage_turns + input.min_equity_turns;
    let lo = input.min_multiple.max(equity_floor);
    let hi = input.max_multiple;
    if lo > input.min_multiple {
        warnings.push(format!(
            "Lower bracket raised from {}x to {lo}x so the sponsor writes an equity cheque at {}x leverage",
            input.min_multiple, input.assumptions.leverage_turns
        ));
    }
    if lo >= hi {
        return Err(BuyoutError::invalid(
            "max_multiple",
            format!("Search bracket [{lo}, {hi}] is empty at this leverage"),
        ));
    }

    debug!(%lo, %hi, target = %input.target_irr, "solving ability to pay");
    let root = solver::bisect(
        |multiple| achieved_irr(&input.assumptions, multiple),
        lo,
        hi,
        input.target_irr,
        &input.solver,
    )
    .map_err(|e| match e {
        BuyoutError::NonConvergence {
            iterations,
            last_delta,
            ..
        } => BuyoutError::NonConvergence {
            function: format!(
                "Ability-to-pay (target IRR {} over entry multiples [{lo}, {hi}])",
                input.target_irr
            ),
            iterations,
            last_delta,
        },
        other => other,
    })?;

    let lbo = model::run_lbo(&input.assumptions.with_entry_multiple(root.x))?;

    let output = AbilityToPayOutput {
        max_entry_multiple: root.x,
        max_purchase_price: lbo.capital_structure.purchase_price,
        target_irr: input.target_irr,
        achieved_irr: lbo.irr,
        irr_error: (lbo.irr - input.target_irr).abs(),
        iterations: root.iterations,
        bracket: (lo, hi),
        lbo,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Ability-to-Pay: bisection on entry multiple for target IRR",
        &serde_json::json!({
            "target_irr": input.target_irr.to_string(),
            "leverage_turns": input.assumptions.leverage_turns.to_string(),
            "exit_multiple": input.assumptions.exit_multiple.to_string(),
            "hold_years": input.assumptions.hold_years,
            "tolerance": input.solver.tolerance.to_string(),
            "max_iterations": input.solver.max_iterations,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lbo::assumptions::fixtures::golden_assumptions;
    use rust_decimal_macros::dec;

    #[test]
    fn test_golden_multiple_recovers_golden_irr() {
        let a = golden_assumptions();
        let golden_irr = model::run_lbo(&a).unwrap().irr;
        let out = solve_ability_to_pay(&AbilityToPayInput::new(a, golden_irr)).unwrap();
        assert!(
            (out.result.max_entry_multiple - dec!(10)).abs() < dec!(0.0001),
            "expected ~10x, got {}",
            out.result.max_entry_multiple
        );
    }

    #[test]
    fn test_higher_hurdle_means_lower_price() {
        let a = golden_assumptions();
        let at_20 = solve_ability_to_pay(&AbilityToPayInput::new(a.clone(), dec!(0.20))).unwrap();
        let at_25 = solve_ability_to_pay(&AbilityToPayInput::new(a, dec!(0.25))).unwrap();
        assert!(at_20.result.max_entry_multiple < dec!(10));
        assert!(at_25.result.max_entry_multiple < at_20.result.max_entry_multiple);
    }

    #[test]
    fn test_fitted_irr_within_tolerance() {
        let out =
            solve_ability_to_pay(&AbilityToPayInput::new(golden_assumptions(), dec!(0.20))).unwrap();
        assert!(out.result.irr_error < dec!(0.000001));
        assert!(out.result.iterations <= 100);
        assert_eq!(
            out.result.max_purchase_price,
            dec!(100) * out.result.max_entry_multiple
        );
    }

    #[test]
    fn test_bracket_floor_follows_leverage() {
        let out =
            solve_ability_to_pay(&AbilityToPayInput::new(golden_assumptions(), dec!(0.20))).unwrap();
        assert_eq!(out.result.bracket, (dec!(6.01), dec!(50.0)));
        assert!(out.warnings.iter().any(|w| w.contains("Lower bracket raised")));
    }

    #[test]
    fn test_unreachable_target_is_non_convergence() {
        // At 6.01x the sponsor puts in 1 and gets ~864 back: IRR ~287%
        let result = solve_ability_to_pay(&AbilityToPayInput::new(golden_assumptions(), dec!(5)));
        assert!(matches!(result, Err(BuyoutError::NonConvergence { .. })));
    }

    #[test]
    fn test_target_below_bracket_is_non_convergence() {
        let mut input = AbilityToPayInput::new(golden_assumptions(), dec!(-0.50));
        input.max_multiple = dec!(20);
        assert!(matches!(
            solve_ability_to_pay(&input),
            Err(BuyoutError::NonConvergence { .. })
        ));
    }

    #[test]
    fn test_iteration_cap_is_non_convergence() {
        let mut input = AbilityToPayInput::new(golden_assumptions(), dec!(0.20));
        input.solver = BisectionConfig {
            tolerance: dec!(0.000001),
            max_iterations: 3,
        };
        assert!(matches!(
            solve_ability_to_pay(&input),
            Err(BuyoutError::NonConvergence { iterations: 3, .. })
        ));
    }

    #[test]
    fn test_empty_bracket_rejected() {
        let mut input = AbilityToPayInput::new(golden_assumptions(), dec!(0.20));
        input.max_multiple = dec!(6);
        assert!(matches!(
            solve_ability_to_pay(&input),
            Err(BuyoutError::InvalidAssumption { .. })
        ));
    }
}
