use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BuyoutError;
use crate::types::*;
use crate::BuyoutResult;

const DEFAULT_FIXED_POINT_TOLERANCE: Decimal = dec!(0.00000001);
const DEFAULT_FIXED_POINT_ITERATIONS: u32 = 100;

/// How interest expense is charged against the debt balance within a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum InterestConvention {
    /// Interest on the opening balance. Each period is a pure function of the
    /// prior closing balance, so no iteration is needed.
    #[default]
    BeginningBalance,
    /// Interest on the mean of opening and closing balance, solved per period
    /// by fixed-point iteration.
    AverageBalance(FixedPointConfig),
}

/// Stopping rules for the average-balance fixed-point iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPointConfig {
    /// Relative change in interest below which the iterate is accepted
    #[serde(default = "default_fixed_point_tolerance")]
    pub tolerance: Rate,
    #[serde(default = "default_fixed_point_iterations")]
    pub max_iterations: u32,
}

fn default_fixed_point_tolerance() -> Rate {
    DEFAULT_FIXED_POINT_TOLERANCE
}

fn default_fixed_point_iterations() -> u32 {
    DEFAULT_FIXED_POINT_ITERATIONS
}

impl Default for FixedPointConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_FIXED_POINT_TOLERANCE,
            max_iterations: DEFAULT_FIXED_POINT_ITERATIONS,
        }
    }
}

/// Entry pricing, financing and operating assumptions for a single-tranche LBO.
///
/// Supplied by the financials collaborator (EBITDA, tax, capex, growth) and the
/// deal-assumptions collaborator (rate, leverage, multiples, hold period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboAssumptions {
    /// EBITDA at acquisition
    pub entry_ebitda: Money,
    /// Entry EV/EBITDA multiple
    pub entry_multiple: Multiple,
    /// Initial debt as a multiple of entry EBITDA
    pub leverage_turns: Multiple,
    /// Annual cash interest rate on the debt balance
    pub interest_rate: Rate,
    /// Exit EV/EBITDA multiple
    pub exit_multiple: Multiple,
    /// Hold period in whole years
    pub hold_years: u32,
    /// Annual EBITDA growth rate
    pub ebitda_growth: Rate,
    /// Capital expenditure as a share of EBITDA
    pub capex_pct: Rate,
    /// Cash tax rate
    pub tax_rate: Rate,
    /// Annual mandatory amortisation as a share of initial debt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_amort_rate: Option<Rate>,
    /// Revolving credit commitment available to cover shortfalls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revolver_capacity: Option<Money>,
    /// Advisory fees as a share of the purchase price, funded by equity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_fees_pct: Option<Rate>,
    /// Arrangement fees as a share of initial debt, funded by equity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_fees_pct: Option<Rate>,
    /// Cash balance held back from the sweep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_cash: Option<Money>,
    #[serde(default)]
    pub interest_convention: InterestConvention,
}

impl LboAssumptions {
    /// Copy of these assumptions priced at a different entry multiple.
    pub fn with_entry_multiple(&self, entry_multiple: Multiple) -> Self {
        Self {
            entry_multiple,
            ..self.clone()
        }
    }

    pub fn amort_rate(&self) -> Rate {
        self.mandatory_amort_rate.unwrap_or(Decimal::ZERO)
    }

    pub fn revolver_capacity(&self) -> Money {
        self.revolver_capacity.unwrap_or(Decimal::ZERO)
    }

    pub fn minimum_cash(&self) -> Money {
        self.minimum_cash.unwrap_or(Decimal::ZERO)
    }

    /// Check every field that the recurrence relies on.
    ///
    /// The equity-cushion check lives in the capital structure builder since it
    /// depends on derived values.
    pub fn validate(&self) -> BuyoutResult<()> {
        if self.entry_ebitda <= Decimal::ZERO {
            return Err(BuyoutError::invalid(
                "entry_ebitda",
                "Entry EBITDA must be positive",
            ));
        }
        if self.entry_multiple <= Decimal::ZERO {
            return Err(BuyoutError::invalid(
                "entry_multiple",
                "Entry multiple must be positive",
            ));
        }
        if self.leverage_turns < Decimal::ZERO {
            return Err(BuyoutError::invalid(
                "leverage_turns",
                "Leverage cannot be negative",
            ));
        }
        if self.exit_multiple <= Decimal::ZERO {
            return Err(BuyoutError::invalid(
                "exit_multiple",
                "Exit multiple must be positive",
            ));
        }
        if self.hold_years == 0 {
            return Err(BuyoutError::invalid(
                "hold_years",
                "Hold period must be at least 1 year",
            ));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(BuyoutError::invalid(
                "interest_rate",
                "Interest rate cannot be negative",
            ));
        }
        if self.ebitda_growth <= dec!(-1) {
            return Err(BuyoutError::invalid(
                "ebitda_growth",
                "EBITDA growth must be greater than -100%",
            ));
        }
        if self.capex_pct < Decimal::ZERO {
            return Err(BuyoutError::invalid(
                "capex_pct",
                "Capex share cannot be negative",
            ));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(BuyoutError::invalid(
                "tax_rate",
                "Tax rate must be in [0, 1)",
            ));
        }
        if let Some(rate) = self.mandatory_amort_rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(BuyoutError::invalid(
                    "mandatory_amort_rate",
                    "Mandatory amortisation must be between 0% and 100% of initial debt",
                ));
            }
        }
        if let Some(capacity) = self.revolver_capacity {
            if capacity < Decimal::ZERO {
                return Err(BuyoutError::invalid(
                    "revolver_capacity",
                    "Revolver capacity cannot be negative",
                ));
            }
        }
        for (field, pct) in [
            ("transaction_fees_pct", self.transaction_fees_pct),
            ("financing_fees_pct", self.financing_fees_pct),
        ] {
            if let Some(pct) = pct {
                if pct < Decimal::ZERO || pct >= Decimal::ONE {
                    return Err(BuyoutError::invalid(field, "Fee share must be in [0, 1)"));
                }
            }
        }
        if let Some(cash) = self.minimum_cash {
            if cash < Decimal::ZERO {
                return Err(BuyoutError::invalid(
                    "minimum_cash",
                    "Minimum cash cannot be negative",
                ));
            }
        }
        if let InterestConvention::AverageBalance(cfg) = self.interest_convention {
            if cfg.tolerance <= Decimal::ZERO {
                return Err(BuyoutError::invalid(
                    "interest_convention.tolerance",
                    "Fixed-point tolerance must be positive",
                ));
            }
            if cfg.max_iterations == 0 {
                return Err(BuyoutError::invalid(
                    "interest_convention.max_iterations",
                    "Fixed-point iteration needs at least one pass",
                ));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::golden_assumptions;
    use super::*;

    fn field_of(err: BuyoutError) -> String {
        match err {
            BuyoutError::InvalidAssumption { field, .. } => field,
            other => panic!("expected InvalidAssumption, got {other:?}"),
        }
    }

    #[test]
    fn test_golden_assumptions_validate() {
        assert!(golden_assumptions().validate().is_ok());
    }

    #[test]
    fn test_zero_hold_years_rejected() {
        let mut a = golden_assumptions();
        a.hold_years = 0;
        assert_eq!(field_of(a.validate().unwrap_err()), "hold_years");
    }

    #[test]
    fn test_tax_rate_bounds() {
        let mut a = golden_assumptions();
        a.tax_rate = dec!(1);
        assert_eq!(field_of(a.validate().unwrap_err()), "tax_rate");
        a.tax_rate = dec!(-0.1);
        assert_eq!(field_of(a.validate().unwrap_err()), "tax_rate");
    }

    #[test]
    fn test_negative_leverage_rejected() {
        let mut a = golden_assumptions();
        a.leverage_turns = dec!(-1);
        assert_eq!(field_of(a.validate().unwrap_err()), "leverage_turns");
    }

    #[test]
    fn test_amort_rate_above_one_rejected() {
        let mut a = golden_assumptions();
        a.mandatory_amort_rate = Some(dec!(1.5));
        assert_eq!(field_of(a.validate().unwrap_err()), "mandatory_amort_rate");
    }

    #[test]
    fn test_fee_share_bounds() {
        let mut a = golden_assumptions();
        a.transaction_fees_pct = Some(dec!(1));
        assert_eq!(field_of(a.validate().unwrap_err()), "transaction_fees_pct");
        a.transaction_fees_pct = Some(dec!(0.02));
        a.financing_fees_pct = Some(dec!(-0.01));
        assert_eq!(field_of(a.validate().unwrap_err()), "financing_fees_pct");
    }

    #[test]
    fn test_negative_minimum_cash_rejected() {
        let mut a = golden_assumptions();
        a.minimum_cash = Some(dec!(-5));
        assert_eq!(field_of(a.validate().unwrap_err()), "minimum_cash");
    }

    #[test]
    fn test_zero_fixed_point_iterations_rejected() {
        let mut a = golden_assumptions();
        a.interest_convention = InterestConvention::AverageBalance(FixedPointConfig {
            tolerance: dec!(0.00000001),
            max_iterations: 0,
        });
        assert_eq!(
            field_of(a.validate().unwrap_err()),
            "interest_convention.max_iterations"
        );
    }

    #[test]
    fn test_convention_defaults_when_absent() {
        let json = serde_json::json!({
            "entry_ebitda": "100",
            "entry_multiple": "10",
            "leverage_turns": "6",
            "interest_rate": "0.08",
            "exit_multiple": "10",
            "hold_years": 5,
            "ebitda_growth": "0.05",
            "capex_pct": "0.20",
            "tax_rate": "0.25"
        });
        let a: LboAssumptions = serde_json::from_value(json).unwrap();
        assert_eq!(a.interest_convention, InterestConvention::BeginningBalance);
        assert_eq!(a.mandatory_amort_rate, None);
        assert_eq!(a.transaction_fees_pct, None);
        assert_eq!(a.minimum_cash(), Decimal::ZERO);
        assert_eq!(a, golden_assumptions());
    }

    #[test]
    fn test_average_balance_deserializes_with_defaults() {
        let json = serde_json::json!({ "type": "average_balance" });
        let c: InterestConvention = serde_json::from_value(json).unwrap();
        assert_eq!(
            c,
            InterestConvention::AverageBalance(FixedPointConfig::default())
        );
    }
}
