use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{in_range, BuyoutError};
use crate::lbo::assumptions::{FixedPointConfig, InterestConvention, LboAssumptions};
use crate::lbo::capital_structure::CapitalStructure;
use crate::types::*;
use crate::BuyoutResult;

/// One projected year. Built once from the prior year's closing position and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodState {
    pub year: u32,
    pub ebitda: Money,
    pub beginning_debt_balance: Money,
    pub interest_expense: Money,
    pub capex: Money,
    pub pretax_income: Money,
    pub tax: Money,
    pub free_cash_flow: Money,
    pub mandatory_amortization: Money,
    pub sweep_paydown: Money,
    pub revolver_draw: Money,
    pub revolver_repay: Money,
    pub ending_debt_balance: Money,
    /// Portion of the ending debt balance drawn on the revolver
    pub revolver_balance: Money,
    pub ending_cash: Money,
    /// Interest passes needed to settle the period (1 for beginning-balance)
    pub interest_iterations: u32,
}

/// Year-by-year schedule from close to exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSchedule {
    pub periods: Vec<PeriodState>,
    pub total_interest: Money,
    pub total_mandatory_amortization: Money,
    pub total_sweep_paydown: Money,
    pub total_revolver_draw: Money,
}

impl DebtSchedule {
    pub fn ending_debt_balance(&self) -> Money {
        self.periods
            .last()
            .map(|p| p.ending_debt_balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn ending_cash(&self) -> Money {
        self.periods
            .last()
            .map(|p| p.ending_cash)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Closing position carried from one period into the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Position {
    pub debt: Money,
    pub revolver: Money,
    pub cash: Money,
}

/// Limits on how a period's cash may be applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CashPolicy {
    pub revolver_capacity: Money,
    /// Balance held back before any sweep
    pub minimum_cash: Money,
}

impl CashPolicy {
    fn from_assumptions(assumptions: &LboAssumptions) -> Self {
        Self {
            revolver_capacity: assumptions.revolver_capacity(),
            minimum_cash: assumptions.minimum_cash(),
        }
    }
}

/// How a period's post-amortisation cash was applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CashAllocation {
    pub sweep_paydown: Money,
    pub revolver_draw: Money,
    pub revolver_repay: Money,
    pub ending_debt: Money,
    pub ending_revolver: Money,
    pub ending_cash: Money,
}

/// EBITDA in a projection year: `entry_ebitda × (1 + growth)^year`.
pub(crate) fn ebitda_in_year(assumptions: &LboAssumptions, year: u32) -> BuyoutResult<Money> {
    let quantity = format!("EBITDA in year {year}");
    let factor = in_range(
        (Decimal::ONE + assumptions.ebitda_growth).checked_powi(i64::from(year)),
        "ebitda_growth",
        &quantity,
    )?;
    in_range(
        assumptions.entry_ebitda.checked_mul(factor),
        "ebitda_growth",
        &quantity,
    )
}

/// Apply cash available after mandatory amortisation.
///
/// A surplus first tops retained cash up to the minimum balance, then sweeps
/// term debt down to zero (outstanding revolver is repaid first out of the
/// sweep); anything left over is retained. A shortfall is met from retained
/// cash, then from the revolver; a draw beyond the undrawn commitment is a
/// `LiquidityShortfall`.
pub(crate) fn allocate_cash(
    year: u32,
    available: Money,
    mandatory: Money,
    opening: &Position,
    policy: &CashPolicy,
) -> BuyoutResult<CashAllocation> {
    if available >= Decimal::ZERO {
        let held_back = (policy.minimum_cash - opening.cash)
            .max(Decimal::ZERO)
            .min(available);
        let sweep_paydown = (available - held_back).min(opening.debt - mandatory);
        let revolver_repay = sweep_paydown.min(opening.revolver);
        let ending_debt = opening.debt - mandatory - sweep_paydown;
        let ending_cash = in_range(
            opening.cash.checked_add(available - sweep_paydown),
            "ebitda_growth",
            "Retained cash",
        )?;
        Ok(CashAllocation {
            sweep_paydown,
            revolver_draw: Decimal::ZERO,
            revolver_repay,
            ending_debt,
            ending_revolver: (opening.revolver - revolver_repay).min(ending_debt),
            ending_cash,
        })
    } else {
        let shortfall = -available;
        let cash_used = shortfall.min(opening.cash);
        let revolver_draw = shortfall - cash_used;
        let headroom = (policy.revolver_capacity - opening.revolver).max(Decimal::ZERO);
        if revolver_draw > headroom {
            warn!(year, %revolver_draw, %headroom, "revolver commitment exhausted");
            return Err(BuyoutError::LiquidityShortfall {
                year,
                shortfall: revolver_draw,
                headroom,
            });
        }
        let ending_debt = in_range(
            (opening.debt - mandatory).checked_add(revolver_draw),
            "revolver_capacity",
            "Debt after revolver draw",
        )?;
        Ok(CashAllocation {
            sweep_paydown: Decimal::ZERO,
            revolver_draw,
            revolver_repay: Decimal::ZERO,
            ending_debt,
            ending_revolver: (opening.revolver + revolver_draw).min(ending_debt),
            ending_cash: opening.cash - cash_used,
        })
    }
}

/// Settle a single period for a given interest charge.
fn settle_period(
    assumptions: &LboAssumptions,
    year: u32,
    ebitda: Money,
    mandatory: Money,
    opening: &Position,
    interest_expense: Money,
    interest_iterations: u32,
) -> BuyoutResult<PeriodState> {
    let capex = in_range(
        ebitda.checked_mul(assumptions.capex_pct),
        "capex_pct",
        "Capex",
    )?;
    // Tax base omits the D&A add-back: EBITDA - interest - capex.
    let pretax_income = in_range(
        ebitda
            .checked_sub(interest_expense)
            .and_then(|v| v.checked_sub(capex)),
        "capex_pct",
        "Pre-tax income",
    )?;
    let tax = (pretax_income * assumptions.tax_rate).max(Decimal::ZERO);
    let free_cash_flow = pretax_income - tax;
    let available = in_range(
        free_cash_flow.checked_sub(mandatory),
        "mandatory_amort_rate",
        "Cash after amortisation",
    )?;

    let alloc = allocate_cash(
        year,
        available,
        mandatory,
        opening,
        &CashPolicy::from_assumptions(assumptions),
    )?;

    Ok(PeriodState {
        year,
        ebitda,
        beginning_debt_balance: opening.debt,
        interest_expense,
        capex,
        pretax_income,
        tax,
        free_cash_flow,
        mandatory_amortization: mandatory,
        sweep_paydown: alloc.sweep_paydown,
        revolver_draw: alloc.revolver_draw,
        revolver_repay: alloc.revolver_repay,
        ending_debt_balance: alloc.ending_debt,
        revolver_balance: alloc.ending_revolver,
        ending_cash: alloc.ending_cash,
        interest_iterations,
    })
}

/// Resolve average-balance interest by iterating on the closing balance.
fn settle_average_balance(
    assumptions: &LboAssumptions,
    year: u32,
    ebitda: Money,
    mandatory: Money,
    opening: &Position,
    config: &FixedPointConfig,
) -> BuyoutResult<PeriodState> {
    let rate = assumptions.interest_rate;
    let mut interest = in_range(
        opening.debt.checked_mul(rate),
        "interest_rate",
        "Interest expense",
    )?;
    let mut last_delta = Decimal::ZERO;

    for i in 1..=config.max_iterations {
        let period = settle_period(assumptions, year, ebitda, mandatory, opening, interest, i)?;
        let next = in_range(
            opening
                .debt
                .checked_add(period.ending_debt_balance)
                .and_then(|sum| sum.checked_mul(rate)),
            "interest_rate",
            "Average-balance interest",
        )? / dec!(2);
        last_delta = (next - interest).abs();
        trace!(year, iteration = i, %interest, %next, "average-balance iterate");

        if last_delta.is_zero() || last_delta <= config.tolerance * next.abs() {
            return Ok(period);
        }
        interest = next;
    }

    Err(BuyoutError::NonConvergence {
        function: format!("Average-balance interest (year {year})"),
        iterations: config.max_iterations,
        last_delta,
    })
}

fn schedule_total(
    periods: &[PeriodState],
    quantity: &str,
    line: impl Fn(&PeriodState) -> Money,
) -> BuyoutResult<Money> {
    periods.iter().try_fold(Decimal::ZERO, |acc, p| {
        in_range(acc.checked_add(line(p)), "hold_years", quantity)
    })
}

/// Project the debt schedule from close through the final hold year.
///
/// Each period depends only on the prior period's closing debt, revolver and
/// cash. The first error aborts the projection and carries the failing year.
pub fn project_debt_schedule(
    assumptions: &LboAssumptions,
    capital: &CapitalStructure,
) -> BuyoutResult<DebtSchedule> {
    let mut periods: Vec<PeriodState> = Vec::with_capacity(assumptions.hold_years as usize);
    let mut position = Position {
        debt: capital.initial_debt,
        revolver: Decimal::ZERO,
        cash: Decimal::ZERO,
    };
    let scheduled_amortization = assumptions.amort_rate() * capital.initial_debt;

    for year in 1..=assumptions.hold_years {
        let ebitda = ebitda_in_year(assumptions, year)?;
        let mandatory = scheduled_amortization.min(position.debt);

        let period = match &assumptions.interest_convention {
            InterestConvention::BeginningBalance => {
                let interest = in_range(
                    position.debt.checked_mul(assumptions.interest_rate),
                    "interest_rate",
                    "Interest expense",
                )?;
                settle_period(assumptions, year, ebitda, mandatory, &position, interest, 1)?
            }
            InterestConvention::AverageBalance(config) => {
                settle_average_balance(assumptions, year, ebitda, mandatory, &position, config)?
            }
        };

        debug!(
            year,
            ebitda = %period.ebitda,
            interest = %period.interest_expense,
            fcf = %period.free_cash_flow,
            ending_debt = %period.ending_debt_balance,
            "period projected"
        );

        position = Position {
            debt: period.ending_debt_balance,
            revolver: period.revolver_balance,
            cash: period.ending_cash,
        };
        periods.push(period);
    }

    let total_interest = schedule_total(&periods, "Total interest", |p| p.interest_expense)?;
    let total_mandatory_amortization =
        schedule_total(&periods, "Total amortisation", |p| p.mandatory_amortization)?;
    let total_sweep_paydown = schedule_total(&periods, "Total sweep", |p| p.sweep_paydown)?;
    let total_revolver_draw = schedule_total(&periods, "Total revolver draw", |p| p.revolver_draw)?;

    Ok(DebtSchedule {
        periods,
        total_interest,
        total_mandatory_amortization,
        total_sweep_paydown,
        total_revolver_draw,
    })
}
