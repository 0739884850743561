use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::lbo::assumptions::{InterestConvention, LboAssumptions};
use crate::lbo::capital_structure::{self, CapitalStructure};
use crate::lbo::debt_schedule::{self, PeriodState};
use crate::lbo::returns;
use crate::types::*;
use crate::BuyoutResult;

/// Full LBO result from close through exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LboResult {
    /// Funding at close
    pub capital_structure: CapitalStructure,
    /// Year-by-year debt schedule, year 1 first
    pub periods: Vec<PeriodState>,
    pub exit_ebitda: Money,
    pub exit_enterprise_value: Money,
    /// Exit EV less closing debt plus closing cash
    pub exit_equity: Money,
    pub exit_net_debt: Money,
    pub moic: Multiple,
    pub irr: Rate,
    pub total_debt_paydown: Money,
    pub total_interest: Money,
    pub entry_leverage: Multiple,
    pub exit_leverage: Multiple,
}

/// Run capital structure, debt schedule and exit returns end to end.
///
/// This is the unwrapped pipeline used by the solver and sensitivity grid;
/// [`build_lbo`] adds warnings and metadata on top.
pub fn run_lbo(assumptions: &LboAssumptions) -> BuyoutResult<LboResult> {
    let capital = capital_structure::build_capital_structure(assumptions)?;
    let schedule = debt_schedule::project_debt_schedule(assumptions, &capital)?;
    let exit = returns::calculate_exit_returns(assumptions, &capital, &schedule)?;

    Ok(LboResult {
        entry_leverage: capital.entry_leverage,
        capital_structure: capital,
        total_interest: schedule.total_interest,
        periods: schedule.periods,
        exit_ebitda: exit.exit_ebitda,
        exit_enterprise_value: exit.exit_enterprise_value,
        exit_equity: exit.exit_equity,
        exit_net_debt: exit.exit_net_debt,
        moic: exit.moic,
        irr: exit.irr,
        total_debt_paydown: exit.total_debt_paydown,
        exit_leverage: exit.exit_leverage,
    })
}

/// Observations about a completed run that a reader of the output should see.
fn collect_warnings(assumptions: &LboAssumptions, result: &LboResult) -> Vec<String> {
    let mut warnings = Vec::new();

    for p in &result.periods {
        if p.pretax_income < Decimal::ZERO {
            warnings.push(format!(
                "Year {}: pre-tax loss of {}; cash tax floored at zero",
                p.year, p.pretax_income
            ));
        }
        if p.revolver_draw > Decimal::ZERO {
            warnings.push(format!(
                "Year {}: drew {} on the revolver",
                p.year, p.revolver_draw
            ));
        }
    }

    if result.capital_structure.initial_debt > Decimal::ZERO {
        if let Some(repaid) = result
            .periods
            .iter()
            .find(|p| p.ending_debt_balance.is_zero())
        {
            if repaid.year < assumptions.hold_years {
                warnings.push(format!(
                    "Debt fully repaid in year {}; later free cash flow accumulates as cash",
                    repaid.year
                ));
            }
        }
    }

    warnings.push(
        "Cash tax is levied on EBITDA less interest less capex, with no D&A add-back".into(),
    );
    warnings
}

/// Build a complete single-tranche LBO from entry through exit.
pub fn build_lbo(assumptions: &LboAssumptions) -> BuyoutResult<ComputationOutput<LboResult>> {
    let start = Instant::now();

    let result = run_lbo(assumptions)?;
    let warnings = collect_warnings(assumptions, &result);

    let methodology = match assumptions.interest_convention {
        InterestConvention::BeginningBalance => {
            "Leveraged Buyout: cash sweep with revolver, interest on opening balance"
        }
        InterestConvention::AverageBalance(_) => {
            "Leveraged Buyout: cash sweep with revolver, interest on average balance (fixed-point)"
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        assumptions,
        warnings,
        elapsed,
        result,
    ))
}
