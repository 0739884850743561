use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::error::{in_range, BuyoutError};
use crate::lbo::assumptions::LboAssumptions;
use crate::lbo::capital_structure::CapitalStructure;
use crate::lbo::debt_schedule::{ebitda_in_year, DebtSchedule};
use crate::types::*;
use crate::BuyoutResult;

/// Sponsor proceeds and returns at exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitReturns {
    pub exit_ebitda: Money,
    pub exit_enterprise_value: Money,
    /// Closing debt less closing cash in the exit year
    pub exit_net_debt: Money,
    pub exit_equity: Money,
    /// Multiple on invested capital
    pub moic: Multiple,
    /// Annualised return implied by the MOIC (single entry, single exit)
    pub irr: Rate,
    /// Initial debt less closing debt
    pub total_debt_paydown: Money,
    /// Net debt / EBITDA at exit
    pub exit_leverage: Multiple,
}

/// IRR implied by a MOIC over a hold period with no interim distributions.
pub fn irr_from_moic(moic: Multiple, hold_years: u32) -> BuyoutResult<Rate> {
    if moic <= Decimal::ZERO {
        return Err(BuyoutError::DomainUndefined(format!(
            "MOIC of {moic} has no real annualised return"
        )));
    }
    if hold_years == 0 {
        return Err(BuyoutError::DomainUndefined(
            "IRR is undefined over a zero-year hold".into(),
        ));
    }
    let exponent = Decimal::ONE / Decimal::from(hold_years);
    let growth = moic.checked_powd(exponent).ok_or_else(|| {
        BuyoutError::DomainUndefined(format!("{moic}^(1/{hold_years}) is not representable"))
    })?;
    Ok(growth - Decimal::ONE)
}

/// Value the business at exit and convert sponsor proceeds into MOIC and IRR.
pub fn calculate_exit_returns(
    assumptions: &LboAssumptions,
    capital: &CapitalStructure,
    schedule: &DebtSchedule,
) -> BuyoutResult<ExitReturns> {
    if capital.initial_equity <= Decimal::ZERO {
        return Err(BuyoutError::DomainUndefined(format!(
            "MOIC requires positive initial equity, got {}",
            capital.initial_equity
        )));
    }

    let exit_ebitda = ebitda_in_year(assumptions, assumptions.hold_years)?;
    let exit_enterprise_value = in_range(
        exit_ebitda.checked_mul(assumptions.exit_multiple),
        "exit_multiple",
        "Exit enterprise value",
    )?;

    let ending_debt = schedule.ending_debt_balance();
    let ending_cash = schedule.ending_cash();
    let exit_net_debt = ending_debt - ending_cash;
    let exit_equity = in_range(
        exit_enterprise_value
            .checked_sub(ending_debt)
            .and_then(|v| v.checked_add(ending_cash)),
        "exit_multiple",
        "Exit equity",
    )?;

    let moic = in_range(
        exit_equity.checked_div(capital.initial_equity),
        "leverage_turns",
        "MOIC",
    )?;
    let irr = irr_from_moic(moic, assumptions.hold_years)?;

    Ok(ExitReturns {
        exit_ebitda,
        exit_enterprise_value,
        exit_net_debt,
        exit_equity,
        moic,
        irr,
        total_debt_paydown: capital.initial_debt - ending_debt,
        exit_leverage: in_range(
            exit_net_debt.checked_div(exit_ebitda),
            "ebitda_growth",
            "Exit leverage",
        )?,
    })
}
