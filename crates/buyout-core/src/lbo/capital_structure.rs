use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BuyoutError;
use crate::lbo::assumptions::LboAssumptions;
use crate::types::*;
use crate::BuyoutResult;

/// Funding at close, line by line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesUses {
    pub sources: Vec<(String, Money)>,
    pub uses: Vec<(String, Money)>,
    pub total_sources: Money,
    pub total_uses: Money,
    /// Whether sources equal uses exactly
    pub balanced: bool,
}

impl SourcesUses {
    fn new(sources: Vec<(String, Money)>, uses: Vec<(String, Money)>) -> BuyoutResult<Self> {
        let total = |lines: &[(String, Money)], field: &str| {
            lines.iter().try_fold(Decimal::ZERO, |acc, (_, v)| {
                acc.checked_add(*v)
                    .ok_or_else(|| BuyoutError::overflow(field, "Sources and uses total"))
            })
        };
        let total_sources = total(&sources, "leverage_turns")?;
        let total_uses = total(&uses, "entry_multiple")?;
        Ok(Self {
            balanced: total_sources == total_uses,
            sources,
            uses,
            total_sources,
            total_uses,
        })
    }
}

/// Funding of the purchase price at close. Derived once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    /// Entry EBITDA × entry multiple
    pub purchase_price: Money,
    /// Debt raised at close, capped at the purchase price
    pub initial_debt: Money,
    /// Sponsor equity cheque: purchase price plus fees less debt
    pub initial_equity: Money,
    /// Initial debt / entry EBITDA
    pub entry_leverage: Multiple,
    /// Initial equity / total uses
    pub equity_pct: Rate,
    pub transaction_fees: Money,
    pub financing_fees: Money,
    pub sources_uses: SourcesUses,
}

/// Size the purchase price, debt, fees and sponsor equity from entry assumptions.
pub fn build_capital_structure(assumptions: &LboAssumptions) -> BuyoutResult<CapitalStructure> {
    assumptions.validate()?;

    let purchase_price = assumptions
        .entry_ebitda
        .checked_mul(assumptions.entry_multiple)
        .ok_or_else(|| BuyoutError::overflow("entry_multiple", "Purchase price"))?;
    let requested_debt = assumptions
        .entry_ebitda
        .checked_mul(assumptions.leverage_turns)
        .ok_or_else(|| BuyoutError::overflow("leverage_turns", "Initial debt"))?;
    let initial_debt = requested_debt.min(purchase_price);

    // Both shares are below one, so neither product can exceed its base.
    let transaction_fees =
        purchase_price * assumptions.transaction_fees_pct.unwrap_or(Decimal::ZERO);
    let financing_fees = initial_debt * assumptions.financing_fees_pct.unwrap_or(Decimal::ZERO);
    let total_uses = purchase_price
        .checked_add(transaction_fees)
        .and_then(|v| v.checked_add(financing_fees))
        .ok_or_else(|| BuyoutError::overflow("entry_multiple", "Total uses"))?;

    let initial_equity = total_uses - initial_debt;
    if initial_equity <= Decimal::ZERO {
        return Err(BuyoutError::invalid(
            "leverage_turns",
            format!(
                "{}x leverage on a {}x entry multiple leaves no sponsor equity",
                assumptions.leverage_turns, assumptions.entry_multiple
            ),
        ));
    }

    let mut sources = Vec::new();
    if initial_debt > Decimal::ZERO {
        sources.push(("Term Debt".to_string(), initial_debt));
    }
    sources.push(("Sponsor Equity".to_string(), initial_equity));

    let mut uses = vec![("Purchase Price".to_string(), purchase_price)];
    if transaction_fees > Decimal::ZERO {
        uses.push(("Transaction Fees".to_string(), transaction_fees));
    }
    if financing_fees > Decimal::ZERO {
        uses.push(("Financing Fees".to_string(), financing_fees));
    }

    Ok(CapitalStructure {
        purchase_price,
        initial_debt,
        initial_equity,
        entry_leverage: initial_debt / assumptions.entry_ebitda,
        equity_pct: initial_equity / total_uses,
        transaction_fees,
        financing_fees,
        sources_uses: SourcesUses::new(sources, uses)?,
    })
}
