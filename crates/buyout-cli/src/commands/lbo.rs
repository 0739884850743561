use clap::Args;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use buyout_core::lbo::ability_to_pay::{self, AbilityToPayInput};
use buyout_core::lbo::model;
use buyout_core::lbo::sensitivity::{self, LboSensitivityInput};
use buyout_core::lbo::{FixedPointConfig, InterestConvention, LboAssumptions};

use crate::input;

/// Stand-in entry multiple for deals whose price is being solved for
const UNPRICED_MULTIPLE: &str = "1";

/// Deal assumptions supplied as individual flags
#[derive(Args)]
pub struct DealArgs {
    /// Path to a JSON or YAML assumptions file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// EBITDA at acquisition
    #[arg(long)]
    pub entry_ebitda: Option<Decimal>,

    /// Entry EV/EBITDA multiple
    #[arg(long)]
    pub entry_multiple: Option<Decimal>,

    /// Initial debt in turns of entry EBITDA
    #[arg(long, alias = "leverage")]
    pub leverage_turns: Option<Decimal>,

    /// Cash interest rate on debt (e.g. 0.08 for 8%)
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Exit EV/EBITDA multiple
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,

    /// Hold period in years
    #[arg(long, default_value_t = 5)]
    pub hold_years: u32,

    /// Annual EBITDA growth
    #[arg(long, default_value = "0.05", allow_negative_numbers = true)]
    pub ebitda_growth: Decimal,

    /// Capex as a share of EBITDA
    #[arg(long, default_value = "0.20")]
    pub capex_pct: Decimal,

    /// Cash tax rate
    #[arg(long, default_value = "0.25")]
    pub tax_rate: Decimal,

    /// Annual mandatory amortisation as a share of initial debt
    #[arg(long)]
    pub amort_rate: Option<Decimal>,

    /// Revolving credit commitment
    #[arg(long)]
    pub revolver: Option<Decimal>,

    /// Transaction fees as a share of the purchase price
    #[arg(long)]
    pub transaction_fees_pct: Option<Decimal>,

    /// Financing fees as a share of initial debt
    #[arg(long)]
    pub financing_fees_pct: Option<Decimal>,

    /// Cash balance kept back from the sweep
    #[arg(long)]
    pub minimum_cash: Option<Decimal>,

    /// Charge interest on the average of opening and closing debt
    #[arg(long)]
    pub average_balance: bool,
}

impl DealArgs {
    /// Assumptions from `--input`, then stdin, then flags. When `solving_price`
    /// is set the entry multiple may be omitted.
    fn resolve(&self, solving_price: bool) -> Result<LboAssumptions, Box<dyn std::error::Error>> {
        match input::load(self.input.as_deref())? {
            Some(assumptions) => Ok(assumptions),
            None => self.assumptions_from_flags(solving_price),
        }
    }

    fn assumptions_from_flags(
        &self,
        solving_price: bool,
    ) -> Result<LboAssumptions, Box<dyn std::error::Error>> {
        let required = |v: Option<Decimal>, flag: &str| {
            v.ok_or_else(|| format!("--{flag} is required (or provide --input)"))
        };

        let entry_multiple = match self.entry_multiple {
            Some(m) => m,
            None if solving_price => Decimal::ONE,
            None => required(None, "entry-multiple")?,
        };

        Ok(LboAssumptions {
            entry_ebitda: required(self.entry_ebitda, "entry-ebitda")?,
            entry_multiple,
            leverage_turns: required(self.leverage_turns, "leverage-turns")?,
            interest_rate: required(self.interest_rate, "interest-rate")?,
            exit_multiple: required(self.exit_multiple, "exit-multiple")?,
            hold_years: self.hold_years,
            ebitda_growth: self.ebitda_growth,
            capex_pct: self.capex_pct,
            tax_rate: self.tax_rate,
            mandatory_amort_rate: self.amort_rate,
            revolver_capacity: self.revolver,
            transaction_fees_pct: self.transaction_fees_pct,
            financing_fees_pct: self.financing_fees_pct,
            minimum_cash: self.minimum_cash,
            interest_convention: if self.average_balance {
                InterestConvention::AverageBalance(FixedPointConfig::default())
            } else {
                InterestConvention::BeginningBalance
            },
        })
    }
}

/// Arguments for a single LBO run
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub deal: DealArgs,
}

pub fn run_lbo(args: RunArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions = args.deal.resolve(false)?;
    let result = model::build_lbo(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the maximum-price search
#[derive(Args)]
pub struct AbilityToPayArgs {
    #[command(flatten)]
    pub deal: DealArgs,

    /// Sponsor hurdle IRR (e.g. 0.20 for 20%); optional when the input sets target_irr
    #[arg(long, allow_negative_numbers = true)]
    pub target_irr: Option<Decimal>,

    /// Lowest entry multiple searched
    #[arg(long)]
    pub lo: Option<Decimal>,

    /// Highest entry multiple searched
    #[arg(long)]
    pub hi: Option<Decimal>,

    /// IRR tolerance for the fitted multiple
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Bisection iteration limit
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

/// Build a search input from a document that is either a full
/// `AbilityToPayInput` or bare deal assumptions. The entry multiple may be
/// left out since it is solved for, and `target_irr` overrides the document.
pub(crate) fn ability_to_pay_document(
    doc: Value,
    target_irr: Option<Decimal>,
) -> Result<AbilityToPayInput, Box<dyn std::error::Error>> {
    let Value::Object(mut doc) = doc else {
        return Err("ability-to-pay input must be a mapping".into());
    };
    if !doc.contains_key("assumptions") {
        debug!("treating input as bare deal assumptions");
        doc = Map::from_iter([("assumptions".to_string(), Value::Object(doc))]);
    }
    if let Some(Value::Object(assumptions)) = doc.get_mut("assumptions") {
        assumptions
            .entry("entry_multiple")
            .or_insert_with(|| Value::String(UNPRICED_MULTIPLE.to_string()));
    }
    if let Some(irr) = target_irr {
        doc.insert("target_irr".to_string(), Value::String(irr.to_string()));
    }
    if !doc.contains_key("target_irr") {
        return Err("--target-irr is required unless the input sets target_irr".into());
    }
    Ok(serde_json::from_value(Value::Object(doc))?)
}

pub fn run_ability_to_pay(args: AbilityToPayArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut atp = match input::load::<Value>(args.deal.input.as_deref())? {
        Some(doc) => ability_to_pay_document(doc, args.target_irr)?,
        None => {
            let target_irr = args
                .target_irr
                .ok_or("--target-irr is required (or provide --input)")?;
            AbilityToPayInput::new(args.deal.assumptions_from_flags(true)?, target_irr)
        }
    };
    if let Some(lo) = args.lo {
        atp.min_multiple = lo;
    }
    if let Some(hi) = args.hi {
        atp.max_multiple = hi;
    }
    if let Some(tol) = args.tolerance {
        atp.solver.tolerance = tol;
    }
    if let Some(n) = args.max_iterations {
        atp.solver.max_iterations = n;
    }

    let result = ability_to_pay::solve_ability_to_pay(&atp)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a two-way LBO sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON or YAML grid definition (base assumptions, rows, columns, metric)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let grid: LboSensitivityInput = input::load(args.input.as_deref())?
        .ok_or("--input <grid.json|grid.yaml> or stdin required for sensitivity")?;
    let result = sensitivity::lbo_sensitivity(&grid)?;
    Ok(serde_json::to_value(result)?)
}
