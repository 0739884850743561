use buyout_core::lbo::ability_to_pay::{self, AbilityToPayInput};
use buyout_core::lbo::debt_schedule;
use buyout_core::lbo::model;
use buyout_core::lbo::returns;
use buyout_core::lbo::sensitivity::{self, LboAxis, LboDriver, LboMetric, LboSensitivityInput};
use buyout_core::lbo::{capital_structure, FixedPointConfig, InterestConvention, LboAssumptions};
use buyout_core::{BuyoutError, SensitivityVariable};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn golden() -> LboAssumptions {
    LboAssumptions {
        entry_ebitda: dec!(100),
        entry_multiple: dec!(10),
        leverage_turns: dec!(6),
        interest_rate: dec!(0.08),
        exit_multiple: dec!(10),
        hold_years: 5,
        ebitda_growth: dec!(0.05),
        capex_pct: dec!(0.20),
        tax_rate: dec!(0.25),
        mandatory_amort_rate: None,
        revolver_capacity: None,
        transaction_fees_pct: None,
        financing_fees_pct: None,
        minimum_cash: None,
        interest_convention: InterestConvention::BeginningBalance,
    }
}

// ===========================================================================
// Golden scenario: 100 EBITDA, 10x in / 10x out, 6x at 8%, five years
// ===========================================================================

#[test]
fn test_golden_entry() {
    let cs = capital_structure::build_capital_structure(&golden()).unwrap();
    assert_eq!(cs.purchase_price, dec!(1000));
    assert_eq!(cs.initial_debt, dec!(600));
    assert_eq!(cs.initial_equity, dec!(400));
}

#[test]
fn test_golden_schedule_balances() {
    let r = model::run_lbo(&golden()).unwrap();
    let closing: Vec<Decimal> = r.periods.iter().map(|p| p.ending_debt_balance).collect();
    assert_eq!(
        closing,
        vec![
            dec!(573),
            dec!(541.23),
            dec!(504.2463),
            dec!(461.570703),
            dec!(412.68805143),
        ]
    );
}

#[test]
fn test_golden_returns() {
    let r = model::run_lbo(&golden()).unwrap();
    assert_eq!(r.exit_ebitda, dec!(127.62815625));
    assert_eq!(r.exit_enterprise_value, dec!(1276.2815625));
    assert_eq!(r.exit_equity, dec!(863.59351107));
    assert_eq!(r.moic, dec!(2.158983777675));
    assert!(
        (r.irr - dec!(0.16640635)).abs() < dec!(0.0000001),
        "Expected IRR ~16.64%, got {}",
        r.irr
    );
}

#[test]
fn test_irr_identity_holds_exactly() {
    for hold in 1..=7 {
        let mut a = golden();
        a.hold_years = hold;
        let r = model::run_lbo(&a).unwrap();
        assert_eq!(r.irr, returns::irr_from_moic(r.moic, hold).unwrap());
    }
}

// ===========================================================================
// Edge cases
// ===========================================================================

#[test]
fn test_fees_raise_the_cheque_and_lower_returns() {
    let mut a = golden();
    a.transaction_fees_pct = Some(dec!(0.02));
    a.financing_fees_pct = Some(dec!(0.02));
    let with_fees = model::run_lbo(&a).unwrap();
    let clean = model::run_lbo(&golden()).unwrap();

    let cs = &with_fees.capital_structure;
    assert_eq!(cs.initial_equity, dec!(432));
    assert_eq!(cs.sources_uses.total_sources, cs.sources_uses.total_uses);
    assert!(cs.sources_uses.balanced);

    // Fees are sunk at close; the operating schedule is unchanged
    assert_eq!(with_fees.periods, clean.periods);
    assert_eq!(with_fees.exit_equity, clean.exit_equity);
    assert!(with_fees.moic < clean.moic);
    assert!(with_fees.irr < clean.irr);
}

#[test]
fn test_fees_lower_ability_to_pay() {
    let mut a = golden();
    a.transaction_fees_pct = Some(dec!(0.03));
    let with_fees = ability_to_pay::solve_ability_to_pay(&AbilityToPayInput::new(a, dec!(0.20)))
        .unwrap()
        .result;
    let clean = ability_to_pay::solve_ability_to_pay(&AbilityToPayInput::new(golden(), dec!(0.20)))
        .unwrap()
        .result;
    assert!(with_fees.max_entry_multiple < clean.max_entry_multiple);
}

#[test]
fn test_long_high_growth_hold_fails_cleanly() {
    let mut a = golden();
    a.hold_years = 90;
    a.ebitda_growth = dec!(1);
    assert!(matches!(
        model::run_lbo(&a),
        Err(BuyoutError::InvalidAssumption { .. })
    ));
}

#[test]
fn test_oversized_purchase_price_fails_cleanly() {
    let mut a = golden();
    a.entry_ebitda = dec!(100000000000000000000);
    a.entry_multiple = dec!(10000000000);
    assert!(matches!(
        model::run_lbo(&a),
        Err(BuyoutError::InvalidAssumption { .. })
    ));
}

#[test]
fn test_pure_equity_deal_never_carries_debt() {
    let mut a = golden();
    a.leverage_turns = Decimal::ZERO;
    let r = model::run_lbo(&a).unwrap();
    assert_eq!(r.capital_structure.initial_debt, Decimal::ZERO);
    assert!(r.periods.iter().all(|p| p.ending_debt_balance.is_zero()));
}

#[test]
fn test_leverage_above_price_is_invalid() {
    let mut a = golden();
    a.leverage_turns = dec!(10.5);
    assert!(matches!(
        model::run_lbo(&a),
        Err(BuyoutError::InvalidAssumption { .. })
    ));
}

#[test]
fn test_shortfall_beyond_revolver_fails_in_that_year() {
    let mut a = golden();
    a.capex_pct = dec!(1.2);
    a.revolver_capacity = Some(dec!(100));
    let err = model::run_lbo(&a).unwrap_err();
    assert!(matches!(err, BuyoutError::LiquidityShortfall { year: 2, .. }));
    assert!(err.to_string().contains("year 2"));
}

#[test]
fn test_sweep_never_exceeds_balance_after_amortization() {
    let mut a = golden();
    a.leverage_turns = dec!(1);
    a.mandatory_amort_rate = Some(dec!(0.25));
    let r = model::run_lbo(&a).unwrap();
    for p in &r.periods {
        let cap = (p.beginning_debt_balance - p.mandatory_amortization).max(Decimal::ZERO);
        assert!(p.sweep_paydown <= cap);
        assert!(p.ending_debt_balance >= Decimal::ZERO);
    }
}

#[test]
fn test_unreachable_hurdle_is_non_convergence() {
    let result = ability_to_pay::solve_ability_to_pay(&AbilityToPayInput::new(golden(), dec!(4)));
    assert!(matches!(result, Err(BuyoutError::NonConvergence { .. })));
}

// ===========================================================================
// Ability to pay
// ===========================================================================

#[test]
fn test_ability_to_pay_round_trip() {
    let target = dec!(0.20);
    let out = ability_to_pay::solve_ability_to_pay(&AbilityToPayInput::new(golden(), target))
        .unwrap()
        .result;
    let rerun = ability_to_pay::achieved_irr(&golden(), out.max_entry_multiple).unwrap();
    assert!((rerun - target).abs() < dec!(0.000001));
    assert_eq!(rerun, out.achieved_irr);
}

#[test]
fn test_ability_to_pay_with_amortization_and_revolver() {
    let mut a = golden();
    a.mandatory_amort_rate = Some(dec!(0.05));
    a.revolver_capacity = Some(dec!(50));
    let out = ability_to_pay::solve_ability_to_pay(&AbilityToPayInput::new(a.clone(), dec!(0.18)))
        .unwrap()
        .result;
    assert!(out.irr_error < dec!(0.000001));
    assert_eq!(out.lbo.capital_structure.initial_debt, dec!(600));
    assert!(out.max_entry_multiple > a.leverage_turns);
}

#[test]
fn test_ability_to_pay_deserializes_with_defaults() {
    let json = serde_json::json!({
        "assumptions": serde_json::to_value(golden()).unwrap(),
        "target_irr": "0.20"
    });
    let input: AbilityToPayInput = serde_json::from_value(json).unwrap();
    assert_eq!(input.min_multiple, dec!(0.1));
    assert_eq!(input.max_multiple, dec!(50));
    assert_eq!(input.solver.max_iterations, 100);
    assert_eq!(input.solver.tolerance, dec!(0.000001));
}

// ===========================================================================
// Average-balance convention
// ===========================================================================

#[test]
fn test_average_balance_lifts_returns() {
    let mut a = golden();
    a.interest_convention = InterestConvention::AverageBalance(FixedPointConfig::default());
    let avg = model::run_lbo(&a).unwrap();
    let beg = model::run_lbo(&golden()).unwrap();
    assert!(avg.total_interest < beg.total_interest);
    assert!(avg.irr > beg.irr);
}

#[test]
fn test_average_balance_on_unlevered_deal_needs_one_pass() {
    let mut a = golden();
    a.leverage_turns = Decimal::ZERO;
    a.interest_convention = InterestConvention::AverageBalance(FixedPointConfig::default());
    let cs = capital_structure::build_capital_structure(&a).unwrap();
    let sched = debt_schedule::project_debt_schedule(&a, &cs).unwrap();
    assert!(sched.periods.iter().all(|p| p.interest_iterations == 1));
}

// ===========================================================================
// Sensitivity
// ===========================================================================

#[test]
fn test_entry_by_leverage_grid() {
    let input = LboSensitivityInput {
        base: golden(),
        rows: LboAxis {
            driver: LboDriver::EntryMultiple,
            range: SensitivityVariable {
                min: dec!(8),
                max: dec!(10),
                step: dec!(1),
            },
        },
        columns: LboAxis {
            driver: LboDriver::LeverageTurns,
            range: SensitivityVariable {
                min: dec!(4),
                max: dec!(8),
                step: dec!(2),
            },
        },
        metric: LboMetric::Moic,
    };
    let out = sensitivity::lbo_sensitivity(&input).unwrap().result;
    // 8x leverage on an 8x price leaves no equity
    assert_eq!(out.matrix[0][2], None);
    assert_eq!(out.failed_cells, 1);
    assert_eq!(out.matrix[2][1], Some(dec!(2.158983777675)));
}
