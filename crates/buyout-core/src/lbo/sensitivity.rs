use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::BuyoutError;
use crate::lbo::assumptions::LboAssumptions;
use crate::lbo::model::{self, LboResult};
use crate::types::*;
use crate::BuyoutResult;

/// Cells beyond this are almost certainly a mistyped step.
const MAX_AXIS_POINTS: usize = 1_000;

/// Assumption swept along one axis of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LboDriver {
    EntryMultiple,
    ExitMultiple,
    LeverageTurns,
    InterestRate,
    EbitdaGrowth,
}

impl LboDriver {
    fn apply(self, assumptions: &mut LboAssumptions, value: Decimal) {
        match self {
            LboDriver::EntryMultiple => assumptions.entry_multiple = value,
            LboDriver::ExitMultiple => assumptions.exit_multiple = value,
            LboDriver::LeverageTurns => assumptions.leverage_turns = value,
            LboDriver::InterestRate => assumptions.interest_rate = value,
            LboDriver::EbitdaGrowth => assumptions.ebitda_growth = value,
        }
    }

    fn name(self) -> &'static str {
        match self {
            LboDriver::EntryMultiple => "entry_multiple",
            LboDriver::ExitMultiple => "exit_multiple",
            LboDriver::LeverageTurns => "leverage_turns",
            LboDriver::InterestRate => "interest_rate",
            LboDriver::EbitdaGrowth => "ebitda_growth",
        }
    }
}

/// Return metric read from each cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LboMetric {
    #[default]
    Irr,
    Moic,
    ExitEquity,
}

impl LboMetric {
    fn read(self, result: &LboResult) -> Decimal {
        match self {
            LboMetric::Irr => result.irr,
            LboMetric::Moic => result.moic,
            LboMetric::ExitEquity => result.exit_equity,
        }
    }
}

/// One axis of the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LboAxis {
    pub driver: LboDriver,
    #[serde(flatten)]
    pub range: SensitivityVariable,
}

/// Input for a two-way LBO sensitivity table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LboSensitivityInput {
    pub base: LboAssumptions,
    pub rows: LboAxis,
    pub columns: LboAxis,
    #[serde(default)]
    pub metric: LboMetric,
}

/// Two-way LBO sensitivity table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LboSensitivityOutput {
    pub row_driver: LboDriver,
    pub column_driver: LboDriver,
    pub row_values: Vec<Decimal>,
    pub column_values: Vec<Decimal>,
    pub metric: LboMetric,
    /// matrix[i][j] at row_values[i], column_values[j]; `None` where the deal fails
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Metric for the unmodified base assumptions, if they evaluate
    pub base_case_value: Option<Decimal>,
    pub failed_cells: usize,
}

/// Sweep values from min to max inclusive.
fn axis_values(axis: &LboAxis) -> BuyoutResult<Vec<Decimal>> {
    let field = axis.driver.name();
    let range = &axis.range;
    if range.step <= Decimal::ZERO {
        return Err(BuyoutError::invalid(field, "Step must be positive"));
    }
    if range.min > range.max {
        return Err(BuyoutError::invalid(field, "Min must be <= max"));
    }

    let mut values = Vec::new();
    let mut current = range.min;
    while current <= range.max {
        values.push(current);
        if values.len() > MAX_AXIS_POINTS {
            return Err(BuyoutError::invalid(
                field,
                format!("Range produces more than {MAX_AXIS_POINTS} points"),
            ));
        }
        current += range.step;
    }
    // Step may not land on max exactly
    if values.last().is_some_and(|last| *last < range.max) {
        values.push(range.max);
    }
    Ok(values)
}

fn evaluate_cell(
    input: &LboSensitivityInput,
    row_value: Decimal,
    column_value: Decimal,
) -> Result<Decimal, String> {
    let mut cell = input.base.clone();
    input.rows.driver.apply(&mut cell, row_value);
    input.columns.driver.apply(&mut cell, column_value);
    model::run_lbo(&cell)
        .map(|r| input.metric.read(&r))
        .map_err(|e| {
            format!(
                "{}={row_value}, {}={column_value}: {e}",
                input.rows.driver.name(),
                input.columns.driver.name()
            )
        })
}

#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn evaluate_serial(
    input: &LboSensitivityInput,
    cells: &[(Decimal, Decimal)],
) -> Vec<Result<Decimal, String>> {
    cells
        .iter()
        .map(|(r, c)| evaluate_cell(input, *r, *c))
        .collect()
}

/// Same cells on the rayon pool; `collect` keeps input order.
#[cfg(feature = "parallel")]
fn evaluate_parallel(
    input: &LboSensitivityInput,
    cells: &[(Decimal, Decimal)],
) -> Vec<Result<Decimal, String>> {
    cells
        .par_iter()
        .map(|(r, c)| evaluate_cell(input, *r, *c))
        .collect()
}

/// Evaluate every cell of a two-way LBO grid.
///
/// Cells are independent full-pipeline runs on their own copy of the
/// assumptions. A cell whose deal fails (over-levered, liquidity shortfall,
/// equity wiped out) is left as `None` and reported in the warnings rather
/// than failing the grid. With the `parallel` feature cells run on rayon.
pub fn lbo_sensitivity(
    input: &LboSensitivityInput,
) -> BuyoutResult<ComputationOutput<LboSensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rows.driver == input.columns.driver {
        return Err(BuyoutError::invalid(
            "columns.driver",
            "Row and column drivers must differ",
        ));
    }
    input.base.validate()?;

    let row_values = axis_values(&input.rows)?;
    let column_values = axis_values(&input.columns)?;

    let cells: Vec<(Decimal, Decimal)> = row_values
        .iter()
        .flat_map(|r| column_values.iter().map(move |c| (*r, *c)))
        .collect();

    #[cfg(feature = "parallel")]
    let evaluated = evaluate_parallel(input, &cells);

    #[cfg(not(feature = "parallel"))]
    let evaluated = evaluate_serial(input, &cells);

    let mut failed_cells = 0;
    let mut flat: Vec<Option<Decimal>> = Vec::with_capacity(evaluated.len());
    for cell in evaluated {
        match cell {
            Ok(v) => flat.push(Some(v)),
            Err(msg) => {
                failed_cells += 1;
                warnings.push(format!("Evaluation failed at {msg}"));
                flat.push(None);
            }
        }
    }
    let matrix: Vec<Vec<Option<Decimal>>> = flat
        .chunks(column_values.len())
        .map(|row| row.to_vec())
        .collect();

    let base_case_value = model::run_lbo(&input.base)
        .map(|r| input.metric.read(&r))
        .ok();

    let output = LboSensitivityOutput {
        row_driver: input.rows.driver,
        column_driver: input.columns.driver,
        row_values,
        column_values,
        metric: input.metric,
        matrix,
        base_case_value,
        failed_cells,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "LBO 2-Way Sensitivity",
        &serde_json::json!({
            "rows": input.rows.driver.name(),
            "columns": input.columns.driver.name(),
            "metric": input.metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}
