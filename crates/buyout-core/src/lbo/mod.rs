pub mod ability_to_pay;
pub mod assumptions;
pub mod capital_structure;
pub mod debt_schedule;
pub mod model;
pub mod returns;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use assumptions::{FixedPointConfig, InterestConvention, LboAssumptions};
pub use capital_structure::{CapitalStructure, SourcesUses};
pub use debt_schedule::PeriodState;
pub use model::LboResult;
