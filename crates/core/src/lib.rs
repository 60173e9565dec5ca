pub mod budget;
pub mod estimate;
pub mod money;
pub mod period;
pub mod transaction;

pub use budget::Budget;
pub use estimate::{
    DefinitionChanges, EstimateDefinition, EstimateError, EstimateId, EstimateTree, EstimateType,
};
pub use money::{Currency, IncompatibleCurrency, Money};
pub use period::{BudgetingPeriod, DateRange};
pub use transaction::Transaction;
