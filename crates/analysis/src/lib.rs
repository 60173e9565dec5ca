pub mod assign;
pub mod balance;
pub mod impact;
pub mod rules;
pub mod task;

pub use assign::{
    aggregate_actuals, ActualFigureSource, ActualFigures, ActualsError, AssignError,
    AssignmentEngine, Assignments,
};
pub use balance::{BalanceCalculator, CalculationError, EndingBalance, EndingBalances};
pub use impact::{compute_impact, evaluate_progress, BalanceImpact, EstimateProgress};
pub use rules::{
    unbudgeted_fallback_rules, ComparisonOperator, Condition, Rule, RuleSet, RuleSetError,
    TransactionField,
};
pub use task::{CancelToken, ProgressThrottle};
