use thiserror::Error;
use tracing::debug;

use saldo_core::estimate::{EstimateId, EstimateTree};
use saldo_core::money::{IncompatibleCurrency, Money};

use crate::assign::{ActualFigureSource, ActualsError};
use crate::impact::compute_impact;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error(transparent)]
    Currency(#[from] IncompatibleCurrency),
    #[error("failed to obtain the actual figure for estimate {estimate}: {source}")]
    ActualFigures {
        estimate: EstimateId,
        source: ActualsError,
    },
}

/// One running balance total: the initial value, the running ending value,
/// and the increases/decreases that got it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndingBalance {
    initial: Money,
    value: Money,
    increases: Money,
    decreases: Money,
}

impl EndingBalance {
    fn new(initial: Money) -> Self {
        let zero = Money::zero(initial.currency());
        EndingBalance {
            initial,
            value: initial,
            increases: zero,
            decreases: zero,
        }
    }

    fn apply(&mut self, change: Money) -> Result<(), IncompatibleCurrency> {
        if change.is_negative() {
            self.decreases = self.decreases.add(-change)?;
        } else {
            self.increases = self.increases.add(change)?;
        }
        self.value = self.value.add(change)?;
        Ok(())
    }

    pub fn initial(&self) -> Money {
        self.initial
    }

    pub fn value(&self) -> Money {
        self.value
    }

    pub fn sum_increases(&self) -> Money {
        self.increases
    }

    pub fn sum_decreases(&self) -> Money {
        self.decreases
    }

    pub fn net_change(&self) -> Result<Money, IncompatibleCurrency> {
        self.increases.sub(self.decreases)
    }
}

/// The three projected balances for a budget: purely as estimated, purely
/// as observed so far, and the conservative expected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndingBalances {
    pub estimated: EndingBalance,
    pub actual: EndingBalance,
    pub expected: EndingBalance,
}

/// Walks the whole estimate tree once and folds every node's balance
/// impact into the three ending balances. The result is all-or-nothing:
/// any failure aborts the calculation with no partial totals.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceCalculator {
    assume_period_ended: bool,
}

impl BalanceCalculator {
    pub fn new() -> Self {
        BalanceCalculator::default()
    }

    /// Treats every estimate as finished, for budgets whose period lies
    /// entirely in the past: nothing further can happen, so only actual
    /// figures feed the expected balance.
    pub fn assume_period_ended(mut self, ended: bool) -> Self {
        self.assume_period_ended = ended;
        self
    }

    pub fn calculate(
        &self,
        initial: Money,
        tree: &EstimateTree,
        actuals: &dyn ActualFigureSource,
    ) -> Result<EndingBalances, CalculationError> {
        let mut estimated = EndingBalance::new(initial);
        let mut actual = EndingBalance::new(initial);
        let mut expected = EndingBalance::new(initial);

        // Pre-order over the whole tree, every node exactly once.
        for (id, definition) in tree.iter() {
            let is_category = tree.is_category(id);
            let figure = actuals
                .actual_for(id)
                .map_err(|source| CalculationError::ActualFigures {
                    estimate: id,
                    source,
                })?
                .unwrap_or_else(|| Money::zero(definition.amount.currency()));

            let impact = if self.assume_period_ended && !definition.finished {
                let mut finished = definition.clone();
                finished.finished = true;
                compute_impact(&finished, is_category, figure)?
            } else {
                compute_impact(definition, is_category, figure)?
            };

            debug!(
                estimate = %id,
                estimated = %impact.estimated,
                actual = %impact.actual,
                expected = %impact.expected,
                "applying balance impact"
            );
            estimated.apply(impact.estimated)?;
            actual.apply(impact.actual)?;
            expected.apply(impact.expected)?;
        }

        Ok(EndingBalances {
            estimated,
            actual,
            expected,
        })
    }
}
