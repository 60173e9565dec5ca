use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use saldo_core::estimate::{EstimateId, EstimateTree};
use saldo_core::money::{Currency, IncompatibleCurrency, Money};
use saldo_core::transaction::Transaction;

use crate::rules::RuleSet;
use crate::task::{CancelToken, ProgressThrottle};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("assignment pass was cancelled")]
    Cancelled,
}

/// Result of an assignment pass: for each transaction, in input order, the
/// index of the first rule that matched it, if any. Unmatched transactions
/// are recorded, never dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignments {
    by_transaction: Vec<Option<usize>>,
}

impl Assignments {
    pub fn len(&self) -> usize {
        self.by_transaction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_transaction.is_empty()
    }

    /// The matching rule's index for the given transaction index.
    pub fn rule_for(&self, transaction: usize) -> Option<usize> {
        self.by_transaction.get(transaction).copied().flatten()
    }

    /// `(transaction index, rule index)` pairs for every matched
    /// transaction, in input order.
    pub fn assigned(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.by_transaction
            .iter()
            .enumerate()
            .filter_map(|(tx, rule)| rule.map(|rule| (tx, rule)))
    }

    /// Indices of transactions no rule claimed.
    pub fn unassigned(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_transaction
            .iter()
            .enumerate()
            .filter_map(|(tx, rule)| rule.is_none().then_some(tx))
    }
}

/// First-match-wins assignment of transactions to rules. The pass is pure:
/// it reads an immutable rule-list snapshot and transaction slice, keeps no
/// state between invocations, and only the optional cancel token and
/// progress sink touch the outside world.
pub struct AssignmentEngine<'a> {
    rules: &'a RuleSet,
    cancel: Option<CancelToken>,
    progress: Option<ProgressThrottle<'a>>,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        AssignmentEngine {
            rules,
            cancel: None,
            progress: None,
        }
    }

    /// Checks the token between transactions and aborts with
    /// [`AssignError::Cancelled`] once it trips.
    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Reports throttled percent-complete updates to the sink.
    pub fn with_progress(mut self, sink: impl FnMut(u8) + 'a) -> Self {
        self.progress = Some(ProgressThrottle::new(sink));
        self
    }

    pub fn assign(mut self, transactions: &[Transaction]) -> Result<Assignments, AssignError> {
        if let Some(progress) = &mut self.progress {
            progress.reset();
        }
        let portion = if transactions.is_empty() {
            0.0
        } else {
            100.0 / transactions.len() as f32
        };

        let mut by_transaction = Vec::with_capacity(transactions.len());
        for (index, transaction) in transactions.iter().enumerate() {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    debug!(transaction = index, "assignment cancelled");
                    return Err(AssignError::Cancelled);
                }
            }

            let matched = self.rules.iter().position(|rule| rule.matches(transaction));
            match matched {
                Some(rule) => debug!(transaction = index, rule, "transaction assigned"),
                None => debug!(transaction = index, "transaction unassigned"),
            }
            by_transaction.push(matched);

            if let Some(progress) = &mut self.progress {
                progress.add(portion);
            }
        }

        if let Some(progress) = &mut self.progress {
            progress.complete();
        }
        Ok(Assignments { by_transaction })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("actual figures unavailable: {0}")]
pub struct ActualsError(pub String);

/// Supplies per-estimate actual figures to the balance calculator. `None`
/// means no activity was recorded against the estimate, which is a valid
/// zero; `Err` means the source itself failed and the whole calculation
/// must be abandoned.
pub trait ActualFigureSource {
    fn actual_for(&self, estimate: EstimateId) -> Result<Option<Money>, ActualsError>;
}

/// Per-estimate sums of assigned transaction amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct ActualFigures {
    currency: Currency,
    figures: HashMap<EstimateId, Money>,
}

impl ActualFigures {
    pub fn new(currency: Currency) -> Self {
        ActualFigures {
            currency,
            figures: HashMap::new(),
        }
    }

    pub fn record(
        &mut self,
        estimate: EstimateId,
        amount: Money,
    ) -> Result<(), IncompatibleCurrency> {
        let entry = self
            .figures
            .entry(estimate)
            .or_insert_with(|| Money::zero(self.currency));
        *entry = entry.add(amount)?;
        Ok(())
    }

    pub fn get(&self, estimate: EstimateId) -> Option<Money> {
        self.figures.get(&estimate).copied()
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    /// Transitive total for an estimate: its own figure plus those of all
    /// of its descendants. This is the actual figure of a category node.
    pub fn total_for(
        &self,
        tree: &EstimateTree,
        estimate: EstimateId,
    ) -> Result<Money, IncompatibleCurrency> {
        let mut total = Money::zero(self.currency);
        for id in tree.subtree(estimate) {
            if let Some(amount) = self.get(id) {
                total = total.add(amount)?;
            }
        }
        Ok(total)
    }
}

impl ActualFigureSource for ActualFigures {
    fn actual_for(&self, estimate: EstimateId) -> Result<Option<Money>, ActualsError> {
        Ok(self.get(estimate))
    }
}

/// Second pass over an assignment result: pools the amounts of all matched
/// transactions by target estimate. Multiple rules targeting the same
/// estimate sum together.
pub fn aggregate_actuals(
    rules: &RuleSet,
    transactions: &[Transaction],
    assignments: &Assignments,
    currency: Currency,
) -> Result<ActualFigures, IncompatibleCurrency> {
    let mut actuals = ActualFigures::new(currency);
    for (tx_index, rule_index) in assignments.assigned() {
        if let (Some(transaction), Some(rule)) =
            (transactions.get(tx_index), rules.get(rule_index))
        {
            actuals.record(rule.estimate, transaction.amount)?;
        }
    }
    Ok(actuals)
}
