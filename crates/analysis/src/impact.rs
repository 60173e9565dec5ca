use saldo_core::estimate::{EstimateDefinition, EstimateType};
use saldo_core::money::{IncompatibleCurrency, Money};

/// Signed contribution of one estimate to the ending balances, with the
/// rationale for the expected amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceImpact {
    pub estimated: Money,
    pub actual: Money,
    pub expected: Money,
    pub notice: &'static str,
}

impl BalanceImpact {
    fn none(zero: Money) -> Self {
        BalanceImpact {
            estimated: zero,
            actual: zero,
            expected: zero,
            notice: "",
        }
    }
}

/// Computes the balance impact of a single estimate given its aggregated
/// actual figure.
///
/// The dispatch is fixed per estimate type: income adds, expense
/// subtracts, transfers move money between tracked accounts without
/// changing net worth, and a category node contributes nothing itself
/// because its descendants already carry its value.
pub fn compute_impact(
    definition: &EstimateDefinition,
    is_category: bool,
    actual: Money,
) -> Result<BalanceImpact, IncompatibleCurrency> {
    let budgeted = definition.amount;
    budgeted.require_same_currency(actual)?;
    let zero = Money::zero(budgeted.currency());

    if is_category {
        return Ok(BalanceImpact::none(zero));
    }

    match definition.kind {
        EstimateType::Income => {
            // An unfinished income estimate is a commitment still counted
            // toward the plan at its estimated amount, even when actual
            // receipts already exceed it.
            let (expected, notice) = if definition.finished {
                (actual, "no more activity expected")
            } else {
                (budgeted, "estimated income still expected")
            };
            Ok(BalanceImpact {
                estimated: budgeted,
                actual,
                expected,
                notice,
            })
        }
        EstimateType::Expense => {
            // The expected amount is the worse of planned vs. observed:
            // strictly greater actual spending wins, otherwise the
            // estimate stands.
            let over_budget = actual.amount() > budgeted.amount();
            let (expected, notice) = if definition.finished {
                (-actual, "no more activity expected")
            } else if over_budget {
                (-actual, "actual exceeds estimated")
            } else {
                (-budgeted, "estimated exceeds or matches actual")
            };
            Ok(BalanceImpact {
                estimated: -budgeted,
                actual: -actual,
                expected,
                notice,
            })
        }
        EstimateType::Transfer | EstimateType::Category => Ok(BalanceImpact::none(zero)),
    }
}

/// Informational progress of an estimate against its actual activity.
/// Never feeds into balance math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateProgress {
    pub estimated: Money,
    pub actual: Money,
    pub healthy: bool,
    pub note: String,
}

/// Evaluates the health of an estimate: an income estimate is healthy once
/// it has earned at least its estimated amount, an expense (or transfer)
/// estimate while it has spent at most its estimated amount. Category
/// totals are their children's business and always report healthy.
pub fn evaluate_progress(
    definition: &EstimateDefinition,
    is_category: bool,
    actual: Money,
) -> Result<EstimateProgress, IncompatibleCurrency> {
    let estimated = definition.amount;
    estimated.require_same_currency(actual)?;

    let healthy = if is_category {
        true
    } else {
        match definition.kind {
            EstimateType::Income => actual.amount() >= estimated.amount(),
            EstimateType::Expense | EstimateType::Transfer => {
                actual.amount() <= estimated.amount()
            }
            EstimateType::Category => true,
        }
    };

    let note = match definition.due_date {
        Some(due) if actual.is_zero() && !is_category => format!("due by {due}"),
        _ => String::new(),
    };

    Ok(EstimateProgress {
        estimated,
        actual,
        healthy,
        note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use saldo_core::money::Currency;

    fn usd(minor: i64) -> Money {
        Money::from_minor(minor, Currency::usd())
    }

    fn income(minor: i64) -> EstimateDefinition {
        EstimateDefinition::new("Salary", EstimateType::Income, usd(minor))
    }

    fn expense(minor: i64) -> EstimateDefinition {
        EstimateDefinition::new("Groceries", EstimateType::Expense, usd(minor))
    }

    #[test]
    fn income_impact_is_positive() {
        let impact = compute_impact(&income(100_000), false, usd(90_000)).unwrap();
        assert_eq!(impact.estimated, usd(100_000));
        assert_eq!(impact.actual, usd(90_000));
        assert_eq!(impact.expected, usd(100_000));
    }

    #[test]
    fn income_expected_stays_estimated_even_when_exceeded() {
        let impact = compute_impact(&income(100_000), false, usd(100_260)).unwrap();
        assert_eq!(impact.expected, usd(100_000));
        assert_eq!(impact.notice, "estimated income still expected");
    }

    #[test]
    fn finished_income_expects_actual() {
        let mut definition = income(100_000);
        definition.finished = true;
        let impact = compute_impact(&definition, false, usd(90_000)).unwrap();
        assert_eq!(impact.expected, usd(90_000));
        assert_eq!(impact.notice, "no more activity expected");
    }

    #[test]
    fn expense_impact_is_negated() {
        let impact = compute_impact(&expense(8456), false, usd(8000)).unwrap();
        assert_eq!(impact.estimated, usd(-8456));
        assert_eq!(impact.actual, usd(-8000));
        assert_eq!(impact.expected, usd(-8456));
        assert_eq!(impact.notice, "estimated exceeds or matches actual");
    }

    #[test]
    fn over_budget_expense_expects_actual() {
        let impact = compute_impact(&expense(3000), false, usd(4500)).unwrap();
        assert_eq!(impact.expected, usd(-4500));
        assert_eq!(impact.notice, "actual exceeds estimated");
    }

    #[test]
    fn expense_tie_goes_to_estimated() {
        // Strict comparison: equal actual and estimated is not over-budget.
        let impact = compute_impact(&expense(3000), false, usd(3000)).unwrap();
        assert_eq!(impact.expected, usd(-3000));
        assert_eq!(impact.notice, "estimated exceeds or matches actual");
    }

    #[test]
    fn finished_expense_expects_actual() {
        let mut definition = expense(8456);
        definition.finished = true;
        let impact = compute_impact(&definition, false, usd(8000)).unwrap();
        assert_eq!(impact.expected, usd(-8000));
    }

    #[test]
    fn transfer_is_neutral() {
        let definition =
            EstimateDefinition::new("Card payment", EstimateType::Transfer, usd(50_000));
        let impact = compute_impact(&definition, false, usd(50_000)).unwrap();
        assert!(impact.estimated.is_zero());
        assert!(impact.actual.is_zero());
        assert!(impact.expected.is_zero());
    }

    #[test]
    fn category_node_has_no_impact() {
        let impact = compute_impact(&expense(99_999), true, usd(12_345)).unwrap();
        assert!(impact.estimated.is_zero());
        assert!(impact.actual.is_zero());
        assert!(impact.expected.is_zero());
        assert_eq!(impact.notice, "");
    }

    #[test]
    fn impact_rejects_mixed_currencies() {
        let actual = Money::from_minor(1000, Currency::new("EUR").unwrap());
        assert!(compute_impact(&expense(1000), false, actual).is_err());
    }

    #[test]
    fn expense_over_budget_is_unhealthy() {
        let progress = evaluate_progress(&expense(3000), false, usd(4500)).unwrap();
        assert!(!progress.healthy);
    }

    #[test]
    fn expense_under_budget_is_healthy() {
        let progress = evaluate_progress(&expense(3000), false, usd(2999)).unwrap();
        assert!(progress.healthy);
    }

    #[test]
    fn income_short_of_estimate_is_unhealthy() {
        let progress = evaluate_progress(&income(100_000), false, usd(90_000)).unwrap();
        assert!(!progress.healthy);
    }

    #[test]
    fn income_at_estimate_is_healthy() {
        let progress = evaluate_progress(&income(100_000), false, usd(100_000)).unwrap();
        assert!(progress.healthy);
    }

    #[test]
    fn untouched_estimate_notes_its_due_date() {
        let mut definition = expense(3000);
        definition.due_date = NaiveDate::from_ymd_opt(2024, 3, 10);
        let progress = evaluate_progress(&definition, false, usd(0)).unwrap();
        assert_eq!(progress.note, "due by 2024-03-10");

        let touched = evaluate_progress(&definition, false, usd(100)).unwrap();
        assert!(touched.note.is_empty());
    }

    #[test]
    fn category_is_always_healthy() {
        let progress = evaluate_progress(&expense(0), true, usd(99_999)).unwrap();
        assert!(progress.healthy);
    }
}
