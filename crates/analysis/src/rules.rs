use serde::{Deserialize, Serialize};
use thiserror::Error;

use saldo_core::estimate::{EstimateId, EstimateTree};
use saldo_core::transaction::Transaction;

/// Transaction field a condition tests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionField {
    /// Any of the four text fields.
    Any,
    Payee,
    Memo,
    WithdrawalAccount,
    DepositAccount,
}

/// How the condition text is compared against the field text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    /// Case-sensitive prefix test.
    BeginsWith,
    /// Case-insensitive full match.
    Equals,
    /// Case-sensitive full match.
    EqualsCase,
    /// Case-sensitive substring test.
    Contains,
    /// Case-sensitive suffix test.
    EndsWith,
    /// Never matches; the "no rule" sentinel.
    None,
}

fn compare(lhs: &str, operator: ComparisonOperator, rhs: &str) -> bool {
    match operator {
        ComparisonOperator::BeginsWith => lhs.starts_with(rhs),
        ComparisonOperator::Equals => lhs.eq_ignore_ascii_case(rhs),
        ComparisonOperator::EqualsCase => lhs == rhs,
        ComparisonOperator::Contains => lhs.contains(rhs),
        ComparisonOperator::EndsWith => lhs.ends_with(rhs),
        ComparisonOperator::None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: TransactionField,
    pub operator: ComparisonOperator,
    pub value: String,
}

impl Condition {
    pub fn new(field: TransactionField, operator: ComparisonOperator, value: &str) -> Self {
        Condition {
            field,
            operator,
            value: value.to_string(),
        }
    }

    /// Whether the transaction satisfies this condition. An empty field
    /// never matches; it is not an error.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        match self.field {
            TransactionField::Any => [
                transaction.payee.as_str(),
                transaction.memo.as_str(),
                transaction.withdrawal_account.as_str(),
                transaction.deposit_account.as_str(),
            ]
            .iter()
            .any(|text| self.compare_text(text)),
            TransactionField::Payee => self.compare_text(&transaction.payee),
            TransactionField::Memo => self.compare_text(&transaction.memo),
            TransactionField::WithdrawalAccount => {
                self.compare_text(&transaction.withdrawal_account)
            }
            TransactionField::DepositAccount => self.compare_text(&transaction.deposit_account),
        }
    }

    fn compare_text(&self, text: &str) -> bool {
        !text.is_empty() && compare(text, self.operator, &self.value)
    }
}

/// Ordered condition set mapping matching transactions to one estimate.
/// All conditions must match; a rule with none never matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub conditions: Vec<Condition>,
    pub estimate: EstimateId,
}

impl Rule {
    /// A rule with no conditions, which matches nothing until conditions
    /// are added.
    pub fn new(estimate: EstimateId) -> Self {
        Rule {
            conditions: Vec::new(),
            estimate,
        }
    }

    pub fn with_conditions(estimate: EstimateId, conditions: Vec<Condition>) -> Self {
        Rule {
            conditions,
            estimate,
        }
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        !self.conditions.is_empty()
            && self
                .conditions
                .iter()
                .all(|condition| condition.matches(transaction))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleSetError {
    #[error("rule {index} targets unknown estimate {estimate}")]
    UnknownTargetEstimate { index: usize, estimate: EstimateId },
}

/// Ordered, mutable list of assignment rules. List order is assignment
/// precedence: the first rule that fully matches a transaction wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet::default()
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Inserts at the given position, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, rule: Rule) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    pub fn remove(&mut self, index: usize) -> Option<Rule> {
        if index < self.rules.len() {
            Some(self.rules.remove(index))
        } else {
            None
        }
    }

    /// Moves the rule at `from` so it ends up at position `to`. Returns
    /// false when either index is out of bounds.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.rules.len() || to >= self.rules.len() {
            return false;
        }
        let rule = self.rules.remove(from);
        self.rules.insert(to, rule);
        true
    }

    /// Drops every rule whose target is among the given estimates. Used
    /// after estimates are deleted from the tree. Returns how many rules
    /// were dropped.
    pub fn purge_estimates(&mut self, estimates: &[EstimateId]) -> usize {
        let before = self.rules.len();
        self.rules.retain(|rule| !estimates.contains(&rule.estimate));
        before - self.rules.len()
    }

    /// Checks every rule target against the tree. Stale targets are a
    /// configuration error reported here, at edit time, never during a
    /// matching pass.
    pub fn validate(&self, tree: &EstimateTree) -> Result<(), RuleSetError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if !tree.contains(rule.estimate) {
                return Err(RuleSetError::UnknownTargetEstimate {
                    index,
                    estimate: rule.estimate,
                });
            }
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Catch-all rules for activity no user rule claims, meant to be appended
/// after every user-defined rule. Account names follow the usual
/// colon-separated export convention ("Expenses:Groceries", "Income:Salary",
/// "Assets:Checking").
pub fn unbudgeted_fallback_rules(
    income_target: EstimateId,
    expense_target: EstimateId,
) -> Vec<Rule> {
    vec![
        // Money leaving for any expense account.
        Rule::with_conditions(
            expense_target,
            vec![Condition::new(
                TransactionField::DepositAccount,
                ComparisonOperator::BeginsWith,
                "Expenses",
            )],
        ),
        // Earned income landing anywhere.
        Rule::with_conditions(
            income_target,
            vec![Condition::new(
                TransactionField::WithdrawalAccount,
                ComparisonOperator::BeginsWith,
                "Income",
            )],
        ),
        // Liability-funded inflows into tracked assets.
        Rule::with_conditions(
            income_target,
            vec![
                Condition::new(
                    TransactionField::WithdrawalAccount,
                    ComparisonOperator::BeginsWith,
                    "Liabilities",
                ),
                Condition::new(
                    TransactionField::DepositAccount,
                    ComparisonOperator::BeginsWith,
                    "Assets",
                ),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use saldo_core::money::{Currency, Money};

    fn tx(payee: &str, memo: &str, withdrawal: &str, deposit: &str) -> Transaction {
        Transaction {
            posted_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            payee: payee.to_string(),
            memo: memo.to_string(),
            withdrawal_account: withdrawal.to_string(),
            deposit_account: deposit.to_string(),
            amount: Money::from_minor(1000, Currency::usd()),
        }
    }

    fn payee_tx(payee: &str) -> Transaction {
        tx(payee, "", "Assets:Checking", "Expenses:Misc")
    }

    #[test]
    fn contains_is_case_sensitive() {
        assert!(!compare("Costco Wholesale", ComparisonOperator::Contains, "costco"));
        assert!(compare("Costco Wholesale", ComparisonOperator::Contains, "Costco"));
    }

    #[test]
    fn equals_is_case_insensitive() {
        assert!(compare("Costco", ComparisonOperator::Equals, "costco"));
        assert!(!compare("Costco Wholesale", ComparisonOperator::Equals, "costco"));
    }

    #[test]
    fn equals_case_is_case_sensitive() {
        assert!(!compare("Costco", ComparisonOperator::EqualsCase, "costco"));
        assert!(compare("Costco", ComparisonOperator::EqualsCase, "Costco"));
    }

    #[test]
    fn begins_and_ends_with() {
        assert!(compare("Costco Wholesale", ComparisonOperator::BeginsWith, "Costco"));
        assert!(!compare("Costco Wholesale", ComparisonOperator::BeginsWith, "Wholesale"));
        assert!(compare("Costco Wholesale", ComparisonOperator::EndsWith, "Wholesale"));
        assert!(!compare("Costco Wholesale", ComparisonOperator::EndsWith, "Costco"));
    }

    #[test]
    fn none_operator_never_matches() {
        assert!(!compare("anything", ComparisonOperator::None, "anything"));
        assert!(!compare("", ComparisonOperator::None, ""));
    }

    #[test]
    fn empty_field_never_matches() {
        let condition = Condition::new(
            TransactionField::Memo,
            ComparisonOperator::BeginsWith,
            "",
        );
        // Prefix-of-empty-string would be trivially true; an absent field
        // still must not match.
        assert!(!condition.matches(&payee_tx("Costco")));
    }

    #[test]
    fn any_field_matches_across_fields() {
        let condition = Condition::new(
            TransactionField::Any,
            ComparisonOperator::Contains,
            "Groceries",
        );
        assert!(condition.matches(&tx("Costco", "", "Assets:Checking", "Expenses:Groceries")));
        assert!(condition.matches(&tx("Costco", "Groceries run", "Assets:Checking", "")));
        assert!(!condition.matches(&tx("Costco", "", "Assets:Checking", "Expenses:Misc")));
    }

    #[test]
    fn rule_requires_every_condition() {
        let rule = Rule::with_conditions(
            EstimateId(1),
            vec![
                Condition::new(TransactionField::Payee, ComparisonOperator::BeginsWith, "Costco"),
                Condition::new(
                    TransactionField::DepositAccount,
                    ComparisonOperator::Equals,
                    "expenses:groceries",
                ),
            ],
        );
        assert!(rule.matches(&tx("Costco", "", "Assets:Checking", "Expenses:Groceries")));
        assert!(!rule.matches(&tx("Costco", "", "Assets:Checking", "Expenses:Gas")));
        assert!(!rule.matches(&tx("Target", "", "Assets:Checking", "Expenses:Groceries")));
    }

    #[test]
    fn rule_with_no_conditions_never_matches() {
        let rule = Rule::new(EstimateId(1));
        assert!(!rule.matches(&payee_tx("Costco")));
        assert!(!rule.matches(&tx("", "", "", "")));
    }

    #[test]
    fn rule_set_insert_remove_reorder() {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(EstimateId(1)));
        rules.push(Rule::new(EstimateId(2)));
        rules.insert(1, Rule::new(EstimateId(3)));
        assert_eq!(rules.get(1).unwrap().estimate, EstimateId(3));

        assert!(rules.reorder(2, 0));
        assert_eq!(rules.get(0).unwrap().estimate, EstimateId(2));
        assert!(!rules.reorder(0, 9));

        let removed = rules.remove(0).unwrap();
        assert_eq!(removed.estimate, EstimateId(2));
        assert_eq!(rules.len(), 2);
        assert!(rules.remove(9).is_none());
    }

    #[test]
    fn purge_drops_rules_for_deleted_estimates() {
        let mut rules = RuleSet::from_rules(vec![
            Rule::new(EstimateId(1)),
            Rule::new(EstimateId(2)),
            Rule::new(EstimateId(1)),
        ]);
        assert_eq!(rules.purge_estimates(&[EstimateId(1)]), 2);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get(0).unwrap().estimate, EstimateId(2));
    }

    #[test]
    fn validate_rejects_stale_targets() {
        use saldo_core::estimate::{EstimateDefinition, EstimateType};

        let mut tree = EstimateTree::new("Budget", Currency::usd());
        let salary = tree
            .add_child(
                tree.root(),
                EstimateDefinition::new(
                    "Salary",
                    EstimateType::Income,
                    Money::zero(Currency::usd()),
                ),
            )
            .unwrap();

        let mut rules = RuleSet::new();
        rules.push(Rule::new(salary));
        assert!(rules.validate(&tree).is_ok());

        rules.push(Rule::new(EstimateId(42)));
        assert_eq!(
            rules.validate(&tree),
            Err(RuleSetError::UnknownTargetEstimate {
                index: 1,
                estimate: EstimateId(42),
            })
        );
    }

    #[test]
    fn toml_round_trip() {
        let rules = RuleSet::from_rules(vec![Rule::with_conditions(
            EstimateId(7),
            vec![Condition::new(
                TransactionField::Payee,
                ComparisonOperator::BeginsWith,
                "Costco",
            )],
        )]);
        let toml = rules.to_toml().unwrap();
        let back = RuleSet::from_toml(&toml).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn fallback_rules_catch_unclaimed_activity() {
        let income = EstimateId(90);
        let expense = EstimateId(91);
        let fallbacks = RuleSet::from_rules(unbudgeted_fallback_rules(income, expense));

        let groceries = tx("Costco", "", "Assets:Checking", "Expenses:Groceries");
        let paycheck = tx("Employer", "", "Income:Salary", "Assets:Checking");
        let advance = tx("Bank", "", "Liabilities:Credit Card", "Assets:Checking");
        let transfer = tx("Me", "", "Assets:Checking", "Assets:Savings");

        let target_of = |t: &Transaction| {
            fallbacks
                .iter()
                .find(|rule| rule.matches(t))
                .map(|rule| rule.estimate)
        };
        assert_eq!(target_of(&groceries), Some(expense));
        assert_eq!(target_of(&paycheck), Some(income));
        assert_eq!(target_of(&advance), Some(income));
        assert_eq!(target_of(&transfer), None);
    }
}
