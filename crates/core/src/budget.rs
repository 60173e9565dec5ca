use serde::{Deserialize, Serialize};

use crate::estimate::EstimateTree;
use crate::money::Money;
use crate::period::BudgetingPeriod;

/// Everything a balance calculation needs except rules and transactions:
/// the period being budgeted, the opening balance, and the estimate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub name: String,
    pub period: BudgetingPeriod,
    pub initial_balance: Money,
    pub estimates: EstimateTree,
}

impl Budget {
    pub fn new(name: &str, period: BudgetingPeriod, initial_balance: Money) -> Self {
        Budget {
            name: name.to_string(),
            period,
            initial_balance,
            estimates: EstimateTree::new(name, initial_balance.currency()),
        }
    }
}
