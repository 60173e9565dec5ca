use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// An imported bank transaction: a positive amount moved from the
/// withdrawal account to the deposit account. Read-only once imported;
/// the analysis engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub posted_on: NaiveDate,
    pub payee: String,
    pub memo: String,
    pub withdrawal_account: String,
    pub deposit_account: String,
    pub amount: Money,
}

impl Transaction {
    pub fn new(
        posted_on: NaiveDate,
        payee: &str,
        withdrawal_account: &str,
        deposit_account: &str,
        amount: Money,
    ) -> Self {
        Transaction {
            posted_on,
            payee: payee.to_string(),
            memo: String::new(),
            withdrawal_account: withdrawal_account.to_string(),
            deposit_account: deposit_account.to_string(),
            amount,
        }
    }
}
