use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

use saldo_core::money::{Currency, Money};
use saldo_core::transaction::Transaction;

/// Maps CSV columns onto transaction fields. Banks disagree on everything,
/// so every column is optional and per-profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvColumnMapping {
    pub date_column: Option<usize>,
    pub payee_column: Option<usize>,
    pub memo_column: Option<usize>,
    pub amount_column: Option<usize>,
    pub withdrawal_column: Option<usize>,
    pub deposit_column: Option<usize>,
    /// Column holding a "debit"/"credit" marker; a credit row swaps the
    /// withdrawal and deposit accounts.
    pub type_column: Option<usize>,
    pub date_format: String,
}

impl Default for CsvColumnMapping {
    fn default() -> Self {
        Self {
            date_column: None,
            payee_column: None,
            memo_column: None,
            amount_column: None,
            withdrawal_column: None,
            deposit_column: None,
            type_column: None,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvImportProfile {
    pub name: String,
    pub mapping: CsvColumnMapping,
    pub has_header: bool,
    pub delimiter: String,
    pub currency: Currency,
}

impl Default for CsvImportProfile {
    fn default() -> Self {
        Self {
            name: "Unnamed Profile".to_string(),
            mapping: CsvColumnMapping::default(),
            has_header: true,
            delimiter: ",".to_string(),
            currency: Currency::usd(),
        }
    }
}

impl CsvImportProfile {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid date: {0:?}")]
    InvalidDate(String),
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
    #[error("no data rows")]
    NoDataRows,
}

/// Reads transactions from CSV data using the given profile. Rows without
/// a mapped, parseable date column are skipped; unparseable amounts or
/// dates in mapped columns are errors; an import producing no transactions
/// at all is an error.
pub fn import_csv<R: Read>(
    data: R,
    profile: &CsvImportProfile,
) -> Result<Vec<Transaction>, CsvError> {
    let delimiter = profile.delimiter.as_bytes().first().copied().unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(profile.has_header)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    let mut transactions = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.is_empty() {
            continue;
        }
        if let Some(transaction) = read_record(&record, profile)? {
            transactions.push(transaction);
        }
    }

    if transactions.is_empty() {
        return Err(CsvError::NoDataRows);
    }
    Ok(transactions)
}

fn read_record(
    record: &csv::StringRecord,
    profile: &CsvImportProfile,
) -> Result<Option<Transaction>, CsvError> {
    let mapping = &profile.mapping;
    let field = |column: Option<usize>| {
        column
            .and_then(|index| record.get(index))
            .map(str::trim)
            .unwrap_or_default()
    };

    let date_text = field(mapping.date_column);
    if date_text.is_empty() {
        return Ok(None);
    }
    let posted_on = parse_date(date_text, &mapping.date_format)?;

    let payee = field(mapping.payee_column).to_string();
    let memo = field(mapping.memo_column).to_string();
    let mut withdrawal = field(mapping.withdrawal_column).to_string();
    let mut deposit = field(mapping.deposit_column).to_string();

    let mut amount = match field(mapping.amount_column) {
        "" => Decimal::ZERO,
        text => parse_amount(text)?,
    };

    // A negative amount means money flowed the other way.
    if amount.is_sign_negative() {
        amount = -amount;
        std::mem::swap(&mut withdrawal, &mut deposit);
    }
    // So does an explicit credit marker.
    if field(mapping.type_column).eq_ignore_ascii_case("credit") {
        std::mem::swap(&mut withdrawal, &mut deposit);
    }

    Ok(Some(Transaction {
        posted_on,
        payee,
        memo,
        withdrawal_account: withdrawal,
        deposit_account: deposit,
        amount: Money::new(amount, profile.currency),
    }))
}

/// First-row peek so a mapping UI can offer column choices.
pub fn detect_columns<R: Read>(data: R, delimiter: u8) -> Result<Vec<String>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_reader(data);

    match reader.records().next() {
        Some(result) => Ok(result?.iter().map(|s| s.to_string()).collect()),
        None => Ok(Vec::new()),
    }
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, CsvError> {
    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fallback in &[
        "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%Y-%m-%d",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fallback) {
            return Ok(date);
        }
    }

    Err(CsvError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> Result<Decimal, CsvError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned = s.replace([',', '$', ' '], "");
    let amount =
        Decimal::from_str(&cleaned).map_err(|_| CsvError::InvalidAmount(s.to_string()))?;
    Ok(if negative { -amount } else { amount })
}
