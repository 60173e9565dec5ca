use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// The span of dates a budget covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetingPeriod {
    /// A single calendar month.
    Month { year: i32, month: u32 },
    /// A full calendar year.
    Year(i32),
    /// An arbitrary custom range.
    Custom(DateRange),
}

impl BudgetingPeriod {
    /// Builds a literal-month period; `month` must be 1-12.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(BudgetingPeriod::Month { year, month })
        } else {
            None
        }
    }

    pub fn start_date(self) -> NaiveDate {
        match self {
            BudgetingPeriod::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 1).unwrap()
            }
            BudgetingPeriod::Year(year) => NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            BudgetingPeriod::Custom(range) => range.start,
        }
    }

    pub fn end_date(self) -> NaiveDate {
        match self {
            BudgetingPeriod::Month { year, month } => {
                let first_of_next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                };
                first_of_next.unwrap().pred_opt().unwrap()
            }
            BudgetingPeriod::Year(year) => NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
            BudgetingPeriod::Custom(range) => range.end,
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// True when the whole period lies before the given date, i.e. the
    /// budget occurred entirely in the past.
    pub fn ends_before(self, date: NaiveDate) -> bool {
        self.end_date() < date
    }
}

impl fmt::Display for BudgetingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetingPeriod::Month { year, month } => write!(f, "{year}-{month:02}"),
            BudgetingPeriod::Year(year) => write!(f, "{year}"),
            BudgetingPeriod::Custom(range) => write!(f, "{range}"),
        }
    }
}
