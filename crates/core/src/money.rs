use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;
use thiserror::Error;

/// Three-letter currency code, ISO 4217 style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    pub fn new(code: &str) -> Result<Self, InvalidCurrencyCode> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(InvalidCurrencyCode(code.to_string()));
        }
        let mut buf = [0u8; 3];
        for (i, b) in bytes.iter().enumerate() {
            buf[i] = b.to_ascii_uppercase();
        }
        Ok(Currency(buf))
    }

    pub fn usd() -> Self {
        Currency(*b"USD")
    }

    pub fn as_str(&self) -> &str {
        // Always ASCII, enforced at construction.
        std::str::from_utf8(&self.0).expect("currency code is ASCII")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Currency::new(&code).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid currency code: {0:?}")]
pub struct InvalidCurrencyCode(pub String);

/// Raised whenever arithmetic or comparison is attempted between two
/// money values of different currencies. Never silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("incompatible currencies: {left} and {right}")]
pub struct IncompatibleCurrency {
    pub left: Currency,
    pub right: Currency,
}

/// An immutable amount of money in a specific currency. Every operation
/// returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Money {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Builds a money value from minor units (cents for most currencies).
    pub fn from_minor(minor: i64, currency: Currency) -> Self {
        Money {
            amount: Decimal::from(minor) / Decimal::from(100),
            currency,
        }
    }

    pub fn parse(s: &str, currency: Currency) -> Result<Self, InvalidAmount> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| InvalidAmount(s.to_string()))?;
        Ok(Money { amount, currency })
    }

    pub fn amount(self) -> Decimal {
        self.amount
    }

    pub fn currency(self) -> Currency {
        self.currency
    }

    pub fn is_zero(self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn abs(self) -> Self {
        Money {
            amount: self.amount.abs(),
            currency: self.currency,
        }
    }

    pub fn add(self, rhs: Money) -> Result<Money, IncompatibleCurrency> {
        self.require_same_currency(rhs)?;
        Ok(Money {
            amount: self.amount + rhs.amount,
            currency: self.currency,
        })
    }

    pub fn sub(self, rhs: Money) -> Result<Money, IncompatibleCurrency> {
        self.require_same_currency(rhs)?;
        Ok(Money {
            amount: self.amount - rhs.amount,
            currency: self.currency,
        })
    }

    pub fn compare(self, rhs: Money) -> Result<Ordering, IncompatibleCurrency> {
        self.require_same_currency(rhs)?;
        Ok(self.amount.cmp(&rhs.amount))
    }

    /// True when this value lies strictly within the given tolerance
    /// (a fraction, e.g. `0.05` for 5%) of the reference value.
    pub fn within_percent(
        self,
        tolerance: Decimal,
        reference: Money,
    ) -> Result<bool, IncompatibleCurrency> {
        self.require_same_currency(reference)?;
        let max_difference = (reference.amount * tolerance).abs();
        let difference = (reference.amount - self.amount).abs();
        Ok(difference < max_difference)
    }

    /// Folds an iterator of money values into a single sum, starting from
    /// zero in the given currency.
    pub fn sum<I>(currency: Currency, values: I) -> Result<Money, IncompatibleCurrency>
    where
        I: IntoIterator<Item = Money>,
    {
        let mut total = Money::zero(currency);
        for value in values {
            total = total.add(value)?;
        }
        Ok(total)
    }

    pub fn require_same_currency(self, other: Money) -> Result<(), IncompatibleCurrency> {
        if self.currency != other.currency {
            return Err(IncompatibleCurrency {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Money {
            amount: -self.amount,
            currency: self.currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency.as_str() {
            "USD" => write!(f, "${:.2}", self.amount),
            "EUR" => write!(f, "\u{20ac}{:.2}", self.amount),
            "GBP" => write!(f, "\u{a3}{:.2}", self.amount),
            code => write!(f, "{:.2} {}", self.amount, code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid money amount: {0:?}")]
pub struct InvalidAmount(pub String);
