use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Currency-tagged, non-negative amount.
///
/// Arithmetic is only defined between amounts of the same currency; every
/// result is re-validated, so subtracting past zero is rejected rather than
/// producing a negative balance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyParts")]
pub struct Money {
    amount: Decimal,
    currency: String,
}

#[derive(Deserialize)]
struct MoneyParts {
    amount: Decimal,
    currency: String,
}

impl TryFrom<MoneyParts> for Money {
    type Error = DomainError;

    fn try_from(parts: MoneyParts) -> Result<Self, Self::Error> {
        Money::new(parts.amount, &parts.currency)
    }
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(
                "amount",
                format!("must not be negative (got {amount})"),
            ));
        }

        let currency = normalize_currency(currency)?;
        let amount = if amount.is_zero() { Decimal::ZERO } else { amount };
        Ok(Self { amount, currency })
    }

    pub fn zero(currency: &str) -> Result<Self, DomainError> {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(other, "add")?;
        let sum = self.amount.checked_add(other.amount).ok_or_else(|| {
            DomainError::InvalidOperation(format!("adding {other} to {self} overflows"))
        })?;
        Money::new(sum, &self.currency)
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(other, "subtract")?;
        Money::new(self.amount - other.amount, &self.currency)
    }

    fn ensure_same_currency(&self, other: &Money, verb: &str) -> Result<(), DomainError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(DomainError::InvalidOperation(format!(
                "cannot {verb} {} and {} amounts",
                self.currency, other.currency
            )))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// Trims and upper-cases a currency code, rejecting blank input.
pub fn normalize_currency(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("currency", "must not be empty"));
    }
    Ok(trimmed.to_ascii_uppercase())
}
