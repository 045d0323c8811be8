use std::fmt;

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

/// 金額
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Money {
    amount: u64,
    currency: Currency,
}

impl Money {
    pub fn new(amount: u64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// 泊数分などの乗算。金額があふれる場合は `None` を返す。
    pub fn times(&self, n: u64) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_mul(n)?,
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.currency.symbol(),
            self.amount.to_formatted_string(&Locale::en)
        )
    }
}

/// 通貨
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    JPY,
    USD,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::JPY => "¥",
            Currency::USD => "$",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::JPY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        let price = Money::new(1000000, Currency::JPY);
        assert_eq!(format!("{}", price), "¥1,000,000");
    }

    #[test]
    fn test_money_times() {
        let nightly = Money::new(12000, Currency::JPY);
        assert_eq!(nightly.times(3), Some(Money::new(36000, Currency::JPY)));
    }

    #[test]
    fn test_money_times_overflow() {
        let nightly = Money::new(u64::MAX / 2, Currency::JPY);
        assert_eq!(nightly.times(3), None);
    }
}
