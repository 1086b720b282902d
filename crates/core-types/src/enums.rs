use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an account adds to or subtracts from net worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountClass {
    Asset,
    Liability,
}

impl AccountClass {
    pub const ALL: [AccountClass; 2] = [AccountClass::Asset, AccountClass::Liability];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClass::Asset => "asset",
            AccountClass::Liability => "liability",
        }
    }

    /// Applies the class sign to an amount: assets count positively,
    /// liabilities negatively.
    pub fn sign(&self, amount: Decimal) -> Decimal {
        match self {
            AccountClass::Asset => amount,
            AccountClass::Liability => -amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountCategory {
    Cash,
    Retirement,
    Hsa,
    RealEstate,
    Loan,
    CreditCard,
}

impl AccountCategory {
    pub const ALL: [AccountCategory; 6] = [
        AccountCategory::Cash,
        AccountCategory::Retirement,
        AccountCategory::Hsa,
        AccountCategory::RealEstate,
        AccountCategory::Loan,
        AccountCategory::CreditCard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Cash => "cash",
            AccountCategory::Retirement => "retirement",
            AccountCategory::Hsa => "hsa",
            AccountCategory::RealEstate => "real-estate",
            AccountCategory::Loan => "loan",
            AccountCategory::CreditCard => "credit-card",
        }
    }

    /// Retirement accounts must declare how they are taxed.
    pub fn requires_tax_bucket(&self) -> bool {
        matches!(self, AccountCategory::Retirement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxBucket {
    TaxDeferred,
    Roth,
    Taxable,
}

impl TaxBucket {
    pub const ALL: [TaxBucket; 3] = [TaxBucket::TaxDeferred, TaxBucket::Roth, TaxBucket::Taxable];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxBucket::TaxDeferred => "tax-deferred",
            TaxBucket::Roth => "roth",
            TaxBucket::Taxable => "taxable",
        }
    }
}

// The wire strings double as the database representation, so parsing and
// display go through the same `as_str` tables.
macro_rules! string_enum {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|candidate| candidate.as_str() == s)
                    .ok_or_else(|| ValidationError::InvalidEnum {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

string_enum!(AccountClass, "class");
string_enum!(AccountCategory, "category");
string_enum!(TaxBucket, "tax bucket");
