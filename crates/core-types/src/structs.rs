use crate::enums::{AccountCategory, AccountClass, TaxBucket};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Monetary amounts are recorded with cent precision.
pub const VALUE_SCALE: u32 = 2;

/// First and last calendar year an observation may be dated in.
pub const EARLIEST_OBSERVATION_YEAR: i32 = 1800;
pub const LATEST_OBSERVATION_YEAR: i32 = 2199;

/// A named financial holding or obligation together with its value history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub class: AccountClass,
    pub category: AccountCategory,
    pub tax_bucket: Option<TaxBucket>,
    /// Most recent observation first.
    #[serde(default)]
    pub values: Vec<AccountValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// The account's current value is its most recent observation.
    pub fn current_value(&self) -> Option<&AccountValue> {
        self.values.first()
    }

    /// Restores the newest-first ordering of `values`, newer ids winning ties.
    pub fn sort_values(&mut self) {
        self.values
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn fields(&self) -> AccountFields {
        AccountFields {
            name: self.name.clone(),
            class: self.class,
            category: self.category,
            tax_bucket: self.tax_bucket,
        }
    }
}

/// A single timestamped observation of an account's balance. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValue {
    pub id: i64,
    pub account_name: String,
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The validated, strongly typed field set of an account, as written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFields {
    pub name: String,
    pub class: AccountClass,
    pub category: AccountCategory,
    pub tax_bucket: Option<TaxBucket>,
}

/// Untrusted account payload.
///
/// Every field is a plain string so that missing or unrecognised values are
/// reported by [`NewAccount::parse`] rather than by the JSON decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAccount {
    pub name: String,
    pub class: String,
    pub category: String,
    pub tax_bucket: String,
}

impl NewAccount {
    /// Fills every empty field from `existing`, producing the field set an
    /// update would leave behind.
    pub fn merged_onto(&self, existing: &Account) -> NewAccount {
        fn pick(update: &str, current: &str) -> String {
            if update.trim().is_empty() {
                current.to_string()
            } else {
                update.to_string()
            }
        }

        NewAccount {
            name: pick(&self.name, &existing.name),
            class: pick(&self.class, existing.class.as_str()),
            category: pick(&self.category, existing.category.as_str()),
            tax_bucket: pick(
                &self.tax_bucket,
                existing.tax_bucket.map(|b| b.as_str()).unwrap_or_default(),
            ),
        }
    }
}

impl From<&AccountFields> for NewAccount {
    fn from(fields: &AccountFields) -> Self {
        NewAccount {
            name: fields.name.clone(),
            class: fields.class.to_string(),
            category: fields.category.to_string(),
            tax_bucket: fields.tax_bucket.map(|b| b.to_string()).unwrap_or_default(),
        }
    }
}

/// Untrusted account value payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccountValue {
    #[serde(default)]
    pub account_name: String,
    pub value: Decimal,
    /// Observation time; the store stamps the insert time when absent.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewAccountValue {
    pub fn new(account_name: impl Into<String>, value: Decimal) -> Self {
        Self {
            account_name: account_name.into(),
            value,
            created_at: None,
        }
    }

    pub fn observed_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Rounds the amount to cents, halves away from zero.
    pub fn normalized(mut self) -> Self {
        self.value = self
            .value
            .round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        self
    }
}

/// One point of the net worth time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    pub date: DateTime<Utc>,
    pub value: Decimal,
}
