use crate::enums::{AccountCategory, AccountClass, TaxBucket};
use crate::error::ValidationError;
use crate::structs::{
    AccountFields, NewAccount, NewAccountValue, EARLIEST_OBSERVATION_YEAR,
    LATEST_OBSERVATION_YEAR,
};
use chrono::Datelike;

impl NewAccount {
    /// Parses the payload into its typed field set.
    ///
    /// Checks run in order: name, class, category, then the tax bucket when
    /// the category demands one. Outside of retirement accounts an
    /// unrecognised tax bucket is dropped rather than rejected.
    pub fn parse(&self) -> Result<AccountFields, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }

        let class: AccountClass = required(&self.class, "class")?.parse()?;
        let category: AccountCategory = required(&self.category, "category")?.parse()?;

        let tax_bucket = if category.requires_tax_bucket() {
            if self.tax_bucket.trim().is_empty() {
                return Err(ValidationError::InvalidEnum {
                    field: "tax bucket",
                    value: self.tax_bucket.clone(),
                });
            }
            Some(self.tax_bucket.trim().parse::<TaxBucket>()?)
        } else {
            self.tax_bucket.trim().parse::<TaxBucket>().ok()
        };

        Ok(AccountFields {
            name: name.to_string(),
            class,
            category,
            tax_bucket,
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Checks that an account payload could be persisted. Runs identically for
/// creates and for the merged field set of an update.
pub fn validate_account(account: &NewAccount) -> Result<(), ValidationError> {
    account.parse().map(|_| ())
}

/// Checks an account value payload. Does not verify that the account exists;
/// that needs a datastore round trip and belongs to the creation path.
pub fn validate_account_value(value: &NewAccountValue) -> Result<(), ValidationError> {
    if value.account_name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if value.value.is_zero() {
        return Err(ValidationError::InvalidValue(
            "account value must be non-zero".to_string(),
        ));
    }
    if let Some(created_at) = value.created_at {
        let year = created_at.year();
        if !(EARLIEST_OBSERVATION_YEAR..=LATEST_OBSERVATION_YEAR).contains(&year) {
            return Err(ValidationError::InvalidValue(format!(
                "observation time {created_at} must fall between the years \
                 {EARLIEST_OBSERVATION_YEAR} and {LATEST_OBSERVATION_YEAR}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn payload(name: &str, class: &str, category: &str, tax_bucket: &str) -> NewAccount {
        NewAccount {
            name: name.to_string(),
            class: class.to_string(),
            category: category.to_string(),
            tax_bucket: tax_bucket.to_string(),
        }
    }

    #[test]
    fn accepts_valid_accounts() {
        let cases = [
            payload("Checking", "asset", "cash", ""),
            payload("My IRA", "asset", "retirement", "roth"),
            payload("My 401k", "asset", "retirement", "tax-deferred"),
            payload("House", "asset", "real-estate", ""),
            payload("Mortgage", "liability", "loan", ""),
            payload("Visa", "liability", "credit-card", ""),
            payload("HSA", "asset", "hsa", "taxable"),
        ];
        for case in cases {
            assert_eq!(validate_account(&case), Ok(()), "{case:?}");
        }
    }

    #[test]
    fn rejects_invalid_accounts() {
        let cases = [
            (payload("", "asset", "cash", ""), ValidationError::MissingField("name")),
            (payload("   ", "asset", "cash", ""), ValidationError::MissingField("name")),
            (payload("x", "", "cash", ""), ValidationError::MissingField("class")),
            (payload("x", "asset", "", ""), ValidationError::MissingField("category")),
            (
                payload("x", "equity", "cash", ""),
                ValidationError::InvalidEnum {
                    field: "class",
                    value: "equity".to_string(),
                },
            ),
            (
                payload("x", "asset", "savings", ""),
                ValidationError::InvalidEnum {
                    field: "category",
                    value: "savings".to_string(),
                },
            ),
            (
                payload("x", "asset", "retirement", ""),
                ValidationError::InvalidEnum {
                    field: "tax bucket",
                    value: String::new(),
                },
            ),
            (
                payload("x", "asset", "retirement", "pension"),
                ValidationError::InvalidEnum {
                    field: "tax bucket",
                    value: "pension".to_string(),
                },
            ),
        ];
        for (case, expected) in cases {
            assert_eq!(validate_account(&case), Err(expected), "{case:?}");
        }
    }

    #[test]
    fn parse_keeps_recognised_tax_bucket_outside_retirement() {
        let fields = payload(" Brokerage ", "asset", "cash", "taxable").parse().unwrap();
        assert_eq!(fields.name, "Brokerage");
        assert_eq!(fields.tax_bucket, Some(TaxBucket::Taxable));

        let fields = payload("Checking", "asset", "cash", "bogus").parse().unwrap();
        assert_eq!(fields.tax_bucket, None);
    }

    #[test]
    fn validates_account_values() {
        assert_eq!(
            validate_account_value(&NewAccountValue::new("Checking", dec!(1.01))),
            Ok(())
        );
        assert_eq!(
            validate_account_value(&NewAccountValue::new("Credit Card", dec!(-20))),
            Ok(())
        );
        assert_eq!(
            validate_account_value(&NewAccountValue::new("", dec!(1))),
            Err(ValidationError::MissingField("name"))
        );
        assert!(matches!(
            validate_account_value(&NewAccountValue::new("Checking", dec!(0.00))),
            Err(ValidationError::InvalidValue(_))
        ));
    }

    #[test]
    fn rejects_observations_outside_the_dated_window() {
        let at = |y: i32| Utc.with_ymd_and_hms(y, 6, 1, 0, 0, 0).unwrap();
        let value = |y: i32| NewAccountValue::new("Checking", dec!(10)).observed_at(at(y));

        for year in [EARLIEST_OBSERVATION_YEAR, 2024, LATEST_OBSERVATION_YEAR] {
            assert_eq!(validate_account_value(&value(year)), Ok(()), "{year}");
        }
        for year in [1600, EARLIEST_OBSERVATION_YEAR - 1, LATEST_OBSERVATION_YEAR + 1, 3000] {
            assert!(
                matches!(
                    validate_account_value(&value(year)),
                    Err(ValidationError::InvalidValue(_))
                ),
                "{year}"
            );
        }
    }

    #[test]
    fn sub_cent_values_are_zero_after_normalizing() {
        let value = NewAccountValue::new("Checking", dec!(0.004)).normalized();
        assert!(validate_account_value(&value).is_err());
    }
}
