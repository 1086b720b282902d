pub mod enums;
pub mod error;
pub mod structs;
pub mod validation;

// Re-export the core types to provide a clean public API.
pub use enums::{AccountCategory, AccountClass, TaxBucket};
pub use error::ValidationError;
pub use structs::{
    Account, AccountFields, AccountValue, NetWorthPoint, NewAccount, NewAccountValue,
    EARLIEST_OBSERVATION_YEAR, LATEST_OBSERVATION_YEAR, VALUE_SCALE,
};
pub use validation::{validate_account, validate_account_value};
