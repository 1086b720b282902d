use crate::DbError;
use async_trait::async_trait;
use core_types::{Account, AccountClass, AccountFields, AccountValue, NewAccountValue};

/// The datastore capability the rest of the application depends on.
///
/// Every read excludes soft-deleted accounts, and every account comes back
/// with its full value history sorted newest first.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn load_all_accounts_with_values(&self) -> Result<Vec<Account>, DbError>;

    async fn load_accounts_by_class_with_values(
        &self,
        class: AccountClass,
    ) -> Result<Vec<Account>, DbError>;

    /// Fails with `AccountNotFound` if the account is missing or deleted.
    async fn load_account_with_values(&self, name: &str) -> Result<Account, DbError>;

    async fn load_account_values(&self, name: &str) -> Result<Vec<AccountValue>, DbError>;

    async fn latest_account_value(&self, name: &str) -> Result<Option<AccountValue>, DbError>;

    async fn account_exists(&self, name: &str) -> Result<bool, DbError>;

    /// Inserts a new account. Fails with `Conflict` if the name belongs to any
    /// account, deleted or not.
    async fn create_account(&self, account: &AccountFields) -> Result<Account, DbError>;

    /// Overwrites every field except the name and the value history.
    async fn update_account(&self, name: &str, account: &AccountFields)
        -> Result<Account, DbError>;

    /// Soft delete. Returns the account as it was removed.
    async fn delete_account(&self, name: &str) -> Result<Account, DbError>;

    /// Appends a value. Fails with `AccountNotFound` unless the owning account
    /// exists and is not deleted at the moment of insertion.
    async fn create_account_value(&self, value: &NewAccountValue) -> Result<AccountValue, DbError>;
}
