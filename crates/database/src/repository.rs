use crate::store::AccountStore;
use crate::DbError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Account, AccountClass, AccountFields, AccountValue, NewAccountValue};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::FromRow;
use std::collections::HashMap;

const ACCOUNT_COLUMNS: &str =
    "name, class, category, tax_bucket, created_at, updated_at, deleted_at";
const VALUE_COLUMNS: &str = "id, account_name, value, created_at";

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

// This struct represents a row fetched from the accounts table. Enum columns
// are plain text and are parsed on the way out.
#[derive(FromRow, Debug, Clone)]
pub struct DbAccount {
    pub name: String,
    pub class: String,
    pub category: String,
    pub tax_bucket: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Represents a row from the `account_values` table.
#[derive(FromRow, Debug, Clone)]
pub struct DbAccountValue {
    pub id: i64,
    pub account_name: String,
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<DbAccountValue> for AccountValue {
    fn from(row: DbAccountValue) -> Self {
        AccountValue {
            id: row.id,
            account_name: row.account_name,
            value: row.value,
            created_at: row.created_at,
        }
    }
}

impl DbAccount {
    fn into_account(self, values: Vec<AccountValue>) -> Result<Account, DbError> {
        let corrupt = |e: core_types::ValidationError| {
            DbError::Corrupt(format!("account {}: {}", self.name, e))
        };
        let class = self.class.parse().map_err(corrupt)?;
        let category = self.category.parse().map_err(corrupt)?;
        let tax_bucket = self
            .tax_bucket
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(corrupt)?;

        let mut account = Account {
            name: self.name,
            class,
            category,
            tax_bucket,
            values,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        };
        account.sort_values();
        Ok(account)
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads the value histories of `rows` and joins them onto their accounts.
    async fn attach_values(
        conn: &mut PgConnection,
        rows: Vec<DbAccount>,
    ) -> Result<Vec<Account>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = rows.iter().map(|r| r.name.clone()).collect();
        let values = sqlx::query_as::<_, DbAccountValue>(&format!(
            "SELECT {VALUE_COLUMNS} FROM account_values
             WHERE account_name = ANY($1)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(&names)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_account: HashMap<String, Vec<AccountValue>> = HashMap::new();
        for value in values {
            by_account
                .entry(value.account_name.clone())
                .or_default()
                .push(value.into());
        }

        rows.into_iter()
            .map(|row| {
                let values = by_account.remove(&row.name).unwrap_or_default();
                row.into_account(values)
            })
            .collect()
    }

    /// Runs an account query and its value query against one snapshot, so
    /// the histories match the accounts they were loaded for.
    async fn load_snapshot(
        &self,
        query: &str,
        class: Option<AccountClass>,
    ) -> Result<Vec<Account>, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut accounts_query = sqlx::query_as::<_, DbAccount>(query);
        if let Some(class) = class {
            accounts_query = accounts_query.bind(class.as_str());
        }
        let rows = accounts_query.fetch_all(&mut *tx).await?;
        let accounts = Self::attach_values(&mut tx, rows).await?;

        tx.commit().await?;
        Ok(accounts)
    }

    async fn fetch_values(&self, name: &str) -> Result<Vec<AccountValue>, DbError> {
        let rows = sqlx::query_as::<_, DbAccountValue>(&format!(
            "SELECT {VALUE_COLUMNS} FROM account_values
             WHERE account_name = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AccountValue::from).collect())
    }

    async fn ensure_exists(&self, name: &str) -> Result<(), DbError> {
        if self.account_exists(name).await? {
            Ok(())
        } else {
            Err(DbError::AccountNotFound(name.to_string()))
        }
    }
}

#[async_trait]
impl AccountStore for DbRepository {
    async fn load_all_accounts_with_values(&self) -> Result<Vec<Account>, DbError> {
        self.load_snapshot(
            &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE deleted_at IS NULL ORDER BY name"
            ),
            None,
        )
        .await
    }

    async fn load_accounts_by_class_with_values(
        &self,
        class: AccountClass,
    ) -> Result<Vec<Account>, DbError> {
        self.load_snapshot(
            &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts
                 WHERE class = $1 AND deleted_at IS NULL
                 ORDER BY name"
            ),
            Some(class),
        )
        .await
    }

    async fn load_account_with_values(&self, name: &str) -> Result<Account, DbError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, DbAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE name = $1 AND deleted_at IS NULL"
        ))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::AccountNotFound(name.to_string()))?;

        Self::attach_values(&mut conn, vec![row])
            .await?
            .pop()
            .ok_or_else(|| DbError::AccountNotFound(name.to_string()))
    }

    async fn load_account_values(&self, name: &str) -> Result<Vec<AccountValue>, DbError> {
        self.ensure_exists(name).await?;
        self.fetch_values(name).await
    }

    async fn latest_account_value(&self, name: &str) -> Result<Option<AccountValue>, DbError> {
        self.ensure_exists(name).await?;
        let row = sqlx::query_as::<_, DbAccountValue>(&format!(
            "SELECT {VALUE_COLUMNS} FROM account_values
             WHERE account_name = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AccountValue::from))
    }

    async fn account_exists(&self, name: &str) -> Result<bool, DbError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE name = $1 AND deleted_at IS NULL)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_account(&self, account: &AccountFields) -> Result<Account, DbError> {
        // Soft-deleted rows keep their name and history, so the name stays taken.
        let row = sqlx::query_as::<_, DbAccount>(&format!(
            "INSERT INTO accounts (name, class, category, tax_bucket)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (name) DO NOTHING
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&account.name)
        .bind(account.class.as_str())
        .bind(account.category.as_str())
        .bind(account.tax_bucket.map(|b| b.as_str()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::Conflict(account.name.clone()))?;

        tracing::info!(account = %account.name, "Created account.");
        let values = self.fetch_values(&row.name).await?;
        row.into_account(values)
    }

    async fn update_account(
        &self,
        name: &str,
        account: &AccountFields,
    ) -> Result<Account, DbError> {
        let row = sqlx::query_as::<_, DbAccount>(&format!(
            "UPDATE accounts
             SET class = $2, category = $3, tax_bucket = $4, updated_at = now()
             WHERE name = $1 AND deleted_at IS NULL
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(name)
        .bind(account.class.as_str())
        .bind(account.category.as_str())
        .bind(account.tax_bucket.map(|b| b.as_str()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::AccountNotFound(name.to_string()))?;

        tracing::info!(account = %name, "Updated account.");
        let values = self.fetch_values(name).await?;
        row.into_account(values)
    }

    async fn delete_account(&self, name: &str) -> Result<Account, DbError> {
        let row = sqlx::query_as::<_, DbAccount>(&format!(
            "UPDATE accounts
             SET deleted_at = now()
             WHERE name = $1 AND deleted_at IS NULL
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::AccountNotFound(name.to_string()))?;

        tracing::info!(account = %name, "Soft-deleted account.");
        let values = self.fetch_values(name).await?;
        row.into_account(values)
    }

    async fn create_account_value(&self, value: &NewAccountValue) -> Result<AccountValue, DbError> {
        let mut tx = self.pool.begin().await?;

        // The shared row lock holds off a concurrent soft delete until the
        // value is in.
        let owner = sqlx::query_scalar::<_, String>(
            "SELECT name FROM accounts WHERE name = $1 AND deleted_at IS NULL FOR SHARE",
        )
        .bind(&value.account_name)
        .fetch_optional(&mut *tx)
        .await?;
        if owner.is_none() {
            return Err(DbError::AccountNotFound(value.account_name.clone()));
        }

        let row = sqlx::query_as::<_, DbAccountValue>(&format!(
            "INSERT INTO account_values (account_name, value, created_at)
             VALUES ($1, $2, COALESCE($3, now()))
             RETURNING {VALUE_COLUMNS}"
        ))
        .bind(&value.account_name)
        .bind(value.value)
        .bind(value.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(account = %row.account_name, value = %row.value, "Recorded account value.");
        Ok(row.into())
    }
}
