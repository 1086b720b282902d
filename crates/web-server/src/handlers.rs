use crate::{error::AppError, AppState};
use analytics::NetWorthTotals;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::{
    validate_account_value, Account, AccountClass, AccountValue, NetWorthPoint, NewAccount,
    NewAccountValue, ValidationError,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountsQuery {
    pub name: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NetWorthQuery {
    /// Overrides the configured bucket width, e.g. `1d` or `6h`.
    pub interval: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required_name(query: &NameQuery) -> Result<&str, AppError> {
    non_empty(&query.name)
        .ok_or_else(|| AppError::BadRequest("Unset parameter 'name' required.".to_string()))
}

fn parse_interval(raw: &str) -> Result<chrono::Duration, AppError> {
    let interval = humantime_serde::re::humantime::parse_duration(raw)
        .map_err(|e| AppError::BadRequest(format!("invalid interval '{raw}': {e}")))?;
    if interval.is_zero() {
        return Err(AppError::BadRequest(format!(
            "invalid interval '{raw}': must be greater than 0"
        )));
    }
    chrono::Duration::from_std(interval)
        .map_err(|e| AppError::BadRequest(format!("invalid interval '{raw}': {e}")))
}

/// # GET /api/accounts
/// With `?name=` returns that single account, with `?class=` every account of
/// that class, otherwise every account. Each comes with its full value history.
pub async fn get_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountsQuery>,
) -> Result<Response, AppError> {
    if let Some(name) = non_empty(&query.name) {
        let account = state.store.load_account_with_values(name).await?;
        return Ok(Json(account).into_response());
    }

    let accounts = match non_empty(&query.class) {
        Some(class) => {
            let class: AccountClass = class.parse()?;
            state.store.load_accounts_by_class_with_values(class).await?
        }
        None => state.store.load_all_accounts_with_values().await?,
    };
    Ok(Json(accounts).into_response())
}

/// # POST /api/accounts?name=
/// Creates the account, or merges the non-empty body fields onto it when it
/// already exists. Both paths validate the full field set before writing.
pub async fn upsert_account(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
    Json(mut payload): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let name = required_name(&query)?;

    let body_name = payload.name.trim();
    if body_name.is_empty() {
        payload.name = name.to_string();
    } else if body_name != name {
        return Err(ValidationError::NameMismatch {
            expected: name.to_string(),
            found: body_name.to_string(),
        }
        .into());
    }

    if state.store.account_exists(name).await? {
        let existing = state.store.load_account_with_values(name).await?;
        let fields = payload.merged_onto(&existing).parse()?;
        let account = state.store.update_account(name, &fields).await?;
        Ok((StatusCode::OK, Json(account)))
    } else {
        let fields = payload.parse()?;
        let account = state.store.create_account(&fields).await?;
        Ok((StatusCode::CREATED, Json(account)))
    }
}

/// # DELETE /api/accounts?name=
/// Soft-deletes the account. Its value history is kept but no longer read.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Account>, AppError> {
    let name = required_name(&query)?;
    let account = state.store.delete_account(name).await?;
    Ok(Json(account))
}

/// # GET /api/accounts/value?name=
pub async fn get_account_values(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<AccountValue>>, AppError> {
    let name = required_name(&query)?;
    let values = state.store.load_account_values(name).await?;
    Ok(Json(values))
}

/// # POST /api/accounts/value?name=
/// Appends an observation. The amount is rounded to cents before it is checked.
pub async fn create_account_value(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
    Json(payload): Json<NewAccountValue>,
) -> Result<(StatusCode, Json<AccountValue>), AppError> {
    let name = required_name(&query)?;

    let mut value = payload.normalized();
    value.account_name = name.to_string();
    validate_account_value(&value)?;

    let created = state.store.create_account_value(&value).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// # GET /api/accounts/value/current?name=
pub async fn get_current_account_value(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<AccountValue>, AppError> {
    let name = required_name(&query)?;
    state
        .store
        .latest_account_value(name)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("account {name} has no values")))
}

/// # GET /api/networth
/// The net worth time series, ascending by date. Empty when nothing has been
/// recorded yet.
pub async fn get_net_worth_over_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NetWorthQuery>,
) -> Result<Json<Vec<NetWorthPoint>>, AppError> {
    let interval = match non_empty(&query.interval) {
        Some(raw) => parse_interval(raw)?,
        None => state.rollup_interval,
    };

    let accounts = state.store.load_all_accounts_with_values().await?;
    let series = analytics::net_worth_series(&accounts, interval)?;
    Ok(Json(series))
}

/// # GET /api/networth/current
pub async fn get_current_net_worth(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NetWorthTotals>, AppError> {
    let accounts = state.store.load_all_accounts_with_values().await?;
    Ok(Json(analytics::current_totals(&accounts)))
}
