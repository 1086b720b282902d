use core_types::{Account, AccountClass};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Net worth as of each account's most recent observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthTotals {
    pub assets: Decimal,
    pub liabilities: Decimal,
    pub net_worth: Decimal,
}

/// Sums the current value of every account by class. Accounts without any
/// recorded value are ignored.
pub fn current_totals(accounts: &[Account]) -> NetWorthTotals {
    let mut totals = NetWorthTotals::default();
    for account in accounts {
        let Some(current) = account.current_value() else {
            continue;
        };
        match account.class {
            AccountClass::Asset => totals.assets += current.value,
            AccountClass::Liability => totals.liabilities += current.value,
        }
    }
    totals.net_worth = totals.assets - totals.liabilities;
    totals
}
