use crate::error::AnalyticsError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{Account, NetWorthPoint};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Widest accepted bucket. Together with the observation window enforced at
/// validation this keeps every rounded instant inside the nanosecond range.
pub const MAX_INTERVAL_DAYS: i64 = 50 * 365;

/// Upper bound on the grid size of a single rollup.
pub const MAX_BUCKETS: usize = 1_000_000;

/// Rounds `ts` to the nearest multiple of `interval` on the UTC epoch grid.
/// Halfway values round up, to the later instant.
pub fn round_to_interval(
    ts: DateTime<Utc>,
    interval: Duration,
) -> Result<DateTime<Utc>, AnalyticsError> {
    let span = interval_nanos(interval)?;
    Ok(Utc.timestamp_nanos(round_nanos(nanos(ts)?, span)?))
}

fn nanos(ts: DateTime<Utc>) -> Result<i64, AnalyticsError> {
    ts.timestamp_nanos_opt()
        .ok_or_else(|| AnalyticsError::Rounding(format!("{ts} is outside the nanosecond range")))
}

fn interval_nanos(interval: Duration) -> Result<i64, AnalyticsError> {
    match interval.num_nanoseconds() {
        Some(span) if span > 0 && interval <= Duration::days(MAX_INTERVAL_DAYS) => Ok(span),
        _ => Err(AnalyticsError::InvalidInterval(interval.to_string())),
    }
}

fn round_nanos(stamp: i64, span: i64) -> Result<i64, AnalyticsError> {
    let rem = stamp.rem_euclid(span);
    let floor = stamp - rem;
    if rem >= span - rem {
        floor
            .checked_add(span)
            .ok_or_else(|| AnalyticsError::Rounding(format!("{stamp}ns overflows when rounded up")))
    } else {
        Ok(floor)
    }
}

/// The fixed-width bucket grid covering every observation of a set of accounts.
///
/// Bucket `i` sits at `round(first) + i * interval`; the last bucket is the
/// one `round(last)` lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBuckets {
    start: i64,
    span: i64,
    len: usize,
}

impl TimeBuckets {
    pub fn for_accounts(accounts: &[Account], interval: Duration) -> Result<Self, AnalyticsError> {
        let span = interval_nanos(interval)?;
        let (first, last) = time_span(accounts).ok_or(AnalyticsError::EmptyInput)?;
        let start = round_nanos(nanos(first)?, span)?;
        let end = round_nanos(nanos(last)?, span)?;
        let count = (i128::from(end) - i128::from(start)) / i128::from(span) + 1;
        if count > MAX_BUCKETS as i128 {
            return Err(AnalyticsError::TooManyBuckets {
                buckets: count,
                max: MAX_BUCKETS,
            });
        }
        let len = usize::try_from(count)
            .map_err(|_| AnalyticsError::Rounding("bucket count overflow".to_string()))?;

        Ok(Self { start, span, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn timestamp(&self, index: usize) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.start + self.span * index as i64)
    }

    /// The index of an already rounded timestamp, if it lies on the grid.
    pub fn index_of(&self, rounded: DateTime<Utc>) -> Option<usize> {
        let stamp = rounded.timestamp_nanos_opt()?;
        let offset = stamp.checked_sub(self.start)?;
        if offset < 0 || offset % self.span != 0 {
            return None;
        }
        let index = usize::try_from(offset / self.span).ok()?;
        (index < self.len).then_some(index)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.len).map(|i| self.timestamp(i))
    }
}

/// Earliest and latest observation across every account.
fn time_span(accounts: &[Account]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    accounts
        .iter()
        .flat_map(|account| account.values.iter().map(|v| v.created_at))
        .fold(None, |span, ts| match span {
            None => Some((ts, ts)),
            Some((first, last)) => Some((first.min(ts), last.max(ts))),
        })
}

/// Rolls a snapshot of accounts up into a chronologically ordered net worth
/// series at the given resolution.
///
/// Each account's `values` must be sorted newest first. Every observation is
/// added (assets) or subtracted (liabilities) into the bucket it rounds to,
/// and each account's most recent value is also carried into every bucket
/// strictly after its own, so later buckets still count balances that did not
/// change. Only buckets that received a contribution are emitted.
pub fn rollup(
    accounts: &[Account],
    interval: Duration,
) -> Result<Vec<NetWorthPoint>, AnalyticsError> {
    let buckets = TimeBuckets::for_accounts(accounts, interval)?;
    let mut totals: BTreeMap<DateTime<Utc>, Decimal> = BTreeMap::new();

    fill_carried_values(accounts, &buckets, interval, &mut totals)?;

    for account in accounts {
        for value in &account.values {
            let ts = round_to_interval(value.created_at, interval)?;
            *totals.entry(ts).or_default() += account.class.sign(value.value);
        }
    }

    tracing::debug!(
        accounts = accounts.len(),
        buckets = buckets.len(),
        points = totals.len(),
        "Rolled up net worth."
    );

    Ok(totals
        .into_iter()
        .map(|(date, value)| NetWorthPoint { date, value })
        .collect())
}

/// Carry-forward pass. Each account's latest value starts counting one bucket
/// after its anchor and keeps counting to the end of the grid, so a running
/// sum over per-bucket deltas covers all accounts in one sweep.
fn fill_carried_values(
    accounts: &[Account],
    buckets: &TimeBuckets,
    interval: Duration,
    totals: &mut BTreeMap<DateTime<Utc>, Decimal>,
) -> Result<(), AnalyticsError> {
    let mut deltas: BTreeMap<usize, Decimal> = BTreeMap::new();

    for account in accounts {
        let Some(latest) = account.current_value() else {
            continue;
        };
        let anchor = round_to_interval(latest.created_at, interval)?;
        let Some(index) = buckets.index_of(anchor) else {
            tracing::warn!(account = %account.name, %anchor, "Latest value is off the bucket grid.");
            continue;
        };
        if index + 1 < buckets.len() {
            *deltas.entry(index + 1).or_default() += account.class.sign(latest.value);
        }
    }

    let Some((&first, _)) = deltas.first_key_value() else {
        return Ok(());
    };

    let mut carried = Decimal::ZERO;
    for index in first..buckets.len() {
        if let Some(delta) = deltas.get(&index) {
            carried += *delta;
        }
        *totals.entry(buckets.timestamp(index)).or_default() += carried;
    }

    Ok(())
}

/// Like [`rollup`], but an empty dataset yields an empty series.
pub fn net_worth_series(
    accounts: &[Account],
    interval: Duration,
) -> Result<Vec<NetWorthPoint>, AnalyticsError> {
    match rollup(accounts, interval) {
        Err(AnalyticsError::EmptyInput) => Ok(Vec::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{AccountCategory, AccountClass, AccountValue};
    use rust_decimal_macros::dec;

    const DAY: i64 = 86_400;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    // A fixed instant a little past midnight so that day rounding goes down.
    fn t0() -> DateTime<Utc> {
        at(1_700_006_400 + 3_600)
    }

    fn account(name: &str, class: AccountClass, values: &[(Decimal, DateTime<Utc>)]) -> Account {
        let mut account = Account {
            name: name.to_string(),
            class,
            category: match class {
                AccountClass::Asset => AccountCategory::Cash,
                AccountClass::Liability => AccountCategory::Loan,
            },
            tax_bucket: None,
            values: values
                .iter()
                .enumerate()
                .map(|(i, (value, created_at))| AccountValue {
                    id: i as i64 + 1,
                    account_name: name.to_string(),
                    value: *value,
                    created_at: *created_at,
                })
                .collect(),
            created_at: t0(),
            updated_at: t0(),
            deleted_at: None,
        };
        account.sort_values();
        account
    }

    fn point(date: DateTime<Utc>, value: Decimal) -> NetWorthPoint {
        NetWorthPoint { date, value }
    }

    #[test]
    fn rounds_to_nearest_with_halfway_up() {
        let five = Duration::seconds(5);
        assert_eq!(round_to_interval(at(12), five).unwrap(), at(10));
        assert_eq!(round_to_interval(at(13), five).unwrap(), at(15));
        assert_eq!(
            round_to_interval(at(10) + Duration::milliseconds(2_500), five).unwrap(),
            at(15)
        );
        assert_eq!(round_to_interval(at(-3), five).unwrap(), at(-5));
        assert_eq!(round_to_interval(at(DAY / 2), Duration::days(1)).unwrap(), at(DAY));
    }

    #[test]
    fn rejects_non_positive_and_oversized_intervals() {
        let accounts = [account("a", AccountClass::Asset, &[(dec!(1), t0())])];
        assert!(matches!(
            rollup(&accounts, Duration::zero()),
            Err(AnalyticsError::InvalidInterval(_))
        ));
        assert!(matches!(
            rollup(&accounts, Duration::seconds(-5)),
            Err(AnalyticsError::InvalidInterval(_))
        ));
        assert!(matches!(
            rollup(&accounts, Duration::days(MAX_INTERVAL_DAYS + 1)),
            Err(AnalyticsError::InvalidInterval(_))
        ));
        assert!(rollup(&accounts, Duration::days(MAX_INTERVAL_DAYS)).is_ok());
    }

    #[test]
    fn refuses_grids_beyond_the_bucket_limit() {
        let accounts = [
            account("a", AccountClass::Asset, &[(dec!(1), t0())]),
            account("b", AccountClass::Asset, &[(dec!(2), t0() + Duration::days(30))]),
        ];
        assert!(matches!(
            TimeBuckets::for_accounts(&accounts, Duration::nanoseconds(1)),
            Err(AnalyticsError::TooManyBuckets { max: MAX_BUCKETS, .. })
        ));
        assert!(matches!(
            net_worth_series(&accounts, Duration::nanoseconds(1)),
            Err(AnalyticsError::TooManyBuckets { .. })
        ));

        // Thirty days at the default five seconds stays within the limit.
        let buckets = TimeBuckets::for_accounts(&accounts, Duration::seconds(5)).unwrap();
        assert_eq!(buckets.len(), 518_401);
    }

    #[test]
    fn widest_interval_rounds_the_observation_window_edges() {
        let widest = Duration::days(MAX_INTERVAL_DAYS);
        let earliest = Utc.with_ymd_and_hms(1800, 1, 1, 0, 0, 0).unwrap();
        let latest = Utc.with_ymd_and_hms(2199, 12, 31, 23, 59, 59).unwrap();
        let accounts = [
            account("a", AccountClass::Asset, &[(dec!(1), earliest)]),
            account("b", AccountClass::Liability, &[(dec!(1), latest)]),
        ];
        let series = rollup(&accounts, widest).unwrap();
        assert_eq!(series.first().map(|p| p.value), Some(dec!(1)));
        assert_eq!(series.last().map(|p| p.value), Some(dec!(0)));
    }

    #[test]
    fn empty_input_is_an_error_for_rollup_and_empty_for_series() {
        let empty = [account("a", AccountClass::Asset, &[])];
        assert!(matches!(
            rollup(&empty, Duration::days(1)),
            Err(AnalyticsError::EmptyInput)
        ));
        assert!(matches!(rollup(&[], Duration::days(1)), Err(AnalyticsError::EmptyInput)));
        assert_eq!(net_worth_series(&empty, Duration::days(1)).unwrap(), vec![]);
    }

    #[test]
    fn creates_one_bucket_per_interval_through_the_last_value() {
        let day = Duration::days(1);
        let one = [
            account("test", AccountClass::Asset, &[(dec!(1), t0())]),
            account("test2", AccountClass::Asset, &[(dec!(1), t0())]),
        ];
        let buckets = TimeBuckets::for_accounts(&one, day).unwrap();
        assert_eq!(
            buckets.timestamps().collect::<Vec<_>>(),
            vec![round_to_interval(t0(), day).unwrap()]
        );

        let four = [
            account("a", AccountClass::Asset, &[(dec!(1), t0() + day * 2)]),
            account("b", AccountClass::Asset, &[(dec!(1), t0() + day * 3)]),
            account("c", AccountClass::Asset, &[(dec!(1), t0())]),
        ];
        let buckets = TimeBuckets::for_accounts(&four, day).unwrap();
        let start = round_to_interval(t0(), day).unwrap();
        assert_eq!(
            buckets.timestamps().collect::<Vec<_>>(),
            (0..4).map(|i| start + day * i).collect::<Vec<_>>()
        );
        assert_eq!(buckets.index_of(start + day * 3), Some(3));
        assert_eq!(buckets.index_of(start + day * 4), None);
        assert_eq!(buckets.index_of(start + Duration::hours(1)), None);
    }

    #[test]
    fn grid_reaches_the_bucket_of_the_last_value() {
        // 1.2 days apart, but rounding puts them two buckets apart.
        let day = Duration::days(1);
        let first = at(10 * DAY) + Duration::hours(10);
        let last = first + Duration::hours(29);
        let accounts = [account("a", AccountClass::Asset, &[(dec!(1), first), (dec!(2), last)])];
        let buckets = TimeBuckets::for_accounts(&accounts, day).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.timestamp(2), at(12 * DAY));
    }

    #[test]
    fn single_value_yields_single_signed_point() {
        for interval in [Duration::seconds(5), Duration::hours(1), Duration::days(1)] {
            let asset = [account("a", AccountClass::Asset, &[(dec!(12.34), t0())])];
            assert_eq!(
                rollup(&asset, interval).unwrap(),
                vec![point(round_to_interval(t0(), interval).unwrap(), dec!(12.34))]
            );

            let liability = [account("l", AccountClass::Liability, &[(dec!(12.34), t0())])];
            assert_eq!(
                rollup(&liability, interval).unwrap(),
                vec![point(round_to_interval(t0(), interval).unwrap(), dec!(-12.34))]
            );
        }
    }

    #[test]
    fn carries_latest_value_into_later_buckets() {
        let interval = Duration::seconds(5);
        let start = at(1_000);
        let accounts = [
            account("A", AccountClass::Asset, &[(dec!(10), start)]),
            account(
                "B",
                AccountClass::Asset,
                &[(dec!(5), start), (dec!(8), start + interval * 2)],
            ),
        ];
        let series = rollup(&accounts, interval).unwrap();
        assert_eq!(
            series,
            vec![
                point(start, dec!(15)),
                point(start + interval, dec!(10)),
                point(start + interval * 2, dec!(18)),
            ]
        );
    }

    #[test]
    fn liability_is_carried_forward_with_negative_sign() {
        let day = Duration::days(1);
        let accounts = [
            account(
                "test",
                AccountClass::Asset,
                &[(dec!(2), t0()), (dec!(3), t0() + day)],
            ),
            account("test2", AccountClass::Liability, &[(dec!(1), t0())]),
        ];
        let series = rollup(&accounts, day).unwrap();
        let start = round_to_interval(t0(), day).unwrap();
        assert_eq!(
            series,
            vec![point(start, dec!(1)), point(start + day, dec!(2))]
        );
    }

    #[test]
    fn anchor_bucket_is_not_double_counted() {
        let interval = Duration::seconds(5);
        let start = at(1_000);
        let accounts = [
            account("a", AccountClass::Asset, &[(dec!(7), start + interval)]),
            account("b", AccountClass::Asset, &[(dec!(1), start)]),
        ];
        let series = rollup(&accounts, interval).unwrap();
        assert_eq!(
            series,
            vec![point(start, dec!(1)), point(start + interval, dec!(8))]
        );
    }

    #[test]
    fn carried_buckets_are_emitted_even_when_they_net_to_zero() {
        let interval = Duration::seconds(5);
        let start = at(1_000);
        let accounts = [
            account("cash", AccountClass::Asset, &[(dec!(5), start)]),
            account("card", AccountClass::Liability, &[(dec!(5), start)]),
            account("late", AccountClass::Asset, &[(dec!(1), start + interval * 2)]),
        ];
        let series = rollup(&accounts, interval).unwrap();
        assert_eq!(
            series,
            vec![
                point(start, dec!(0)),
                point(start + interval, dec!(0)),
                point(start + interval * 2, dec!(1)),
            ]
        );
    }

    #[test]
    fn series_is_strictly_ascending_and_repeatable() {
        let interval = Duration::seconds(5);
        let start = at(1_000);
        let accounts = [
            account(
                "a",
                AccountClass::Asset,
                &[
                    (dec!(100.10), start + interval * 7),
                    (dec!(50.05), start),
                    (dec!(75.00), start + interval * 3),
                ],
            ),
            account(
                "b",
                AccountClass::Liability,
                &[(dec!(20.20), start + interval * 2), (dec!(30.30), start + interval * 9)],
            ),
        ];

        let first = rollup(&accounts, interval).unwrap();
        let second = rollup(&accounts, interval).unwrap();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(first.first().map(|p| p.date), Some(start));
        assert_eq!(first.last().map(|p| p.value), Some(dec!(100.10) - dec!(30.30)));
    }

    #[test]
    fn sums_are_exact_decimals() {
        let interval = Duration::seconds(5);
        let start = at(1_000);
        let values: Vec<(Decimal, DateTime<Utc>)> = (0..10).map(|_| (dec!(0.10), start)).collect();
        let accounts = [account("coins", AccountClass::Asset, &values)];
        assert_eq!(rollup(&accounts, interval).unwrap(), vec![point(start, dec!(1.00))]);
    }
}
