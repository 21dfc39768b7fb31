use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dates::Clock;
use crate::db::ContractStore;
use crate::error::Result;
use crate::models::{Category, ContractRecord, DecoratedContract, RequestContext};

/// Upper bound, in days, of the "expiring soon" window
pub const ALERT_WINDOW_DAYS: i64 = 5;

/// Per-category totals plus the number of expired contracts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateCounts {
    #[serde(rename = "pool_count")]
    pub pool_service: usize,
    #[serde(rename = "garden_count")]
    pub garden_service: usize,
    #[serde(rename = "expired_count")]
    pub expired: usize,
}

impl AggregateCounts {
    pub fn for_category(&self, category: Category) -> usize {
        match category {
            Category::PoolService => self.pool_service,
            Category::GardenService => self.garden_service,
        }
    }
}

/// Aggregate view across every category, serialized flat as
/// `{pool_count, garden_count, expired_count, expiring_soon}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub counts: AggregateCounts,
    pub expiring_soon: Vec<DecoratedContract>,
}

#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ContractStore>,
    clock: Arc<dyn Clock>,
}

impl ListingService {
    pub fn new(store: Arc<dyn ContractStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Fetches the caller's contracts, optionally for one category, sorted
    /// by expiration and numbered from 1. Empty without a principal.
    pub async fn list_for_owner(
        &self,
        ctx: &RequestContext,
        category: Option<Category>,
    ) -> Result<Vec<DecoratedContract>> {
        let Some(owner_id) = ctx.principal() else {
            tracing::debug!("listing skipped: no authenticated principal");
            return Ok(Vec::new());
        };

        let records = self
            .store
            .query_by_owner_and_category(owner_id, category)
            .await?;

        Ok(decorate_and_sort(records, self.clock.now()))
    }

    /// Counts over a fresh, unfiltered fetch
    pub async fn aggregate_counts(&self, ctx: &RequestContext) -> Result<AggregateCounts> {
        let all = self.list_for_owner(ctx, None).await?;
        Ok(count(&all))
    }

    pub async fn dashboard(&self, ctx: &RequestContext) -> Result<Dashboard> {
        let all = self.list_for_owner(ctx, None).await?;
        Ok(Dashboard {
            counts: count(&all),
            expiring_soon: alert_subset(&all),
        })
    }
}

/// Derives remaining days and urgency, orders by expiration and assigns
/// display indices
pub fn decorate_and_sort(records: Vec<ContractRecord>, now: DateTime<Utc>) -> Vec<DecoratedContract> {
    let mut contracts: Vec<DecoratedContract> = records
        .into_iter()
        .map(|record| DecoratedContract::decorate(record, now))
        .collect();

    sort_by_expiration(&mut contracts);
    for (index, contract) in contracts.iter_mut().enumerate() {
        contract.display_index = index + 1;
    }

    contracts
}

/// Stable ascending sort on `expires_at`. Contracts without a date keep
/// their positions; the dated ones are ordered among the remaining slots.
pub fn sort_by_expiration(contracts: &mut [DecoratedContract]) {
    let slots: Vec<usize> = contracts
        .iter()
        .enumerate()
        .filter(|(_, c)| c.record.expires_at.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut dated: Vec<DecoratedContract> = slots.iter().map(|&i| contracts[i].clone()).collect();
    dated.sort_by_key(|c| c.record.expires_at);

    for (slot, contract) in slots.into_iter().zip(dated) {
        contracts[slot] = contract;
    }
}

/// Contracts expiring within the next five days (today included), fewest
/// days first
pub fn alert_subset(contracts: &[DecoratedContract]) -> Vec<DecoratedContract> {
    let mut alerts: Vec<DecoratedContract> = contracts
        .iter()
        .filter(|c| matches!(c.days_remaining, Some(days) if (0..=ALERT_WINDOW_DAYS).contains(&days)))
        .cloned()
        .collect();
    alerts.sort_by_key(|c| c.days_remaining);
    alerts
}

/// Contracts already past their expiration, in listing order
pub fn expired_subset(contracts: &[DecoratedContract]) -> Vec<DecoratedContract> {
    contracts.iter().filter(|c| c.is_expired()).cloned().collect()
}

fn count(contracts: &[DecoratedContract]) -> AggregateCounts {
    contracts
        .iter()
        .fold(AggregateCounts::default(), |mut counts, contract| {
            match contract.record.category {
                Category::PoolService => counts.pool_service += 1,
                Category::GardenService => counts.garden_service += 1,
            }
            if contract.is_expired() {
                counts.expired += 1;
            }
            counts
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn record(id: &str, category: Category, expires_in_days: Option<i64>) -> ContractRecord {
        ContractRecord {
            id: id.to_string(),
            owner_id: "owner".into(),
            name: format!("Client {}", id),
            contact: None,
            category,
            expires_at: expires_in_days.map(|d| now() + Duration::days(d)),
            created_at: now() - Duration::days(30),
        }
    }

    fn ids(contracts: &[DecoratedContract]) -> Vec<&str> {
        contracts.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn sorts_ascending_and_numbers_from_one() {
        let records = vec![
            record("a", Category::PoolService, Some(20)),
            record("b", Category::PoolService, Some(-3)),
            record("c", Category::GardenService, Some(4)),
        ];
        let listed = decorate_and_sort(records, now());
        assert_eq!(ids(&listed), vec!["b", "c", "a"]);
        assert_eq!(
            listed.iter().map(|c| c.display_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(listed[0].days_remaining, Some(-3));
    }

    #[test]
    fn undated_contracts_keep_their_slots() {
        let records = vec![
            record("late", Category::PoolService, Some(30)),
            record("x", Category::PoolService, None),
            record("soon", Category::PoolService, Some(1)),
            record("y", Category::PoolService, None),
        ];
        let listed = decorate_and_sort(records, now());
        assert_eq!(ids(&listed), vec!["soon", "x", "late", "y"]);
        assert_eq!(listed[1].days_remaining, None);
    }

    #[test]
    fn equal_dates_keep_fetch_order() {
        let records = vec![
            record("first", Category::PoolService, Some(9)),
            record("second", Category::PoolService, Some(9)),
            record("third", Category::PoolService, Some(9)),
        ];
        let once = decorate_and_sort(records.clone(), now());
        let twice = decorate_and_sort(records, now());
        assert_eq!(ids(&once), vec!["first", "second", "third"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn alert_subset_keeps_zero_to_five_days() {
        let records = vec![
            record("a", Category::PoolService, Some(5)),
            record("b", Category::PoolService, Some(-1)),
            record("c", Category::PoolService, Some(0)),
            record("d", Category::PoolService, Some(6)),
            record("e", Category::GardenService, Some(2)),
            record("f", Category::GardenService, None),
        ];
        let listed = decorate_and_sort(records, now());
        let alerts = alert_subset(&listed);
        assert_eq!(ids(&alerts), vec!["c", "e", "a"]);
        assert_eq!(ids(&expired_subset(&listed)), vec!["b"]);
    }

    #[test]
    fn counts_each_category_and_expired() {
        let records = vec![
            record("a", Category::PoolService, Some(5)),
            record("b", Category::PoolService, Some(-10)),
            record("c", Category::GardenService, Some(-1)),
            record("d", Category::GardenService, None),
            record("e", Category::GardenService, Some(100)),
        ];
        let counts = count(&decorate_and_sort(records, now()));
        assert_eq!(
            counts,
            AggregateCounts {
                pool_service: 2,
                garden_service: 3,
                expired: 2,
            }
        );
        assert_eq!(counts.for_category(Category::GardenService), 3);
    }

    #[test]
    fn dashboard_serializes_flat() {
        let records = vec![
            record("a", Category::PoolService, Some(2)),
            record("b", Category::GardenService, Some(-4)),
        ];
        let listed = decorate_and_sort(records, now());
        let dashboard = Dashboard {
            counts: count(&listed),
            expiring_soon: alert_subset(&listed),
        };

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["pool_count"], 1);
        assert_eq!(json["garden_count"], 1);
        assert_eq!(json["expired_count"], 1);
        assert_eq!(json["expiring_soon"][0]["id"], "a");
        assert!(json.get("counts").is_none());
    }
}
