use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Order, Storefront};
use crate::store::Database;

/// Half-open window `[start, end)` of order creation times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopSellerWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TopSellerWindow {
    pub fn calendar_month_of(now: DateTime<Utc>) -> Self {
        let (year, month) = (now.year(), now.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        Self {
            start: month_start(year, month).unwrap_or(now),
            end: month_start(next_year, next_month).unwrap_or(now),
        }
    }
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Sellers by units sold, best first; ties broken by seller id.
pub fn rank_sellers(orders: &[Order], limit: usize) -> Vec<(Uuid, u64)> {
    let mut units: HashMap<Uuid, u64> = HashMap::new();
    for line in orders.iter().flat_map(|order| order.products.iter()) {
        *units.entry(line.seller_id).or_default() += u64::from(line.quantity);
    }
    let mut ranked: Vec<(Uuid, u64)> = units.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Re-tags the top sellers for a window. Running it twice with the same
/// window leaves the same tags.
pub struct TopSellerJob {
    db: Arc<dyn Database>,
    limit: usize,
}

impl TopSellerJob {
    pub fn new(db: Arc<dyn Database>, limit: usize) -> Self {
        Self { db, limit }
    }

    pub async fn run(&self, window: TopSellerWindow) -> AppResult<Vec<Storefront>> {
        let mut tx = self.db.begin().await?;
        let orders = tx.orders_created_between(window.start, window.end).await?;
        let ranked = rank_sellers(&orders, self.limit);

        let mut tagged = Vec::new();
        for mut store in tx.storefronts().await? {
            let is_top = ranked.iter().any(|(seller, _)| *seller == store.seller_id);
            if store.is_top_seller != is_top {
                store.is_top_seller = is_top;
                store.updated_at = Utc::now();
                tx.save_storefront(&store).await?;
            }
            if is_top {
                tagged.push(store);
            }
        }
        tx.commit().await?;

        tagged.sort_by_key(|store| {
            ranked
                .iter()
                .position(|(seller, _)| *seller == store.seller_id)
                .unwrap_or(usize::MAX)
        });
        tracing::info!(
            window_start = %window.start,
            window_end = %window.end,
            orders = orders.len(),
            tagged = tagged.len(),
            "Top sellers recomputed"
        );
        Ok(tagged)
    }

    pub async fn run_current_month(&self) -> AppResult<Vec<Storefront>> {
        self.run(TopSellerWindow::calendar_month_of(Utc::now())).await
    }

    /// Storefronts carrying the tag right now.
    pub async fn tagged(&self) -> AppResult<Vec<Storefront>> {
        let mut tx = self.db.begin().await?;
        let stores = tx.storefronts().await?;
        Ok(stores.into_iter().filter(|store| store.is_top_seller).collect())
    }
}

/// Starts a scheduler running the job for the current month on `cron`.
pub async fn schedule(job: Arc<TopSellerJob>, cron: &str) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create scheduler: {:?}", e))?;

    let cron_job = Job::new_async(cron, move |_uuid, _scheduler| {
        let job = job.clone();
        Box::pin(async move {
            if let Err(e) = job.run_current_month().await {
                tracing::error!(error = %e, "Top seller job failed");
            }
        })
    })
    .map_err(|e| anyhow::anyhow!("Invalid TOP_SELLER_CRON '{}': {:?}", cron, e))?;

    scheduler
        .add(cron_job)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to register top seller job: {:?}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start scheduler: {:?}", e))?;

    tracing::info!(cron, "Top seller job scheduled");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderLine;
    use crate::store::MemoryDatabase;

    fn order(lines: &[(Uuid, u32)], created_at: DateTime<Utc>) -> Order {
        let mut order = Order::placed(
            crate::models::generate_order_id(created_at),
            "Ada",
            "0801",
            "Lagos",
            lines
                .iter()
                .map(|&(seller_id, quantity)| OrderLine {
                    product_id: Uuid::new_v4(),
                    product_name: "Item".into(),
                    quantity,
                    price: 10.0,
                    seller_id,
                    is_bargain: false,
                    is_group_buy: false,
                    bargain_id: None,
                    group_buy_id: None,
                })
                .collect(),
            created_at,
        );
        order.created_at = created_at;
        order
    }

    #[test]
    fn month_window_covers_whole_month() {
        let now = Utc.with_ymd_and_hms(2025, 12, 15, 10, 30, 0).unwrap();
        let window = TopSellerWindow::calendar_month_of(now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn ranking_sums_units_and_keeps_top_n() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let orders = vec![
            order(&[(a, 2), (b, 5)], now),
            order(&[(a, 4), (c, 1)], now),
        ];
        let ranked = rank_sellers(&orders, 2);
        assert_eq!(ranked, vec![(a, 6), (b, 5)]);
    }

    #[tokio::test]
    async fn rerun_resets_previous_tags() {
        let db = MemoryDatabase::new();
        let (old_top, seller) = (Uuid::new_v4(), Uuid::new_v4());
        let mut stale = Storefront::new(old_top, "Old", "Ibadan");
        stale.is_top_seller = true;
        db.seed_storefront(stale).await;
        db.seed_storefront(Storefront::new(seller, "New", "Lagos")).await;

        let now = Utc::now();
        db.seed_order(order(&[(seller, 3)], now)).await;
        let last_year = now - chrono::Duration::days(400);
        db.seed_order(order(&[(old_top, 50)], last_year)).await;

        let job = TopSellerJob::new(Arc::new(db.clone()), 20);
        let window = TopSellerWindow::calendar_month_of(now);
        let first = job.run(window).await.unwrap();
        let second = job.run(window).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].seller_id, seller);
        assert_eq!(first, second);
        let tagged = job.tagged().await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].seller_id, seller);
    }
}
