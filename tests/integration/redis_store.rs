//! RedisStore tests against a live Redis
//!
//! Skipped when no Redis is listening on the test URL.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures::future::join_all;
use homegoods_meter::{
    store::{redis::keys, ClickEvent, MeterStore, RedisStore},
    BillingPeriod,
};
use redis::AsyncCommands;

use crate::skip_if_no_redis;

fn october() -> BillingPeriod {
    BillingPeriod::containing(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()).unwrap()
}

#[tokio::test]
async fn test_usage_counter_lifecycle() {
    let redis = skip_if_no_redis!();
    let store = RedisStore::new(redis.conn());
    let user = redis.unique("user");
    let period = october();
    redis.track(keys::usage(&user, &period));

    let record = store.get_or_create_usage_record(&user, &period).await.unwrap();
    assert_eq!(record.count, 0);
    assert_eq!(record.period_start, period.start);
    assert_eq!(record.period_end, period.end);

    assert_eq!(store.atomic_increment(&user, &period).await.unwrap(), 1);
    assert_eq!(store.atomic_increment(&user, &period).await.unwrap(), 2);

    // Re-reading must not reset the counter
    let record = store.get_or_create_usage_record(&user, &period).await.unwrap();
    assert_eq!(record.count, 2);

    redis.cleanup().await;
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    let redis = skip_if_no_redis!();
    let store = Arc::new(RedisStore::new(redis.conn()));
    let user = redis.unique("busy");
    let period = october();
    redis.track(keys::usage(&user, &period));

    let increments = (0..50).map(|_| {
        let store = store.clone();
        let user = user.clone();
        tokio::spawn(async move { store.atomic_increment(&user, &period).await.unwrap() })
    });
    join_all(increments).await;

    let record = store.get_or_create_usage_record(&user, &period).await.unwrap();
    assert_eq!(record.count, 50);

    redis.cleanup().await;
}

#[tokio::test]
async fn test_try_increment_holds_at_limit_under_contention() {
    let redis = skip_if_no_redis!();
    let store = Arc::new(RedisStore::new(redis.conn()));
    let user = redis.unique("capped");
    let period = october();
    redis.track(keys::usage(&user, &period));

    let attempts = (0..30).map(|_| {
        let store = store.clone();
        let user = user.clone();
        tokio::spawn(async move { store.try_increment(&user, &period, 20).await.unwrap() })
    });
    let results = join_all(attempts).await;

    let admitted = results.iter().filter(|r| matches!(r, Ok(Some(_)))).count();
    assert_eq!(admitted, 20);
    let record = store.get_or_create_usage_record(&user, &period).await.unwrap();
    assert_eq!(record.count, 20);
    assert_eq!(store.try_increment(&user, &period, 20).await.unwrap(), None);

    redis.cleanup().await;
}

#[tokio::test]
async fn test_click_events_and_totals() {
    let redis = skip_if_no_redis!();
    let store = RedisStore::new(redis.conn());
    let retailer = redis.unique("shop");

    for product_id in [1, 2] {
        let event = ClickEvent::new(retailer.clone(), product_id, None, None);
        store.insert_click_event(&event).await.unwrap();
    }

    let counts = store.click_counts_by_retailer().await.unwrap();
    assert_eq!(counts.get(&retailer), Some(&2));

    let mut conn = redis.conn();
    let _: () = conn.hdel(keys::CLICKS_BY_RETAILER, &retailer).await.unwrap();
    for _ in 0..2 {
        let _: Option<String> = conn.rpop(keys::CLICKS, None).await.unwrap();
    }
}

#[tokio::test]
async fn test_ping() {
    let redis = skip_if_no_redis!();
    RedisStore::new(redis.conn()).ping().await.unwrap();
}
