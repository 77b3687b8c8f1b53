//! Redis test helpers
//!
//! Tests that need a real Redis connect through [`TestRedis`] and skip
//! themselves when none is running. They use a dedicated database so the
//! fixed click keys never touch a development dataset.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use redis::AsyncCommands;

/// Redis URL for testing (database 15)
pub const TEST_REDIS_URL: &str = "redis://127.0.0.1:6379/15";

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Test Redis wrapper with unique ids and key cleanup
pub struct TestRedis {
    conn: redis::aio::ConnectionManager,
    namespace: String,
    tracked_keys: std::sync::Mutex<Vec<String>>,
}

impl TestRedis {
    /// Returns `None` when Redis is unavailable so callers can skip.
    pub async fn connect() -> Option<Self> {
        let client = redis::Client::open(TEST_REDIS_URL).ok()?;
        let mut conn = client.get_connection_manager().await.ok()?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .ok()?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);

        Some(Self {
            conn,
            namespace: format!("t{}x{}", timestamp, counter),
            tracked_keys: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn conn(&self) -> redis::aio::ConnectionManager {
        self.conn.clone()
    }

    /// An id unique to this test run, e.g. for user ids or retailer slugs
    pub fn unique(&self, name: &str) -> String {
        format!("{}-{}", name, self.namespace)
    }

    /// Register a key to delete in [`TestRedis::cleanup`]
    pub fn track(&self, key: impl Into<String>) {
        self.tracked_keys.lock().unwrap().push(key.into());
    }

    pub async fn cleanup(&self) {
        let keys: Vec<String> = self.tracked_keys.lock().unwrap().drain(..).collect();
        let mut conn = self.conn.clone();
        for key in keys {
            let _: redis::RedisResult<()> = conn.del(&key).await;
        }
    }
}

/// Skip the current test if Redis is not available
#[macro_export]
macro_rules! skip_if_no_redis {
    () => {
        match $crate::mocks::redis::TestRedis::connect().await {
            Some(r) => r,
            None => {
                eprintln!(
                    "Skipping test: Redis not available at {}",
                    $crate::mocks::redis::TEST_REDIS_URL
                );
                return;
            }
        }
    };
}
