/// PostgreSQL pool for the vote store
///
/// Each transition holds one connection for a short transaction that locks a
/// single post row, so the pool stays small and every session carries a
/// `lock_timeout` that bounds how long a vote can queue behind a hot post.
use crate::config::DatabaseConfig;
use crate::metrics;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Postgres;
use std::str::FromStr;
use std::time::{Duration, Instant};

const POOL_SAMPLE_INTERVAL: Duration = Duration::from_secs(15);

/// Connect, verify with `SELECT 1` and start the pool gauge sampler.
pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::from_str(url)?.application_name("vote-service");
    if config.lock_timeout_ms > 0 {
        options = options.options([("lock_timeout", format!("{}ms", config.lock_timeout_ms))]);
    }

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        lock_timeout_ms = config.lock_timeout_ms,
        "Connecting vote store to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    sample_pool(&pool);

    let sampled = pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POOL_SAMPLE_INTERVAL);
        while !sampled.is_closed() {
            interval.tick().await;
            sample_pool(&sampled);
        }
    });

    Ok(pool)
}

fn sample_pool(pool: &PgPool) {
    let size = i64::from(pool.size());
    let idle = pool.num_idle() as i64;
    let max = i64::from(pool.options().get_max_connections());
    metrics::set_pool_connections(idle, size - idle, max);
}

pub(crate) fn acquire_failure(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::PoolTimedOut => "timeout",
        sqlx::Error::PoolClosed => "closed",
        _ => "other",
    }
}

/// Check out a connection, recording wait time and failures.
pub async fn acquire(pool: &PgPool) -> Result<PoolConnection<Postgres>, sqlx::Error> {
    let start = Instant::now();
    let result = pool.acquire().await;
    metrics::record_acquire(
        start.elapsed().as_secs_f64(),
        result.as_ref().err().map(acquire_failure),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_failure_labels() {
        assert_eq!(acquire_failure(&sqlx::Error::PoolTimedOut), "timeout");
        assert_eq!(acquire_failure(&sqlx::Error::PoolClosed), "closed");
        assert_eq!(acquire_failure(&sqlx::Error::RowNotFound), "other");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let config = DatabaseConfig {
            url: None,
            max_connections: 2,
            min_connections: 0,
            acquire_timeout_secs: 1,
            lock_timeout_ms: 100,
        };
        assert!(connect("not a url", &config).await.is_err());
    }
}
