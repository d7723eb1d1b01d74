//! Postgres Collector
//!
//! Exposes server and `pg_stat_database` metrics for one Postgres instance.
//! The connection pool is created lazily: construction only validates the
//! data source, the first scrape opens the connection.

use super::ScrapeError;
use crate::domain::error::GatewayError;
use crate::domain::ports::Collector;
use async_trait::async_trait;
use prometheus::{Gauge, GaugeVec, IntCounter, Opts, Registry};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};

const STAT_DATABASE_QUERY: &str = "\
SELECT d.datname::text, \
       s.numbackends::float8, \
       s.xact_commit::float8, \
       s.xact_rollback::float8, \
       s.blks_read::float8, \
       s.blks_hit::float8, \
       s.deadlocks::float8, \
       pg_database_size(d.oid)::float8 \
FROM pg_stat_database s \
JOIN pg_database d ON d.oid = s.datid \
WHERE d.datallowconn";

type DatabaseRow = (String, f64, f64, f64, f64, f64, f64, f64);

struct PostgresMetrics {
    up: Gauge,
    scrapes: IntCounter,
    last_scrape_error: Gauge,
    last_scrape_duration: Gauge,
    version: GaugeVec,
    numbackends: GaugeVec,
    xact_commit: GaugeVec,
    xact_rollback: GaugeVec,
    blks_read: GaugeVec,
    blks_hit: GaugeVec,
    deadlocks: GaugeVec,
    database_size: GaugeVec,
}

impl PostgresMetrics {
    fn new(namespace: &str) -> prometheus::Result<Self> {
        let exporter = |name: &str, help: &str| {
            Opts::new(name, help).namespace(namespace).subsystem("exporter")
        };
        let stat = |name: &str, help: &str| {
            GaugeVec::new(
                Opts::new(name, help)
                    .namespace(namespace)
                    .subsystem("stat_database"),
                &["datname"],
            )
        };

        Ok(Self {
            up: Gauge::with_opts(Opts::new("up", "Whether the last scrape of the database succeeded.").namespace(namespace))?,
            scrapes: IntCounter::with_opts(exporter("scrapes_total", "Total number of scrapes of the database."))?,
            last_scrape_error: Gauge::with_opts(exporter("last_scrape_error", "Whether the last scrape resulted in an error (1 for error, 0 for success)."))?,
            last_scrape_duration: Gauge::with_opts(exporter("last_scrape_duration_seconds", "Duration of the last scrape of the database."))?,
            version: GaugeVec::new(
                Opts::new("static", "Version string as reported by postgres.").namespace(namespace),
                &["version"],
            )?,
            numbackends: stat("numbackends", "Number of backends currently connected to this database.")?,
            xact_commit: stat("xact_commit", "Number of transactions in this database that have been committed.")?,
            xact_rollback: stat("xact_rollback", "Number of transactions in this database that have been rolled back.")?,
            blks_read: stat("blks_read", "Number of disk blocks read in this database.")?,
            blks_hit: stat("blks_hit", "Number of times disk blocks were found already in the buffer cache.")?,
            deadlocks: stat("deadlocks", "Number of deadlocks detected in this database.")?,
            database_size: GaugeVec::new(
                Opts::new("size_bytes", "Disk space used by the database.")
                    .namespace(namespace)
                    .subsystem("database"),
                &["datname"],
            )?,
        })
    }
}

/// Collector bound to one Postgres data source.
pub struct PostgresCollector {
    data_source: String,
    pool: PgPool,
    timeout: Duration,
    metrics: PostgresMetrics,
}

impl PostgresCollector {
    /// Create a collector for `data_source`.
    ///
    /// A non-empty `prefix` is prepended to every metric name
    /// (`<prefix>_pg_up`). `timeout` bounds each scrape, connection included.
    pub fn new(data_source: String, prefix: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let namespace = if prefix.is_empty() {
            "pg".to_string()
        } else {
            format!("{}_pg", prefix)
        };

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_lazy(&data_source)
            .map_err(|e| GatewayError::Upstream(format!("invalid postgres data source: {}", e)))?;

        Ok(Self {
            data_source,
            pool,
            timeout,
            metrics: PostgresMetrics::new(&namespace)?,
        })
    }

    async fn query(&self) -> Result<(), ScrapeError> {
        let version: String = sqlx::query_scalar("SHOW server_version")
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<DatabaseRow> = sqlx::query_as(STAT_DATABASE_QUERY)
            .fetch_all(&self.pool)
            .await?;

        let m = &self.metrics;
        m.version.reset();
        m.version.with_label_values(&[version.as_str()]).set(1.0);

        for vec in [
            &m.numbackends,
            &m.xact_commit,
            &m.xact_rollback,
            &m.blks_read,
            &m.blks_hit,
            &m.deadlocks,
            &m.database_size,
        ] {
            vec.reset();
        }
        for (datname, backends, commit, rollback, read, hit, deadlocks, size) in rows {
            let labels = [datname.as_str()];
            m.numbackends.with_label_values(&labels).set(backends);
            m.xact_commit.with_label_values(&labels).set(commit);
            m.xact_rollback.with_label_values(&labels).set(rollback);
            m.blks_read.with_label_values(&labels).set(read);
            m.blks_hit.with_label_values(&labels).set(hit);
            m.deadlocks.with_label_values(&labels).set(deadlocks);
            m.database_size.with_label_values(&labels).set(size);
        }
        Ok(())
    }
}

#[async_trait]
impl Collector for PostgresCollector {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn endpoint(&self) -> &str {
        &self.data_source
    }

    fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        let m = &self.metrics;
        registry.register(Box::new(m.up.clone()))?;
        registry.register(Box::new(m.scrapes.clone()))?;
        registry.register(Box::new(m.last_scrape_error.clone()))?;
        registry.register(Box::new(m.last_scrape_duration.clone()))?;
        registry.register(Box::new(m.version.clone()))?;
        registry.register(Box::new(m.numbackends.clone()))?;
        registry.register(Box::new(m.xact_commit.clone()))?;
        registry.register(Box::new(m.xact_rollback.clone()))?;
        registry.register(Box::new(m.blks_read.clone()))?;
        registry.register(Box::new(m.blks_hit.clone()))?;
        registry.register(Box::new(m.deadlocks.clone()))?;
        registry.register(Box::new(m.database_size.clone()))?;
        Ok(())
    }

    async fn scrape(&self) {
        let start = Instant::now();
        self.metrics.scrapes.inc();

        let result = match tokio::time::timeout(self.timeout, self.query()).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout),
        };

        match result {
            Ok(()) => {
                self.metrics.up.set(1.0);
                self.metrics.last_scrape_error.set(0.0);
            }
            Err(e) => {
                tracing::warn!("postgres scrape failed: {}", e);
                self.metrics.up.set(0.0);
                self.metrics.last_scrape_error.set(1.0);
            }
        }
        self.metrics
            .last_scrape_duration
            .set(start.elapsed().as_secs_f64());
    }
}
