use crate::database::{ConnectionError, Database};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkQuery {
    pub label: &'static str,
    pub statement: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub label: String,
    /// wall clock time of execute and fetch, rounded to two decimals
    pub duration_ms: f64,
    pub rows: usize,
}

/// The fixed workload, executed in this order
pub const BENCHMARK_QUERIES: [BenchmarkQuery; 2] = [
    BenchmarkQuery {
        label: "Complex Query 1",
        statement: "select product_name, city, state, platform, device_type, avg(price) as avg_price
            from test_data
            where price > 500 and rating > 3 and is_new_customer = true and status = 'delivered'
            group by product_name, city, state, platform, device_type
            order by avg_price desc
            limit 20",
    },
    BenchmarkQuery {
        label: "Complex Query 2",
        statement: "select td1.product_name, td1.city, td1.price
            from test_data td1
            where td1.price = (
                select max(td2.price) from test_data td2 where td2.city = td1.city
            ) and td1.rating >= 4
            limit 20",
    },
];

/// Run `statement` once and pull its complete result set, returns the rounded latency in ms and the
/// number of rows
pub fn execute_and_time<D: Database>(
    db: &mut D,
    statement: &str,
) -> Result<(f64, usize), ConnectionError> {
    let start = Instant::now();
    let rows = db.fetch_all(statement)?;
    let elapsed = start.elapsed();

    Ok((round_ms(elapsed.as_secs_f64() * 1000.0), rows))
}

fn round_ms(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Execute every query once in order. The first failure aborts the remaining queries.
#[instrument(skip(db, queries), fields(backend = db.backend()))]
pub fn run_queries<D: Database>(
    db: &mut D,
    queries: &[BenchmarkQuery],
) -> Result<Vec<BenchmarkResult>, ConnectionError> {
    queries
        .iter()
        .map(|query| {
            debug!(label = query.label, "Running query");
            let (duration_ms, rows) = execute_and_time(db, query.statement)?;
            info!(label = query.label, rows = rows, "Finished in {duration_ms} ms");

            Ok(BenchmarkResult {
                label: query.label.to_owned(),
                duration_ms,
                rows,
            })
        })
        .collect()
}
