use crate::{
    bench::{self, BENCHMARK_QUERIES},
    config::{BenchConfig, ConfigErrors, DatabaseConfig},
    database::{Connection, ConnectionError, Database},
    generate::{self, LoadSummary},
    report::{self, BenchmarkReport, ReportError},
    schema::{self, SchemaError},
};
use thiserror::Error;
use tracing::{error, instrument};

#[derive(Error, Debug)]
pub enum BenchError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Open a connection for the duration of `operation`. The connection is closed on every path, a
/// close failure after a failed operation is only logged so the original error is kept.
fn with_connection<T, F>(config: &DatabaseConfig, operation: F) -> Result<T, BenchError>
where
    F: FnOnce(&mut Connection) -> Result<T, BenchError>,
{
    let mut connection = Connection::open(config)?;

    match operation(&mut connection) {
        Ok(value) => {
            connection.close()?;

            Ok(value)
        }
        Err(error) => {
            if let Err(close_error) = connection.close() {
                error!(error = ?close_error, "Failed to close connection after error: {close_error}");
            }

            Err(error)
        }
    }
}

/// Recreate the benchmark table and fill it with synthetic rows
#[instrument(skip(config))]
pub fn generate(config: &BenchConfig) -> Result<LoadSummary, BenchError> {
    with_connection(&config.database, |db| {
        schema::create_table(db)?;

        Ok(generate::load(db, &config.generate)?)
    })
}

/// Measure the workload on the bare table, optimize schema and indexes, then measure again.
///
/// Indexes are dropped first so the baseline always runs unindexed.
#[instrument(skip(config))]
pub fn full_benchmark(config: &DatabaseConfig) -> Result<BenchmarkReport, BenchError> {
    report::print_banner("Benchmarking Before Optimization");
    with_connection(config, |db| {
        schema::drop_indexes(db);

        Ok(())
    })?;
    let before = run_phase(config)?;

    report::print_banner("Optimizing Schema & Indexes");
    with_connection(config, |db| Ok(schema::optimize_schema(db)?))?;
    with_connection(config, |db| Ok(schema::setup_indexes(db)?))?;

    report::print_banner("Benchmarking After Optimization");
    let after = run_phase(config)?;

    Ok(BenchmarkReport { before, after })
}

fn run_phase(config: &DatabaseConfig) -> Result<Vec<bench::BenchmarkResult>, BenchError> {
    let results = with_connection(config, |db| {
        Ok(bench::run_queries(db, &BENCHMARK_QUERIES)?)
    })?;
    report::print_results("Benchmark Results", &results);

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Backend, GenerateConfig},
        schema::INDEXES,
        table::TABLE,
    };
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> BenchConfig {
        BenchConfig {
            database: DatabaseConfig {
                backend: Backend::SQLite,
                path: dir.path().join("bench.db"),
            },
            generate: GenerateConfig {
                total_rows: 800,
                batch_size: 300,
                seed: 5,
            },
        }
    }

    #[test]
    fn generate_fills_table() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let summary = generate(&config).unwrap();
        assert_eq!(summary.batches, vec![300, 300, 200]);

        let mut db = Connection::open(&config.database).unwrap();
        assert_eq!(db.query_scalar("select count(*) from test_data").unwrap(), 800);
    }

    #[test]
    fn full_benchmark_reports_both_phases() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        generate(&config).unwrap();

        let report = full_benchmark(&config.database).unwrap();

        for phase in [&report.before, &report.after] {
            let labels = phase.iter().map(|r| r.label.as_str()).collect::<Vec<_>>();
            assert_eq!(labels, vec!["Complex Query 1", "Complex Query 2"]);
        }

        let mut db = Connection::open(&config.database).unwrap();
        assert_eq!(db.indexes(TABLE).unwrap().len(), INDEXES.len());
        assert!(db
            .columns(TABLE)
            .unwrap()
            .contains(&schema::DERIVED_COLUMN.to_owned()));
    }

    #[test]
    fn full_benchmark_can_be_repeated() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        generate(&config).unwrap();

        full_benchmark(&config.database).unwrap();
        let report = full_benchmark(&config.database).unwrap();

        assert_eq!(report.before.len(), BENCHMARK_QUERIES.len());
        assert_eq!(report.after.len(), BENCHMARK_QUERIES.len());
    }

    #[test]
    fn missing_table_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let error = full_benchmark(&config.database).unwrap_err();

        assert!(matches!(error, BenchError::Connection(_)));
    }
}
