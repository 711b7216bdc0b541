use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{fmt, fs::File, io::Error, path::Path, path::PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file")]
    ReadFailed(#[from] Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] serde_yaml::Error),
    #[error("Config failed preflight checks")]
    PreflightFailed,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default, alias = "db")]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[value(name = "sqlite")]
    SQLite,
    #[value(name = "duckdb")]
    DuckDB,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SQLite => f.write_str("sqlite"),
            Self::DuckDB => f.write_str("duckdb"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_database_path(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    // number of rows the table holds after loading
    #[serde(default = "default_total_rows")]
    pub total_rows: u64,
    // rows per bulk insert, each batch is its own transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            total_rows: default_total_rows(),
            batch_size: default_batch_size(),
            seed: default_seed(),
        }
    }
}

impl BenchConfig {
    /// read a YAML config, every missing field falls back to its default
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let config = serde_yaml::from_reader(File::open(path)?)?;
        info!(path = ?path, "Loaded config");

        Ok(config)
    }

    /// attempt to catch all errors instead of piece-by-piece to make debugging easier for users
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.generate.batch_size == 0 {
            error!("generate.batch_size must be at least 1");
            contains_error = true;
        }

        if self.generate.total_rows == 0 {
            warn!("generate.total_rows is 0, the table will be left empty");
        }

        if cfg!(not(feature = "duckdb")) && self.database.backend == Backend::DuckDB {
            error!("database.backend is duckdb but this binary was built without the duckdb feature");
            contains_error = true;
        }

        if self.database.path.as_os_str().is_empty() {
            error!("database.path must not be empty");
            contains_error = true;
        }

        contains_error
    }
}

fn default_backend() -> Backend {
    Backend::SQLite
}

fn default_database_path() -> PathBuf {
    PathBuf::from("querybench.db")
}

fn default_total_rows() -> u64 {
    100_000
}

fn default_batch_size() -> usize {
    1_000
}

fn default_seed() -> u64 {
    42
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config: BenchConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.database.backend, Backend::SQLite);
        assert_eq!(config.database.path, PathBuf::from("querybench.db"));
        assert_eq!(config.generate, GenerateConfig::default());
        assert_eq!(config.generate.total_rows, 100_000);
        assert_eq!(config.generate.batch_size, 1_000);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config: BenchConfig = serde_yaml::from_str(
            "db:
  backend: duckdb
  path: bench.duckdb
generate:
  total_rows: 1500
",
        )
        .unwrap();

        assert_eq!(config.database.backend, Backend::DuckDB);
        assert_eq!(config.database.path, PathBuf::from("bench.duckdb"));
        assert_eq!(config.generate.total_rows, 1500);
        assert_eq!(config.generate.batch_size, 1_000);
        assert_eq!(config.generate.seed, 42);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_yaml::from_str::<BenchConfig>("generate:\n  rows: 10\n");

        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "generate:\n  batch_size: 250").unwrap();

        let config = BenchConfig::load(file.path()).unwrap();

        assert_eq!(config.generate.batch_size, 250);
    }

    #[test]
    fn load_missing_file_fails() {
        let result = BenchConfig::load(Path::new("/nonexistent/querybench.yaml"));

        assert!(matches!(result, Err(ConfigErrors::ReadFailed(_))));
    }

    #[test]
    fn preflight_rejects_zero_batch_size() {
        let mut config = BenchConfig::default();
        assert!(!config.preflight_checks());

        config.generate.batch_size = 0;
        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_allows_empty_load() {
        let mut config = BenchConfig::default();
        config.generate.total_rows = 0;

        assert!(!config.preflight_checks());
    }
}
