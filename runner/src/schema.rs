use crate::{
    database::{ConnectionError, Database, ErrorKind},
    table::{CREATE_TABLE, TABLE},
};
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to create index {index}: {source}")]
    CreateIndex {
        index: &'static str,
        source: ConnectionError,
    },
    #[error("Failed to optimize table storage: {0}")]
    Storage(ConnectionError),
    #[error("Failed to add derived column {column}: {source}")]
    DerivedColumn {
        column: &'static str,
        source: ConnectionError,
    },
    #[error("Failed to recreate table: {0}")]
    CreateTable(ConnectionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl IndexDescriptor {
    fn create_statement(&self) -> String {
        format!(
            "create index if not exists {} on {TABLE} ({})",
            self.name,
            self.columns.iter().join(", ")
        )
    }

    fn drop_statement(&self) -> String {
        format!("drop index {}", self.name)
    }
}

/// Indexes backing the two benchmark queries
pub const INDEXES: [IndexDescriptor; 3] = [
    IndexDescriptor {
        name: "idx_q1_composite",
        columns: &[
            "price",
            "rating",
            "is_new_customer",
            "status",
            "product_name",
            "city",
            "state",
            "platform",
            "device_type",
        ],
    },
    IndexDescriptor {
        name: "idx_q2_city_price",
        columns: &["city", "price"],
    },
    IndexDescriptor {
        name: "idx_rating",
        columns: &["rating"],
    },
];

/// stored copy of `DERIVED_EXPRESSION`
pub const DERIVED_COLUMN: &str = "price_rating_cache";
pub const DERIVED_EXPRESSION: &str = "price * rating";

/// drop and recreate the benchmark table, used before loading data
#[instrument(skip(db), fields(backend = db.backend()))]
pub fn create_table<D: Database>(db: &mut D) -> Result<(), SchemaError> {
    db.execute(&format!("drop table if exists {TABLE}"))
        .and_then(|_| db.execute(CREATE_TABLE))
        .map_err(SchemaError::CreateTable)?;
    info!("Created table {TABLE}");

    Ok(())
}

/// Remove every index in `INDEXES`. Failures are only logged, the names of indexes that could not be
/// dropped are returned.
#[instrument(skip(db), fields(backend = db.backend()))]
pub fn drop_indexes<D: Database>(db: &mut D) -> Vec<&'static str> {
    info!("Dropping existing indexes...");

    let skipped = INDEXES
        .iter()
        .filter_map(|index| match db.execute(&index.drop_statement()) {
            Ok(_) => {
                info!(index = index.name, "Dropped index");
                None
            }
            Err(error) => {
                warn!(index = index.name, kind = ?error.kind(), "Couldn't drop index {}: {error}", index.name);
                Some(index.name)
            }
        })
        .collect::<Vec<_>>();
    log_indexes(db);

    skipped
}

fn log_indexes<D: Database>(db: &mut D) {
    match db.indexes(TABLE) {
        Ok(indexes) => info!(indexes = ?indexes, "Indexes on {TABLE}"),
        Err(error) => warn!("Couldn't list indexes on {TABLE}: {error}"),
    }
}

/// Create every index in `INDEXES` unless it already exists
#[instrument(skip(db), fields(backend = db.backend()))]
pub fn setup_indexes<D: Database>(db: &mut D) -> Result<(), SchemaError> {
    info!("Creating indexes...");

    for index in INDEXES.iter() {
        match db.execute(&index.create_statement()) {
            Ok(_) => info!(index = index.name, "Created index"),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                warn!(index = index.name, "Index already exists: {error}")
            }
            Err(source) => {
                return Err(SchemaError::CreateIndex {
                    index: index.name,
                    source,
                })
            }
        }
    }

    info!("Indexes created");
    log_indexes(db);

    Ok(())
}

/// Move the table to the engine's transactional storage configuration and add the stored
/// `price * rating` column. Engines that support it keep the column in sync on later writes, the
/// loader refreshes it otherwise. Re-running refreshes the stored values.
#[instrument(skip(db), fields(backend = db.backend()))]
pub fn optimize_schema<D: Database>(db: &mut D) -> Result<(), SchemaError> {
    info!("Altering table storage and cache columns...");

    db.optimize_storage().map_err(SchemaError::Storage)?;

    match db.execute(&format!(
        "alter table {TABLE} add column {DERIVED_COLUMN} double"
    )) {
        Ok(_) => info!(column = DERIVED_COLUMN, "Added derived column"),
        Err(error) if error.kind() == ErrorKind::AlreadyExists => {
            info!(column = DERIVED_COLUMN, "Derived column already present")
        }
        Err(source) => {
            return Err(SchemaError::DerivedColumn {
                column: DERIVED_COLUMN,
                source,
            })
        }
    }

    let derived = |source| SchemaError::DerivedColumn {
        column: DERIVED_COLUMN,
        source,
    };
    let maintained = db
        .sync_derived_column(TABLE, DERIVED_COLUMN, DERIVED_EXPRESSION)
        .map_err(derived)?;
    let updated = fill_derived_column(db).map_err(derived)?;

    match db.columns(TABLE) {
        Ok(columns) => debug!(columns = columns.len(), "Columns of {TABLE}"),
        Err(error) => warn!("Couldn't list columns of {TABLE}: {error}"),
    }
    info!(rows = updated, maintained, "Schema optimization done");

    Ok(())
}

fn fill_derived_column<D: Database>(db: &mut D) -> Result<usize, ConnectionError> {
    db.execute(&format!(
        "update {TABLE} set {DERIVED_COLUMN} = {DERIVED_EXPRESSION}"
    ))
}

/// Recompute the derived column after a bulk write, a no-op until `optimize_schema` added it.
/// Returns the number of refreshed rows.
pub fn refresh_derived_column<D: Database>(
    db: &mut D,
) -> Result<Option<usize>, ConnectionError> {
    if !db.columns(TABLE)?.iter().any(|column| column == DERIVED_COLUMN) {
        return Ok(None);
    }

    let updated = fill_derived_column(db)?;
    debug!(rows = updated, "Refreshed {DERIVED_COLUMN}");

    Ok(Some(updated))
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
