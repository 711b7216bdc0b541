use crate::bench::BenchmarkResult;
use prettytable::{format, row, Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

const BANNER_WIDTH: usize = 80;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create report file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Results of one orchestrated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub before: Vec<BenchmarkResult>,
    pub after: Vec<BenchmarkResult>,
}

pub fn banner(title: &str) -> String {
    format!("{:─^width$}", format!(" {title} "), width = BANNER_WIDTH)
}

pub fn print_banner(title: &str) {
    println!("\n{}", banner(title));
}

pub fn results_table(results: &[BenchmarkResult]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Query", "Execution Time (ms)", "Rows"]);

    for result in results {
        table.add_row(Row::new(vec![
            Cell::new(&result.label),
            right(format!("{:.2}", result.duration_ms)),
            right(result.rows.to_string()),
        ]));
    }

    table
}

pub fn print_results(title: &str, results: &[BenchmarkResult]) {
    println!("{title}");
    results_table(results).printstd();
}

/// before/after latency per query, labels missing on either side are skipped
pub fn comparison_table(report: &BenchmarkReport) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(row!["Query", "Before (ms)", "After (ms)", "Speedup"]);

    for before in report.before.iter() {
        if let Some(after) = report.after.iter().find(|after| after.label == before.label) {
            table.add_row(Row::new(vec![
                Cell::new(&before.label),
                right(format!("{:.2}", before.duration_ms)),
                right(format!("{:.2}", after.duration_ms)),
                right(speedup(before.duration_ms, after.duration_ms)),
            ]));
        }
    }

    table
}

fn right(content: String) -> Cell {
    Cell::new(&content).style_spec("r")
}

fn speedup(before: f64, after: f64) -> String {
    if after > 0.0 {
        format!("{:.2}x", before / after)
    } else {
        "n/a".to_owned()
    }
}

pub fn print_comparison(report: &BenchmarkReport) {
    println!("Comparison");
    comparison_table(report).printstd();
}

pub fn write_yaml(path: &Path, report: &BenchmarkReport) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_yaml::to_writer(file, report)?;
    info!(path = ?path, "Wrote benchmark report");

    Ok(())
}
