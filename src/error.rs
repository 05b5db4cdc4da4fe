use thiserror::Error;

use crate::schema::Column;

/// Failures that stop a dataset from loading at all.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no worksheet")]
    NoWorksheet,

    #[error("dataset has no header row")]
    EmptyHeader,
}

/// Recoverable conditions surfaced to the user as informational messages.
/// None of these abort the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    #[error("{what} requires column(s) {}", join(.columns))]
    MissingColumns {
        what: &'static str,
        columns: Vec<Column>,
    },

    #[error("{metric} is not computable for {rows} row(s) (zero or missing denominator)")]
    UndefinedMetric { metric: &'static str, rows: usize },

    #[error("campaign '{name}' not found in dataset")]
    CampaignNotFound { name: String },

    #[error("row {row}: unparseable date '{value}' excluded from trend")]
    MalformedDate { row: usize, value: String },
}

fn join(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(", ")
}
