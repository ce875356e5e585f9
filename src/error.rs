use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{table}: state {key} does not have steps")]
    MissingRecord { table: String, key: String },
    #[error("{stage} FAILED with range {min}->{max}")]
    NoIdaSolution { stage: String, min: u32, max: u32 },
    #[error("{stage}: best-first search FAILED after {explored} nodes")]
    NoBestFirstSolution { stage: String, explored: u64 },
    #[error("{table} does not have max_depth and does not have steps for {key}")]
    HeuristicMisconfigured { table: String, key: String },
    #[error("{region} {symbol} count is {count} (should be {expected})")]
    SanityCheckFailed { region: String, symbol: char, count: usize, expected: usize },
    #[error("no support for {0}")]
    UnimplementedVariant(String),

    #[error("{}: table file does not exist", .path.display())]
    TableMissing { path: PathBuf },
    #[error("{}: {reason}", .path.display())]
    MalformedTable { path: PathBuf, reason: String },
    #[error("{table}: key {key:?} is {} bytes, table keys are {expected} bytes", .key.len())]
    KeyWidth { table: String, key: String, expected: usize },
    #[error("{table}: chained lookups came back to {key}")]
    CyclicTable { table: String, key: String },
    #[error("invalid step {0:?}")]
    InvalidStep(String),
    #[error("puzzle has no step {0}")]
    UnknownStep(String),
    #[error("illegal move {0} is not in the list of legal moves")]
    IllegalMoveNotLegal(String),
    #[error("invalid puzzle: {0}")]
    InvalidPuzzle(String),
    #[error("invalid stage config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
