use thiserror::Error;

/// Rejected filter input. Shown to clients as a 400.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown collection: {0}")]
    InvalidTableName(String),

    #[error("Invalid field path: {0}")]
    InvalidColumn(String),

    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid value for operator: {0}")]
    InvalidOperatorData(String),

    #[error("Filter nested deeper than {0} levels")]
    TooDeep(u32),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),
}
