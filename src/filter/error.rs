use thiserror::Error;

/// Problems with a client-supplied list query. All of them map to 400.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown column: {0}")]
    InvalidColumn(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid value for operator: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Invalid paging: {0}")]
    InvalidPaging(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}
