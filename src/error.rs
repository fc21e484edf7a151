//! Pool errors

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Error)]
pub enum PoolError {
    /// Construction parameters are out of range, or no factory was given
    #[error("parameter error: {0}")]
    InvalidParameters(&'static str),

    #[error("pool is closed")]
    Closed,

    /// The factory failed while lending a connection
    #[error("create conn err: {0}")]
    Create(#[source] io::Error),

    /// The factory failed while pre-populating a new pool
    #[error("factory is not able to fill the pool: {0}")]
    Fill(#[source] io::Error),

    /// A returned connection did not fit; it has already been closed
    #[error("pool is full")]
    Full,

    #[error("conn is nil, return")]
    NilConnection,

    #[error("reset err: {0}")]
    Reset(#[source] Box<PoolError>),
}
