//! Bounded pool of reusable connections
//!
//! A [`Pool`] lends out idle connections, or creates new ones through a caller-supplied
//! [`Factory`] when none are idle. Borrowed connections come back wrapped in a
//! [`PooledConnection`], which returns them to the pool when released or dropped.

pub mod common;
pub mod config;
pub mod conn;
pub mod error;
pub mod factory;
pub mod pool;
mod store;

#[cfg(test)]
mod testing;

pub use config::PoolConfig;
pub use conn::PooledConnection;
pub use error::{PoolError, Result};
pub use factory::{Factory, FactoryFuture, factory};
pub use pool::{Pool, PoolBuilder, PoolStatus};
