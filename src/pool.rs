//! Connection pools

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::PoolConfig;
use crate::conn::PooledConnection;
use crate::error::{PoolError, Result};
use crate::factory::Factory;
use crate::store::PoolCore;

/// Point-in-time view of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub idle: usize,
    pub max_capacity: usize,
    pub closed: bool,
}

/// Bounded pool of reusable connections
///
/// Cheap to clone; every clone refers to the same pool, including across
/// [`reset`](Self::reset).
pub struct Pool<C> {
    current: Arc<RwLock<Arc<PoolCore<C>>>>,
}

impl<C> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Pool {
            current: Arc::clone(&self.current),
        }
    }
}

impl<C> Pool<C> {
    /// Create a pool holding `initial_size` connections and at most `max_capacity` idle ones
    pub async fn new(
        initial_size: usize,
        max_capacity: usize,
        factory: Factory<C>,
    ) -> Result<Self> {
        Self::with_config(PoolConfig::new(initial_size, max_capacity), factory).await
    }

    pub async fn with_config(config: PoolConfig, factory: Factory<C>) -> Result<Self> {
        let core = PoolCore::build(config, factory).await?;
        Ok(Pool {
            current: Arc::new(RwLock::new(core)),
        })
    }

    pub fn builder() -> PoolBuilder<C> {
        PoolBuilder::new()
    }

    fn core(&self) -> Arc<PoolCore<C>> {
        Arc::clone(&self.current.read())
    }

    /// Borrow a connection. Never waits: an idle connection is reused, otherwise the
    /// factory is called.
    pub async fn get(&self) -> Result<PooledConnection<C>> {
        self.core().get().await
    }

    /// Close the pool and every idle connection. Connections on loan are closed when
    /// released.
    pub fn close(&self) {
        self.core().close();
    }

    /// Replace the pool with a freshly built one
    ///
    /// The current pool is left untouched if the new one cannot be built. On success
    /// the old pool is closed and every clone of this handle uses the new one.
    pub async fn reset(
        &self,
        initial_size: usize,
        max_capacity: usize,
        factory: Factory<C>,
    ) -> Result<()> {
        let config = PoolConfig::new(initial_size, max_capacity);
        let core = PoolCore::build(config, factory)
            .await
            .map_err(|err| PoolError::Reset(Box::new(err)))?;

        let old = std::mem::replace(&mut *self.current.write(), core);
        old.close();
        debug!(initial_size, max_capacity, "pool reset");
        Ok(())
    }

    pub fn idle_count(&self) -> usize {
        self.core().idle_count()
    }

    pub fn max_capacity(&self) -> usize {
        self.core().max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.core().is_closed()
    }

    pub fn status(&self) -> PoolStatus {
        let core = self.core();
        PoolStatus {
            idle: core.idle_count(),
            max_capacity: core.max_capacity(),
            closed: core.is_closed(),
        }
    }
}

/// Builder for [`Pool`]. A factory is required.
pub struct PoolBuilder<C> {
    config: PoolConfig,
    factory: Option<Factory<C>>,
}

impl<C> PoolBuilder<C> {
    pub fn new() -> Self {
        PoolBuilder {
            config: PoolConfig::default(),
            factory: None,
        }
    }

    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_size(mut self, initial_size: usize) -> Self {
        self.config.initial_size = initial_size;
        self
    }

    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.config.max_capacity = max_capacity;
        self
    }

    pub fn factory(mut self, factory: Factory<C>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub async fn build(self) -> Result<Pool<C>> {
        let factory = self
            .factory
            .ok_or(PoolError::InvalidParameters("factory is required"))?;
        Pool::with_config(self.config, factory).await
    }
}

impl<C> Default for PoolBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
