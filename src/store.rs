//! Bounded idle-connection store backing a [`Pool`](crate::Pool)

use std::sync::Arc;

use async_channel::{Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::conn::PooledConnection;
use crate::error::{PoolError, Result};
use crate::factory::Factory;

/// Idle connections plus the factory that refills them. Both exist only while the pool is open.
struct Store<C> {
    send: Sender<C>,
    recv: Receiver<C>,
    factory: Factory<C>,
}

impl<C> Clone for Store<C> {
    fn clone(&self) -> Self {
        Store {
            send: self.send.clone(),
            recv: self.recv.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

/// One pool instance. `None` in `store` means closed.
///
/// The lock only guards open vs. closed; the channel synchronizes its own contents, so
/// concurrent gets and puts only ever take the read side.
pub(crate) struct PoolCore<C> {
    store: RwLock<Option<Store<C>>>,
    max_capacity: usize,
}

impl<C> PoolCore<C> {
    /// Validate `config`, then call `factory` `initial_size` times to fill the store
    pub(crate) async fn build(config: PoolConfig, factory: Factory<C>) -> Result<Arc<Self>> {
        config.validate()?;

        let (send, recv) = async_channel::bounded(config.max_capacity);
        let core = Arc::new(PoolCore {
            store: RwLock::new(Some(Store {
                send: send.clone(),
                recv,
                factory: Arc::clone(&factory),
            })),
            max_capacity: config.max_capacity,
        });

        for _ in 0..config.initial_size {
            let conn = match factory().await {
                Ok(conn) => conn,
                Err(err) => {
                    core.close();
                    return Err(PoolError::Fill(err));
                }
            };
            // initial_size <= max_capacity and nobody else holds the sender yet
            if send.try_send(conn).is_err() {
                core.close();
                return Err(PoolError::Full);
            }
        }

        debug!(
            initial_size = config.initial_size,
            max_capacity = config.max_capacity,
            "pool created"
        );
        Ok(core)
    }

    fn snapshot(&self) -> Option<Store<C>> {
        self.store.read().clone()
    }

    /// Lend an idle connection, or create one if none are idle
    pub(crate) async fn get(self: &Arc<Self>) -> Result<PooledConnection<C>> {
        let Some(Store { recv, factory, .. }) = self.snapshot() else {
            return Err(PoolError::Closed);
        };

        match recv.try_recv() {
            Ok(conn) => {
                trace!("lending idle connection");
                Ok(self.wrap(conn))
            }
            // closed between the snapshot and the take
            Err(TryRecvError::Closed) => Err(PoolError::Closed),
            Err(TryRecvError::Empty) => {
                drop(recv);
                trace!("no idle connection, creating one");
                let conn = factory().await.map_err(PoolError::Create)?;
                Ok(self.wrap(conn))
            }
        }
    }

    /// Return a connection to the store, closing it if the store is closed or full
    pub(crate) fn put(&self, conn: Option<C>) -> Result<()> {
        let Some(conn) = conn else {
            return Err(PoolError::NilConnection);
        };

        let guard = self.store.read();
        let Some(store) = guard.as_ref() else {
            trace!("pool is closed, closing returned connection");
            drop(conn);
            return Ok(());
        };

        match store.send.try_send(conn) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(conn)) => {
                drop(conn);
                debug!(
                    max_capacity = self.max_capacity,
                    "pool is full, closed returned connection"
                );
                Err(PoolError::Full)
            }
            Err(TrySendError::Closed(conn)) => {
                drop(conn);
                Ok(())
            }
        }
    }

    /// Close the pool and every idle connection. Only the first call drains.
    pub(crate) fn close(&self) {
        let Some(store) = self.store.write().take() else {
            return;
        };

        store.recv.close();
        let mut drained = 0usize;
        while let Ok(conn) = store.recv.try_recv() {
            drop(conn);
            drained += 1;
        }
        debug!(drained, "pool closed");
    }

    pub(crate) fn wrap(self: &Arc<Self>, conn: C) -> PooledConnection<C> {
        PooledConnection::new(conn, Arc::clone(self))
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.store.read().as_ref().map_or(0, |store| store.recv.len())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.store.read().is_none()
    }

    pub(crate) fn max_capacity(&self) -> usize {
        self.max_capacity
    }
}

#[cfg(test)]
mod test {
    use super::PoolCore;
    use crate::config::PoolConfig;
    use crate::error::PoolError;
    use crate::testing::Tracker;

    #[tokio::test]
    async fn put_nothing() {
        let tracker = Tracker::new();
        let core = PoolCore::build(PoolConfig::new(0, 1), tracker.factory())
            .await
            .unwrap();
        assert!(matches!(core.put(None), Err(PoolError::NilConnection)));
        assert_eq!(core.idle_count(), 0);
    }

    #[tokio::test]
    async fn put_after_close_just_closes() {
        let tracker = Tracker::new();
        let core = PoolCore::build(PoolConfig::new(0, 2), tracker.factory())
            .await
            .unwrap();
        let conn = core.get().await.unwrap().detach();
        let id = conn.id;
        core.close();
        core.put(Some(conn)).unwrap();
        assert_eq!(tracker.closed(), vec![id]);
        assert_eq!(core.idle_count(), 0);
    }

    #[tokio::test]
    async fn close_drains_once() {
        let tracker = Tracker::new();
        let core = PoolCore::build(PoolConfig::new(3, 3), tracker.factory())
            .await
            .unwrap();
        core.close();
        core.close();
        assert!(core.is_closed());
        let mut closed = tracker.closed();
        closed.sort_unstable();
        assert_eq!(closed, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn failed_fill_closes_partial() {
        let tracker = Tracker::new();
        tracker.fail_after(2);
        let err = PoolCore::build(PoolConfig::new(4, 4), tracker.factory())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PoolError::Fill(_)));
        let mut closed = tracker.closed();
        closed.sort_unstable();
        assert_eq!(closed, vec![0, 1]);
    }
}
