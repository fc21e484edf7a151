//! Connections on loan from a pool

use std::fmt;
use std::io::{self, IoSlice, Read, Write};
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::error::Result;
use crate::store::PoolCore;

/// A connection lent out by a [`Pool`](crate::Pool)
///
/// Behaves like the wrapped connection (deref, reads, writes). Releasing it, explicitly
/// with [`release`](Self::release) or by dropping it, hands the connection back to the
/// pool that lent it instead of closing it, unless it was marked unusable.
pub struct PooledConnection<C> {
    /// `None` once released or detached
    conn: Option<C>,
    pool: Arc<PoolCore<C>>,
    unusable: RwLock<bool>,
}

impl<C> PooledConnection<C> {
    pub(crate) fn new(conn: C, pool: Arc<PoolCore<C>>) -> Self {
        PooledConnection {
            conn: Some(conn),
            pool,
            unusable: RwLock::new(false),
        }
    }

    /// Give the connection back to the pool
    ///
    /// Returns [`PoolError::Full`](crate::PoolError::Full) if the pool had no room; the
    /// connection has been closed in that case.
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        let unusable = self.unusable.read();
        if *unusable {
            drop(self.conn.take());
            return Ok(());
        }
        self.pool.put(self.conn.take())
    }

    /// Keep this connection out of the pool. Releasing it afterwards closes it.
    pub fn mark_unusable(&self) {
        *self.unusable.write() = true;
    }

    pub fn is_unusable(&self) -> bool {
        *self.unusable.read()
    }

    /// Take the connection out of pool management entirely
    pub fn detach(mut self) -> C {
        self.conn
            .take()
            .expect("connection present until released - this is a bug")
    }
}

impl<C> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if self.conn.is_none() {
            return;
        }
        if let Err(err) = self.release_inner() {
            debug!(%err, "connection dropped without release");
        }
    }
}

impl<C> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn
            .as_ref()
            .expect("connection present until released - this is a bug")
    }
}

impl<C> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn
            .as_mut()
            .expect("connection present until released - this is a bug")
    }
}

impl<C: fmt::Debug> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .field("unusable", &self.is_unusable())
            .finish()
    }
}

impl<C: AsyncRead + Unpin> AsyncRead for PooledConnection<C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut **self.get_mut()).poll_read(cx, buf)
    }
}

impl<C: AsyncWrite + Unpin> AsyncWrite for PooledConnection<C> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut **self.get_mut()).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut **self.get_mut()).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        (**self).is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut **self.get_mut()).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut **self.get_mut()).poll_shutdown(cx)
    }
}

impl<C: Read> Read for PooledConnection<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }
}

impl<C: Write> Write for PooledConnection<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}
