//! Connection factories

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

pub type FactoryFuture<C> = Pin<Box<dyn Future<Output = io::Result<C>> + Send + 'static>>;

/// Zero-argument connection constructor. May be called from several tasks at once.
pub type Factory<C> = Arc<dyn Fn() -> FactoryFuture<C> + Send + Sync + 'static>;

/// Box an async closure into a [`Factory`]
///
/// ```ignore
/// let factory = conn_pool::factory(move || TcpStream::connect(addr));
/// ```
pub fn factory<C, F, Fut>(f: F) -> Factory<C>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = io::Result<C>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as FactoryFuture<C>)
}
