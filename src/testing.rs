//! Connection doubles that record creation and closing

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::factory::{Factory, factory};

#[derive(Debug)]
pub struct Tracker {
    created: AtomicUsize,
    fail_after: AtomicUsize,
    closed: Mutex<Vec<usize>>,
}

#[derive(Debug)]
pub struct TestConn {
    pub id: usize,
    tracker: Arc<Tracker>,
}

impl Drop for TestConn {
    fn drop(&mut self) {
        self.tracker.closed.lock().push(self.id);
    }
}

impl Tracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Tracker {
            created: AtomicUsize::new(0),
            fail_after: AtomicUsize::new(usize::MAX),
            closed: Mutex::new(Vec::new()),
        })
    }

    pub fn factory(self: &Arc<Self>) -> Factory<TestConn> {
        let tracker = Arc::clone(self);
        factory(move || {
            let tracker = Arc::clone(&tracker);
            async move { tracker.create() }
        })
    }

    fn create(self: &Arc<Self>) -> io::Result<TestConn> {
        if self.created.load(Ordering::SeqCst) >= self.fail_after.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "dial refused",
            ));
        }
        Ok(TestConn {
            id: self.created.fetch_add(1, Ordering::SeqCst),
            tracker: Arc::clone(self),
        })
    }

    /// Make every factory call fail once `n` connections have been created
    pub fn fail_after(&self, n: usize) {
        self.fail_after.store(n, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Ids of closed connections, in closing order
    pub fn closed(&self) -> Vec<usize> {
        self.closed.lock().clone()
    }
}
