//! SessionPool - idle sessions ready for reuse.

use crate::session::{Session, SessionFactory};
use parking_lot::Mutex;
use sf_error::ScriptError;
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace};

/// Pool of idle sessions for one processor.
///
/// Checkout never blocks: if no session is idle a new one is created.
/// Returned sessions beyond `max_idle` are dropped.
#[derive(Debug)]
pub struct SessionPool {
    factory: SessionFactory,
    idle: Mutex<Vec<Session>>,
    max_idle: usize,
}

impl SessionPool {
    /// Creates a pool seeded with `seed`. A `max_idle` of zero means no limit.
    pub(crate) fn new(factory: SessionFactory, seed: Session, max_idle: usize) -> Self {
        let pool = Self {
            factory,
            idle: Mutex::new(Vec::new()),
            max_idle,
        };
        pool.put(Some(seed));
        pool
    }

    /// Checks out a session, creating one if none is idle.
    ///
    /// New sessions run top-level statements and `register` but not `test`.
    pub fn get(&self) -> Result<PooledSession<'_>, ScriptError> {
        let idle = self.idle.lock().pop();
        let session = match idle {
            Some(session) => session,
            None => {
                debug!(processor = %self.factory.processor_id, "Creating script session");
                self.factory.create(false)?
            }
        };

        Ok(PooledSession {
            pool: self,
            session: Some(session),
        })
    }

    /// Returns a session for reuse. `None` and poisoned sessions are dropped.
    pub fn put(&self, session: Option<Session>) {
        let Some(mut session) = session else {
            return;
        };
        if session.is_poisoned() {
            debug!(processor = %self.factory.processor_id, "Discarding session after panic");
            return;
        }
        session.reset();

        let mut idle = self.idle.lock();
        if self.max_idle == 0 || idle.len() < self.max_idle {
            idle.push(session);
        } else {
            drop(idle);
            trace!(processor = %self.factory.processor_id, "Discarding surplus script session");
        }
    }

    /// Returns the number of idle sessions.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

/// A checked-out session, returned to its pool when dropped.
pub struct PooledSession<'a> {
    pool: &'a SessionPool,
    session: Option<Session>,
}

impl Deref for PooledSession<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        // Only taken in Drop.
        self.session.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledSession<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        self.pool.put(self.session.take());
    }
}
