//! Opaque session handles.

use std::{any::Any, fmt, sync::Arc};

/// An opaque driver session handle passed through to the driver untouched.
///
/// Each driver decides what it stores inside; the MongoDB driver stores a client session.
/// Handles compare equal when they are clones of the same session.
#[derive(Clone)]
pub struct Session {
    handle: Arc<dyn Any + Send + Sync>,
}

impl Session {
    /// Wraps a driver-specific session value.
    pub fn new<T: Any + Send + Sync>(handle: T) -> Self {
        Self { handle: Arc::new(handle) }
    }

    /// Returns the driver-specific session value if it has type `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.handle
            .clone()
            .downcast::<T>()
            .ok()
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.handle) as *const ()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.addr())
            .finish()
    }
}
