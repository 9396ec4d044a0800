//! RAII release of native sessions.
//!
//! Every compress/decompress call wraps its session in a [`SessionGuard`].
//! Dropping the guard calls `end()` exactly once, including on `?` early
//! returns and unwinding.

use std::ops::{Deref, DerefMut};

use qzcodec_native::session::{CompressorSession, DecompressorSession};

/// A session that owns native state and must be released.
pub trait Release {
    fn release(&mut self);
}

impl Release for dyn CompressorSession {
    fn release(&mut self) {
        self.end();
    }
}

impl Release for dyn DecompressorSession {
    fn release(&mut self) {
        self.end();
    }
}

pub struct SessionGuard<S: ?Sized + Release> {
    session: Box<S>,
    tag: &'static str,
}

impl<S: ?Sized + Release> SessionGuard<S> {
    pub fn new(session: Box<S>, tag: &'static str) -> Self {
        Self { session, tag }
    }
}

impl<S: ?Sized + Release> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: ?Sized + Release> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: ?Sized + Release> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.release();
        #[cfg(feature = "tracing")]
        tracing::trace!(tag = self.tag, "released native session");
        #[cfg(not(feature = "tracing"))]
        let _ = self.tag;
    }
}

impl<S: ?Sized + Release> std::fmt::Debug for SessionGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard").field("tag", &self.tag).finish()
    }
}
