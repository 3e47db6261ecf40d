//! Sessions own queue builders and tell when to flush them.
//!
//! A session is one logical owner of playback requests, typically one
//! voice-assistant application run. Requests made during the session are
//! collected and only sent to the device when the session ends. The end of
//! a session is signalled through the teardown hooks registered on it.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use futures_util::future::BoxFuture;

use crate::error::Result;

/// Opaque key of a session.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Work to run once when a session ends.
pub type TeardownHook = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// The surface of a session as seen by the queue builder manager.
pub trait Session: Send + Sync {
    fn id(&self) -> &SessionId;

    /// Registers `hook` to run when the session ends.
    fn on_teardown(&self, hook: TeardownHook);
}

/// A session that keeps its hooks in memory until [`teardown`] runs them.
///
/// [`teardown`]: AppSession::teardown
pub struct AppSession {
    id: SessionId,
    hooks: Mutex<Vec<TeardownHook>>,
}

impl AppSession {
    #[must_use]
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Number of hooks waiting for teardown.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Ends the session by running its hooks in registration order.
    ///
    /// Every hook runs, even when an earlier one fails. Hooks run at most
    /// once: calling this again only runs hooks registered since.
    ///
    /// # Errors
    ///
    /// Returns the first error of any hook. Later errors are logged.
    pub async fn teardown(&self) -> Result<()> {
        let hooks = std::mem::take(&mut *self.hooks.lock().unwrap_or_else(PoisonError::into_inner));
        debug!("{}: tearing down with {} hook(s)", self.id, hooks.len());

        let mut result = Ok(());
        for hook in hooks {
            if let Err(e) = hook().await {
                if result.is_ok() {
                    result = Err(e);
                } else {
                    error!("{}: teardown hook failed: {e}", self.id);
                }
            }
        }

        result
    }
}

impl Session for AppSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn on_teardown(&self, hook: TeardownHook) {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }
}

impl fmt::Debug for AppSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSession")
            .field("id", &self.id)
            .field("hooks", &self.hook_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures_util::FutureExt;

    use super::*;
    use crate::error::{Error, ErrorKind};

    fn counting_hook(counter: &Arc<AtomicUsize>, fail: bool) -> TeardownHook {
        let counter = Arc::clone(counter);
        Box::new(move || {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(Error::unavailable("hook failed"))
                } else {
                    Ok(())
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn runs_every_hook_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let session = AppSession::new("app");
        session.on_teardown(counting_hook(&counter, false));
        session.on_teardown(counting_hook(&counter, false));
        assert_eq!(session.hook_count(), 2);

        session.teardown().await.unwrap();
        session.teardown().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(session.hook_count(), 0);
    }

    #[tokio::test]
    async fn returns_first_failure_after_running_all_hooks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let session = AppSession::new("app");
        session.on_teardown(counting_hook(&counter, true));
        session.on_teardown(counting_hook(&counter, false));

        let err = session.teardown().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
