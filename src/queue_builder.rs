//! Per-session accumulation of playables and their lazy expansion.
//!
//! A [`QueueBuilder`] collects the URIs that a session asks to play and
//! later hands them out one singular URI at a time. Collections like albums
//! and playlists are only resolved once [`next`](QueueBuilder::next) reaches
//! them, so nothing is fetched for work that gets canceled before it is
//! needed.
//!
//! # Ordering
//!
//! URIs come out in the order they were pushed. A collection expands in
//! place into its resolved URIs, in the order the resolver returned them.
//!
//! # Concurrency
//!
//! All methods take `&self` so that a builder can be shared between its
//! manager and a background drain task. Calls to `next` must not overlap:
//! each call pops from the backlog before it awaits the resolver. Canceling
//! does not need to wait for an outstanding `next`; it takes effect on the
//! following call.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use futures_util::{stream, Stream};

use crate::{
    device::Device,
    error::Result,
    playable::Playable,
    remote::UriResolver,
    session::SessionId,
    uri::{self, UriType},
};

/// Outcome of [`QueueBuilder::next`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Next {
    /// A singular URI, ready to be played or queued.
    Produced(String),
    /// Nothing more will be produced.
    Finished,
}

#[derive(Debug, Default)]
struct Backlog {
    /// URIs pushed but not yet processed.
    source: VecDeque<String>,
    /// Resolved URIs of the last expanded collection.
    ready: VecDeque<String>,
}

pub struct QueueBuilder {
    session: SessionId,
    device: Device,
    resolver: Arc<dyn UriResolver>,
    backlog: Mutex<Backlog>,
    canceled: AtomicBool,
}

impl QueueBuilder {
    /// Creates an empty builder that will play on `device`.
    #[must_use]
    pub fn new(session: SessionId, device: Device, resolver: Arc<dyn UriResolver>) -> Self {
        Self {
            session,
            device,
            resolver,
            backlog: Mutex::new(Backlog::default()),
            canceled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// The device that was active when this builder was created.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn backlog(&self) -> MutexGuard<'_, Backlog> {
        // A panic cannot leave the backlog half-updated: every mutation is a
        // single push, pop or assignment.
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `playable` to the backlog. Nothing is resolved yet.
    pub fn push(&self, playable: &Playable) {
        self.push_uri(playable.uri());
    }

    pub fn push_uri(&self, uri: impl Into<String>) {
        let uri = uri.into();
        trace!("{}: pushing {uri}", self.session);
        self.backlog().source.push_back(uri);
    }

    /// Number of entries in the backlog that were not processed yet.
    ///
    /// Resolved URIs waiting to be handed out are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backlog().source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backlog().source.is_empty()
    }

    /// The only backlog entry, if there is exactly one.
    #[must_use]
    pub fn sole_uri(&self) -> Option<String> {
        let backlog = self.backlog();
        if backlog.source.len() == 1 {
            backlog.source.front().cloned()
        } else {
            None
        }
    }

    /// Stops this builder from producing anything further.
    pub fn cancel(&self) {
        if !self.canceled.swap(true, Ordering::SeqCst) {
            debug!("{}: canceled queue builder", self.session);
        }
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Produces the next singular URI, resolving collections as needed.
    ///
    /// Returns [`Next::Finished`] once the backlog is exhausted or the
    /// builder is canceled. Cancellation also discards URIs that were
    /// already resolved.
    ///
    /// # Errors
    ///
    /// Returns an error when a backlog entry cannot be classified or when
    /// resolving a collection fails. The failing entry is consumed either
    /// way.
    pub async fn next(&self) -> Result<Next> {
        // Every pass consumes one backlog entry, so this terminates even when
        // many collections in a row resolve to nothing.
        loop {
            let uri = {
                let mut backlog = self.backlog();
                trace!(
                    "{}: next with {} source and {} ready uri(s)",
                    self.session,
                    backlog.source.len(),
                    backlog.ready.len()
                );

                if self.is_canceled() {
                    debug!("{}: canceled, done", self.session);
                    return Ok(Next::Finished);
                }

                if let Some(uri) = backlog.ready.pop_front() {
                    return Ok(Next::Produced(uri));
                }

                match backlog.source.pop_front() {
                    Some(uri) => uri,
                    None => {
                        debug!("{}: no more source uris, done", self.session);
                        return Ok(Next::Finished);
                    }
                }
            };

            if uri::uri_type(&uri)?.is_singular() {
                return Ok(Next::Produced(uri));
            }

            debug!("{}: resolving {uri}", self.session);
            let resolved = self.resolver.resolve(&uri).await?;
            debug!("{}: resolved {uri} into {} uri(s)", self.session, resolved.len());

            self.backlog().ready = resolved.into();
        }
    }

    /// Takes the URIs that can start playback right away.
    ///
    /// This is the run of singular URIs at the front of the backlog. When the
    /// backlog starts with a collection instead, that collection is resolved
    /// and its URIs are returned.
    ///
    /// # Errors
    ///
    /// Returns an error when the first entry cannot be classified or fails
    /// to resolve.
    pub async fn initial_uris(&self) -> Result<Vec<String>> {
        let first = {
            let mut backlog = self.backlog();
            if backlog.source.is_empty() {
                error!("{}: attempting to take initial uris from empty queue builder", self.session);
                return Ok(Vec::new());
            }

            let mut ready = Vec::new();
            while let Some(uri) = backlog.source.front() {
                if !uri::uri_type(uri).is_ok_and(UriType::is_singular) {
                    break;
                }
                ready.extend(backlog.source.pop_front());
            }

            if !ready.is_empty() {
                debug!(
                    "{}: found {} initial ready uri(s), {} remaining",
                    self.session,
                    ready.len(),
                    backlog.source.len()
                );
                return Ok(ready);
            }

            backlog.source.pop_front()
        };

        let Some(first) = first else {
            return Ok(Vec::new());
        };

        uri::uri_type(&first)?;
        debug!("{}: no initial ready uris, resolving {first}", self.session);
        self.resolver.resolve(&first).await
    }

    /// Turns the builder into a stream of the URIs that
    /// [`next`](Self::next) produces.
    ///
    /// The stream ends when the builder finishes or is canceled. An error is
    /// yielded once and ends the stream.
    pub fn stream(self: Arc<Self>) -> impl Stream<Item = Result<String>> + Send {
        stream::unfold(Some(self), |builder| async move {
            let builder = builder?;
            match builder.next().await {
                Ok(Next::Produced(uri)) => Some((Ok(uri), Some(builder))),
                Ok(Next::Finished) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl fmt::Debug for QueueBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("session", &self.session)
            .field("device", &self.device)
            .field("backlog", &*self.backlog())
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}
