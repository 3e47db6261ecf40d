//! Keyed registry of queue builders and the flush protocol.
//!
//! The manager keeps at most one *pending* builder per session: the one that
//! still accepts playables. When the session ends, its teardown hook
//! flushes that builder in two phases:
//!
//! 1. The first URI is played right away, so audio starts with the least
//!    possible delay.
//! 2. The rest is drained in a background task that adds each URI to the
//!    device queue. While that runs, the builder is registered as the
//!    session's *background* builder.
//!
//! A newer flush for the same session supersedes an older one that is still
//! draining: the older builder is canceled before the new first URI plays.
//!
//! # Lifecycle
//!
//! ```text
//! Pending --flush--> Flushing --first uri played--> Draining --> Done
//!                                                       |
//!                                                       +--superseded--> Canceled
//! ```

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures_util::{stream::FuturesUnordered, FutureExt, StreamExt};
use tokio::task::JoinHandle;

use crate::{
    error::Result,
    queue_builder::{Next, QueueBuilder},
    remote::{DeviceResolver, Player, UriResolver},
    session::{Session, SessionId, TeardownHook},
};

/// What a flush ended up doing.
#[derive(Debug)]
pub enum Flushed {
    /// There was nothing to play.
    Nothing,
    /// The single backlog entry was played directly.
    Direct,
    /// The first URI was played and the rest is draining in the background.
    Draining(JoinHandle<()>),
}

type Registry = Mutex<HashMap<SessionId, Arc<QueueBuilder>>>;

struct Inner {
    resolver: Arc<dyn UriResolver>,
    devices: Arc<dyn DeviceResolver>,
    player: Arc<dyn Player>,
    pending: Registry,
    background: Registry,
}

/// Hands out queue builders per session and flushes them on teardown.
///
/// Cloning is cheap and yields a handle to the same registries.
#[derive(Clone)]
pub struct QueueBuilderManager {
    inner: Arc<Inner>,
}

impl QueueBuilderManager {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn UriResolver>,
        devices: Arc<dyn DeviceResolver>,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                devices,
                player,
                pending: Mutex::default(),
                background: Mutex::default(),
            }),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<QueueBuilder>>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn background(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<QueueBuilder>>> {
        self.inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `session` has a builder that still accepts playables.
    #[must_use]
    pub fn is_pending(&self, session: &SessionId) -> bool {
        self.pending().contains_key(session)
    }

    /// Whether `session` has a builder draining in the background.
    #[must_use]
    pub fn is_draining(&self, session: &SessionId) -> bool {
        self.background().contains_key(session)
    }

    /// Returns the pending builder of `session`, creating it if needed.
    ///
    /// A new builder targets the device that is active at this moment, and
    /// a teardown hook that flushes it is registered on `session`.
    ///
    /// # Errors
    ///
    /// Returns an error when no device can be found for the session.
    pub async fn get(&self, session: &dyn Session) -> Result<Arc<QueueBuilder>> {
        let id = session.id();
        if let Some(builder) = self.pending().get(id) {
            return Ok(Arc::clone(builder));
        }

        let device = self.inner.devices.active_device(id).await?;

        // Another call may have created the builder while the device was
        // being resolved.
        let builder = match self.pending().entry(id.clone()) {
            Entry::Occupied(entry) => return Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                debug!("{id}: creating queue builder for {device}");
                let builder = Arc::new(QueueBuilder::new(
                    id.clone(),
                    device,
                    Arc::clone(&self.inner.resolver),
                ));
                Arc::clone(entry.insert(builder))
            }
        };

        session.on_teardown(self.flush_hook(id.clone()));
        Ok(builder)
    }

    fn flush_hook(&self, session: SessionId) -> TeardownHook {
        let manager = self.clone();
        Box::new(move || async move { manager.flush(&session).await.map(drop) }.boxed())
    }

    /// Flushes the pending builder of `session`.
    ///
    /// This normally runs from the teardown hook that [`get`](Self::get)
    /// registered. A builder with a single backlog entry has that entry
    /// played as-is, without resolving it. Otherwise the first URI is
    /// played and the remainder drains in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error when the first URI cannot be resolved or when the
    /// play request fails. Having nothing to flush is not an error.
    pub async fn flush(&self, session: &SessionId) -> Result<Flushed> {
        debug!("{session}: flushing queue builder");

        let Some(builder) = self.pending().remove(session) else {
            warn!("{session}: no queue builder to flush");
            return Ok(Flushed::Nothing);
        };

        if builder.is_empty() {
            error!("{session}: attempted to flush empty queue builder");
            return Ok(Flushed::Nothing);
        }

        let device_id = builder.device().id.clone();

        if let Some(uri) = builder.sole_uri() {
            debug!("{session}: single uri, playing {uri} directly");
            self.inner.player.play(&device_id, &uri).await?;
            return Ok(Flushed::Direct);
        }

        let uri = match builder.next().await? {
            Next::Produced(uri) => uri,
            Next::Finished => {
                error!("{session}: queue builder produced no uri to play");
                return Ok(Flushed::Nothing);
            }
        };

        if let Some(previous) = self.background().remove(session) {
            debug!("{session}: previous queue builder still draining, canceling");
            previous.cancel();
        }

        debug!("{session}: playing initial {uri}");
        self.inner.player.play(&device_id, &uri).await?;

        self.background().insert(session.clone(), Arc::clone(&builder));
        let handle = tokio::spawn(self.clone().drain(builder));

        Ok(Flushed::Draining(handle))
    }

    /// Adds everything that `builder` produces to the queue of its device.
    ///
    /// Queue requests are started in the order the URIs come out of the
    /// builder, but the builder does not wait for them: the next URI is
    /// produced while earlier requests are still in flight. The builder is
    /// deregistered as soon as it finishes, before the outstanding requests
    /// complete.
    async fn drain(self, builder: Arc<QueueBuilder>) {
        let session = builder.session().clone();
        let device_id = builder.device().id.clone();
        debug!("{session}: starting background drain");

        let uris = Arc::clone(&builder).stream();
        tokio::pin!(uris);

        let mut in_flight = FuturesUnordered::new();
        let mut queued = 0_usize;
        loop {
            tokio::select! {
                // Start requests in builder order before polling them.
                biased;

                result = uris.next() => match result {
                    Some(Ok(uri)) => {
                        trace!("{session}: adding {uri} to queue");
                        in_flight.push(self.add_to_queue(&session, &device_id, uri));
                    }
                    Some(Err(e)) => {
                        error!("{session}: background drain stopped: {e}");
                        break;
                    }
                    None => break,
                },
                Some(added) = in_flight.next(), if !in_flight.is_empty() => {
                    queued += usize::from(added);
                }
            }
        }

        self.deregister(&session, &builder);

        while let Some(added) = in_flight.next().await {
            queued += usize::from(added);
        }

        debug!("{session}: background drain done after queueing {queued} uri(s)");
    }

    /// Returns whether `uri` was added.
    async fn add_to_queue(&self, session: &SessionId, device_id: &str, uri: String) -> bool {
        match self.inner.player.add_to_queue(device_id, &uri).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{session}: failed adding {uri} to queue: {e}");
                false
            }
        }
    }

    /// Removes `builder` from the background registry unless a newer flush
    /// replaced it already.
    fn deregister(&self, session: &SessionId, builder: &Arc<QueueBuilder>) {
        let mut background = self.background();
        if background
            .get(session)
            .is_some_and(|current| Arc::ptr_eq(current, builder))
        {
            background.remove(session);
        }
    }
}
