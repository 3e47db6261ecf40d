//! Recording fakes of the remote collaborators.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    device::Device,
    error::{Error, Result},
    remote::{DeviceResolver, Player, UriResolver},
    session::SessionId,
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A call made to one of the collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Resolve(String),
    ActiveDevice(SessionId),
    Play(String, String),
    AddToQueue(String, String),
}

/// Holds a resolution until the test releases it.
#[derive(Default)]
pub(crate) struct Gate {
    /// Signalled when the resolver starts waiting on this gate.
    pub entered: Notify,
    /// Signal to let the resolver return.
    pub release: Notify,
}

#[derive(Default)]
pub(crate) struct Remote {
    calls: Mutex<Vec<Call>>,
    collections: Mutex<HashMap<String, Result<Vec<String>>>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    device: Mutex<Option<Device>>,
    failing_plays: Mutex<Vec<String>>,
    stalled_queue: AtomicBool,
    play_observer: Mutex<Option<PlayObserver>>,
}

type PlayObserver = Box<dyn Fn(&str) + Send>;

impl Remote {
    pub fn new() -> Arc<Self> {
        let remote = Self::default();
        *remote.device.lock().unwrap() = Some(Device {
            id: "kitchen".to_owned(),
            name: "Kitchen speaker".to_owned(),
            is_active: true,
            ..Default::default()
        });
        Arc::new(remote)
    }

    pub fn without_devices() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn collection(&self, uri: &str, items: &[&str]) {
        let items = items.iter().map(|&item| item.to_owned()).collect();
        self.collections.lock().unwrap().insert(uri.to_owned(), Ok(items));
    }

    pub fn failing_collection(&self, uri: &str) {
        self.collections
            .lock()
            .unwrap()
            .insert(uri.to_owned(), Err(Error::unavailable("resolver down")));
    }

    pub fn failing_play(&self, uri: &str) {
        self.failing_plays.lock().unwrap().push(uri.to_owned());
    }

    /// Makes every add-to-queue request hang after it was recorded.
    pub fn stall_queue(&self) {
        self.stalled_queue.store(true, Ordering::SeqCst);
    }

    /// Runs `observer` with the URI of every play request, before it is
    /// recorded.
    pub fn on_play(&self, observer: impl Fn(&str) + Send + 'static) {
        *self.play_observer.lock().unwrap() = Some(Box::new(observer));
    }

    pub fn gate(&self, uri: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates.lock().unwrap().insert(uri.to_owned(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resolves(&self) -> Vec<String> {
        self.filter(|call| match call {
            Call::Resolve(uri) => Some(uri.clone()),
            _ => None,
        })
    }

    pub fn plays(&self) -> Vec<String> {
        self.filter(|call| match call {
            Call::Play(_, uri) => Some(uri.clone()),
            _ => None,
        })
    }

    pub fn queued(&self) -> Vec<String> {
        self.filter(|call| match call {
            Call::AddToQueue(_, uri) => Some(uri.clone()),
            _ => None,
        })
    }

    fn filter(&self, f: impl Fn(&Call) -> Option<String>) -> Vec<String> {
        self.calls.lock().unwrap().iter().filter_map(f).collect()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl UriResolver for Remote {
    async fn resolve(&self, uri: &str) -> Result<Vec<String>> {
        self.record(Call::Resolve(uri.to_owned()));

        let gate = self.gates.lock().unwrap().get(uri).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        match self.collections.lock().unwrap().get(uri) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(e)) => Err(Error::new(e.kind, e.to_string())),
            None => Err(Error::not_found(format!("no collection {uri}"))),
        }
    }
}

#[async_trait]
impl DeviceResolver for Remote {
    async fn active_device(&self, session: &SessionId) -> Result<Device> {
        self.record(Call::ActiveDevice(session.clone()));
        tokio::task::yield_now().await;

        self.device
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::unavailable("no player devices"))
    }
}

#[async_trait]
impl Player for Remote {
    async fn play(&self, device_id: &str, uri: &str) -> Result<()> {
        if let Some(observer) = &*self.play_observer.lock().unwrap() {
            observer(uri);
        }
        self.record(Call::Play(device_id.to_owned(), uri.to_owned()));
        if self.failing_plays.lock().unwrap().iter().any(|failing| failing == uri) {
            return Err(Error::not_found("no active device"));
        }
        Ok(())
    }

    async fn add_to_queue(&self, device_id: &str, uri: &str) -> Result<()> {
        self.record(Call::AddToQueue(device_id.to_owned(), uri.to_owned()));
        if self.stalled_queue.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
