//! Remote collaborators of the queue builders.
//!
//! The queue builders and their manager never talk to the music service
//! directly. Everything that needs the network goes through these traits,
//! so hosts can plug in the Web API client from [`web`](crate::web) or any
//! other implementation.

use async_trait::async_trait;

use crate::{device::Device, error::Result, session::SessionId};

/// Expands a collection URI into the singular URIs it contains.
#[async_trait]
pub trait UriResolver: Send + Sync {
    /// Returns the track or episode URIs of `uri`, in playback order.
    ///
    /// An empty list is a valid result, for example for a show of which all
    /// episodes were played already.
    async fn resolve(&self, uri: &str) -> Result<Vec<String>>;
}

/// Finds the device that a session should play on.
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// # Errors
    ///
    /// Fails when no device is available.
    async fn active_device(&self, session: &SessionId) -> Result<Device>;
}

/// Controls playback on a device.
#[async_trait]
pub trait Player: Send + Sync {
    /// Starts playing `uri` right away. This may be a singular or a
    /// collection URI.
    async fn play(&self, device_id: &str, uri: &str) -> Result<()>;

    /// Appends the singular `uri` to the playback queue without
    /// interrupting what is playing.
    async fn add_to_queue(&self, device_id: &str, uri: &str) -> Result<()>;
}
