use serde::Deserialize;
use url::Url;

use crate::device::Device;

/// A page of results, with a link to the next page if there is one.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    pub next: Option<Url>,
    #[serde(default)]
    pub total: u64,
}

/// Any object that carries a URI, like a track or an episode.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct UriObject {
    pub uri: String,
}

/// An entry of a playlist. `track` is null for items that are no longer
/// available.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<UriObject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TopTracks {
    pub tracks: Vec<UriObject>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct ResumePoint {
    pub fully_played: bool,
    #[serde(default)]
    pub resume_position_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Episode {
    pub uri: String,
    #[serde(default)]
    pub resume_point: Option<ResumePoint>,
}

impl Episode {
    /// Whether the user has not listened to this episode until the end.
    #[must_use]
    pub fn is_unfinished(&self) -> bool {
        !self.resume_point.is_some_and(|point| point.fully_played)
    }
}

/// A device as listed by the Web API. Some devices have no id and cannot be
/// targeted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeviceObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

impl DeviceObject {
    #[must_use]
    pub fn into_device(self) -> Option<Device> {
        Some(Device {
            id: self.id?,
            name: self.name,
            kind: self.kind,
            is_active: self.is_active,
            volume_percent: self.volume_percent,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Devices {
    pub devices: Vec<DeviceObject>,
}
