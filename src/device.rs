//! Playback devices and the choice of which one a session targets.

use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A device that can play audio for the user's account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,

    /// Device kind as reported by the service, like `Computer` or
    /// `Speaker`.
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub volume_percent: Option<u8>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Chooses the device to target from the ones available to the account.
///
/// The `preferred` device wins when it is present: this is the companion
/// playback daemon, if the host runs one. Otherwise the currently active
/// device is chosen.
///
/// # Errors
///
/// * [`Unavailable`](crate::error::ErrorKind::Unavailable) when there are
///   no devices at all
/// * [`NotFound`](crate::error::ErrorKind::NotFound) when none of them is
///   preferred or active
pub fn select_device(devices: Vec<Device>, preferred: Option<&str>) -> Result<Device> {
    if devices.is_empty() {
        return Err(Error::unavailable("no player devices"));
    }

    if let Some(preferred) = preferred {
        if let Some(device) = devices.iter().find(|device| device.id == preferred) {
            debug!("found preferred device {device}");
            return Ok(device.clone());
        }
        trace!("preferred device {preferred} not available");
    }

    devices
        .into_iter()
        .find(|device| device.is_active)
        .ok_or_else(|| Error::not_found("no active device"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn device(id: &str, is_active: bool) -> Device {
        Device {
            id: id.to_owned(),
            name: format!("device {id}"),
            is_active,
            ..Default::default()
        }
    }

    #[test]
    fn no_devices_is_unavailable() {
        let err = select_device(Vec::new(), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
    }

    #[test]
    fn prefers_daemon_device_over_active_one() {
        let devices = vec![device("phone", true), device("daemon", false)];
        let chosen = select_device(devices, Some("daemon")).unwrap();
        assert_eq!(chosen.id, "daemon");
    }

    #[test]
    fn falls_back_to_active_device() {
        let devices = vec![device("laptop", false), device("phone", true)];
        let chosen = select_device(devices, Some("daemon")).unwrap();
        assert_eq!(chosen.id, "phone");
    }

    #[test]
    fn no_active_device_is_not_found() {
        let devices = vec![device("laptop", false)];
        let err = select_device(devices, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn deserializes_web_api_device() {
        let json = r#"{
            "id": "5fbb3ba6aa454b5534c4ba43a8c7e8e45a63ad0e",
            "is_active": true,
            "is_private_session": false,
            "is_restricted": false,
            "name": "Kitchen speaker",
            "type": "Speaker",
            "volume_percent": 59
        }"#;

        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.name, "Kitchen speaker");
        assert_eq!(device.kind, "Speaker");
        assert!(device.is_active);
        assert_eq!(device.volume_percent, Some(59));
    }
}
