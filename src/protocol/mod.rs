//! Web API request and response types.
//!
//! Only the fields that queue building needs are modelled: URIs of playable
//! items, pagination links, episode resume points and devices. Everything
//! else in the responses is ignored.
//!
//! # Submodules
//!
//! * [`objects`] - Response objects
//! * [`requests`] - Request bodies

pub mod objects;
pub mod requests;

use std::fmt::Debug;

use serde::Deserialize;

use crate::error::Result;

/// Parses and logs JSON responses from the Web API.
///
/// `origin` describes the endpoint for logging.
///
/// # Errors
///
/// Returns error if `body` is not valid JSON or does not match `T`.
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e:?})");
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}
