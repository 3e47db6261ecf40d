//! Classification of music service URIs.
//!
//! URIs take the form `scheme:type:id`, for example
//! `spotify:album:4aawyAB9vmqN3uQ7FjRGTy`. The type component decides
//! whether a URI can be played as-is or needs to be expanded first:
//!
//! * Singular: [`UriType::Track`] and [`UriType::Episode`]
//! * Collections: [`UriType::Album`], [`UriType::Artist`],
//!   [`UriType::Playlist`] and [`UriType::Show`]
//!
//! # Example
//!
//! ```rust
//! use spotqueue::uri::{self, UriType};
//!
//! let uri = "spotify:album:4aawyAB9vmqN3uQ7FjRGTy";
//! assert_eq!(uri::uri_type(uri)?, UriType::Album);
//! assert!(!uri::is_singular(uri)?);
//! assert_eq!(uri::uri_id(uri), "4aawyAB9vmqN3uQ7FjRGTy");
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// A URI that does not carry any of the known type components.
#[derive(Clone, Debug, Error, PartialEq, Eq, Hash)]
#[error("unrecognized uri: {0}")]
pub struct UnrecognizedUri(pub String);

impl From<UnrecognizedUri> for Error {
    fn from(e: UnrecognizedUri) -> Self {
        Self::invalid_argument(e)
    }
}

/// The kind of entity a URI refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UriType {
    Track,
    Artist,
    Album,
    Playlist,
    Show,
    Episode,
}

impl UriType {
    const ALL: [Self; 6] = [
        Self::Track,
        Self::Artist,
        Self::Album,
        Self::Playlist,
        Self::Show,
        Self::Episode,
    ];

    /// The type component as it appears in a URI.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Playlist => "playlist",
            Self::Show => "show",
            Self::Episode => "episode",
        }
    }

    /// Whether a URI of this type plays without being resolved first.
    #[must_use]
    pub fn is_singular(self) -> bool {
        matches!(self, Self::Track | Self::Episode)
    }

    /// Whether a URI of this type expands into a list of singular URIs.
    #[must_use]
    pub fn is_collection(self) -> bool {
        !self.is_singular()
    }
}

impl fmt::Display for UriType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UriType {
    type Err = UnrecognizedUri;

    /// Classifies a full URI by its type component.
    ///
    /// The first component is the scheme and is not checked. Anything
    /// without a known type in second position is rejected.
    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let mut components = uri.split(':');
        let kind = components.nth(1).filter(|_| components.next().is_some());

        kind.and_then(|kind| Self::ALL.into_iter().find(|t| t.as_str() == kind))
            .ok_or_else(|| UnrecognizedUri(uri.to_owned()))
    }
}

/// Returns the type of `uri`.
///
/// # Errors
///
/// Returns [`UnrecognizedUri`] when `uri` is not of the form
/// `scheme:type:id` with a known type.
pub fn uri_type(uri: &str) -> Result<UriType, UnrecognizedUri> {
    uri.parse()
}

/// Whether `uri` can be played without being resolved first.
///
/// # Errors
///
/// Returns [`UnrecognizedUri`] when `uri` cannot be classified.
pub fn is_singular(uri: &str) -> Result<bool, UnrecognizedUri> {
    uri_type(uri).map(UriType::is_singular)
}

/// Returns the bare id of `uri`: its last colon-delimited component.
#[must_use]
pub fn uri_id(uri: &str) -> &str {
    uri.rsplit(':').next().unwrap_or(uri)
}
