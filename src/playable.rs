use std::fmt;

use crate::uri::{self, UnrecognizedUri, UriType};

/// A user-selected entity that can be queued for playback: a URI plus the
/// name to show for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Playable {
    uri: String,
    name: String,
}

impl Playable {
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of entity this refers to.
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedUri`] when the URI cannot be classified.
    pub fn uri_type(&self) -> Result<UriType, UnrecognizedUri> {
        uri::uri_type(&self.uri)
    }
}

impl fmt::Display for Playable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uri)
    }
}
