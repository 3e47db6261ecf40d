use serde::Serialize;

/// Body of a request to start playback.
///
/// Singular URIs are sent as a list of `uris`; collections are sent as a
/// `context_uri` so that the service plays the whole collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Play<'a> {
    Uris { uris: Vec<&'a str> },
    Context { context_uri: &'a str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_both_shapes() {
        let uris = Play::Uris {
            uris: vec!["spotify:track:a"],
        };
        let context = Play::Context {
            context_uri: "spotify:album:b",
        };

        assert_eq!(serde_json::to_string(&uris).unwrap(), r#"{"uris":["spotify:track:a"]}"#);
        assert_eq!(
            serde_json::to_string(&context).unwrap(),
            r#"{"context_uri":"spotify:album:b"}"#
        );
    }
}
