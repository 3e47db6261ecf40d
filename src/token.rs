use std::str::FromStr;

use async_trait::async_trait;
use veil::Redact;

use crate::error::{Error, Result};

/// Bearer token to access the Web API.
#[derive(Clone, PartialEq, Eq, Hash, Redact)]
#[redact(all)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccessToken {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::invalid_argument("access token is empty"));
        }

        // Must fit in an `Authorization` header as-is.
        if token.contains(|chr: char| !chr.is_ascii_graphic()) {
            return Err(Error::invalid_argument(
                "access token contains invalid characters",
            ));
        }

        Ok(Self(token.to_owned()))
    }
}

/// Supplies access tokens for Web API requests.
///
/// Refreshing tokens is up to the host. The token is asked for on every
/// request, so a provider can hand out a new one whenever it wants.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

#[async_trait]
impl TokenProvider for AccessToken {
    async fn access_token(&self) -> Result<AccessToken> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_and_trims() {
        let token: AccessToken = " BQDx-abc_123 \n".parse().unwrap();
        assert_eq!(token.as_str(), "BQDx-abc_123");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        for input in ["", "   ", "two words"] {
            let err = input.parse::<AccessToken>().unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "{input:?}");
        }
    }

    #[test]
    fn debug_output_is_redacted() {
        let token: AccessToken = "supersecret".parse().unwrap();
        assert!(!format!("{token:?}").contains("supersecret"));
    }
}
