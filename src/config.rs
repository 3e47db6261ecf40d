use std::{fs, path::Path};

use serde::Deserialize;
use url::Url;

use crate::{
    error::{Error, Result},
    token::AccessToken,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,

    pub user_agent: String,

    /// Base URL of the Web API, with a trailing slash.
    pub api_url: Url,
    pub access_token: AccessToken,

    /// Device to prefer over the active one, like that of a playback daemon
    /// that the host runs.
    pub preferred_device: Option<String>,

    /// Market to pick artist top tracks from.
    pub market: String,

    /// Maximum number of unfinished episodes to queue for a show.
    pub episode_limit: usize,
}

/// Settings as read from a configuration file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct File {
    access_token: String,
    api_url: Option<String>,
    device_id: Option<String>,
    market: Option<String>,
    episode_limit: Option<usize>,
}

impl Config {
    const DEFAULT_API_URL: &'static str = "https://api.spotify.com/";
    const DEFAULT_MARKET: &'static str = "from_token";

    /// Unfinished episodes are picked from a single page of 50, so more than
    /// this would mostly come up short anyway.
    pub const MAX_EPISODE_LIMIT: usize = 10;

    /// Configuration files hold a handful of short values.
    const MAX_FILE_SIZE: u64 = 4096;

    /// # Errors
    ///
    /// Will return `Err` if the application name or version cannot be used in
    /// a `User-Agent` header.
    pub fn with_token(access_token: AccessToken) -> Result<Self> {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();

        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
        {
            return Err(Error::internal(format!(
                "application name and/or version invalid (\"{app_name}\"; \"{app_version}\")"
            )));
        }

        let user_agent = format!("{app_name}/{app_version} (Rust; {})", std::env::consts::OS);
        trace!("user agent: {user_agent}");

        Ok(Self {
            app_name,
            app_version,
            user_agent,
            api_url: Url::parse(Self::DEFAULT_API_URL)?,
            access_token,
            preferred_device: None,
            market: Self::DEFAULT_MARKET.to_owned(),
            episode_limit: Self::MAX_EPISODE_LIMIT,
        })
    }

    /// Loads the configuration from a TOML file.
    ///
    /// Only `access_token` is required. `api_url`, `device_id`, `market` and
    /// `episode_limit` override the defaults.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file cannot be read, is too large, or holds
    /// invalid values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: the file should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!(
                "{} is too large ({file_size} bytes)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses the configuration from TOML `contents`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the contents are not valid TOML or hold invalid
    /// values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: File = toml::from_str(contents)?;

        let mut config = Self::with_token(file.access_token.parse()?)?;

        if let Some(api_url) = file.api_url {
            let mut api_url = Url::parse(&api_url)?;
            // Relative endpoints must join under the base, not replace its
            // last path segment.
            if !api_url.path().ends_with('/') {
                let path = format!("{}/", api_url.path());
                api_url.set_path(&path);
            }
            config.api_url = api_url;
        }

        if let Some(device_id) = file.device_id.filter(|id| !id.is_empty()) {
            config.preferred_device = Some(device_id);
        }

        if let Some(market) = file.market {
            if market.is_empty() {
                return Err(Error::invalid_argument("market is empty"));
            }
            config.market = market;
        }

        if let Some(limit) = file.episode_limit {
            if !(1..=Self::MAX_EPISODE_LIMIT).contains(&limit) {
                return Err(Error::invalid_argument(format!(
                    "expected 1 ≤ episode_limit ≤ {}, given episode_limit = {limit}",
                    Self::MAX_EPISODE_LIMIT
                )));
            }
            config.episode_limit = limit;
        }

        Ok(config)
    }
}
