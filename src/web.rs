//! Web API implementation of the remote collaborators.
//!
//! [`WebApi`] resolves collections, finds devices and controls playback
//! through the public Web API:
//!
//! | URI type | Endpoint                          | Result                          |
//! |----------|-----------------------------------|---------------------------------|
//! | album    | `v1/albums/{id}/tracks`           | all tracks, following pages     |
//! | artist   | `v1/artists/{id}/top-tracks`      | top tracks in the market        |
//! | playlist | `v1/playlists/{id}/tracks`        | all available tracks            |
//! | show     | `v1/shows/{id}/episodes`          | unfinished episodes, up to limit|
//! | track    |                                   | the URI itself                  |
//! | episode  |                                   | the URI itself                  |

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::{
    config::Config,
    device::{self, Device},
    error::Result,
    http,
    protocol::{
        self,
        objects::{Devices, Episode, Paging, PlaylistItem, TopTracks, UriObject},
        requests,
    },
    remote::{DeviceResolver, Player, UriResolver},
    session::SessionId,
    token::TokenProvider,
    uri::{self, UriType},
};

/// Client of the Web API for one user.
pub struct WebApi {
    http: http::Client,
    api_url: Url,
    preferred_device: Option<String>,
    market: String,
    episode_limit: usize,
}

impl WebApi {
    /// Page size for endpoints that support it.
    const PAGE_LIMIT: &'static str = "50";

    /// Creates a client that authorizes with the access token of `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_token_provider(config, Arc::new(config.access_token.clone()))
    }

    /// Creates a client that asks `tokens` for an access token on every
    /// request.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_token_provider(config: &Config, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            http: http::Client::new(config, tokens)?,
            api_url: config.api_url.clone(),
            preferred_device: config.preferred_device.clone(),
            market: config.market.clone(),
            episode_limit: config.episode_limit,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.api_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get<T>(&self, url: Url, origin: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de> + fmt::Debug,
    {
        let request = self.http.get(url);
        let body = self.http.execute(request).await?.text().await?;
        protocol::json(&body, origin)
    }

    /// Collects the items of every page, starting at `url`.
    async fn get_all<T>(&self, url: Url, origin: &str) -> Result<Vec<T>>
    where
        T: for<'de> Deserialize<'de> + fmt::Debug,
    {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let page: Paging<T> = self.get(url, origin).await?;
            items.extend(page.items);
            next = page.next;
        }
        Ok(items)
    }

    async fn album_tracks(&self, id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(
            &format!("v1/albums/{id}/tracks"),
            &[("limit", Self::PAGE_LIMIT)],
        )?;
        let tracks: Vec<UriObject> = self.get_all(url, "album tracks").await?;
        Ok(tracks.into_iter().map(|track| track.uri).collect())
    }

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(
            &format!("v1/artists/{id}/top-tracks"),
            &[("market", self.market.as_str())],
        )?;
        let top: TopTracks = self.get(url, "artist top tracks").await?;
        Ok(top.tracks.into_iter().map(|track| track.uri).collect())
    }

    async fn playlist_tracks(&self, id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(
            &format!("v1/playlists/{id}/tracks"),
            &[("limit", Self::PAGE_LIMIT)],
        )?;
        let items: Vec<PlaylistItem> = self.get_all(url, "playlist tracks").await?;

        let total = items.len();
        let tracks: Vec<String> = items
            .into_iter()
            .filter_map(|item| item.track.map(|track| track.uri))
            .collect();
        if tracks.len() < total {
            debug!(
                "playlist {id}: skipped {} unavailable track(s)",
                total - tracks.len()
            );
        }

        Ok(tracks)
    }

    async fn unfinished_episodes(&self, id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(
            &format!("v1/shows/{id}/episodes"),
            &[("limit", Self::PAGE_LIMIT)],
        )?;
        let page: Paging<Episode> = self.get(url, "show episodes").await?;
        Ok(page
            .items
            .into_iter()
            .filter(Episode::is_unfinished)
            .take(self.episode_limit)
            .map(|episode| episode.uri)
            .collect())
    }
}

/// Chooses how to start playback of `uri`.
fn play_body(uri: &str) -> Result<requests::Play<'_>> {
    Ok(if uri::is_singular(uri)? {
        requests::Play::Uris { uris: vec![uri] }
    } else {
        requests::Play::Context { context_uri: uri }
    })
}

#[async_trait]
impl UriResolver for WebApi {
    async fn resolve(&self, uri: &str) -> Result<Vec<String>> {
        let id = uri::uri_id(uri);
        let uris = match uri::uri_type(uri)? {
            UriType::Track | UriType::Episode => vec![uri.to_owned()],
            UriType::Album => self.album_tracks(id).await?,
            UriType::Artist => self.artist_top_tracks(id).await?,
            UriType::Playlist => self.playlist_tracks(id).await?,
            UriType::Show => self.unfinished_episodes(id).await?,
        };

        debug!("{uri}: resolved to {} item(s)", uris.len());
        Ok(uris)
    }
}

#[async_trait]
impl DeviceResolver for WebApi {
    async fn active_device(&self, session: &SessionId) -> Result<Device> {
        let url = self.endpoint("v1/me/player/devices", &[])?;
        let devices: Devices = self.get(url, "devices").await?;
        let devices = devices
            .devices
            .into_iter()
            .filter_map(protocol::objects::DeviceObject::into_device)
            .collect();

        let device = device::select_device(devices, self.preferred_device.as_deref())?;
        debug!("{session}: playing on {device}");
        Ok(device)
    }
}

#[async_trait]
impl Player for WebApi {
    async fn play(&self, device_id: &str, uri: &str) -> Result<()> {
        let url = self.endpoint("v1/me/player/play", &[("device_id", device_id)])?;
        let request = self.http.put_json(url, &play_body(uri)?)?;
        self.http.execute(request).await?;

        info!("playing {uri} on {device_id}");
        Ok(())
    }

    async fn add_to_queue(&self, device_id: &str, uri: &str) -> Result<()> {
        let url = self.endpoint(
            "v1/me/player/queue",
            &[("device_id", device_id), ("uri", uri)],
        )?;
        let request = self.http.post(url);
        self.http.execute(request).await?;

        debug!("queued {uri} on {device_id}");
        Ok(())
    }
}

impl fmt::Debug for WebApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebApi")
            .field("api_url", &self.api_url.as_str())
            .field("preferred_device", &self.preferred_device)
            .field("market", &self.market)
            .field("episode_limit", &self.episode_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::error::ErrorKind;

    /// Answers a single HTTP request on a local port with `body`, returning
    /// the base URL to reach it.
    async fn respond_once(body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn web_api() -> WebApi {
        let mut config = Config::with_token("token".parse().unwrap()).unwrap();
        config.api_url = Url::parse("http://localhost:8080/api/").unwrap();
        config.market = "NL".to_owned();
        WebApi::new(&config).unwrap()
    }

    #[test]
    fn endpoints_join_under_base() {
        let api = web_api();

        let url = api
            .endpoint("v1/artists/xyz/top-tracks", &[("market", "NL")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/artists/xyz/top-tracks?market=NL"
        );

        let url = api.endpoint("v1/me/player/devices", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/me/player/devices");
    }

    #[test]
    fn queue_endpoint_encodes_uri() {
        let api = web_api();
        let url = api
            .endpoint(
                "v1/me/player/queue",
                &[("device_id", "kitchen"), ("uri", "spotify:track:abc")],
            )
            .unwrap();
        assert_eq!(
            url.query(),
            Some("device_id=kitchen&uri=spotify%3Atrack%3Aabc")
        );
    }

    #[test]
    fn plays_singular_uris_as_list_and_collections_as_context() {
        assert_eq!(
            play_body("spotify:episode:e").unwrap(),
            requests::Play::Uris {
                uris: vec!["spotify:episode:e"]
            }
        );
        assert_eq!(
            play_body("spotify:playlist:p").unwrap(),
            requests::Play::Context {
                context_uri: "spotify:playlist:p"
            }
        );
        assert_eq!(
            play_body("nonsense").unwrap_err().kind,
            ErrorKind::InvalidArgument
        );
    }

    #[tokio::test]
    async fn singular_uris_resolve_without_requests() {
        let api = web_api();
        assert_eq!(
            api.resolve("spotify:track:t").await.unwrap(),
            vec!["spotify:track:t"]
        );
        assert_eq!(
            api.resolve("spotify:episode:e").await.unwrap(),
            vec!["spotify:episode:e"]
        );
    }

    #[tokio::test]
    async fn page_total_is_not_trusted() {
        let mut config = Config::with_token("token".parse().unwrap()).unwrap();
        config.api_url = respond_once(
            r#"{
                "items": [ { "uri": "spotify:track:one" }, { "uri": "spotify:track:two" } ],
                "next": null,
                "total": 18446744073709551615
            }"#,
        )
        .await;
        let api = WebApi::new(&config).unwrap();

        assert_eq!(
            api.resolve("spotify:album:huge").await.unwrap(),
            ["spotify:track:one", "spotify:track:two"]
        );
    }
}
