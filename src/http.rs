//! HTTP client with rate limiting and bearer authorization for the Web API.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting to stay within the API quota
//! * An `Authorization` header from a [`TokenProvider`]
//! * Consistent timeouts and headers
//! * Mapping of non-success status codes to [`Error`]s
//!
//! # Rate Limiting
//!
//! * 50 calls per 5-second interval
//! * Allows bursts up to the maximum calls per interval
//! * Requests that would exceed the limit are delayed
//!
//! # Example
//!
//! ```rust
//! use spotqueue::http::Client;
//!
//! let client = Client::new(&config, Arc::new(config.access_token.clone()))?;
//! let request = client.get(url);
//! let response = client.execute(request).await?;
//! ```

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    self,
    header::{HeaderValue, AUTHORIZATION},
    Body, Method, Url,
};

use crate::{
    config::Config,
    error::{Error, Result},
    token::TokenProvider,
};

/// HTTP client with built-in rate limiting and authorization.
pub struct Client {
    /// Unlimited request client for special cases.
    pub unlimited: reqwest::Client,

    /// Rate limiter for API quota compliance.
    rate_limiter: DefaultDirectRateLimiter,

    tokens: Arc<dyn TokenProvider>,
}

impl Client {
    /// Rolling window of the rate limit.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum calls per window. Requests beyond this are delayed.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 50;

    /// Duration to keep idle connections alive.
    ///
    /// Queue flushes come in bursts that benefit from reusing connections.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for individual network reads.
    const READ_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a new client that authorizes with tokens from `tokens`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &Config, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .read_timeout(Self::READ_TIMEOUT)
            .user_agent(&config.user_agent)
            .build()?;

        // Rate limit own requests as to not DoS the service.
        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .ok_or_else(|| Error::internal("quota time interval is zero"))?
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .ok_or_else(|| Error::internal("calls per interval is zero"))?,
            );

        Ok(Self {
            unlimited: http_client,
            rate_limiter: governor::RateLimiter::direct(quota),
            tokens,
        })
    }

    /// Builds a request with specified method, URL and optional body.
    pub fn request(&self, method: Method, url: Url, body: Option<Body>) -> reqwest::Request {
        let mut request = reqwest::Request::new(method, url);
        *request.body_mut() = body;
        request
    }

    pub fn get(&self, url: Url) -> reqwest::Request {
        self.request(Method::GET, url, None)
    }

    /// Builds a POST request with an empty body.
    pub fn post(&self, url: Url) -> reqwest::Request {
        // An empty body still sends `Content-Length: 0`, which the API requires.
        self.request(Method::POST, url, Some(Body::from(Vec::new())))
    }

    /// Builds a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns error if `body` cannot be serialized.
    pub fn put_json<T>(&self, url: Url, body: &T) -> Result<reqwest::Request>
    where
        T: serde::Serialize + ?Sized,
    {
        let json = serde_json::to_vec(body)?;
        let mut request = self.request(Method::PUT, url, Some(json.into()));
        request.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(request)
    }

    /// Executes a request with rate limiting and authorization.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * No access token is available
    /// * Request execution fails
    /// * The response status is not a success
    pub async fn execute(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))?;
        authorization.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, authorization);

        // No need to await with jitter because the level of concurrency is low.
        self.rate_limiter.until_ready().await;

        let method = request.method().clone();
        let url = request.url().clone();
        trace!("{method} {url}");

        let response = self.unlimited.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("{method} {url}: {status}");
        Err(Error::from_status(status, &body))
    }
}
