//! HTTP plumbing shared by the remote clients.
//!
//! [`HttpClient`] is the seam the rest of the crate talks through, so tests
//! and alternative transports can swap the implementation. [`BearerAuth`]
//! wraps any client and injects an `Authorization: Bearer` header.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Request, Response};

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Plain reqwest-backed client.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req).await
    }
}

/// An [`HttpClient`] wrapper that authenticates every request with a bearer
/// token, the scheme the Cloudflare API expects.
pub struct BearerAuth<C> {
    inner: C,
    header_value: String,
}

impl<C> BearerAuth<C> {
    pub fn new(inner: C, token: &str) -> Self {
        Self {
            inner,
            header_value: format!("Bearer {token}"),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for BearerAuth<C> {
    async fn execute(&self, mut req: Request) -> reqwest::Result<Response> {
        let value = self
            .header_value
            .parse()
            .expect("BearerAuth: token is not a valid header value");
        req.headers_mut().insert(reqwest::header::AUTHORIZATION, value);
        self.inner.execute(req).await
    }
}

/// Fetches a URL and returns the raw body bytes.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = Request::new(reqwest::Method::GET, url.parse()?);
    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}
